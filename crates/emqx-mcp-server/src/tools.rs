//! Tool registry and dispatcher.
//!
//! The tool set is closed: [`TOOLS`] is a static table from tool name to
//! its description, input schema and validator. Dispatch runs a linear
//! pipeline per call (validate, build, call, normalize) and always ends in
//! a [`ToolResult`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::normalize::{self, ToolResult};
use crate::request;
use crate::transport::BrokerTransport;
use crate::validate::{self, ToolArgs, ValidationError, MAX_LIMIT};

/// Names of every tool the server exposes.
///
/// Discriminants index into [`TOOLS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListClients = 0,
    GetClient = 1,
    KickClient = 2,
    PublishMessage = 3,
    ValidateSql = 4,
    ListSchemas = 5,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ListClients => "list_mqtt_clients",
            ToolName::GetClient => "get_mqtt_client",
            ToolName::KickClient => "kick_mqtt_client",
            ToolName::PublishMessage => "publish_mqtt_message",
            ToolName::ValidateSql => "validate_sql",
            ToolName::ListSchemas => "list_available_schemas",
        }
    }

    /// Registry entry for this tool.
    pub fn spec(self) -> &'static ToolSpec {
        &TOOLS[self as usize]
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tool: {0}")]
pub struct UnknownTool(pub String);

impl FromStr for ToolName {
    type Err = UnknownTool;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        TOOLS
            .iter()
            .map(|spec| spec.name)
            .find(|tool| tool.as_str() == name)
            .ok_or_else(|| UnknownTool(name.to_string()))
    }
}

// ── Registry ──────────────────────────────────────────────────────

/// One registry entry.
pub struct ToolSpec {
    pub name: ToolName,
    pub description: &'static str,
    input_schema: fn() -> Value,
    validate: fn(&Map<String, Value>) -> Result<ToolArgs, ValidationError>,
}

impl ToolSpec {
    pub fn input_schema(&self) -> Value {
        (self.input_schema)()
    }

    pub fn validate(&self, arguments: &Value) -> Result<ToolArgs, ValidationError> {
        let map = validate::arguments_object(arguments)?;
        (self.validate)(&map)
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.as_str(),
            description: self.description,
            input_schema: self.input_schema(),
        }
    }
}

/// Tool definition as advertised by `tools/list`.
#[derive(Debug, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub static TOOLS: [ToolSpec; 6] = [
    ToolSpec {
        name: ToolName::ListClients,
        description: "List MQTT clients connected to the broker. Supports pagination \
                      (page, limit) and exact or fuzzy filters on node, client ID, username, \
                      IP address, connection state, clean start flag and protocol version.",
        input_schema: list_clients_schema,
        validate: |args| validate::list_clients(args).map(ToolArgs::ListClients),
    },
    ToolSpec {
        name: ToolName::GetClient,
        description: "Get detailed information about a specific MQTT client by client ID",
        input_schema: client_id_schema,
        validate: |args| validate::client_id(args).map(ToolArgs::GetClient),
    },
    ToolSpec {
        name: ToolName::KickClient,
        description: "Disconnect a client from the MQTT broker by client ID",
        input_schema: client_id_schema,
        validate: |args| validate::client_id(args).map(ToolArgs::KickClient),
    },
    ToolSpec {
        name: ToolName::PublishMessage,
        description: "Publish an MQTT message to the broker",
        input_schema: publish_schema,
        validate: |args| validate::publish_message(args).map(ToolArgs::PublishMessage),
    },
    ToolSpec {
        name: ToolName::ValidateSql,
        description: "Validate a rule engine SQL statement by running it against sample \
                      event data (the context) on the broker",
        input_schema: validate_sql_schema,
        validate: |args| validate::validate_sql(args).map(ToolArgs::ValidateSql),
    },
    ToolSpec {
        name: ToolName::ListSchemas,
        description: "List the schemas registered in the broker's schema registry",
        input_schema: empty_schema,
        validate: |_| Ok(ToolArgs::ListSchemas),
    },
];

fn list_clients_schema() -> Value {
    let filter = |description: &str| json!({ "type": "string", "description": description });
    json!({
        "type": "object",
        "properties": {
            "page": { "type": "integer", "minimum": 1, "default": validate::DEFAULT_PAGE,
                      "description": "Page number" },
            "limit": { "type": "integer", "minimum": 1, "maximum": MAX_LIMIT,
                       "default": validate::DEFAULT_LIMIT, "description": "Results per page" },
            "node": filter("Node name"),
            "clientid": filter("Client ID"),
            "username": filter("Username"),
            "ip_address": filter("Client IP address"),
            "conn_state": filter("Connection state, e.g. connected, disconnected, idle"),
            "clean_start": { "type": "boolean", "description": "Clean start flag" },
            "proto_ver": { "type": ["string", "integer"], "description": "MQTT protocol version" },
            "like_clientid": filter("Fuzzy search by client ID pattern"),
            "like_username": filter("Fuzzy search by username pattern"),
            "like_ip_address": filter("Fuzzy search by IP address pattern"),
        },
        "required": []
    })
}

fn client_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "clientid": { "type": "string", "minLength": 1,
                          "description": "The unique identifier of the client" }
        },
        "required": ["clientid"]
    })
}

fn publish_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "topic": { "type": "string", "minLength": 1, "description": "MQTT topic" },
            "payload": { "type": "string", "description": "Message content" },
            "qos": { "type": "integer", "enum": [0, 1, 2], "default": 0,
                     "description": "Quality of Service level" },
            "retain": { "type": "boolean", "default": false,
                        "description": "Whether the broker retains the message" }
        },
        "required": ["topic", "payload"]
    })
}

fn validate_sql_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sql": { "type": "string", "minLength": 1, "description": "Rule SQL statement" },
            "context": { "type": "object",
                         "description": "Sample event the SQL is evaluated against, \
                                         e.g. {\"event_type\": \"message_publish\", \"topic\": \"t/1\", \"payload\": \"{}\"}" }
        },
        "required": ["sql", "context"]
    })
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {}, "required": [] })
}

// ── Dispatcher ────────────────────────────────────────────────────

/// A single tool invocation, consumed by [`Dispatcher::dispatch`].
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub tool: ToolName,
    pub arguments: Value,
}

impl ToolRequest {
    pub fn new(tool: ToolName, arguments: Value) -> Self {
        Self { tool, arguments }
    }

    /// Resolve a tool by its wire name.
    pub fn parse(name: &str, arguments: Value) -> Result<Self, UnknownTool> {
        Ok(Self::new(name.parse()?, arguments))
    }
}

/// Pipeline stages of one invocation. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validating,
    Building,
    Calling,
    Normalizing,
    Done,
}

/// Runs tool requests against a broker transport. Holds no per-call state.
pub struct Dispatcher<T> {
    transport: Arc<T>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: BrokerTransport> Dispatcher<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute one tool request. Issues at most one broker call.
    pub async fn dispatch(&self, request: ToolRequest) -> ToolResult {
        let tool = request.tool;
        info!("Tool called: {}", tool);
        trace_stage(tool, Stage::Received);

        trace_stage(tool, Stage::Validating);
        let args = match tool.spec().validate(&request.arguments) {
            Ok(args) => args,
            Err(e) => return finish(tool, e.into()),
        };

        trace_stage(tool, Stage::Building);
        let call = request::build(&args);
        debug!("{}: {}", tool, call);

        trace_stage(tool, Stage::Calling);
        let outcome = self.transport.execute(&call).await;

        trace_stage(tool, Stage::Normalizing);
        finish(tool, normalize::normalize(outcome))
    }
}

fn trace_stage(tool: ToolName, stage: Stage) {
    debug!("{}: {:?}", tool, stage);
}

fn finish(tool: ToolName, result: ToolResult) -> ToolResult {
    trace_stage(tool, Stage::Done);
    if let Some(err) = &result.error {
        warn!("{} failed ({}): {}", tool, err.kind.as_str(), err.message);
    }
    result
}
