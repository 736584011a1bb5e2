//! Tool argument validation.
//!
//! Every tool receives a loosely typed JSON object from the agent. The
//! functions here check presence, type and range of each recognized field,
//! fill in defaults, and produce a typed [`ToolArgs`] value. Unrecognized
//! fields are ignored so newer agents can send extra hints.

use serde_json::{Map, Value};

/// Default page for `list_mqtt_clients`.
pub const DEFAULT_PAGE: u64 = 1;

/// Default page size for `list_mqtt_clients`.
pub const DEFAULT_LIMIT: u64 = 100;

/// Largest page size the broker accepts.
pub const MAX_LIMIT: u64 = 10_000;

/// A rejected tool argument. Never reaches the broker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid argument '{field}': {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

// ── Typed arguments ───────────────────────────────────────────────

/// Filters and pagination for listing connected clients.
///
/// `None` means "not provided" and the filter is left to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListClientsArgs {
    pub page: u64,
    pub limit: u64,
    pub node: Option<String>,
    pub clientid: Option<String>,
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub conn_state: Option<String>,
    pub clean_start: Option<bool>,
    pub proto_ver: Option<String>,
    pub like_clientid: Option<String>,
    pub like_username: Option<String>,
    pub like_ip_address: Option<String>,
}

impl Default for ListClientsArgs {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            node: None,
            clientid: None,
            username: None,
            ip_address: None,
            conn_state: None,
            clean_start: None,
            proto_ver: None,
            like_clientid: None,
            like_username: None,
            like_ip_address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdArgs {
    pub clientid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishArgs {
    pub topic: String,
    pub payload: String,
    pub qos: u8,
    pub retain: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidateSqlArgs {
    pub sql: String,
    pub context: Map<String, Value>,
}

/// Validated arguments, one variant per tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    ListClients(ListClientsArgs),
    GetClient(ClientIdArgs),
    KickClient(ClientIdArgs),
    PublishMessage(PublishArgs),
    ValidateSql(ValidateSqlArgs),
    ListSchemas,
}

// ── Entry points ──────────────────────────────────────────────────

/// Unwrap the raw `arguments` value of a tool call.
///
/// Absent or `null` arguments are treated as an empty object.
pub fn arguments_object(raw: &Value) -> ValidationResult<Map<String, Value>> {
    match raw {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        other => Err(ValidationError::new(
            "arguments",
            format!("expected an object, got {}", type_name(other)),
        )),
    }
}

pub fn list_clients(args: &Map<String, Value>) -> ValidationResult<ListClientsArgs> {
    let fields = Fields(args);

    let page = fields.opt_u64("page")?.unwrap_or(DEFAULT_PAGE);
    if page < 1 {
        return Err(ValidationError::new("page", "must be at least 1"));
    }

    let limit = fields.opt_u64("limit")?.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ValidationError::new(
            "limit",
            format!("must be between 1 and {}, got {}", MAX_LIMIT, limit),
        ));
    }

    Ok(ListClientsArgs {
        page,
        limit,
        node: fields.opt_str("node")?,
        clientid: fields.opt_str("clientid")?,
        username: fields.opt_str("username")?,
        ip_address: fields.opt_str("ip_address")?,
        conn_state: fields.opt_str("conn_state")?,
        clean_start: fields.opt_bool("clean_start")?,
        proto_ver: fields.opt_str_or_u64("proto_ver")?,
        like_clientid: fields.opt_str("like_clientid")?,
        like_username: fields.opt_str("like_username")?,
        like_ip_address: fields.opt_str("like_ip_address")?,
    })
}

/// Shared by `get_mqtt_client` and `kick_mqtt_client`.
pub fn client_id(args: &Map<String, Value>) -> ValidationResult<ClientIdArgs> {
    Ok(ClientIdArgs {
        clientid: Fields(args).required_str("clientid")?,
    })
}

pub fn publish_message(args: &Map<String, Value>) -> ValidationResult<PublishArgs> {
    let fields = Fields(args);

    let topic = fields.required_str("topic")?;
    let payload = fields
        .opt_string_allow_empty("payload")?
        .ok_or_else(|| ValidationError::new("payload", "is required"))?;

    let qos = match fields.opt_u64("qos")? {
        None => 0,
        Some(q @ 0..=2) => q as u8,
        Some(q) => {
            return Err(ValidationError::new(
                "qos",
                format!("must be 0, 1 or 2, got {}", q),
            ))
        }
    };

    Ok(PublishArgs {
        topic,
        payload,
        qos,
        retain: fields.opt_bool("retain")?.unwrap_or(false),
    })
}

pub fn validate_sql(args: &Map<String, Value>) -> ValidationResult<ValidateSqlArgs> {
    let fields = Fields(args);
    let sql = fields.required_str("sql")?;
    let context = match fields.get("context") {
        None => return Err(ValidationError::new("context", "is required")),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            return Err(ValidationError::new(
                "context",
                format!("expected an object, got {}", type_name(other)),
            ))
        }
    };
    Ok(ValidateSqlArgs { sql, context })
}

// ── Field access ──────────────────────────────────────────────────

/// Typed accessors over an argument object. `null` reads as absent.
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// Optional string; the empty string is treated as not provided.
    fn opt_str(&self, name: &str) -> ValidationResult<Option<String>> {
        Ok(self
            .opt_string_allow_empty(name)?
            .filter(|s| !s.is_empty()))
    }

    fn opt_string_allow_empty(&self, name: &str) -> ValidationResult<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(wrong_type(name, "a string", other)),
        }
    }

    fn required_str(&self, name: &str) -> ValidationResult<String> {
        match self.get(name) {
            None => Err(ValidationError::new(name, "is required")),
            Some(Value::String(s)) if s.is_empty() => {
                Err(ValidationError::new(name, "must not be empty"))
            }
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(wrong_type(name, "a string", other)),
        }
    }

    fn opt_u64(&self, name: &str) -> ValidationResult<Option<u64>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| wrong_type(name, "a non-negative integer", v)),
        }
    }

    fn opt_bool(&self, name: &str) -> ValidationResult<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(wrong_type(name, "a boolean", other)),
        }
    }

    fn opt_str_or_u64(&self, name: &str) -> ValidationResult<Option<String>> {
        match self.get(name) {
            Some(Value::Number(n)) if n.is_u64() => Ok(Some(n.to_string())),
            Some(Value::String(_)) | None => self.opt_str(name),
            Some(other) => Err(wrong_type(name, "a string or non-negative integer", other)),
        }
    }
}

fn wrong_type(name: &str, expected: &str, got: &Value) -> ValidationError {
    ValidationError::new(
        name,
        format!("expected {}, got {}", expected, describe(got)),
    )
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string \"{}\"", s),
        other => type_name(other).to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn list_clients_defaults() {
        let args = list_clients(&Map::new()).unwrap();
        assert_eq!(args, ListClientsArgs::default());
        assert_eq!(args.page, 1);
        assert_eq!(args.limit, 100);
    }

    #[test]
    fn list_clients_limit_bounds() {
        for limit in [1u64, 500, MAX_LIMIT] {
            let args = list_clients(&obj(json!({ "limit": limit }))).unwrap();
            assert_eq!(args.limit, limit);
        }

        let err = list_clients(&obj(json!({ "limit": 10001 }))).unwrap_err();
        assert_eq!(err.field, "limit");

        let err = list_clients(&obj(json!({ "limit": 0 }))).unwrap_err();
        assert_eq!(err.field, "limit");
    }

    #[test]
    fn list_clients_rejects_bad_page() {
        assert_eq!(list_clients(&obj(json!({ "page": 0 }))).unwrap_err().field, "page");
        assert_eq!(list_clients(&obj(json!({ "page": -3 }))).unwrap_err().field, "page");
        assert_eq!(list_clients(&obj(json!({ "page": 1.5 }))).unwrap_err().field, "page");
        assert_eq!(list_clients(&obj(json!({ "page": "2" }))).unwrap_err().field, "page");
    }

    #[test]
    fn list_clients_wrong_type_filters() {
        let err = list_clients(&obj(json!({ "clean_start": "yes" }))).unwrap_err();
        assert_eq!(err.field, "clean_start");

        let err = list_clients(&obj(json!({ "username": 42 }))).unwrap_err();
        assert_eq!(err.field, "username");
        assert!(err.reason.contains("expected a string"));
    }

    #[test]
    fn list_clients_ignores_unknown_and_null() {
        let args = list_clients(&obj(json!({
            "future_filter": "x",
            "node": null,
            "username": "",
        })))
        .unwrap();
        assert_eq!(args, ListClientsArgs::default());
    }

    #[test]
    fn list_clients_collects_filters() {
        let args = list_clients(&obj(json!({
            "page": 3,
            "limit": 50,
            "node": "emqx@127.0.0.1",
            "conn_state": "connected",
            "clean_start": true,
            "proto_ver": 5,
            "like_clientid": "mqttx",
        })))
        .unwrap();
        assert_eq!(args.page, 3);
        assert_eq!(args.limit, 50);
        assert_eq!(args.node.as_deref(), Some("emqx@127.0.0.1"));
        assert_eq!(args.conn_state.as_deref(), Some("connected"));
        assert_eq!(args.clean_start, Some(true));
        assert_eq!(args.proto_ver.as_deref(), Some("5"));
        assert_eq!(args.like_clientid.as_deref(), Some("mqttx"));
        assert_eq!(args.clientid, None);
    }

    #[test]
    fn client_id_required_and_non_empty() {
        assert_eq!(client_id(&Map::new()).unwrap_err().field, "clientid");
        assert_eq!(
            client_id(&obj(json!({ "clientid": "" }))).unwrap_err().reason,
            "must not be empty"
        );
        assert_eq!(client_id(&obj(json!({ "clientid": 7 }))).unwrap_err().field, "clientid");
        assert_eq!(
            client_id(&obj(json!({ "clientid": "abc123" }))).unwrap().clientid,
            "abc123"
        );
    }

    #[test]
    fn whitespace_only_strings_are_not_empty() {
        assert_eq!(
            client_id(&obj(json!({ "clientid": " " }))).unwrap().clientid,
            " "
        );
        let args = publish_message(&obj(json!({ "topic": "\t", "payload": "x" }))).unwrap();
        assert_eq!(args.topic, "\t");
    }

    #[test]
    fn publish_defaults() {
        let args = publish_message(&obj(json!({ "topic": "/poem", "payload": "hello" }))).unwrap();
        assert_eq!(args.qos, 0);
        assert!(!args.retain);
    }

    #[test]
    fn publish_qos_range() {
        for qos in 0..=2u8 {
            let args = publish_message(&obj(json!({ "topic": "t", "payload": "p", "qos": qos })))
                .unwrap();
            assert_eq!(args.qos, qos);
        }
        for bad in [json!(3), json!(-1), json!(1.5), json!("1")] {
            let err = publish_message(&obj(json!({ "topic": "t", "payload": "p", "qos": bad })))
                .unwrap_err();
            assert_eq!(err.field, "qos");
        }
    }

    #[test]
    fn publish_requires_topic_and_payload() {
        assert_eq!(
            publish_message(&obj(json!({ "payload": "p" }))).unwrap_err().field,
            "topic"
        );
        assert_eq!(
            publish_message(&obj(json!({ "topic": "t" }))).unwrap_err().field,
            "payload"
        );
        // An empty payload is a valid MQTT message.
        assert!(publish_message(&obj(json!({ "topic": "t", "payload": "" }))).is_ok());
    }

    #[test]
    fn publish_retain_must_be_bool() {
        let err = publish_message(&obj(json!({ "topic": "t", "payload": "p", "retain": 1 })))
            .unwrap_err();
        assert_eq!(err.field, "retain");
    }

    #[test]
    fn validate_sql_requires_object_context() {
        assert_eq!(validate_sql(&obj(json!({ "context": {} }))).unwrap_err().field, "sql");
        assert_eq!(
            validate_sql(&obj(json!({ "sql": "SELECT * FROM \"t/#\"" }))).unwrap_err().field,
            "context"
        );
        assert_eq!(
            validate_sql(&obj(json!({ "sql": "SELECT 1", "context": "x" }))).unwrap_err().field,
            "context"
        );
        let args = validate_sql(&obj(json!({
            "sql": "SELECT payload FROM \"t/#\"",
            "context": { "topic": "t/1", "payload": "{}" }
        })))
        .unwrap();
        assert_eq!(args.context["topic"], "t/1");
    }

    #[test]
    fn arguments_must_be_object_or_null() {
        assert!(arguments_object(&Value::Null).unwrap().is_empty());
        assert_eq!(arguments_object(&json!([1])).unwrap_err().field, "arguments");
    }

    #[test]
    fn error_message_is_readable() {
        let err = ValidationError::new("limit", "must be between 1 and 10000, got 20000");
        assert_eq!(
            err.to_string(),
            "Invalid argument 'limit': must be between 1 and 10000, got 20000"
        );
    }
}
