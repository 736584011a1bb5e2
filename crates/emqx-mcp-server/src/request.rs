//! Mapping validated tool arguments to broker REST calls.

use std::fmt;

use serde_json::{json, Value};

use crate::validate::{ListClientsArgs, ToolArgs};

/// HTTP methods used against the broker API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one outbound request to the broker.
///
/// `segments` are appended to the broker base URL path as-is; the transport
/// percent-encodes each one, so a clientid containing `/` stays a single
/// segment. `query` keeps insertion order and never holds entries for
/// filters the caller left unset.
#[derive(Debug, Clone, PartialEq)]
pub struct RestCall {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RestCall {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Unencoded path relative to the base URL, e.g. `/clients/abc123`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

impl fmt::Display for RestCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            write!(f, "{}{}={}", if i == 0 { '?' } else { '&' }, k, v)?;
        }
        Ok(())
    }
}

/// Build the REST call for a validated tool invocation.
pub fn build(args: &ToolArgs) -> RestCall {
    match args {
        ToolArgs::ListClients(list) => list_clients(list),
        ToolArgs::GetClient(c) => RestCall::new(Method::Get, ["clients", c.clientid.as_str()]),
        ToolArgs::KickClient(c) => {
            RestCall::new(Method::Delete, ["clients", c.clientid.as_str()])
        }
        ToolArgs::PublishMessage(p) => {
            let mut call = RestCall::new(Method::Post, ["publish"]);
            call.body = Some(json!({
                "topic": p.topic,
                "payload": p.payload,
                "qos": p.qos,
                "retain": p.retain,
            }));
            call
        }
        ToolArgs::ValidateSql(v) => {
            let mut call = RestCall::new(Method::Post, ["rule_test"]);
            call.body = Some(json!({
                "sql": v.sql,
                "context": v.context,
            }));
            call
        }
        ToolArgs::ListSchemas => RestCall::new(Method::Get, ["schema_registry"]),
    }
}

fn list_clients(args: &ListClientsArgs) -> RestCall {
    let mut call = RestCall::new(Method::Get, ["clients"]);
    call.query.push(("page".to_string(), args.page.to_string()));
    call.query.push(("limit".to_string(), args.limit.to_string()));

    let clean_start = args.clean_start.map(|b| b.to_string());
    let filters = [
        ("node", &args.node),
        ("clientid", &args.clientid),
        ("username", &args.username),
        ("ip_address", &args.ip_address),
        ("conn_state", &args.conn_state),
        ("clean_start", &clean_start),
        ("proto_ver", &args.proto_ver),
        ("like_clientid", &args.like_clientid),
        ("like_username", &args.like_username),
        ("like_ip_address", &args.like_ip_address),
    ];
    for (name, value) in filters {
        if let Some(value) = value {
            call.query.push((name.to_string(), value.clone()));
        }
    }
    call
}
