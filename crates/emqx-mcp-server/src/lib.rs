//! EMQX MCP Server
//!
//! Exposes MQTT broker management (list, inspect and disconnect clients,
//! publish messages, rule engine helpers) to AI assistants via the Model
//! Context Protocol. Each tool call becomes exactly one authenticated request
//! against the broker's management REST API.

pub mod config;
pub mod normalize;
pub mod request;
pub mod server;
pub mod tools;
pub mod transport;
pub mod validate;

pub use config::{BrokerCredentials, ConfigError, ServerConfig};
pub use normalize::{ErrorKind, ToolError, ToolResult};
pub use request::{Method, RestCall};
pub use server::McpServer;
pub use tools::{Dispatcher, ToolName, ToolRequest};
pub use transport::{BrokerTransport, HttpTransport, RawResponse, TransportError};
pub use validate::ValidationError;
