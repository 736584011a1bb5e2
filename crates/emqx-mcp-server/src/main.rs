//! EMQX MCP Server - Entry Point
//!
//! Runs the MCP server over stdio for integration with MCP clients.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use emqx_mcp_server::{Dispatcher, HttpTransport, McpServer, ServerConfig};

/// EMQX MCP Server - Expose MQTT broker management to AI assistants
#[derive(FromArgs)]
struct Args {
    /// seconds to wait for a broker response (default: 30)
    #[argh(option, default = "emqx_mcp_server::config::DEFAULT_TIMEOUT.as_secs()")]
    timeout_secs: u64,

    /// dotenv file to load instead of ./.env
    #[argh(option)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();

    // Initialize logging to stderr (stdout is used for MCP protocol)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("Starting EMQX MCP server");

    let config = ServerConfig::load(
        args.env_file.as_deref(),
        Duration::from_secs(args.timeout_secs.max(1)),
    )
    .context("broker configuration")?;
    log::info!("Broker API: {}", config.credentials.base_url);

    let transport = HttpTransport::new(config.credentials, config.timeout)
        .context("failed to build HTTP client")?;
    let server = Arc::new(McpServer::new(Dispatcher::new(Arc::new(transport))));

    server.run_stdio().await?;

    log::info!("EMQX MCP server stopped");
    Ok(())
}
