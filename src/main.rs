//! # applescript-mcp
//!
//! MCP server exposing AppleScript execution as callable tools. Scripts run
//! through the local interpreter, or over SSH on a remote Mac when the
//! remote host/user/password flags are all configured.
//!
//! ```text
//! main.rs      - entry point, flag parsing, logging, MCP server launch
//! config.rs    - CLI flags and process-wide connection parameters
//! server.rs    - rmcp tool adapter (placeholder substitution, boundary)
//! scripts.rs   - canned AppleScript for the convenience tools
//! exec/        - dispatcher, temp-file staging, local and remote runners
//! ```

mod config;
mod exec;
mod scripts;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::{ServiceExt, transport::stdio};
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, RemoteConfig};
use crate::exec::ExecutionTarget;
use crate::server::AppleScriptServer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the MCP transport; diagnostics go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = RemoteConfig::from_cli(&cli);
    match ExecutionTarget::resolve(&config) {
        ExecutionTarget::Remote(ref params) => {
            tracing::info!(host = %params.host, user = %params.user, "remote execution enabled");
        }
        ExecutionTarget::Local => tracing::info!("local execution only"),
    }

    // A transport failure here is the one fatal error; everything after this
    // point is reported through tool results.
    let service = AppleScriptServer::new(config)
        .serve(stdio())
        .await
        .context("failed to start MCP stdio transport")?;
    service.waiting().await?;
    Ok(())
}
