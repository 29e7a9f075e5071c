//! MCP server entrypoint (stdio transport).
//!
//! Launches an MCP server that exposes SmartGist's tools and resources over stdio. This mode is
//! designed for editor/agent integrations and shares all runtime configuration with the HTTP
//! binary.
use anyhow::{Context, Result};
use rmcp::{service::ServiceExt, transport::stdio};
use smartgist::{config, logging, mcp::SmartGistMcpServer, processing::SummarizeService};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing("smartgist-mcp");
    let config = config::load().context("invalid configuration")?;

    let service = SummarizeService::new(config).context("failed to initialize pipeline")?;
    let server = SmartGistMcpServer::new(Arc::new(service));

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
