//! Mnemo MCP Server
//!
//! A Model Context Protocol server exposing mnemo's hierarchical
//! conversational memory engine to an LLM client over stdio.

use mnemo_mcp::MnemoMcpServer;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The transport is JSON-RPC over stdio, so log output MUST go to stderr.
    mnemo_core::logging::init_logging();

    tracing::info!("starting mnemo-mcp v{}", env!("CARGO_PKG_VERSION"));

    let server = MnemoMcpServer::new().await.map_err(|e| {
        tracing::error!(error = %e, "failed to initialize server");
        e
    })?;

    tracing::info!("server initialized");

    let service = server.clone().serve(stdio()).await.map_err(|e| {
        tracing::error!(error = %e, "failed to start server");
        e
    })?;

    tracing::info!("mnemo-mcp running on stdio transport");

    service.waiting().await.map_err(|e| {
        tracing::error!(error = %e, "server error");
        e
    })?;

    tracing::info!("shutting down, awaiting in-flight scribe tasks");
    server.shutdown().await;

    Ok(())
}
