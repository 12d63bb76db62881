//! MCP server initialization for stdio and SSE transports.
//!
//! Provides [`serve_stdio`] and [`serve_sse`] entry points that wire up the
//! substrate, its indexes, and the MCP tool handler into a running server.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use rmcp::ServiceExt;

use aku::index::IndexManager;
use aku::substrate::Substrate;

use crate::tools::SubstrateTools;

/// Shared setup: open the store and its indexes, wrapped for sharing across
/// tool invocations.
fn setup_shared_state(root: &Path) -> Result<(Arc<Substrate>, Arc<Mutex<IndexManager>>)> {
    let substrate = Substrate::open(root)?;
    let indexes = IndexManager::open(&substrate.indexes_dir(), &substrate.config().indexes)?;
    tracing::info!(root = %root.display(), "substrate ready");

    Ok((Arc::new(substrate), Arc::new(Mutex::new(indexes))))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(root: &Path) -> Result<()> {
    tracing::info!("starting substrate MCP server on stdio");

    let (substrate, indexes) = setup_shared_state(root)?;

    let tools = SubstrateTools::new(substrate, indexes);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP (SSE) transport.
pub async fn serve_sse(root: &Path, bind_addr: &str) -> Result<()> {
    tracing::info!(addr = %bind_addr, "starting substrate MCP server on SSE/HTTP");

    let (substrate, indexes) = setup_shared_state(root)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(SubstrateTools::new(substrate.clone(), indexes.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down SSE server");
        })
        .await?;

    Ok(())
}
