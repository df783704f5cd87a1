//! MCP server initialization for stdio and streamable HTTP transports.
//!
//! Both entry points build one [`MemoryService`] for the whole process; every
//! MCP session shares it, so the embedding model and store client are
//! constructed once.

use std::sync::Arc;

use anyhow::Result;
use cairn::config::CairnConfig;
use cairn::memory::MemoryService;
use rmcp::ServiceExt;

use crate::tools::CairnTools;

/// Shared setup: build the process-wide memory service.
///
/// Backends are created lazily, but collections are provisioned eagerly so a
/// misconfigured store shows up in the logs at startup rather than on the
/// first tool call.
async fn setup_shared_state(config: CairnConfig) -> Arc<MemoryService> {
    let memory = Arc::new(MemoryService::new(Arc::new(config)));

    match memory.ensure_collections().await {
        Ok(()) => tracing::info!("collections ready"),
        Err(e) => tracing::warn!(error = %e, "could not provision collections at startup"),
    }

    memory
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: CairnConfig) -> Result<()> {
    tracing::info!("starting Cairn MCP server on stdio");

    let memory = setup_shared_state(config).await;

    let tools = CairnTools::new(memory);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: CairnConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!(addr = %bind_addr, "starting Cairn MCP server on HTTP");

    let memory = setup_shared_state(config).await;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(CairnTools::new(Arc::clone(&memory))),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
