//! Server initialization for the HTTP and stdio transports.
//!
//! Provides [`serve_http`] and [`serve_stdio`] entry points that wire up the
//! key-value store, rate limiter, and graph service into a running server.

use anyhow::{bail, Context, Result};
use ebb::config::EbbConfig;
use ebb::graph::GraphService;
use ebb::ratelimit::RateLimiter;
use ebb::store::{KvDocumentStore, KvStore, MemoryKv, SqliteKv};
use rmcp::ServiceExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::http::{self, AppState};
use crate::tools::EbbTools;

/// How often a running server drops expired rate-limit counters.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Open the configured key-value backend.
pub fn open_kv(config: &EbbConfig) -> Result<Arc<dyn KvStore>> {
    match config.storage.backend.as_str() {
        "sqlite" => {
            let db_path = config.resolved_db_path();
            let kv = SqliteKv::open(&db_path)
                .with_context(|| format!("failed to open store at {}", db_path.display()))?;
            let swept = kv.sweep_expired().context("failed to sweep expired keys")?;
            tracing::info!(db = %db_path.display(), swept, "store ready");
            Ok(Arc::new(kv))
        }
        "memory" => {
            tracing::warn!("using in-memory store; the graph is lost on exit");
            Ok(Arc::new(MemoryKv::new()))
        }
        other => bail!("unknown storage backend: {other}. Supported: sqlite, memory"),
    }
}

/// Shared setup: open the store and build the graph service.
fn setup_service(config: &EbbConfig) -> Result<Arc<GraphService>> {
    let kv = open_kv(config)?;
    let documents = KvDocumentStore::new(
        kv.clone(),
        config.storage.document_key.clone(),
        config.storage.write_mode,
    );
    let limiter = RateLimiter::new(kv.clone(), config.rate_limit.clone());
    spawn_sweeper(kv);

    tracing::info!(
        write_mode = ?config.storage.write_mode,
        exempt = config.rate_limit.exempt_identity.is_some(),
        "graph service ready"
    );
    Ok(Arc::new(GraphService::new(Arc::new(documents), limiter)))
}

/// Periodically remove expired keys so per-caller counters do not pile up.
fn spawn_sweeper(kv: Arc<dyn KvStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            match sweep(Arc::clone(&kv)).await {
                Ok(0) => {}
                Ok(swept) => tracing::debug!(swept, "expired keys swept"),
                Err(e) => tracing::warn!(error = %e, "expired key sweep failed"),
            }
        }
    });
}

async fn sweep(kv: Arc<dyn KvStore>) -> Result<usize> {
    let swept = tokio::task::spawn_blocking(move || kv.sweep_expired()).await??;
    Ok(swept)
}

/// Start the HTTP server.
pub async fn serve_http(config: EbbConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting ebb HTTP server");

    let service = setup_service(&config)?;
    let state = AppState::new(service, config.server.trust_forwarded_for);
    let router = http::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "listening at http://{bind_addr}");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
        tracing::info!("shutting down HTTP server");
    })
    .await?;

    Ok(())
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: EbbConfig) -> Result<()> {
    tracing::info!("starting ebb MCP server on stdio");

    let service = setup_service(&config)?;
    let tools = EbbTools::new(service, config.server.mcp_identity.clone());
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn sweep_removes_expired_counters() {
        let kv = Arc::new(MemoryKv::new());
        kv.put("graph", "{}", None).unwrap();
        kv.put(
            "rate:10.0.0.1:reads",
            "{}",
            Some(Utc::now() - chrono::Duration::seconds(1)),
        )
        .unwrap();

        assert_eq!(sweep(kv.clone()).await.unwrap(), 1);
        assert_eq!(sweep(kv.clone()).await.unwrap(), 0);
        assert!(kv.get("graph").unwrap().is_some());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut config = EbbConfig::default();
        config.storage.backend = "redis".into();
        let err = open_kv(&config).err().unwrap();
        assert!(err.to_string().contains("unknown storage backend: redis"));
    }
}
