/// Axum HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cluster::MockCluster;
use crate::handlers::*;

pub fn create_router(cluster: Arc<MockCluster>) -> Router {
    // Browser wallets call the endpoint cross-origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // JSON-RPC endpoint
        .route("/", post(rpc))
        // Health check
        .route("/health", get(health_check))
        // Shared state
        .with_state(cluster)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(cluster: Arc<MockCluster>, host: String, port: u16) -> anyhow::Result<()> {
    let program_id = cluster.program_id();
    let app = create_router(cluster);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("🚀 Ledger mock listening on http://{}", addr);
    log::info!("📜 Record list program: {}", program_id);
    log::info!("💧 Fund wallets with requestAirdrop");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve `cluster` on an ephemeral localhost port in the background
pub async fn spawn(cluster: Arc<MockCluster>) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(cluster);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("❌ Ledger mock stopped: {}", e);
        }
    });
    log::debug!("   Ledger mock spawned on {}", addr);

    Ok((addr, handle))
}
