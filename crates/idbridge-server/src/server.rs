use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::bootstrap::AppState;
use crate::handlers;

/// Assembles the router over the shared state.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/ping", get(handlers::ping))
        .route("/robots.txt", get(handlers::robots))
        .route("/login", get(handlers::login_page))
        .route("/login/{provider}", get(handlers::provider_login))
        .route("/callback/{provider}", get(handlers::callback))
        .route("/pubkey", get(handlers::public_keys))
        .route(
            "/token",
            get(handlers::verify_token).post(handlers::verify_token),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct IdbridgeServer {
    addr: SocketAddr,
    app: Router,
}

impl IdbridgeServer {
    #[must_use]
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            app: build_app(state),
        }
    }

    /// Serves until a shutdown signal arrives.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
