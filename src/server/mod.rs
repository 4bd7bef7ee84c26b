//! HTTP server for the econews agent.
//!
//! Provides endpoints for:
//! - Streaming chat over SSE, with stop
//! - News harvesting and CSV download
//! - Chunked CSV analysis

pub mod events;
pub mod routes;
pub mod state;

pub use events::{ChannelSink, SessionEvent};
pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the router with CORS and request tracing.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind the API port on all interfaces.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await
}

/// Serve the API on `listener` until `shutdown` resolves.
///
/// In-flight streams are drained before this returns.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, model = %state.default_model, "Serving econews API and UI");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!(%addr, "Listener closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;

    #[tokio::test]
    async fn test_serve_returns_after_shutdown() {
        let state = AppState::new(&AgentConfig::default()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let result = serve(listener, state, std::future::ready(())).await;
        assert!(result.is_ok());
    }
}
