//! HTTP surface.

pub mod ai;
pub mod error;
pub mod health;
pub mod messages;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::init::AppContext;
use crate::ratelimit::client_address;

pub use error::ApiError;

/// Build the application router.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/ai/stream", post(ai::stream))
        .route("/api/ai/interview", post(ai::interview))
        .route("/api/ai/review", post(ai::review))
        .route("/api/ai/style-analyze", post(ai::style_analyze))
        .route(
            "/api/ai/messages",
            get(messages::list)
                .post(messages::append)
                .delete(messages::clear),
        )
        .route("/api/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Serve until ctrl-c. Rate-limit housekeeping runs alongside.
pub async fn serve(ctx: Arc<AppContext>, addr: SocketAddr) -> anyhow::Result<()> {
    let housekeeping = ctx.rate_limiter.clone().spawn_housekeeping(
        ctx.config.rate_limit.sweep_interval(),
        ctx.config.rate_limit.retention(),
    );

    let app = router(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    housekeeping.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

/// The address a request is rate limited under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

impl FromRequestParts<Arc<AppContext>> for ClientAddr {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientAddr(client_address(
            peer,
            &parts.headers,
            ctx.config.rate_limit.trusted_proxy,
        )))
    }
}
