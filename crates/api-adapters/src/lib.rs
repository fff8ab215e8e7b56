//! # api-adapters
//!
//! The web routing and orchestration layer for Rusty-Board: axum
//! handlers, askama rendering, the basic-auth gate and metrics.

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod render;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use metrics::BoardMetrics;
pub use render::AskamaRenderer;
pub use state::{AppState, LocalMedia};

/// Builds the board's router.
///
/// Everything except `/health` and the signed `/media/{key}` route sits
/// behind the credential gate. Request bodies above `max_upload_bytes`
/// are refused before the handler runs.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let gated = Router::new()
        .route("/", get(handlers::list_threads))
        .route("/threads", post(handlers::create_thread))
        .route("/threads/{id}", get(handlers::view_thread))
        .route("/threads/{id}/posts", post(handlers::create_post))
        .route("/metrics", get(handlers::metrics))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_credentials,
        ));

    let open = Router::new()
        .route("/health", get(handlers::health))
        .route("/media/{key}", get(handlers::serve_media));

    gated
        .merge(open)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(middleware::make_span))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
