use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::routes::pubsub_routes;
use crate::state::AppState;

/// Build the complete Axum application:
/// - /sub   (held subscriber connections)
/// - /pub   (fan a notification out to every held subscriber)
/// - anything else answers 400 Bad Request
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(pubsub_routes::routes(state))
        .fallback(pubsub_routes::bad_request)
        // Logging middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
