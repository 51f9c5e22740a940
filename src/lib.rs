pub mod config;
pub mod error;
pub mod filter;
pub mod fixture;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod state;
pub mod store;
pub mod types;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{any, get},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the HTTP router around a set of collaborators
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Tables: /:username/:project/:table, shape checked after the key
        .route("/*path", any(handlers::dispatch))
        .layer(DefaultBodyLimit::max(server.max_request_size_bytes))
        .with_state(state);

    if server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if server.enable_request_logging {
        // Path only: the query string carries the API key
        router = router.layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!("http", method = %request.method(), path = %request.uri().path())
        }));
    }
    router
}
