//! Axum router construction.
//!
//! The route table and layer stack are decided once from the
//! [`StartupProfile`](crate::mode::StartupProfile) held in the state.
//! Layers, innermost first:
//!
//! 1. request-context pipeline
//! 2. session layer (census mode)
//! 3. request tracing (unless testing)
//! 4. gzip compression
//! 5. basic-auth gate (`auth_on`)
//! 6. response headers (CORS, readonly cache control)
//!
//! The response-header layer is outermost so basic-auth rejections and the
//! 404 fallback carry the same headers as every other response.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::census;
use crate::handlers;
use crate::pipeline;
use crate::session;
use crate::state::AppState;

/// Routes registered in every deployment.
fn core_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::overview))
        .route("/about", get(handlers::about))
        .route("/faq", get(handlers::faq))
        .route("/changes", get(handlers::changes))
        .route("/overview.json", get(handlers::result_json))
        .route("/place/{place}", get(handlers::place))
        .route("/dataset/{dataset}", get(handlers::dataset))
        .route("/entry/{place}/{dataset}", get(handlers::entry))
        // `entries.json` / `entries.csv`, checked by the handler
        .route("/api/{file}", get(handlers::api_entries))
}

/// Routes that edit data; never registered in readonly mode.
fn census_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/contribute", get(census::contribute))
        .route("/setlocale/{locale}", get(census::setlocale))
        .route("/submit", get(census::submit_form).post(census::submit_post))
        .route("/submission/{id}", get(census::submission).post(census::review))
        .route("/login", get(census::login).post(census::anon_login))
        .route("/auth/logout", get(census::logout))
        .route("/auth/loggedin", get(census::loggedin))
        .route("/admin/reload", get(census::reload))
        .route("/auth/google", get(census::google))
        .route("/auth/google/callback", get(census::google_callback))
}

/// Build the complete Axum router for the census application.
pub fn build_router(state: Arc<AppState>) -> Router {
    let profile = state.profile;

    let mut router = core_routes();
    if profile.census_routes() {
        router = router.merge(census_routes());
    }
    router = router
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            pipeline::request_context,
        ));

    if profile.sessions() {
        router = router.layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            session::session_layer,
        ));
    }
    if profile.request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router = router.layer(CompressionLayer::new());
    if profile.basic_auth() {
        router = router.layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::basic_auth,
        ));
    }
    router = router.layer(middleware::from_fn_with_state(
        Arc::clone(&state),
        pipeline::response_headers,
    ));

    tracing::debug!(profile = profile.label(), "router assembled");
    router.with_state(state)
}
