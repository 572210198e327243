use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::healthcheck))
        // Package routes
        .route("/generate_bootstrap_package", post(handlers::bootstrap::generate_bootstrap_package))
        .route("/get_bootstrap_variables", post(handlers::bootstrap::get_bootstrap_variables))
        // Template routes
        .route("/import_template", post(handlers::templates::import_template))
        .route("/delete_template", post(handlers::templates::delete_template))
        .route("/list_templates", get(handlers::templates::list_templates))
        .route("/list_init_cfg_templates", get(handlers::templates::list_init_cfg_templates))
        .route("/get_template", post(handlers::templates::get_template))
        // Cache routes
        .route("/set", post(handlers::cache::set_object))
        .route("/get/:key", get(handlers::cache::get_object))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
