use axum::{
    routing::{delete, get, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Public documents
        .route("/sitemap", get(handlers::sitemap))
        .route("/sitemap.xml", get(handlers::sitemap))
        .route("/sitemap-image", get(handlers::image_sitemap))
        .route("/sitemap-image.xml", get(handlers::image_sitemap))
        // Admin
        .route(
            "/admin/module/sitemap",
            get(handlers::get_settings).post(handlers::save_settings),
        )
        .route("/admin/module/sitemap/cache", delete(handlers::flush_cache))
        .route(
            "/admin/sitemap-priority/:view/:id",
            get(handlers::get_priority),
        )
        // Host notifications
        .route(
            "/hooks/content/:view/:id",
            put(handlers::save_content).delete(handlers::delete_content),
        )
        .route(
            "/hooks/langs/:locale",
            put(handlers::put_lang).delete(handlers::delete_lang),
        )
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
