use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

use super::sitemap_error;
use crate::api::auth::MaybeAdmin;
use crate::api::response::{ApiError, AppQuery};
use crate::sitemap::DocumentKind;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SitemapParams {
    /// Locale to render; the default language when absent
    #[serde(default)]
    pub lang: Option<String>,
    /// Any non-empty value regenerates the document (admins only)
    #[serde(default)]
    pub flush: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Route: GET /sitemap
pub async fn sitemap(
    State(state): State<Arc<AppState>>,
    MaybeAdmin(is_admin): MaybeAdmin,
    AppQuery(params): AppQuery<SitemapParams>,
) -> Result<Response, ApiError> {
    render_document(&state, DocumentKind::Standard, is_admin, &params).await
}

/// Route: GET /sitemap-image
pub async fn image_sitemap(
    State(state): State<Arc<AppState>>,
    MaybeAdmin(is_admin): MaybeAdmin,
    AppQuery(params): AppQuery<SitemapParams>,
) -> Result<Response, ApiError> {
    render_document(&state, DocumentKind::Image, is_admin, &params).await
}

// ============================================================================
// Helpers
// ============================================================================

async fn render_document(
    state: &AppState,
    kind: DocumentKind,
    is_admin: bool,
    params: &SitemapParams,
) -> Result<Response, ApiError> {
    let locale = state
        .sitemaps
        .resolve_locale(params.lang.as_deref())
        .map_err(sitemap_error)?;

    let flush = is_admin && params.flush.as_deref().is_some_and(|f| !f.is_empty());
    if flush {
        tracing::info!(locale = %locale, ?kind, "Admin flush of cached sitemap");
    }

    let content = state
        .sitemaps
        .render(kind, &locale, flush)
        .await
        .map_err(sitemap_error)?;

    Ok(([(header::CONTENT_TYPE, "application/xml")], content).into_response())
}
