use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::{database_error, parse_view};
use crate::api::auth::AdminAuth;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::settings::{save_form, SaveOutcome, SettingsForm, SitemapSettings};
use crate::storage::models::View;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub entries_deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct PriorityResponse {
    pub view: View,
    pub id: u64,
    /// Effective priority written to the sitemap
    pub priority: String,
    /// Whether `priority` comes from a per-item override
    pub overridden: bool,
    pub updated_at: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Route: GET /admin/module/sitemap
pub async fn get_settings(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<SettingsForm>>, ApiError> {
    let settings = SitemapSettings::load(&state.db).map_err(database_error)?;
    Ok(JSend::success(SettingsForm::from_settings(&settings)))
}

/// Route: POST /admin/module/sitemap
pub async fn save_settings(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    AppJson(form): AppJson<SettingsForm>,
) -> Result<Json<JSend<SettingsForm>>, ApiError> {
    match save_form(&state.db, &form).map_err(database_error)? {
        SaveOutcome::Invalid(errors) => {
            tracing::debug!(count = errors.len(), "Rejected sitemap configuration");
            Err(ApiError::invalid_fields(
                "Invalid sitemap configuration",
                errors
                    .into_iter()
                    .map(|e| (e.field.to_string(), e.message)),
            ))
        }
        SaveOutcome::Saved(settings) => {
            let flushed = state.sitemaps.flush_all().await;
            tracing::info!(flushed, "Saved sitemap configuration");
            Ok(JSend::success(SettingsForm::from_settings(&settings)))
        }
    }
}

/// Route: DELETE /admin/module/sitemap/cache
pub async fn flush_cache(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Json<JSend<FlushResponse>> {
    let entries_deleted = state.sitemaps.flush_all().await;
    tracing::info!(entries_deleted, "Flushed sitemap cache");
    JSend::success(FlushResponse { entries_deleted })
}

/// Route: GET /admin/sitemap-priority/:view/:id
pub async fn get_priority(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path((view, id)): Path<(String, u64)>,
) -> Result<Json<JSend<PriorityResponse>>, ApiError> {
    let view = parse_view(&view)?;

    if state.db.get_entity(view, id).map_err(database_error)?.is_none() {
        return Err(ApiError::not_found(format!("Not found: {view} {id}")));
    }

    let settings = SitemapSettings::load(&state.db).map_err(database_error)?;
    let stored = state
        .db
        .get_priority(view, id)
        .map_err(database_error)?
        .filter(|p| !p.value.trim().is_empty());

    let response = match stored {
        Some(p) => PriorityResponse {
            view,
            id,
            priority: p.value,
            overridden: true,
            updated_at: Some(p.updated_at.to_rfc3339()),
        },
        None => PriorityResponse {
            view,
            id,
            priority: settings.default_priority(view).to_string(),
            overridden: false,
            updated_at: None,
        },
    };

    Ok(JSend::success(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::CatalogEntity;
    use crate::testutil::test_state;
    use axum::http::StatusCode;
    use chrono::Utc;

    fn content_item(id: u64) -> CatalogEntity {
        CatalogEntity {
            id,
            visible: true,
            updated_at: Utc::now(),
            parent_ids: vec![],
            titles: Default::default(),
            images: vec![],
        }
    }

    #[tokio::test]
    async fn test_save_settings_rejects_bad_fields() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let form = SettingsForm {
            quality: Some("250".to_string()),
            default_priority_product_value: Some("0.5".to_string()),
            ..Default::default()
        };
        let err = save_settings(AdminAuth, State(Arc::clone(&state)), AppJson(form))
            .await
            .unwrap_err();

        match err {
            ApiError::Invalid(_, fields) => assert!(fields.contains_key("quality")),
            other => panic!("unexpected error: {other:?}"),
        }

        let settings = SitemapSettings::load(&state.db).unwrap();
        assert_eq!(settings.default_priority_product_value, "0.8");
    }

    #[tokio::test]
    async fn test_content_priority_follows_folder_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state.db.save_content(View::Content, &content_item(3), &[]).unwrap();

        let Json(body) = get_priority(
            AdminAuth,
            State(Arc::clone(&state)),
            Path(("content".to_string(), 3)),
        )
        .await
        .unwrap();
        let data = body.data;
        assert_eq!(data.priority, "0.6");
        assert!(!data.overridden);

        state
            .db
            .set_priority(View::Content, 3, "0.3")
            .unwrap();
        let Json(body) = get_priority(AdminAuth, State(state), Path(("content".to_string(), 3)))
            .await
            .unwrap();
        let data = body.data;
        assert_eq!(data.priority, "0.3");
        assert!(data.overridden);
    }

    #[tokio::test]
    async fn test_priority_for_unknown_view_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let err = get_priority(AdminAuth, State(state), Path(("page".to_string(), 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Fail(StatusCode::NOT_FOUND, _)));
    }
}
