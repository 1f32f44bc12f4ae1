//! Notifications sent by the host CMS when catalog content or languages change.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{database_error, parse_view};
use crate::api::auth::AdminAuth;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::settings::{parse_priority, text_field};
use crate::storage::models::{CatalogEntity, EntityImage, Lang, RewritingUrl, View};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaveContentRequest {
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Defaults to the time of the notification
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_ids: Vec<u64>,
    #[serde(default)]
    pub titles: BTreeMap<String, String>,
    #[serde(default)]
    pub images: Vec<EntityImage>,
    /// The complete set of URLs of the item; omitted ones are dropped
    #[serde(default)]
    pub urls: Vec<UrlInput>,
    /// Per-item priority entered in the content form; blank leaves the override untouched
    #[serde(default, deserialize_with = "text_field")]
    pub sitemap_priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UrlInput {
    pub locale: String,
    pub url: String,
    #[serde(default)]
    pub redirected: bool,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub view: View,
    pub id: u64,
    pub urls: usize,
    pub priority_updated: bool,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PutLangRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub by_default: bool,
}

fn default_visible() -> bool {
    true
}

// ============================================================================
// Handlers
// ============================================================================

/// Route: PUT /hooks/content/:view/:id
pub async fn save_content(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path((view, id)): Path<(String, u64)>,
    AppJson(request): AppJson<SaveContentRequest>,
) -> Result<Json<JSend<ContentResponse>>, ApiError> {
    let view = parse_view(&view)?;

    let priority = match request.sitemap_priority.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_priority(raw).map_err(|message| {
            ApiError::invalid_fields(
                "Invalid sitemap priority",
                [("sitemap_priority".to_string(), message)],
            )
        })?),
        _ => None,
    };

    let urls = url_records(&state, view, id, &request.urls)?;

    let entity = CatalogEntity {
        id,
        visible: request.visible,
        updated_at: request.updated_at.unwrap_or_else(Utc::now),
        parent_ids: request.parent_ids,
        titles: request.titles,
        images: request.images,
    };

    let priority_updated = state
        .db
        .save_content_with_priority(view, &entity, &urls, priority.as_deref())
        .map_err(database_error)?;

    tracing::debug!(%view, id, urls = urls.len(), priority_updated, "Saved content");

    Ok(JSend::success(ContentResponse {
        view,
        id,
        urls: urls.len(),
        priority_updated,
    }))
}

/// Route: DELETE /hooks/content/:view/:id
pub async fn delete_content(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path((view, id)): Path<(String, u64)>,
) -> Result<Json<JSend<DeletedResponse>>, ApiError> {
    let view = parse_view(&view)?;

    let deleted = state
        .db
        .delete_content(view, id)
        .map_err(database_error)?;
    if !deleted {
        return Err(ApiError::not_found(format!("Not found: {view} {id}")));
    }

    tracing::debug!(%view, id, "Deleted content");
    Ok(JSend::success(DeletedResponse { deleted }))
}

/// Route: PUT /hooks/langs/:locale
pub async fn put_lang(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(locale): Path<String>,
    AppJson(request): AppJson<PutLangRequest>,
) -> Result<Json<JSend<Lang>>, ApiError> {
    let locale = locale.trim();
    if locale.is_empty() {
        return Err(ApiError::bad_request("Locale must not be empty"));
    }

    let lang = Lang {
        locale: locale.to_string(),
        title: request.title.filter(|t| !t.trim().is_empty()),
        by_default: request.by_default,
    };
    state.db.put_lang(&lang).map_err(database_error)?;

    tracing::debug!(locale = %lang.locale, by_default = lang.by_default, "Saved language");
    Ok(JSend::success(lang))
}

/// Route: DELETE /hooks/langs/:locale
pub async fn delete_lang(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(locale): Path<String>,
) -> Result<Json<JSend<DeletedResponse>>, ApiError> {
    let deleted = state.db.delete_lang(&locale).map_err(database_error)?;
    if !deleted {
        return Err(ApiError::not_found(format!("Unknown locale: {locale}")));
    }

    Ok(JSend::success(DeletedResponse { deleted }))
}

// ============================================================================
// Helpers
// ============================================================================

/// Normalise the submitted URLs. A path already owned by another item is a conflict.
fn url_records(
    state: &AppState,
    view: View,
    id: u64,
    inputs: &[UrlInput],
) -> Result<Vec<RewritingUrl>, ApiError> {
    let mut errors = BTreeMap::new();
    let mut records: Vec<RewritingUrl> = Vec::with_capacity(inputs.len());

    for (i, input) in inputs.iter().enumerate() {
        let url = input.url.trim().trim_start_matches('/');
        let locale = input.locale.trim();

        if url.is_empty() {
            errors.insert(format!("urls[{i}].url"), "must not be empty".to_string());
            continue;
        }
        if locale.is_empty() {
            errors.insert(format!("urls[{i}].locale"), "must not be empty".to_string());
            continue;
        }
        if records.iter().any(|r| r.url == url) {
            errors.insert(format!("urls[{i}].url"), "is listed twice".to_string());
            continue;
        }

        if let Some(owner) = state.db.get_url(url).map_err(database_error)? {
            if owner.view != view || owner.view_id != id {
                return Err(ApiError::conflict(format!(
                    "URL '{url}' already belongs to {} {}",
                    owner.view, owner.view_id
                )));
            }
        }

        records.push(RewritingUrl {
            url: url.to_string(),
            view,
            view_id: id,
            view_locale: locale.to_string(),
            redirected: input.redirected,
        });
    }

    if errors.is_empty() {
        Ok(records)
    } else {
        Err(ApiError::invalid_fields("Invalid URLs", errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crate::testutil::test_state;

    fn request(urls: &[(&str, &str)], priority: Option<&str>) -> SaveContentRequest {
        SaveContentRequest {
            visible: true,
            updated_at: None,
            parent_ids: vec![],
            titles: BTreeMap::new(),
            images: vec![],
            urls: urls
                .iter()
                .map(|(locale, url)| UrlInput {
                    locale: locale.to_string(),
                    url: url.to_string(),
                    redirected: false,
                })
                .collect(),
            sitemap_priority: priority.map(str::to_string),
        }
    }

    async fn save(
        state: &Arc<AppState>,
        view: &str,
        id: u64,
        body: SaveContentRequest,
    ) -> Result<ContentResponse, ApiError> {
        save_content(
            AdminAuth,
            State(Arc::clone(state)),
            Path((view.to_string(), id)),
            AppJson(body),
        )
        .await
        .map(|Json(body)| body.data)
    }

    #[tokio::test]
    async fn test_save_content_stores_priority_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let saved = save(&state, "product", 42, request(&[("en_US", "/shoes.html")], Some("0.3")))
            .await
            .unwrap();
        assert!(saved.priority_updated);
        assert_eq!(state.db.get_url("shoes.html").unwrap().unwrap().view_id, 42);

        let again = save(&state, "product", 42, request(&[("en_US", "shoes.html")], Some("0.3")))
            .await
            .unwrap();
        assert!(!again.priority_updated);

        let blank = save(&state, "product", 42, request(&[("en_US", "shoes.html")], Some("")))
            .await
            .unwrap();
        assert!(!blank.priority_updated);
        assert_eq!(
            state.db.get_priority(View::Product, 42).unwrap().unwrap().value,
            "0.3"
        );
    }

    #[tokio::test]
    async fn test_save_content_rejects_bad_priority() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let err = save(&state, "product", 1, request(&[("en_US", "a.html")], Some("1.5")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_, ref f) if f.contains_key("sitemap_priority")));
        assert!(state.db.get_entity(View::Product, 1).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_url_owned_by_other_item_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        save(&state, "category", 1, request(&[("en_US", "shoes.html")], None))
            .await
            .unwrap();
        let err = save(&state, "product", 2, request(&[("en_US", "shoes.html")], None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Fail(StatusCode::CONFLICT, _)));
    }

    #[tokio::test]
    async fn test_delete_content_drops_override() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        save(&state, "content", 9, request(&[("en_US", "about.html")], Some("0.2")))
            .await
            .unwrap();
        delete_content(
            AdminAuth,
            State(Arc::clone(&state)),
            Path(("content".to_string(), 9)),
        )
        .await
        .unwrap();

        assert!(state.db.get_priority(View::Content, 9).unwrap().is_none());
        assert!(state.db.get_url("about.html").unwrap().is_none());

        let err = delete_content(AdminAuth, State(state), Path(("content".to_string(), 9)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Fail(StatusCode::NOT_FOUND, _)));
    }

    #[tokio::test]
    async fn test_put_lang_switches_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        for locale in ["en_US", "fr_FR"] {
            put_lang(
                AdminAuth,
                State(Arc::clone(&state)),
                Path(locale.to_string()),
                AppJson(PutLangRequest {
                    title: None,
                    by_default: true,
                }),
            )
            .await
            .unwrap();
        }

        assert_eq!(state.db.default_lang().unwrap().unwrap().locale, "fr_FR");
    }
}
