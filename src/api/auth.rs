use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use ring::digest;

use crate::api::response::ApiError;
use crate::AppState;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Rejects the request with 401 unless it carries the admin token.
pub struct AdminAuth;

/// Whether the request carries the admin token. Never rejects.
pub struct MaybeAdmin(pub bool);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        if is_admin(parts, state) {
            Ok(AdminAuth)
        } else {
            Err(ApiError::unauthorized("Admin authentication required"))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeAdmin {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAdmin(is_admin(parts, state)))
    }
}

fn is_admin(parts: &Parts, state: &AppState) -> bool {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return false;
    };

    let presented = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| {
            parts
                .headers
                .get(ADMIN_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
        });

    presented.is_some_and(|token| tokens_match(token.trim(), expected))
}

/// Compared through fixed-length SHA-256 digests.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let a = digest::digest(&digest::SHA256, presented.as_bytes());
    let b = digest::digest(&digest::SHA256, expected.as_bytes());
    a.as_ref() == b.as_ref()
}
