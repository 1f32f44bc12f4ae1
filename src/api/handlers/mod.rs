mod admin;
mod hooks;
mod sitemap;

use crate::api::response::ApiError;
use crate::sitemap::SitemapError;
use crate::storage::models::View;
use crate::storage::DatabaseError;

pub use admin::{flush_cache, get_priority, get_settings, health, save_settings};
pub use hooks::{delete_content, delete_lang, put_lang, save_content};
pub use sitemap::{image_sitemap, sitemap};

/// Map a SitemapError to an ApiError
fn sitemap_error(e: SitemapError) -> ApiError {
    match e {
        SitemapError::UnknownLocale(locale) => {
            ApiError::not_found(format!("Unknown locale: {locale}"))
        }
        SitemapError::Timeout(_) => {
            ApiError::unavailable("Image sitemap generation timed out, retry shortly")
        }
        SitemapError::Database(e) => database_error(e),
    }
}

fn database_error(e: DatabaseError) -> ApiError {
    tracing::error!(error = %e, "Database error");
    ApiError::internal(e.to_string())
}

fn parse_view(view: &str) -> Result<View, ApiError> {
    view.parse::<View>()
        .map_err(|e| ApiError::not_found(format!("Not found: {e}")))
}
