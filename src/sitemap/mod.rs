//! Sitemap assembly and the read-through cache in front of it.

pub mod priority;
pub mod xml;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::cache::CacheStore;
use crate::events::{EventDispatcher, SitemapEndEvent, SitemapEvent};
use crate::image::{ImageOptions, ImageProcessor, ImageRequest};
use crate::settings::SitemapSettings;
use crate::storage::models::View;
use crate::storage::{Database, DatabaseError, UrlQuery, UrlRow};

use priority::PriorityResolver;
use xml::{ImageEntry, UrlEntry};

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Unknown locale: {0}")]
    UnknownLocale(String),
    #[error("Image sitemap generation exceeded {0:?}")]
    Timeout(Duration),
}

/// The two documents the service renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Standard,
    Image,
}

impl DocumentKind {
    pub fn cache_key(&self, locale: &str) -> String {
        match self {
            DocumentKind::Standard => format!("sitemap{locale}"),
            DocumentKind::Image => format!("sitemap-image{locale}"),
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

pub struct SitemapGenerator {
    db: Database,
    dispatcher: EventDispatcher,
    images: Arc<dyn ImageProcessor>,
    base_url: String,
}

impl SitemapGenerator {
    pub fn new(
        db: Database,
        base_url: &str,
        images: Arc<dyn ImageProcessor>,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            db,
            dispatcher,
            images,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The storefront home page
    pub fn index_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// Turn a stored relative url into an absolute one. Absolute urls pass through.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Build the standard sitemap for `locale` as an ordered list of fragments.
    pub fn generate(&self, locale: &str) -> Result<Vec<String>, SitemapError> {
        let settings = SitemapSettings::load(&self.db)?;
        let priorities = PriorityResolver::load(&self.db, &settings)?;

        let mut sitemap = vec![xml::header(Utc::now())];

        let mut home = UrlEntry::new(self.index_url());
        home.priority = Some(settings.default_priority_homepage_value.clone());
        home.changefreq = Some(settings.default_update_frequency.clone());
        sitemap.push(home.to_xml());

        for view in View::SITEMAP_ORDER {
            let rows = self.url_query(view, locale, &settings).find(&self.db)?;
            let mut added = 0usize;

            for row in rows {
                let Some(event) = self.before_add(&row) else {
                    continue;
                };
                let entry = UrlEntry {
                    loc: event.loc,
                    lastmod: Some(event.lastmod),
                    priority: Some(priorities.resolve(view, row.entity.id).to_string()),
                    changefreq: Some(settings.default_update_frequency.clone()),
                    images: Vec::new(),
                };
                sitemap.push(entry.to_xml());
                added += 1;
            }

            tracing::debug!(locale, view = %view, entries = added, "Added sitemap entries");
        }

        Ok(self.finish(sitemap))
    }

    /// Build the image sitemap for `locale`: one entry per visible product that
    /// has a title in the locale and a visible image. Products whose image cannot
    /// be processed are left out.
    pub async fn generate_images(&self, locale: &str) -> Result<Vec<String>, SitemapError> {
        let settings = SitemapSettings::load(&self.db)?;
        let options = ImageOptions::from_settings(&settings);

        let rows = UrlQuery::new(View::Product)
            .filter_by_locale(locale)
            .join_visible()
            .join_title()
            .join_image()
            .group_by_entity()
            .find(&self.db)?;

        let mut sitemap = vec![xml::header(Utc::now())];
        let mut skipped = 0usize;

        for row in rows {
            let Some(event) = self.before_add(&row) else {
                continue;
            };
            // join_image guarantees an image
            let Some(image) = row.image() else {
                continue;
            };

            let request = ImageRequest {
                source: View::Product,
                file: &image.file,
                options: &options,
            };
            let image_url = match self.images.process(&request).await {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(
                        product_id = row.entity.id,
                        file = %image.file,
                        error = %e,
                        "Skipping product image"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let mut entry = UrlEntry::new(event.loc);
            entry.images.push(ImageEntry {
                loc: image_url,
                title: row.title().map(str::to_string),
            });
            sitemap.push(entry.to_xml());
        }

        if skipped > 0 {
            tracing::info!(locale, skipped, "Image sitemap generated with skipped images");
        }

        Ok(self.finish(sitemap))
    }

    /// Render a whole document. The image branch runs under the configured timeout.
    pub async fn render(&self, kind: DocumentKind, locale: &str) -> Result<String, SitemapError> {
        let fragments = match kind {
            DocumentKind::Standard => self.generate(locale)?,
            DocumentKind::Image => {
                let timeout = SitemapSettings::load(&self.db)?.image_timeout();
                tokio::time::timeout(timeout, self.generate_images(locale))
                    .await
                    .map_err(|_| SitemapError::Timeout(timeout))??
            }
        };
        Ok(fragments.join("\n"))
    }

    fn url_query(&self, view: View, locale: &str, settings: &SitemapSettings) -> UrlQuery {
        let query = UrlQuery::new(view).filter_by_locale(locale).join_visible();
        let exclude_empty = match view {
            View::Category => settings.exclude_empty_category,
            View::Folder => settings.exclude_empty_folder,
            _ => false,
        };
        if exclude_empty {
            query.require_children()
        } else {
            query
        }
    }

    /// Dispatch the before-add event; `None` when a listener hid the entry.
    fn before_add(&self, row: &UrlRow) -> Option<SitemapEvent> {
        let mut event = SitemapEvent::new(
            row.url.clone(),
            self.absolute_url(&row.url.url),
            xml::lastmod(row.entity.updated_at),
        );
        self.dispatcher.dispatch_entry(&mut event);
        (!event.hide).then_some(event)
    }

    /// Run the finalize event and close the document.
    fn finish(&self, sitemap: Vec<String>) -> Vec<String> {
        let mut end = SitemapEndEvent { sitemap };
        self.dispatcher.dispatch_end(&mut end);
        let mut sitemap = end.sitemap;
        sitemap.push(xml::URLSET_CLOSE.to_string());
        sitemap
    }
}

// ============================================================================
// Cached rendering
// ============================================================================

/// Serves documents from the cache, regenerating on a miss or an explicit flush.
pub struct SitemapService {
    db: Database,
    generator: SitemapGenerator,
    cache: Arc<dyn CacheStore>,
}

impl SitemapService {
    pub fn new(db: Database, generator: SitemapGenerator, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            db,
            generator,
            cache,
        }
    }

    pub fn generator(&self) -> &SitemapGenerator {
        &self.generator
    }

    /// Pick the locale to render. An explicit locale must be a known language;
    /// without one the default language is used, or the empty locale if none is set.
    pub fn resolve_locale(&self, requested: Option<&str>) -> Result<String, SitemapError> {
        match requested.map(str::trim).filter(|l| !l.is_empty()) {
            Some(locale) => match self.db.get_lang(locale)? {
                Some(lang) => Ok(lang.locale),
                None => Err(SitemapError::UnknownLocale(locale.to_string())),
            },
            None => Ok(self
                .db
                .default_lang()?
                .map(|lang| lang.locale)
                .unwrap_or_default()),
        }
    }

    /// Return the cached document, or generate and cache it.
    /// With `flush` the cached entry is discarded first.
    pub async fn render(
        &self,
        kind: DocumentKind,
        locale: &str,
        flush: bool,
    ) -> Result<String, SitemapError> {
        let key = kind.cache_key(locale);

        if flush {
            if let Err(e) = self.cache.delete(&key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete cached sitemap");
            }
        } else {
            match self.cache.get(&key).await {
                Ok(Some(content)) => {
                    tracing::debug!(key = %key, "Serving cached sitemap");
                    return Ok(content);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "Failed to read cached sitemap"),
            }
        }

        let content = self.generator.render(kind, locale).await?;
        let ttl = SitemapSettings::load(&self.db)?.cache_ttl();

        if let Err(e) = self.cache.set(&key, &content, ttl).await {
            tracing::warn!(key = %key, error = %e, "Failed to cache sitemap");
        }
        tracing::info!(key = %key, bytes = content.len(), "Generated sitemap");

        Ok(content)
    }

    /// Drop every cached document. Returns how many entries were removed.
    pub async fn flush_all(&self) -> u64 {
        match self.cache.flush_all().await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to flush sitemap cache");
                0
            }
        }
    }
}
