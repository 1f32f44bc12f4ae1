//! sitemap-service - XML sitemaps for e-commerce catalog content
//!
//! This crate renders the storefront sitemap and its image variant with:
//! - Catalog, URL, language and priority-override records in redb
//! - Per-entry and end-of-document extension hooks
//! - A filesystem cache keyed by document kind and locale
//! - Admin configuration and host notification endpoints

pub mod api;
pub mod cache;
pub mod config;
pub mod events;
pub mod image;
pub mod settings;
pub mod sitemap;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use cache::FilesystemCache;
use config::Config;
use events::{EventDispatcher, ExcludePathsListener};
use image::LocalImageProcessor;
use sitemap::{SitemapGenerator, SitemapService};
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub sitemaps: SitemapService,
}

impl AppState {
    /// Wire the storage, cache, image and hook layers described by `config`.
    pub fn build(config: Config, db: Database) -> Result<Self, std::io::Error> {
        let cache = FilesystemCache::new(config.sitemap_cache_dir())?;
        let images = LocalImageProcessor::new(
            &config.site.images_library_path,
            config.site.image_cache_url.as_str(),
        );

        let mut dispatcher = EventDispatcher::new();
        if !config.site.exclude_paths.is_empty() {
            dispatcher = dispatcher.with_listener(Arc::new(ExcludePathsListener::new(
                config.site.exclude_paths.clone(),
            )));
        }

        let generator = SitemapGenerator::new(
            db.clone(),
            &config.site.base_url,
            Arc::new(images),
            dispatcher,
        );
        let sitemaps = SitemapService::new(db.clone(), generator, Arc::new(cache));

        Ok(Self {
            config,
            db,
            sitemaps,
        })
    }
}
