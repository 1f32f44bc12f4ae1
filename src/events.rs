//! Extension points around sitemap assembly.
//!
//! Listeners see every candidate entry before it is formatted and may rewrite
//! it or hide it. Once all entries are in, they see the whole fragment list and
//! may reorder, filter or append to it before the closing tag goes on.

use std::sync::Arc;

use crate::storage::models::RewritingUrl;

/// A candidate sitemap entry, handed to listeners before it is formatted
#[derive(Debug, Clone)]
pub struct SitemapEvent {
    pub rewriting_url: RewritingUrl,
    pub loc: String,
    pub lastmod: String,
    pub hide: bool,
}

impl SitemapEvent {
    pub fn new(rewriting_url: RewritingUrl, loc: String, lastmod: String) -> Self {
        Self {
            rewriting_url,
            loc,
            lastmod,
            hide: false,
        }
    }
}

/// The assembled fragments, minus the closing tag
#[derive(Debug, Clone, Default)]
pub struct SitemapEndEvent {
    pub sitemap: Vec<String>,
}

pub trait SitemapListener: Send + Sync {
    fn on_entry(&self, _event: &mut SitemapEvent) {}

    fn on_end(&self, _event: &mut SitemapEndEvent) {}
}

/// Calls listeners in registration order
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Vec<Arc<dyn SitemapListener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: Arc<dyn SitemapListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn dispatch_entry(&self, event: &mut SitemapEvent) {
        for listener in &self.listeners {
            listener.on_entry(event);
        }
    }

    pub fn dispatch_end(&self, event: &mut SitemapEndEvent) {
        for listener in &self.listeners {
            listener.on_end(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Hides every entry whose url starts with one of the configured prefixes.
/// Prefixes are matched against the stored (relative) url, not the absolute location.
pub struct ExcludePathsListener {
    prefixes: Vec<String>,
}

impl ExcludePathsListener {
    pub fn new(prefixes: Vec<String>) -> Self {
        let prefixes = prefixes
            .into_iter()
            .map(|p| p.trim().trim_start_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }
}

impl SitemapListener for ExcludePathsListener {
    fn on_entry(&self, event: &mut SitemapEvent) {
        let url = &event.rewriting_url;
        let path = url.url.trim_start_matches('/');
        if self.prefixes.iter().any(|prefix| path.starts_with(prefix)) {
            tracing::debug!(url = %url.url, "Entry hidden by excluded path");
            event.hide = true;
        }
    }
}
