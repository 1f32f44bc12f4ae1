mod local;

pub use local::LocalImageProcessor;

use async_trait::async_trait;
use thiserror::Error;

use crate::settings::{ResizeMode, SitemapSettings};
use crate::storage::models::View;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source image not found: {0}")]
    SourceNotFound(String),
    #[error("Invalid image file name: {0}")]
    InvalidFileName(String),
}

/// Resize parameters applied to every image of a sitemap
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: u8,
    pub rotation: i32,
    pub resize_mode: ResizeMode,
    pub background_color: Option<String>,
    pub allow_zoom: bool,
}

impl ImageOptions {
    pub fn from_settings(settings: &SitemapSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            quality: settings.quality,
            rotation: settings.rotation,
            resize_mode: settings.resize_mode,
            background_color: settings.background_color.clone(),
            allow_zoom: settings.allow_zoom,
        }
    }
}

/// One image to turn into a publicly reachable, resized variant
#[derive(Debug, Clone)]
pub struct ImageRequest<'a> {
    /// Image library subdirectory the source file lives in
    pub source: View,
    pub file: &'a str,
    pub options: &'a ImageOptions,
}

/// Produces the public URL of a processed image.
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    async fn process(&self, request: &ImageRequest<'_>) -> Result<String, ImageError>;
}
