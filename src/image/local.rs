use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::digest;

use super::{ImageError, ImageOptions, ImageProcessor, ImageRequest};

/// Resolves images against a local media library and points at the resized
/// variant the storefront's image cache serves.
///
/// Variant URLs look like `{cache_url}/{view}/{params-hash}-{file}`, so two
/// different option sets never share a cached file.
pub struct LocalImageProcessor {
    library_path: PathBuf,
    cache_url: String,
}

impl LocalImageProcessor {
    pub fn new<P: AsRef<Path>>(library_path: P, cache_url: impl Into<String>) -> Self {
        Self {
            library_path: library_path.as_ref().to_path_buf(),
            cache_url: cache_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageProcessor for LocalImageProcessor {
    async fn process(&self, request: &ImageRequest<'_>) -> Result<String, ImageError> {
        let file = request.file;
        if file.is_empty() || file.contains(['/', '\\']) || file.starts_with('.') {
            return Err(ImageError::InvalidFileName(file.to_string()));
        }

        let source_path = self
            .library_path
            .join(request.source.as_str())
            .join(file);
        if !tokio::fs::try_exists(&source_path).await? {
            return Err(ImageError::SourceNotFound(
                source_path.to_string_lossy().to_string(),
            ));
        }

        Ok(format!(
            "{}/{}/{}-{}",
            self.cache_url,
            request.source,
            options_hash(request.options),
            file
        ))
    }
}

fn options_hash(options: &ImageOptions) -> String {
    let fingerprint = format!(
        "{:?}|{:?}|{}|{}|{}|{}|{}",
        options.width,
        options.height,
        options.quality,
        options.rotation,
        options.resize_mode.code(),
        options.background_color.as_deref().unwrap_or_default(),
        options.allow_zoom
    );
    let hash = digest::digest(&digest::SHA256, fingerprint.as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(hash.as_ref());
    encoded.truncate(16);
    encoded
}
