use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub site: SiteConfig,
    /// Bearer token guarding admin and host-notification routes.
    /// When unset those routes reject every request.
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Root directory for cached documents
    pub cache_dir: String,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Absolute storefront URL, without trailing slash
    pub base_url: String,
    /// Local media library holding source images, one subdirectory per view
    pub images_library_path: String,
    /// Public URL prefix of processed images
    pub image_cache_url: String,
    /// URL prefixes hidden from every sitemap
    pub exclude_paths: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            cache_dir: "./cache".to_string(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            images_library_path: "./local/media/images".to_string(),
            image_cache_url: "http://localhost:8080/cache/images".to_string(),
            exclude_paths: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let cache_dir = std::env::var("CACHE_DIR").unwrap_or_else(|_| "./cache".to_string());

        let base_url = std::env::var("SITE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let images_library_path = std::env::var("IMAGES_LIBRARY_PATH")
            .unwrap_or_else(|_| "./local/media/images".to_string());

        let image_cache_url = std::env::var("IMAGE_CACHE_URL")
            .unwrap_or_else(|_| format!("{base_url}/cache/images"));

        let exclude_paths: Vec<String> = std::env::var("SITEMAP_EXCLUDE_PATHS")
            .map(|p| {
                p.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let admin_token = std::env::var("ADMIN_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
                cache_dir,
            },
            site: SiteConfig {
                base_url,
                images_library_path,
                image_cache_url,
                exclude_paths,
            },
            admin_token,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.site.base_url.starts_with("http://") || self.site.base_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError(
                "SITE_URL must be an absolute http(s) URL".to_string(),
            ));
        }

        if let Some(ref token) = self.admin_token {
            if token.len() < 16 {
                return Err(ConfigError::ValidationError(
                    "ADMIN_TOKEN must be at least 16 characters".to_string(),
                ));
            }
        } else {
            tracing::warn!("ADMIN_TOKEN is not set. Admin and notification routes are disabled.");
        }

        Ok(())
    }

    /// Directory holding the cached sitemap documents.
    pub fn sitemap_cache_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.node.cache_dir).join("sitemap")
    }
}
