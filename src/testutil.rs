//! Shared test helpers for handler tests.

use std::sync::Arc;

use crate::config::{Config, NodeConfig, SiteConfig};
use crate::storage::Database;
use crate::AppState;

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-0123456789";

/// Create a test AppState with a temporary database, cache and image library.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let cache_dir = temp_dir.path().join("cache");
    let images_dir = temp_dir.path().join("images");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            cache_dir: cache_dir.to_string_lossy().to_string(),
        },
        site: SiteConfig {
            base_url: "http://shop.test".to_string(),
            images_library_path: images_dir.to_string_lossy().to_string(),
            image_cache_url: "http://shop.test/cache/images".to_string(),
            exclude_paths: vec![],
        },
        admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    Arc::new(AppState::build(config, db).expect("Failed to build test state"))
}
