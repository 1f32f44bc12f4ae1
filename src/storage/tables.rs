use redb::TableDefinition;

/// Rewritten front-end URLs: url -> RewritingUrl (msgpack)
pub const REWRITING_URLS: TableDefinition<&str, &[u8]> = TableDefinition::new("rewriting_urls");

/// View index: "view:view_id" -> msgpack Vec of urls owned by that entity
pub const VIEW_URLS: TableDefinition<&str, &[u8]> = TableDefinition::new("view_urls");

/// Catalog entities, one table per view: id -> CatalogEntity (msgpack)
pub const PRODUCTS: TableDefinition<u64, &[u8]> = TableDefinition::new("products");
pub const CATEGORIES: TableDefinition<u64, &[u8]> = TableDefinition::new("categories");
pub const FOLDERS: TableDefinition<u64, &[u8]> = TableDefinition::new("folders");
pub const CONTENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("contents");
pub const BRANDS: TableDefinition<u64, &[u8]> = TableDefinition::new("brands");

/// Storefront languages: locale -> Lang (msgpack)
pub const LANGS: TableDefinition<&str, &[u8]> = TableDefinition::new("langs");

/// Priority overrides: "source:source_id" -> SitemapPriority (msgpack)
pub const SITEMAP_PRIORITIES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("sitemap_priorities");

/// Module settings: name -> raw string value
pub const MODULE_CONFIG: TableDefinition<&str, &str> = TableDefinition::new("module_config");
