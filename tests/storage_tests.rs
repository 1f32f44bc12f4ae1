use std::collections::BTreeMap;

use chrono::Utc;
use sitemap_service::storage::models::{CatalogEntity, EntityImage, Lang, RewritingUrl, View};
use sitemap_service::storage::{Database, UrlQuery};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn entity(id: u64) -> CatalogEntity {
    CatalogEntity {
        id,
        visible: true,
        updated_at: Utc::now(),
        parent_ids: vec![],
        titles: BTreeMap::new(),
        images: vec![],
    }
}

fn url(view: View, id: u64, locale: &str, path: &str) -> RewritingUrl {
    RewritingUrl {
        url: path.to_string(),
        view,
        view_id: id,
        view_locale: locale.to_string(),
        redirected: false,
    }
}

fn lang(locale: &str, by_default: bool) -> Lang {
    Lang {
        locale: locale.to_string(),
        title: None,
        by_default,
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[test]
fn test_save_and_get_content() {
    let (_dir, db) = test_db();
    let mut product = entity(42);
    product.titles.insert("en_US".to_string(), "Red shoes".to_string());

    db.save_content(
        View::Product,
        &product,
        &[
            url(View::Product, 42, "en_US", "red-shoes.html"),
            url(View::Product, 42, "fr_FR", "chaussures-rouges.html"),
        ],
    )
    .unwrap();

    let stored = db.get_entity(View::Product, 42).unwrap().expect("entity should exist");
    assert_eq!(stored, product);
    assert!(db.get_entity(View::Category, 42).unwrap().is_none());

    let urls = db.get_urls_for(View::Product, 42).unwrap();
    assert_eq!(urls.len(), 2);
    assert_eq!(
        db.get_url("chaussures-rouges.html").unwrap().unwrap().view_locale,
        "fr_FR"
    );
}

#[test]
fn test_save_content_replaces_urls() {
    let (_dir, db) = test_db();

    db.save_content(
        View::Category,
        &entity(1),
        &[url(View::Category, 1, "en_US", "old-path.html")],
    )
    .unwrap();
    db.save_content(
        View::Category,
        &entity(1),
        &[url(View::Category, 1, "en_US", "new-path.html")],
    )
    .unwrap();

    assert!(db.get_url("old-path.html").unwrap().is_none());
    assert!(db.get_url("new-path.html").unwrap().is_some());
    assert_eq!(db.get_all_urls().unwrap().len(), 1);
}

#[test]
fn test_delete_content_removes_urls_and_override() {
    let (_dir, db) = test_db();

    db.save_content(
        View::Brand,
        &entity(7),
        &[url(View::Brand, 7, "en_US", "acme.html")],
    )
    .unwrap();
    db.set_priority(View::Brand, 7, "0.1").unwrap();

    assert!(db.delete_content(View::Brand, 7).unwrap());
    assert!(db.get_entity(View::Brand, 7).unwrap().is_none());
    assert!(db.get_url("acme.html").unwrap().is_none());
    assert!(db.get_priority(View::Brand, 7).unwrap().is_none());

    assert!(!db.delete_content(View::Brand, 7).unwrap());
}

#[test]
fn test_get_all_entities() {
    let (_dir, db) = test_db();
    for id in [3, 1, 2] {
        db.save_content(View::Folder, &entity(id), &[]).unwrap();
    }

    let ids: Vec<u64> = db
        .get_all_entities(View::Folder)
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(db.get_all_entities(View::Content).unwrap().is_empty());
}

// ============================================================================
// Languages
// ============================================================================

#[test]
fn test_single_default_lang() {
    let (_dir, db) = test_db();
    assert!(db.default_lang().unwrap().is_none());

    db.put_lang(&lang("en_US", true)).unwrap();
    db.put_lang(&lang("fr_FR", false)).unwrap();
    assert_eq!(db.default_lang().unwrap().unwrap().locale, "en_US");

    db.put_lang(&lang("fr_FR", true)).unwrap();
    assert_eq!(db.default_lang().unwrap().unwrap().locale, "fr_FR");
    assert!(!db.get_lang("en_US").unwrap().unwrap().by_default);

    let locales: Vec<String> = db.list_langs().unwrap().into_iter().map(|l| l.locale).collect();
    assert_eq!(locales, vec!["en_US", "fr_FR"]);

    assert!(db.delete_lang("en_US").unwrap());
    assert!(!db.delete_lang("en_US").unwrap());
    assert!(db.get_lang("en_US").unwrap().is_none());
}

// ============================================================================
// Priorities and module config
// ============================================================================

#[test]
fn test_set_priority_reports_changes() {
    let (_dir, db) = test_db();

    assert!(db.set_priority(View::Product, 42, "0.3").unwrap());
    let first = db.get_priority(View::Product, 42).unwrap().unwrap();
    assert_eq!(first.value, "0.3");
    assert_eq!(first.source, View::Product);
    assert_eq!(first.source_id, 42);

    assert!(!db.set_priority(View::Product, 42, "0.3").unwrap());

    assert!(db.set_priority(View::Product, 42, "0.4").unwrap());
    let updated = db.get_priority(View::Product, 42).unwrap().unwrap();
    assert_eq!(updated.value, "0.4");
    assert_eq!(updated.created_at, first.created_at);

    assert!(db.get_priority(View::Category, 42).unwrap().is_none());
    assert_eq!(db.get_all_priorities().unwrap().len(), 1);

    assert!(db.delete_priority(View::Product, 42).unwrap());
    assert!(!db.delete_priority(View::Product, 42).unwrap());
}

#[test]
fn test_save_content_with_priority() {
    let (_dir, db) = test_db();
    let urls = [url(View::Content, 9, "en_US", "about.html")];

    assert!(db
        .save_content_with_priority(View::Content, &entity(9), &urls, Some("0.2"))
        .unwrap());
    assert!(db.get_entity(View::Content, 9).unwrap().is_some());
    assert_eq!(db.get_priority(View::Content, 9).unwrap().unwrap().value, "0.2");

    // Same value: the entity is still rewritten, the override is untouched
    let mut hidden = entity(9);
    hidden.visible = false;
    assert!(!db
        .save_content_with_priority(View::Content, &hidden, &urls, Some("0.2"))
        .unwrap());
    assert!(!db.get_entity(View::Content, 9).unwrap().unwrap().visible);

    // No value keeps the stored override
    assert!(!db
        .save_content_with_priority(View::Content, &entity(9), &urls, None)
        .unwrap());
    assert_eq!(db.get_priority(View::Content, 9).unwrap().unwrap().value, "0.2");
}

#[test]
fn test_config_values() {
    let (_dir, db) = test_db();
    assert!(db.get_config_value("sitemap_ttl").unwrap().is_none());

    db.set_config_values(&[
        ("sitemap_ttl", "600".to_string()),
        ("quality", "90".to_string()),
    ])
    .unwrap();

    assert_eq!(db.get_config_value("sitemap_ttl").unwrap().as_deref(), Some("600"));
    assert_eq!(db.get_config_value("quality").unwrap().as_deref(), Some("90"));
}

// ============================================================================
// Url queries
// ============================================================================

#[test]
fn test_query_filters_locale_visibility_and_redirects() {
    let (_dir, db) = test_db();

    db.save_content(
        View::Product,
        &entity(1),
        &[
            url(View::Product, 1, "en_US", "one.html"),
            url(View::Product, 1, "fr_FR", "un.html"),
            RewritingUrl {
                redirected: true,
                ..url(View::Product, 1, "en_US", "one-old.html")
            },
        ],
    )
    .unwrap();

    let mut hidden = entity(2);
    hidden.visible = false;
    db.save_content(
        View::Product,
        &hidden,
        &[url(View::Product, 2, "en_US", "two.html")],
    )
    .unwrap();

    let rows = UrlQuery::new(View::Product)
        .filter_by_locale("en_US")
        .join_visible()
        .find(&db)
        .unwrap();
    let paths: Vec<&str> = rows.iter().map(|r| r.url.url.as_str()).collect();
    assert_eq!(paths, vec!["one.html"]);

    let rows = UrlQuery::new(View::Product)
        .filter_by_locale("en_US")
        .include_redirected(true)
        .find(&db)
        .unwrap();
    let paths: Vec<&str> = rows.iter().map(|r| r.url.url.as_str()).collect();
    assert_eq!(paths, vec!["one-old.html", "one.html", "two.html"]);
}

#[test]
fn test_query_skips_urls_without_entity() {
    let (_dir, db) = test_db();

    db.save_content(
        View::Content,
        &entity(5),
        &[url(View::Content, 5, "en_US", "about.html")],
    )
    .unwrap();
    // Urls of another view never leak into the result
    db.save_content(
        View::Folder,
        &entity(5),
        &[url(View::Folder, 5, "en_US", "pages.html")],
    )
    .unwrap();

    let rows = UrlQuery::new(View::Content).find(&db).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity.id, 5);
    assert_eq!(rows[0].url.url, "about.html");
}

#[test]
fn test_require_children_excludes_empty_categories() {
    let (_dir, db) = test_db();

    // 1 holds a product, 2 holds a sub-category, 3 is empty
    for id in [1, 2, 3] {
        db.save_content(
            View::Category,
            &entity(id),
            &[url(View::Category, id, "en_US", &format!("cat-{id}.html"))],
        )
        .unwrap();
    }
    db.save_content(
        View::Category,
        &CatalogEntity {
            parent_ids: vec![2],
            ..entity(4)
        },
        &[],
    )
    .unwrap();
    db.save_content(
        View::Product,
        &CatalogEntity {
            parent_ids: vec![1],
            ..entity(10)
        },
        &[],
    )
    .unwrap();

    let ids: Vec<u64> = UrlQuery::new(View::Category)
        .require_children()
        .find(&db)
        .unwrap()
        .into_iter()
        .map(|r| r.entity.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let all = UrlQuery::new(View::Category).find(&db).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_image_query_groups_by_entity() {
    let (_dir, db) = test_db();

    let mut titled = entity(1);
    titled.titles.insert("en_US".to_string(), "Shoes".to_string());
    titled.images = vec![
        EntityImage {
            file: "back.jpg".to_string(),
            position: 2,
            visible: true,
        },
        EntityImage {
            file: "front.jpg".to_string(),
            position: 1,
            visible: true,
        },
    ];
    db.save_content(
        View::Product,
        &titled,
        &[
            url(View::Product, 1, "en_US", "shoes-b.html"),
            url(View::Product, 1, "en_US", "shoes-a.html"),
        ],
    )
    .unwrap();

    let mut untitled = entity(2);
    untitled.images = titled.images.clone();
    db.save_content(
        View::Product,
        &untitled,
        &[url(View::Product, 2, "en_US", "boots.html")],
    )
    .unwrap();

    let mut no_image = entity(3);
    no_image.titles.insert("en_US".to_string(), "Hat".to_string());
    no_image.images = vec![EntityImage {
        file: "hidden.jpg".to_string(),
        position: 1,
        visible: false,
    }];
    db.save_content(
        View::Product,
        &no_image,
        &[url(View::Product, 3, "en_US", "hat.html")],
    )
    .unwrap();

    let rows = UrlQuery::new(View::Product)
        .filter_by_locale("en_US")
        .join_visible()
        .join_title()
        .join_image()
        .group_by_entity()
        .find(&db)
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].url.url, "shoes-a.html");
    assert_eq!(rows[0].title(), Some("Shoes"));
    assert_eq!(rows[0].image().unwrap().file, "front.jpg");
}

#[test]
fn test_require_children_excludes_empty_folders() {
    let (_dir, db) = test_db();

    // 1 holds a content, 2 holds a sub-folder, 3 is empty
    for id in [1, 2, 3] {
        db.save_content(
            View::Folder,
            &entity(id),
            &[url(View::Folder, id, "en_US", &format!("folder-{id}.html"))],
        )
        .unwrap();
    }
    db.save_content(
        View::Folder,
        &CatalogEntity {
            parent_ids: vec![2],
            ..entity(4)
        },
        &[],
    )
    .unwrap();
    db.save_content(
        View::Content,
        &CatalogEntity {
            parent_ids: vec![1],
            ..entity(10)
        },
        &[],
    )
    .unwrap();
    // A product pointing at folder 3 does not make it a parent
    db.save_content(
        View::Product,
        &CatalogEntity {
            parent_ids: vec![3],
            ..entity(11)
        },
        &[],
    )
    .unwrap();

    let ids: Vec<u64> = UrlQuery::new(View::Folder)
        .require_children()
        .find(&db)
        .unwrap()
        .into_iter()
        .map(|r| r.entity.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}
