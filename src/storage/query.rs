//! Read queries over URL records joined to the catalog entity they point at.
//!
//! A [`UrlQuery`] starts from the rewriting-url table and narrows it the way the
//! sitemap needs: one view, one locale, no redirected urls, only entities that
//! are visible (and optionally non-empty, titled, or carrying an image).

use std::collections::{HashMap, HashSet};

use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{CatalogEntity, EntityImage, RewritingUrl, View};
use super::tables::REWRITING_URLS;

/// One matching URL record with the entity it resolves to
#[derive(Debug, Clone)]
pub struct UrlRow {
    pub url: RewritingUrl,
    pub entity: CatalogEntity,
}

impl UrlRow {
    /// Entity title in the url's locale
    pub fn title(&self) -> Option<&str> {
        self.entity
            .titles
            .get(&self.url.view_locale)
            .map(String::as_str)
    }

    pub fn image(&self) -> Option<&EntityImage> {
        self.entity.first_image()
    }
}

#[derive(Debug, Clone)]
pub struct UrlQuery {
    view: View,
    locale: Option<String>,
    include_redirected: bool,
    visible_only: bool,
    not_empty: bool,
    with_title: bool,
    with_image: bool,
    group_by_entity: bool,
}

impl UrlQuery {
    /// All non-redirected urls of `view`, in every locale, whatever the entity state.
    pub fn new(view: View) -> Self {
        Self {
            view,
            locale: None,
            include_redirected: false,
            visible_only: false,
            not_empty: false,
            with_title: false,
            with_image: false,
            group_by_entity: false,
        }
    }

    pub fn filter_by_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    pub fn include_redirected(mut self, include: bool) -> Self {
        self.include_redirected = include;
        self
    }

    /// Keep only urls whose entity is visible.
    pub fn join_visible(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// Keep only categories/folders that have at least one child of any kind.
    /// No effect on other views.
    pub fn require_children(mut self) -> Self {
        self.not_empty = true;
        self
    }

    /// Keep only entities titled in the url's locale.
    pub fn join_title(mut self) -> Self {
        self.with_title = true;
        self
    }

    /// Keep only entities with at least one visible image.
    pub fn join_image(mut self) -> Self {
        self.with_image = true;
        self
    }

    /// Keep a single url per entity (the first in url order).
    pub fn group_by_entity(mut self) -> Self {
        self.group_by_entity = true;
        self
    }

    /// Run the query. Rows come back ordered by entity id, then url.
    pub fn find(&self, db: &Database) -> Result<Vec<UrlRow>, DatabaseError> {
        let read_txn = db.begin_read()?;
        let urls = read_txn.open_table(REWRITING_URLS)?;
        let entities = read_txn.open_table(self.view.table())?;

        let parents = if self.not_empty && !self.view.child_views().is_empty() {
            let mut ids = HashSet::new();
            for child_view in self.view.child_views() {
                let children = read_txn.open_table(child_view.table())?;
                for result in children.iter()? {
                    let (_, value) = result?;
                    let child: CatalogEntity = rmp_serde::from_slice(value.value())?;
                    ids.extend(child.parent_ids);
                }
            }
            Some(ids)
        } else {
            None
        };

        let mut cache: HashMap<u64, Option<CatalogEntity>> = HashMap::new();
        let mut rows = Vec::new();

        for result in urls.iter()? {
            let (_, value) = result?;
            let url: RewritingUrl = rmp_serde::from_slice(value.value())?;

            if url.view != self.view || (url.redirected && !self.include_redirected) {
                continue;
            }
            if let Some(ref locale) = self.locale {
                if url.view_locale != *locale {
                    continue;
                }
            }

            let entity = match cache.get(&url.view_id) {
                Some(entity) => entity.clone(),
                None => {
                    let loaded: Option<CatalogEntity> = match entities.get(url.view_id)? {
                        Some(data) => Some(rmp_serde::from_slice(data.value())?),
                        None => None,
                    };
                    cache.insert(url.view_id, loaded.clone());
                    loaded
                }
            };

            // Inner join: urls pointing at unknown entities never match
            let Some(entity) = entity else {
                continue;
            };

            if self.visible_only && !entity.visible {
                continue;
            }
            if let Some(ref parents) = parents {
                if !parents.contains(&entity.id) {
                    continue;
                }
            }

            let row = UrlRow { url, entity };
            if self.with_title && row.title().is_none() {
                continue;
            }
            if self.with_image && row.image().is_none() {
                continue;
            }

            rows.push(row);
        }

        rows.sort_by(|a, b| {
            a.entity
                .id
                .cmp(&b.entity.id)
                .then_with(|| a.url.url.cmp(&b.url.url))
        });

        if self.group_by_entity {
            rows.dedup_by_key(|row| row.entity.id);
        }

        Ok(rows)
    }
}
