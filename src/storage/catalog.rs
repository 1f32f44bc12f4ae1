use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{entity_key, CatalogEntity, Lang, RewritingUrl, View};
use super::priorities::upsert_priority;
use super::tables::*;

impl Database {
    // ========================================================================
    // Catalog entities
    // ========================================================================

    /// Store an entity together with the full set of its URL records.
    /// URL records previously owned by the entity but absent from `urls` are removed.
    pub fn save_content(
        &self,
        view: View,
        entity: &CatalogEntity,
        urls: &[RewritingUrl],
    ) -> Result<(), DatabaseError> {
        self.save_content_with_priority(view, entity, urls, None)?;
        Ok(())
    }

    /// [`Database::save_content`] plus an optional priority override, in one transaction.
    /// Returns whether the override was created or changed.
    pub fn save_content_with_priority(
        &self,
        view: View,
        entity: &CatalogEntity,
        urls: &[RewritingUrl],
        priority: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        debug_assert!(
            urls.iter()
                .all(|u| u.view == view && u.view_id == entity.id),
            "url records must belong to the saved entity"
        );

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(view.table())?;
            let data = rmp_serde::to_vec_named(entity)?;
            table.insert(entity.id, data.as_slice())?;
        }
        replace_urls(&write_txn, view, entity.id, urls)?;
        let priority_updated = match priority {
            Some(value) => upsert_priority(&write_txn, view, entity.id, value)?,
            None => false,
        };
        write_txn.commit()?;
        Ok(priority_updated)
    }

    /// Get an entity by view and id
    pub fn get_entity(&self, view: View, id: u64) -> Result<Option<CatalogEntity>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(view.table())?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// All entities of a view, ordered by id
    pub fn get_all_entities(&self, view: View) -> Result<Vec<CatalogEntity>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(view.table())?;

        let mut entities = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            entities.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(entities)
    }

    /// Delete an entity, its URL records and its priority override
    pub fn delete_content(&self, view: View, id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let deleted = {
            let mut table = write_txn.open_table(view.table())?;
            let removed = table.remove(id)?.is_some();
            removed
        };
        replace_urls(&write_txn, view, id, &[])?;
        {
            let mut priorities = write_txn.open_table(SITEMAP_PRIORITIES)?;
            priorities.remove(entity_key(view, id).as_str())?;
        }

        write_txn.commit()?;
        Ok(deleted)
    }

    // ========================================================================
    // URL records
    // ========================================================================

    /// Get a URL record by its path
    pub fn get_url(&self, url: &str) -> Result<Option<RewritingUrl>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REWRITING_URLS)?;

        match table.get(url)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// All URL records owned by one entity
    pub fn get_urls_for(&self, view: View, id: u64) -> Result<Vec<RewritingUrl>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(VIEW_URLS)?;
        let urls_table = read_txn.open_table(REWRITING_URLS)?;

        let urls: Vec<String> = match index.get(entity_key(view, id).as_str())? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::new();
        for url in urls {
            if let Some(data) = urls_table.get(url.as_str())? {
                records.push(rmp_serde::from_slice(data.value())?);
            }
        }

        Ok(records)
    }

    /// All URL records, in url order
    pub fn get_all_urls(&self) -> Result<Vec<RewritingUrl>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REWRITING_URLS)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            records.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(records)
    }

    // ========================================================================
    // Languages
    // ========================================================================

    /// Store a language. Marking it as default clears the flag on every other language.
    pub fn put_lang(&self, lang: &Lang) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(LANGS)?;

            if lang.by_default {
                let others: Vec<Lang> = table
                    .iter()?
                    .map(|r| r.map(|(_, v)| v.value().to_vec()))
                    .collect::<Result<Vec<_>, _>>()?
                    .iter()
                    .map(|bytes| rmp_serde::from_slice::<Lang>(bytes))
                    .collect::<Result<Vec<_>, _>>()?;

                for mut other in others {
                    if other.by_default && other.locale != lang.locale {
                        other.by_default = false;
                        let data = rmp_serde::to_vec_named(&other)?;
                        table.insert(other.locale.as_str(), data.as_slice())?;
                    }
                }
            }

            let data = rmp_serde::to_vec_named(lang)?;
            table.insert(lang.locale.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a language by locale
    pub fn get_lang(&self, locale: &str) -> Result<Option<Lang>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(LANGS)?;

        match table.get(locale)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// The language flagged as default, if any
    pub fn default_lang(&self) -> Result<Option<Lang>, DatabaseError> {
        Ok(self.list_langs()?.into_iter().find(|lang| lang.by_default))
    }

    /// All languages, in locale order
    pub fn list_langs(&self) -> Result<Vec<Lang>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(LANGS)?;

        let mut langs = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            langs.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(langs)
    }

    /// Delete a language by locale
    pub fn delete_lang(&self, locale: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(LANGS)?;
            let removed = table.remove(locale)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}

/// Swap the URL records owned by `(view, id)` for `urls`, keeping the view index in step.
fn replace_urls(
    write_txn: &WriteTransaction,
    view: View,
    id: u64,
    urls: &[RewritingUrl],
) -> Result<(), DatabaseError> {
    let key = entity_key(view, id);

    let previous: Vec<String> = {
        let index = write_txn.open_table(VIEW_URLS)?;
        let result = match index.get(key.as_str())? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => Vec::new(),
        };
        result
    };

    let mut urls_table = write_txn.open_table(REWRITING_URLS)?;
    for url in &previous {
        urls_table.remove(url.as_str())?;
    }

    let mut owned = Vec::with_capacity(urls.len());
    for record in urls {
        let data = rmp_serde::to_vec_named(record)?;
        urls_table.insert(record.url.as_str(), data.as_slice())?;
        owned.push(record.url.clone());
    }
    drop(urls_table);

    let mut index = write_txn.open_table(VIEW_URLS)?;
    if owned.is_empty() {
        index.remove(key.as_str())?;
    } else {
        let data = rmp_serde::to_vec_named(&owned)?;
        index.insert(key.as_str(), data.as_slice())?;
    }

    Ok(())
}
