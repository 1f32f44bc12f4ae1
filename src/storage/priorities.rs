use chrono::Utc;
use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{entity_key, SitemapPriority, View};
use super::tables::*;

impl Database {
    // ========================================================================
    // Priority overrides
    // ========================================================================

    /// Get the priority override for one content item
    pub fn get_priority(
        &self,
        source: View,
        source_id: u64,
    ) -> Result<Option<SitemapPriority>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SITEMAP_PRIORITIES)?;

        match table.get(entity_key(source, source_id).as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Create or update the override for one content item.
    /// Returns false when the stored value already equals `value`.
    pub fn set_priority(
        &self,
        source: View,
        source_id: u64,
        value: &str,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let changed = upsert_priority(&write_txn, source, source_id, value)?;
        if changed {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(changed)
    }

    /// Remove the override for one content item
    pub fn delete_priority(&self, source: View, source_id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(SITEMAP_PRIORITIES)?;
            let removed = table.remove(entity_key(source, source_id).as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// All stored overrides
    pub fn get_all_priorities(&self) -> Result<Vec<SitemapPriority>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SITEMAP_PRIORITIES)?;

        let mut priorities = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            priorities.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(priorities)
    }

    // ========================================================================
    // Module settings
    // ========================================================================

    /// Read a raw module setting
    pub fn get_config_value(&self, name: &str) -> Result<Option<String>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(MODULE_CONFIG)?;
        Ok(table.get(name)?.map(|v| v.value().to_string()))
    }

    /// Write several module settings in one transaction
    pub fn set_config_values(&self, values: &[(&str, String)]) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(MODULE_CONFIG)?;
            for (name, value) in values {
                table.insert(*name, value.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Write the override for `(source, source_id)` inside `write_txn`.
/// Returns false, writing nothing, when the stored value already equals `value`.
pub(super) fn upsert_priority(
    write_txn: &WriteTransaction,
    source: View,
    source_id: u64,
    value: &str,
) -> Result<bool, DatabaseError> {
    let key = entity_key(source, source_id);
    let mut table = write_txn.open_table(SITEMAP_PRIORITIES)?;

    let existing: Option<SitemapPriority> = match table.get(key.as_str())? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };

    let now = Utc::now();
    let priority = match existing {
        Some(current) if current.value == value => return Ok(false),
        Some(current) => SitemapPriority {
            value: value.to_string(),
            updated_at: now,
            ..current
        },
        None => SitemapPriority {
            source,
            source_id,
            value: value.to_string(),
            created_at: now,
            updated_at: now,
        },
    };

    let data = rmp_serde::to_vec_named(&priority)?;
    table.insert(key.as_str(), data.as_slice())?;
    Ok(true)
}
