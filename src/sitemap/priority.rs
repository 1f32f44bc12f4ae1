use std::collections::HashMap;

use crate::settings::SitemapSettings;
use crate::storage::models::{SitemapPriority, View};
use crate::storage::{Database, DatabaseError};

/// Effective priority of one content item: its override when set, else the type default.
pub fn resolve_priority(
    db: &Database,
    settings: &SitemapSettings,
    view: View,
    id: u64,
) -> Result<String, DatabaseError> {
    let stored = db.get_priority(view, id)?;
    Ok(pick(stored.as_ref().map(|p| p.value.as_str()), settings.default_priority(view)).to_string())
}

/// Resolves priorities for a whole document from one snapshot of the overrides.
pub struct PriorityResolver<'a> {
    overrides: HashMap<(View, u64), String>,
    settings: &'a SitemapSettings,
}

impl<'a> PriorityResolver<'a> {
    pub fn load(db: &Database, settings: &'a SitemapSettings) -> Result<Self, DatabaseError> {
        let overrides = db
            .get_all_priorities()?
            .into_iter()
            .map(|SitemapPriority { source, source_id, value, .. }| ((source, source_id), value))
            .collect();
        Ok(Self { overrides, settings })
    }

    pub fn resolve(&self, view: View, id: u64) -> &str {
        pick(
            self.overrides.get(&(view, id)).map(String::as_str),
            self.settings.default_priority(view),
        )
    }
}

fn pick<'v>(stored: Option<&'v str>, default: &'v str) -> &'v str {
    match stored.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => default,
    }
}
