use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};

use super::tables::{BRANDS, CATEGORIES, CONTENTS, FOLDERS, PRODUCTS};

/// Content type tag used to discriminate URL records and priority overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Brand,
    Category,
    Content,
    Folder,
    Product,
}

impl View {
    /// Order in which views appear in the generated sitemap.
    pub const SITEMAP_ORDER: [View; 5] = [
        View::Category,
        View::Product,
        View::Folder,
        View::Content,
        View::Brand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Brand => "brand",
            View::Category => "category",
            View::Content => "content",
            View::Folder => "folder",
            View::Product => "product",
        }
    }

    pub(crate) fn table(&self) -> TableDefinition<'static, u64, &'static [u8]> {
        match self {
            View::Brand => BRANDS,
            View::Category => CATEGORIES,
            View::Content => CONTENTS,
            View::Folder => FOLDERS,
            View::Product => PRODUCTS,
        }
    }

    /// Views whose entities reference this view's entities in their `parent_ids`.
    /// Only categories and folders can be "empty".
    pub fn child_views(&self) -> &'static [View] {
        match self {
            View::Category => &[View::Category, View::Product],
            View::Folder => &[View::Folder, View::Content],
            _ => &[],
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownView(pub String);

impl fmt::Display for UnknownView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown view '{}'", self.0)
    }
}

impl std::error::Error for UnknownView {}

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brand" => Ok(View::Brand),
            "category" => Ok(View::Category),
            "content" => Ok(View::Content),
            "folder" => Ok(View::Folder),
            "product" => Ok(View::Product),
            other => Err(UnknownView(other.to_string())),
        }
    }
}

/// A canonical front-end path for one entity in one locale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewritingUrl {
    pub url: String,
    pub view: View,
    pub view_id: u64,
    pub view_locale: String,
    /// Set when the url now redirects to a newer one; such urls are never listed.
    #[serde(default)]
    pub redirected: bool,
}

/// An image attached to a catalog entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityImage {
    pub file: String,
    pub position: u32,
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

/// The slice of a host content record the sitemap needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntity {
    pub id: u64,
    pub visible: bool,
    pub updated_at: DateTime<Utc>,
    /// Parent category/folder for categories and folders, owning
    /// categories/folders for products and contents.
    #[serde(default)]
    pub parent_ids: Vec<u64>,
    /// locale -> title
    #[serde(default)]
    pub titles: BTreeMap<String, String>,
    #[serde(default)]
    pub images: Vec<EntityImage>,
}

impl CatalogEntity {
    /// First visible image by ascending position.
    pub fn first_image(&self) -> Option<&EntityImage> {
        self.images
            .iter()
            .filter(|image| image.visible)
            .min_by_key(|image| image.position)
    }
}

/// A storefront language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lang {
    pub locale: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub by_default: bool,
}

/// A per-item priority override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapPriority {
    pub source: View,
    pub source_id: u64,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn entity_key(view: View, id: u64) -> String {
    format!("{view}:{id}")
}
