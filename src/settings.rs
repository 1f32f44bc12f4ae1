//! Module settings persisted in the service database.
//!
//! Settings are stored as raw strings under their form field names, the way the
//! admin form submits them. [`SitemapSettings::load`] reads them leniently (a
//! missing or unreadable value falls back to its default), while
//! [`SettingsForm::validate`] is strict: one bad field rejects the whole
//! submission and nothing is saved.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::storage::models::View;
use crate::storage::{Database, DatabaseError};

pub const DEFAULT_PRIORITY_HOME_VALUE: &str = "1";
pub const DEFAULT_PRIORITY_BRAND_VALUE: &str = "0.6";
pub const DEFAULT_PRIORITY_CATEGORY_VALUE: &str = "0.9";
pub const DEFAULT_PRIORITY_PRODUCT_VALUE: &str = "0.8";
pub const DEFAULT_PRIORITY_FOLDER_VALUE: &str = "0.6";
pub const DEFAULT_FREQUENCY_UPDATE: &str = "weekly";
pub const DEFAULT_SITEMAP_TTL: u64 = 7200;
pub const DEFAULT_IMAGE_TIMEOUT: u64 = 30;
pub const DEFAULT_IMAGE_QUALITY: u8 = 75;

pub const CHANGE_FREQUENCIES: [&str; 7] = [
    "always", "hourly", "daily", "weekly", "monthly", "yearly", "never",
];

/// How generated images are fitted to the configured width and height.
/// Persisted as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Keep the ratio, pad with the background color
    Borders,
    /// Keep the ratio, crop the overflow
    Crop,
    /// Keep the source ratio, no exact size
    None,
}

impl ResizeMode {
    pub fn code(&self) -> u8 {
        match self {
            ResizeMode::Borders => 1,
            ResizeMode::Crop => 2,
            ResizeMode::None => 3,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(ResizeMode::Borders),
            "2" => Some(ResizeMode::Crop),
            "3" => Some(ResizeMode::None),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResizeMode::Borders => "borders",
            ResizeMode::Crop => "crop",
            ResizeMode::None => "none",
        }
    }
}

/// Typed view of the module settings
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapSettings {
    /// Seconds allowed for image sitemap generation
    pub timeout: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: u8,
    pub rotation: i32,
    pub resize_mode: ResizeMode,
    pub background_color: Option<String>,
    pub allow_zoom: bool,
    pub exclude_empty_category: bool,
    pub exclude_empty_folder: bool,
    pub default_priority_homepage_value: String,
    pub default_priority_brand_value: String,
    pub default_priority_category_value: String,
    pub default_priority_product_value: String,
    pub default_priority_folder_value: String,
    pub default_update_frequency: String,
    /// Seconds a rendered sitemap stays cached
    pub sitemap_ttl: u64,
}

impl Default for SitemapSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_IMAGE_TIMEOUT,
            width: None,
            height: None,
            quality: DEFAULT_IMAGE_QUALITY,
            rotation: 0,
            resize_mode: ResizeMode::Borders,
            background_color: None,
            allow_zoom: false,
            exclude_empty_category: false,
            exclude_empty_folder: false,
            default_priority_homepage_value: DEFAULT_PRIORITY_HOME_VALUE.to_string(),
            default_priority_brand_value: DEFAULT_PRIORITY_BRAND_VALUE.to_string(),
            default_priority_category_value: DEFAULT_PRIORITY_CATEGORY_VALUE.to_string(),
            default_priority_product_value: DEFAULT_PRIORITY_PRODUCT_VALUE.to_string(),
            default_priority_folder_value: DEFAULT_PRIORITY_FOLDER_VALUE.to_string(),
            default_update_frequency: DEFAULT_FREQUENCY_UPDATE.to_string(),
            sitemap_ttl: DEFAULT_SITEMAP_TTL,
        }
    }
}

impl SitemapSettings {
    /// Read the settings from the database, falling back to defaults per field.
    pub fn load(db: &Database) -> Result<Self, DatabaseError> {
        let defaults = Self::default();
        let read = |name: &str| -> Result<Option<String>, DatabaseError> {
            Ok(db
                .get_config_value(name)?
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()))
        };

        Ok(Self {
            timeout: read("timeout")?
                .and_then(|v| v.parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(defaults.timeout),
            width: read("width")?.and_then(|v| v.parse().ok()),
            height: read("height")?.and_then(|v| v.parse().ok()),
            quality: read("quality")?
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.quality),
            rotation: read("rotation")?
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rotation),
            resize_mode: read("resize_mode")?
                .and_then(|v| ResizeMode::from_code(&v))
                .unwrap_or(defaults.resize_mode),
            background_color: read("background_color")?,
            allow_zoom: read("allow_zoom")?
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.allow_zoom),
            exclude_empty_category: read("exclude_empty_category")?
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.exclude_empty_category),
            exclude_empty_folder: read("exclude_empty_folder")?
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.exclude_empty_folder),
            default_priority_homepage_value: read("default_priority_homepage_value")?
                .unwrap_or(defaults.default_priority_homepage_value),
            default_priority_brand_value: read("default_priority_brand_value")?
                .unwrap_or(defaults.default_priority_brand_value),
            default_priority_category_value: read("default_priority_category_value")?
                .unwrap_or(defaults.default_priority_category_value),
            default_priority_product_value: read("default_priority_product_value")?
                .unwrap_or(defaults.default_priority_product_value),
            default_priority_folder_value: read("default_priority_folder_value")?
                .unwrap_or(defaults.default_priority_folder_value),
            default_update_frequency: read("default_update_frequency")?
                .unwrap_or(defaults.default_update_frequency),
            // Zero or garbage means "use the default", never "do not cache"
            sitemap_ttl: read("sitemap_ttl")?
                .and_then(|v| v.parse().ok())
                .filter(|ttl| *ttl > 0)
                .unwrap_or(defaults.sitemap_ttl),
        })
    }

    /// Default priority for entries of `view`. Contents share the folder default.
    pub fn default_priority(&self, view: View) -> &str {
        match view {
            View::Brand => &self.default_priority_brand_value,
            View::Category => &self.default_priority_category_value,
            View::Product => &self.default_priority_product_value,
            View::Folder | View::Content => &self.default_priority_folder_value,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.sitemap_ttl)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

// ============================================================================
// Admin form
// ============================================================================

/// The admin configuration form. Every field is a text input; numbers and
/// booleans sent as JSON scalars are accepted and read as their text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsForm {
    #[serde(default, deserialize_with = "text_field")]
    pub timeout: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub width: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub quality: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub rotation: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub resize_mode: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub background_color: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub allow_zoom: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub exclude_empty_category: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub exclude_empty_folder: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub default_priority_homepage_value: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub default_priority_brand_value: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub default_priority_category_value: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub default_priority_product_value: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub default_priority_folder_value: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub default_update_frequency: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub sitemap_ttl: Option<String>,
}

/// A validation message attached to one form field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl SettingsForm {
    /// Pre-fill the form from the current settings.
    pub fn from_settings(settings: &SitemapSettings) -> Self {
        let flag = |b: bool| Some(if b { "1" } else { "0" }.to_string());
        Self {
            timeout: Some(settings.timeout.to_string()),
            width: settings.width.map(|w| w.to_string()),
            height: settings.height.map(|h| h.to_string()),
            quality: Some(settings.quality.to_string()),
            rotation: Some(settings.rotation.to_string()),
            resize_mode: Some(settings.resize_mode.name().to_string()),
            background_color: settings.background_color.clone(),
            allow_zoom: flag(settings.allow_zoom),
            exclude_empty_category: flag(settings.exclude_empty_category),
            exclude_empty_folder: flag(settings.exclude_empty_folder),
            default_priority_homepage_value: Some(settings.default_priority_homepage_value.clone()),
            default_priority_brand_value: Some(settings.default_priority_brand_value.clone()),
            default_priority_category_value: Some(settings.default_priority_category_value.clone()),
            default_priority_product_value: Some(settings.default_priority_product_value.clone()),
            default_priority_folder_value: Some(settings.default_priority_folder_value.clone()),
            default_update_frequency: Some(settings.default_update_frequency.clone()),
            sitemap_ttl: Some(settings.sitemap_ttl.to_string()),
        }
    }

    /// Check every field and return the `(name, value)` pairs to persist.
    /// All problems are reported together.
    pub fn validate(&self) -> Result<Vec<(&'static str, String)>, Vec<FieldError>> {
        let mut values: Vec<(&'static str, String)> = Vec::new();
        let mut errors = Vec::new();

        let mut check = |field: &'static str,
                         raw: &Option<String>,
                         rule: fn(&str) -> Result<String, String>| {
            let raw = raw.as_deref().map(str::trim).unwrap_or_default();
            if raw.is_empty() {
                values.push((field, String::new()));
                return;
            }
            match rule(raw) {
                Ok(value) => values.push((field, value)),
                Err(message) => errors.push(FieldError::new(field, message)),
            }
        };

        check("timeout", &self.timeout, positive_integer);
        check("width", &self.width, positive_integer);
        check("height", &self.height, positive_integer);
        check("quality", &self.quality, |v| match v.parse::<u8>() {
            Ok(q) if q <= 100 => Ok(q.to_string()),
            _ => Err("must be an integer between 0 and 100".to_string()),
        });
        check("rotation", &self.rotation, |v| match v.parse::<i32>() {
            Ok(r) if (-360..=360).contains(&r) => Ok(r.to_string()),
            _ => Err("must be an integer between -360 and 360".to_string()),
        });
        check("resize_mode", &self.resize_mode, |v| {
            let mode = match v {
                "borders" => ResizeMode::Borders,
                "crop" => ResizeMode::Crop,
                "none" => ResizeMode::None,
                _ => return Err("must be one of borders, crop, none".to_string()),
            };
            Ok(mode.code().to_string())
        });
        check("background_color", &self.background_color, |v| {
            let hex = v.strip_prefix('#').unwrap_or(v);
            if matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                Ok(format!("#{}", hex.to_ascii_lowercase()))
            } else {
                Err("must be a hexadecimal color such as #ffffff".to_string())
            }
        });
        check("allow_zoom", &self.allow_zoom, flag_value);
        check("exclude_empty_category", &self.exclude_empty_category, flag_value);
        check("exclude_empty_folder", &self.exclude_empty_folder, flag_value);
        check(
            "default_priority_homepage_value",
            &self.default_priority_homepage_value,
            parse_priority,
        );
        check(
            "default_priority_brand_value",
            &self.default_priority_brand_value,
            parse_priority,
        );
        check(
            "default_priority_category_value",
            &self.default_priority_category_value,
            parse_priority,
        );
        check(
            "default_priority_product_value",
            &self.default_priority_product_value,
            parse_priority,
        );
        check(
            "default_priority_folder_value",
            &self.default_priority_folder_value,
            parse_priority,
        );
        check(
            "default_update_frequency",
            &self.default_update_frequency,
            |v| {
                let lower = v.to_ascii_lowercase();
                if CHANGE_FREQUENCIES.contains(&lower.as_str()) {
                    Ok(lower)
                } else {
                    Err(format!("must be one of {}", CHANGE_FREQUENCIES.join(", ")))
                }
            },
        );
        check("sitemap_ttl", &self.sitemap_ttl, positive_integer);

        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }
}

/// Validate and persist a submitted form. Nothing is written if any field is invalid.
pub fn save_form(db: &Database, form: &SettingsForm) -> Result<SaveOutcome, DatabaseError> {
    match form.validate() {
        Ok(values) => {
            db.set_config_values(&values)?;
            Ok(SaveOutcome::Saved(SitemapSettings::load(db)?))
        }
        Err(errors) => Ok(SaveOutcome::Invalid(errors)),
    }
}

#[derive(Debug)]
pub enum SaveOutcome {
    Saved(SitemapSettings),
    Invalid(Vec<FieldError>),
}

/// Check a sitemap priority: a plain decimal between 0 and 1. Returns the trimmed text.
/// Signs, exponents and special values are rejected since the text is written out as-is.
pub fn parse_priority(value: &str) -> Result<String, String> {
    let value = value.trim();
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let plain = !(whole.is_empty() && fraction.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit());

    match value.parse::<f64>() {
        Ok(p) if plain && (0.0..=1.0).contains(&p) => Ok(value.to_string()),
        _ => Err("must be a decimal number between 0 and 1".to_string()),
    }
}

fn positive_integer(value: &str) -> Result<String, String> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n.to_string()),
        _ => Err("must be a positive integer".to_string()),
    }
}

fn flag_value(value: &str) -> Result<String, String> {
    parse_flag(value)
        .map(|b| if b { "1" } else { "0" }.to_string())
        .ok_or_else(|| "must be true or false".to_string())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Accept a string, number or boolean and keep its text; `null` reads as absent.
pub(crate) fn text_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected text, got {other}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_priority_bounds() {
        assert_eq!(parse_priority(" 0.8 ").unwrap(), "0.8");
        assert_eq!(parse_priority("1").unwrap(), "1");
        assert_eq!(parse_priority("0").unwrap(), "0");
        assert!(parse_priority("1.5").is_err());
        assert!(parse_priority("-0.1").is_err());
        assert!(parse_priority("high").is_err());
        assert_eq!(parse_priority(".5").unwrap(), ".5");
        assert!(parse_priority("1e-1").is_err());
        assert!(parse_priority("+0.5").is_err());
        assert!(parse_priority("0.5.1").is_err());
        assert!(parse_priority(".").is_err());
        assert!(parse_priority("NaN").is_err());
        assert!(parse_priority("inf").is_err());
    }

    #[test]
    fn test_validate_reports_every_bad_field() {
        let form = SettingsForm {
            quality: Some("150".to_string()),
            default_priority_product_value: Some("2".to_string()),
            default_update_frequency: Some("sometimes".to_string()),
            ..Default::default()
        };

        let errors = form.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "quality",
                "default_priority_product_value",
                "default_update_frequency"
            ]
        );
    }

    #[test]
    fn test_validate_normalizes_values() {
        let form = SettingsForm {
            resize_mode: Some("crop".to_string()),
            allow_zoom: Some("true".to_string()),
            background_color: Some("FFF".to_string()),
            default_update_frequency: Some("Daily".to_string()),
            ..Default::default()
        };

        let values = form.validate().unwrap();
        let get = |name: &str| {
            values
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(get("resize_mode"), Some("2"));
        assert_eq!(get("allow_zoom"), Some("1"));
        assert_eq!(get("background_color"), Some("#fff"));
        assert_eq!(get("default_update_frequency"), Some("daily"));
        assert_eq!(get("width"), Some(""));
    }

    #[test]
    fn test_form_accepts_json_scalars() {
        let form: SettingsForm =
            serde_json::from_str(r#"{"width": 560, "allow_zoom": false, "height": null}"#)
                .unwrap();
        assert_eq!(form.width.as_deref(), Some("560"));
        assert_eq!(form.allow_zoom.as_deref(), Some("false"));
        assert_eq!(form.height, None);
    }

    #[test]
    fn test_content_shares_folder_default() {
        let settings = SitemapSettings {
            default_priority_folder_value: "0.3".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.default_priority(View::Content), "0.3");
        assert_eq!(settings.default_priority(View::Folder), "0.3");
        assert_eq!(settings.default_priority(View::Product), "0.8");
    }
}
