use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One media item as listed by the catalog builder.
///
/// Only `display_name`, `length` and `description` feed the chapter pipeline; the
/// remaining columns are carried along untouched. Field aliases accept the column
/// names of the channel export (`Name`, `URL_Link`, `Length`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRecord {
    #[serde(alias = "Name")]
    pub display_name: String,

    #[serde(alias = "URL_Link", alias = "url")]
    pub url_or_id: String,

    /// Total length, `H:MM:SS`
    #[serde(alias = "Length")]
    pub length: String,

    #[serde(default, alias = "Description")]
    pub description: String,

    #[serde(default, alias = "Views")]
    pub views: Option<u64>,

    #[serde(default, alias = "Publish_date")]
    pub publish_date: Option<String>,

    #[serde(default, alias = "Keywords")]
    pub keywords: Vec<String>,

    #[serde(default, alias = "Author")]
    pub author: Option<String>,

    #[serde(default, alias = "ID")]
    pub id: Option<String>,
}

impl MediaRecord {
    pub fn new(
        display_name: impl Into<String>,
        url_or_id: impl Into<String>,
        length: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            url_or_id: url_or_id.into(),
            length: length.into(),
            description: description.into(),
            views: None,
            publish_date: None,
            keywords: Vec::new(),
            author: None,
            id: None,
        }
    }

    /// Key identifying the item in match results
    pub fn media_key(&self) -> &str {
        &self.url_or_id
    }
}

/// Load a catalog exported as a JSON array of records
pub async fn load_catalog(path: &Path) -> Result<Vec<MediaRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;

    let records: Vec<MediaRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))?;

    info!("📚 Loaded {} media records from {}", records.len(), path.display());
    Ok(records)
}
