//! Document and event records as exchanged with the archive store.
//!
//! Both kinds share the same soft-delete lifecycle: an active record is moved
//! to the trash (remembering when), from where it is either restored under its
//! original id or purged for good.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which archive table a lifecycle operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Document,
    Event,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a document or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Active,
    Trashed,
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Display name after duplicate resolution (no extension).
    #[serde(alias = "document_name")]
    pub name: String,
    /// Filename as it was selected by the user.
    #[serde(default)]
    pub original_filename: String,
    /// Institutional category, `None` when uncategorized.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub category_confidence: f32,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub award_type: Option<String>,
    /// OCR excerpt captured during upload.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "ocr_text", deserialize_with = "empty_as_none")]
    pub excerpt: Option<String>,
    #[serde(alias = "upload_date", deserialize_with = "flexible_datetime")]
    pub uploaded_at: DateTime<Utc>,
}

/// A stored calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
}

/// An entry in the trash, pointing back at the record it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub trash_id: String,
    pub kind: EntityKind,
    #[serde(deserialize_with = "string_or_number")]
    pub original_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub deleted_at: DateTime<Utc>,
}

/// Fields sent to the store when creating a document.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub original_filename: String,
    pub category: Option<String>,
    pub category_confidence: f32,
    pub award_type: Option<String>,
    pub excerpt: Option<String>,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl NewDocument {
    /// Lowercase extension of the original filename, or an empty string.
    pub fn file_type(&self) -> String {
        file_extension(&self.original_filename)
    }
}

/// Store answer to a successful create call.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedDocument {
    pub id: String,
    pub message: String,
}

/// Listing filters, mirroring the archive's listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFilter {
    pub page: u32,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Largest page size the listing endpoint hands out.
pub const MAX_PAGE_LIMIT: u32 = 100;

impl Default for DocumentFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
            category: None,
        }
    }
}

impl DocumentFilter {
    /// Page number and size clamped to what the store accepts.
    pub fn normalized(&self) -> (u32, u32) {
        (self.page.max(1), self.limit.clamp(1, MAX_PAGE_LIMIT))
    }

    /// Whether a document passes the search and category filters.
    pub fn matches(&self, doc: &DocumentRecord) -> bool {
        if let Some(ref category) = self.category {
            if !category.is_empty() && doc.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            if !needle.is_empty()
                && !doc.name.to_lowercase().contains(&needle)
                && !doc.original_filename.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64) as u32
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// One page of documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentPage {
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Archive statistics shown next to the listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total: u64,
    /// Documents uploaded in the last 30 days.
    pub recent: u64,
    #[serde(default)]
    pub by_category: BTreeMap<String, u64>,
}

/// Lowercase extension of a filename (`"Report.PDF"` -> `"pdf"`).
pub fn file_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Ids arrive as JSON numbers from some archive endpoints.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// RFC 3339, or the archive's `YYYY-MM-DD HH:MM:SS` (read as UTC).
fn flexible_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
