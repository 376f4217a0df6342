//! Client for the archive's action-style JSON API.
//!
//! Every endpoint takes `?action=...` and answers with an envelope of the
//! form `{ "success": bool, "message": "...", ...payload }`. Documents are
//! served by `documents.php`; the event trash lives behind
//! `enhanced_management.php` with its own action names.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{DocumentStore, StoreError, StoreResult};
use crate::models::{
    CreatedDocument, DocumentFilter, DocumentPage, DocumentRecord, DocumentStats, EntityKind,
    NewDocument, Pagination, TrashEntry,
};

/// Script serving document uploads, listings and stats.
const DOCUMENTS: &str = "documents.php";

/// Request timeout for archive calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// [`DocumentStore`] backed by the archive server.
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
}

/// Older and newer servers name the same counters differently, and some
/// send both spellings side by side.
#[derive(Debug, Deserialize)]
struct WirePagination {
    #[serde(default)]
    total_documents: Option<u64>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    current_page: Option<u32>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
}

impl WirePagination {
    fn into_pagination(self, page: u32, limit: u32) -> Pagination {
        Pagination::new(
            self.current_page.or(self.page).unwrap_or(page),
            self.limit.unwrap_or(limit),
            self.total_documents.or(self.total).unwrap_or(0),
        )
    }
}

#[derive(Debug, Deserialize)]
struct WireStats {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    total_documents: Option<u64>,
    #[serde(default)]
    recent: u64,
    #[serde(default)]
    by_category: BTreeMap<String, u64>,
}

impl From<WireStats> for DocumentStats {
    fn from(stats: WireStats) -> Self {
        DocumentStats {
            total: stats.total.or(stats.total_documents).unwrap_or(0),
            recent: stats.recent,
            by_category: stats.by_category,
        }
    }
}

/// Lifecycle operations that need per-kind routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrashOp {
    Delete,
    List,
    Restore,
    Purge,
}

/// Where a lifecycle call goes and which form field carries its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Route {
    script: &'static str,
    action: &'static str,
    id_param: &'static str,
}

fn route(kind: EntityKind, op: TrashOp) -> Route {
    let (script, action, id_param) = match (kind, op) {
        (EntityKind::Document, TrashOp::Delete) => ("documents.php", "delete", "id"),
        (EntityKind::Document, TrashOp::List) => ("documents.php", "get_trash", ""),
        (EntityKind::Document, TrashOp::Restore) => ("documents.php", "restore", "trash_id"),
        (EntityKind::Document, TrashOp::Purge) => {
            ("documents.php", "permanent_delete", "trash_id")
        }
        (EntityKind::Event, TrashOp::Delete) => {
            ("enhanced_management.php", "delete_event", "event_id")
        }
        (EntityKind::Event, TrashOp::List) => ("enhanced_management.php", "get_trash_events", ""),
        (EntityKind::Event, TrashOp::Restore) => {
            ("enhanced_management.php", "restore_event", "trash_id")
        }
        (EntityKind::Event, TrashOp::Purge) => {
            ("enhanced_management.php", "permanently_delete_event", "trash_id")
        }
    };
    Route {
        script,
        action,
        id_param,
    }
}

/// Keys a trash listing may arrive under.
fn trash_keys(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Document => &["trash", "items", "documents"],
        EntityKind::Event => &["trash_events", "trash", "events"],
    }
}

/// Pull the trash rows out of a listing envelope.
fn parse_trash(value: &Value, kind: EntityKind) -> StoreResult<Vec<TrashEntry>> {
    let keys = trash_keys(kind);
    let items = keys
        .iter()
        .find_map(|key| value.get(*key))
        .cloned()
        .ok_or_else(|| {
            StoreError::InvalidResponse(format!("trash listing has none of {:?}", keys))
        })?;
    let items: Vec<WireTrashItem> =
        serde_json::from_value(items).map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
    Ok(items.into_iter().map(|i| i.into_entry(kind)).collect())
}

/// Trash rows as the archive returns them; ids may be numbers.
#[derive(Debug, Deserialize)]
struct WireTrashItem {
    #[serde(alias = "trash_id")]
    id: Value,
    #[serde(default)]
    original_id: Option<Value>,
    #[serde(default, alias = "document_name", alias = "title")]
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    deleted_at: Option<String>,
}

impl WireTrashItem {
    fn into_entry(self, kind: EntityKind) -> TrashEntry {
        let trash_id = id_string(&self.id);
        let original_id = self
            .original_id
            .as_ref()
            .map(id_string)
            .unwrap_or_else(|| trash_id.clone());
        let deleted_at = self
            .deleted_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        TrashEntry {
            trash_id,
            kind,
            original_id,
            name: self.name,
            category: self.category.filter(|c| !c.trim().is_empty()),
            deleted_at,
        }
    }
}

impl HttpDocumentStore {
    /// Create a client for the archive API rooted at `base_url`
    /// (e.g. `http://localhost/LILAC/api`).
    pub fn new(base_url: &str) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("lilac/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, script: &str) -> String {
        format!("{}/{}", self.base_url, script)
    }

    fn get(&self, script: &str, action: &str) -> RequestBuilder {
        self.client
            .get(self.endpoint(script))
            .query(&[("action", action)])
    }

    fn post(&self, script: &str, action: &str) -> RequestBuilder {
        self.client
            .post(self.endpoint(script))
            .query(&[("action", action)])
    }

    /// POST a lifecycle action carrying a single id.
    async fn lifecycle_call(
        &self,
        kind: EntityKind,
        op: TrashOp,
        id: &str,
        fallback: &str,
    ) -> StoreResult<String> {
        let route = route(kind, op);
        let request = self
            .post(route.script, route.action)
            .form(&[(route.id_param, id)]);
        self.call_for_message(request, fallback).await
    }

    /// Send a request and unwrap the `{ success, message }` envelope.
    async fn call(&self, request: RequestBuilder) -> StoreResult<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                StoreError::InvalidResponse(format!("{} ({})", e, truncate(&body)))
            } else {
                StoreError::Transport(format!("HTTP {}", status))
            }
        })?;

        if value.get("success").and_then(Value::as_bool) != Some(true) {
            let message = message_of(&value).unwrap_or_else(|| format!("HTTP {}", status));
            return Err(StoreError::Rejected(message));
        }
        Ok(value)
    }

    /// Lifecycle actions answer with just a message.
    async fn call_for_message(&self, request: RequestBuilder, fallback: &str) -> StoreResult<String> {
        let value = self.call(request).await?;
        Ok(message_of(&value).unwrap_or_else(|| fallback.to_string()))
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn list_categories(&self) -> StoreResult<Vec<String>> {
        let value = self
            .call(self.get(DOCUMENTS, "get_categories"))
            .await?;
        let categories: Vec<Option<String>> = field(&value, "categories")?;
        Ok(categories
            .into_iter()
            .flatten()
            .filter(|c| !c.trim().is_empty())
            .collect())
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> StoreResult<DocumentPage> {
        let (page, limit) = filter.normalized();
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(ref search) = filter.search {
            query.push(("search", search.clone()));
        }
        if let Some(ref category) = filter.category {
            query.push(("category", category.clone()));
        }

        let value = self
            .call(self.get(DOCUMENTS, "get_all").query(&query))
            .await?;
        let documents: Vec<DocumentRecord> = field(&value, "documents")?;
        let pagination = match value.get("pagination") {
            Some(raw) => {
                let wire: WirePagination = serde_json::from_value(raw.clone())
                    .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
                wire.into_pagination(page, limit)
            }
            None => Pagination::new(page, limit, documents.len() as u64),
        };

        Ok(DocumentPage {
            documents,
            pagination,
        })
    }

    async fn create_document(&self, document: NewDocument) -> StoreResult<CreatedDocument> {
        let part = Part::bytes(document.bytes)
            .file_name(document.original_filename.clone())
            .mime_str(&document.mime_type)?;

        let mut form = Form::new()
            .part("file", part)
            .text("document_name", document.name.clone())
            .text("category", document.category.clone().unwrap_or_default())
            .text(
                "category_confidence",
                document.category_confidence.to_string(),
            );
        if let Some(award_type) = document.award_type {
            form = form.text("award_type", award_type);
        }
        if let Some(excerpt) = document.excerpt {
            form = form.text("ocr_text", excerpt);
        }

        debug!("Submitting '{}' to {}", document.name, self.base_url);
        let value = self
            .call(self.post(DOCUMENTS, "add").multipart(form))
            .await?;

        let id = value
            .get("document")
            .and_then(|d| d.get("id"))
            .or_else(|| value.get("id"))
            .map(id_string)
            .ok_or_else(|| StoreError::InvalidResponse("missing document id".to_string()))?;

        Ok(CreatedDocument {
            id,
            message: message_of(&value).unwrap_or_else(|| "Document added".to_string()),
        })
    }

    async fn get_stats(&self) -> StoreResult<DocumentStats> {
        let value = self.call(self.get(DOCUMENTS, "get_stats")).await?;
        let stats: WireStats = field(&value, "stats")?;
        Ok(stats.into())
    }

    async fn trash(&self, kind: EntityKind, id: &str) -> StoreResult<String> {
        self.lifecycle_call(kind, TrashOp::Delete, id, "Moved to trash")
            .await
    }

    async fn restore(&self, kind: EntityKind, trash_id: &str) -> StoreResult<String> {
        self.lifecycle_call(kind, TrashOp::Restore, trash_id, "Restored")
            .await
    }

    async fn purge(&self, kind: EntityKind, trash_id: &str) -> StoreResult<String> {
        self.lifecycle_call(kind, TrashOp::Purge, trash_id, "Permanently deleted")
            .await
    }

    async fn list_trash(&self, kind: EntityKind) -> StoreResult<Vec<TrashEntry>> {
        let route = route(kind, TrashOp::List);
        let value = self.call(self.get(route.script, route.action)).await?;
        parse_trash(&value, kind)
    }
}

fn field<T: DeserializeOwned>(value: &Value, key: &str) -> StoreResult<T> {
    let raw = value
        .get(key)
        .cloned()
        .ok_or_else(|| StoreError::InvalidResponse(format!("missing '{}'", key)))?;
    serde_json::from_value(raw).map_err(|e| StoreError::InvalidResponse(format!("{}: {}", key, e)))
}

fn message_of(value: &Value) -> Option<String> {
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_joins_base_url() {
        let store = HttpDocumentStore::new("http://localhost/LILAC/api/").unwrap();
        assert_eq!(store.base_url(), "http://localhost/LILAC/api");
        assert_eq!(
            store.endpoint(DOCUMENTS),
            "http://localhost/LILAC/api/documents.php"
        );
    }

    #[test]
    fn test_event_lifecycle_routes_to_management_script() {
        let delete = route(EntityKind::Event, TrashOp::Delete);
        assert_eq!(delete.script, "enhanced_management.php");
        assert_eq!(delete.action, "delete_event");
        assert_eq!(delete.id_param, "event_id");

        assert_eq!(
            route(EntityKind::Event, TrashOp::List).action,
            "get_trash_events"
        );
        let restore = route(EntityKind::Event, TrashOp::Restore);
        assert_eq!(restore.action, "restore_event");
        assert_eq!(restore.id_param, "trash_id");
        let purge = route(EntityKind::Event, TrashOp::Purge);
        assert_eq!(purge.action, "permanently_delete_event");
        assert_eq!(purge.id_param, "trash_id");

        let doc_delete = route(EntityKind::Document, TrashOp::Delete);
        assert_eq!(doc_delete.script, DOCUMENTS);
        assert_eq!(doc_delete.id_param, "id");
    }

    #[test]
    fn test_event_trash_is_read_from_trash_events() {
        let value = json!({
            "success": true,
            "trash_events": [
                { "id": 3, "original_id": 9, "title": "Foundation Day", "deleted_at": "2024-05-02 08:30:00" }
            ]
        });
        let entries = parse_trash(&value, EntityKind::Event).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].trash_id, "3");
        assert_eq!(entries[0].original_id, "9");
        assert_eq!(entries[0].kind, EntityKind::Event);
    }

    #[test]
    fn test_trash_listing_without_list_key_is_invalid() {
        let value = json!({ "success": true, "message": "ok" });
        let err = parse_trash(&value, EntityKind::Document).unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
        let err = parse_trash(&value, EntityKind::Event).unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
    }

    #[test]
    fn test_stats_with_both_total_spellings() {
        let stats: WireStats = serde_json::from_value(json!({
            "total_documents": 12,
            "total": 12,
            "recent": 3,
            "month": 1,
            "total_size": 99
        }))
        .unwrap();
        let stats = DocumentStats::from(stats);
        assert_eq!(stats.total, 12);
        assert_eq!(stats.recent, 3);
        assert!(stats.by_category.is_empty());

        let only_legacy: WireStats =
            serde_json::from_value(json!({ "total_documents": 7 })).unwrap();
        assert_eq!(DocumentStats::from(only_legacy).total, 7);
    }

    #[test]
    fn test_pagination_with_both_spellings() {
        let wire: WirePagination = serde_json::from_value(json!({
            "total_documents": 41,
            "total": 41,
            "current_page": 3,
            "page": 3,
            "limit": 20,
            "total_pages": 3
        }))
        .unwrap();
        let pagination = wire.into_pagination(1, 10);
        assert_eq!(pagination.page, 3);
        assert_eq!(pagination.limit, 20);
        assert_eq!(pagination.total, 41);
    }

    #[test]
    fn test_trash_item_with_numeric_ids() {
        let item: WireTrashItem = serde_json::from_value(json!({
            "id": 12,
            "original_id": 4,
            "title": "Research Seminar",
            "deleted_at": "2024-03-01T10:00:00+08:00"
        }))
        .unwrap();
        let entry = item.into_entry(EntityKind::Event);
        assert_eq!(entry.trash_id, "12");
        assert_eq!(entry.original_id, "4");
        assert_eq!(entry.name, "Research Seminar");
        assert_eq!(entry.category, None);
    }

    #[test]
    fn test_message_falls_back_to_error_key() {
        let value = json!({ "success": false, "error": "Database error" });
        assert_eq!(message_of(&value).as_deref(), Some("Database error"));
    }

    #[test]
    fn test_sql_timestamp() {
        let ts = parse_timestamp("2024-01-31 23:59:59").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-31T23:59:59+00:00");
    }
}
