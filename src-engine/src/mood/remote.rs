//! Remote table store abstraction
//!
//! A minimal table API (insert a JSON record, select with a filter and an
//! ordering) that every backend implements. `MoodHistoryStore` is the only
//! caller; it maps rows to typed records and backend errors to
//! `MindhubError`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Remote tables used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    MoodLogs,
    CommunityPosts,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::MoodLogs => "mood_logs",
            Table::CommunityPosts => "community_posts",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open `[start, end)` interval on `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at < self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub session_id: Option<String>,
    pub created_at: Option<TimeRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A select against one table, always ordered by `created_at`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: Table,
    pub filter: Filter,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl Select {
    pub fn new(table: Table, order: SortOrder) -> Self {
        Self {
            table,
            filter: Filter::default(),
            order,
            limit: None,
        }
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.filter.session_id = Some(session_id.into());
        self
    }

    pub fn within(mut self, range: TimeRange) -> Self {
        self.filter.created_at = Some(range);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Backend contract shared by the in-memory, file and HTTP stores
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Insert one record, returning the row as stored (with its `id`)
    async fn insert(&self, table: Table, record: Value) -> Result<Value, RemoteError>;

    async fn select(&self, query: &Select) -> Result<Vec<Value>, RemoteError>;
}

/// Parse a row's `created_at` column
pub fn row_created_at(row: &Value) -> Option<DateTime<Utc>> {
    row.get("created_at")?
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Assign an `id` to a record that lacks one, as a database would
pub fn with_row_id(mut record: Value) -> Value {
    if let Value::Object(ref mut map) = record {
        if !map.contains_key("id") {
            map.insert(
                "id".to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
    }
    record
}

/// Evaluate a select over rows held locally
pub fn apply_select(rows: impl IntoIterator<Item = Value>, query: &Select) -> Vec<Value> {
    let mut matched: Vec<(Option<DateTime<Utc>>, Value)> = rows
        .into_iter()
        .filter(|row| match &query.filter.session_id {
            Some(id) => row.get("session_id").and_then(Value::as_str) == Some(id.as_str()),
            None => true,
        })
        .map(|row| (row_created_at(&row), row))
        .filter(|(created_at, _)| match (&query.filter.created_at, created_at) {
            (Some(range), Some(at)) => range.contains(at),
            (Some(_), None) => false,
            (None, _) => true,
        })
        .collect();

    // Stable sort keeps insertion order for equal timestamps
    matched.sort_by(|a, b| a.0.cmp(&b.0));
    if query.order == SortOrder::Descending {
        matched.reverse();
    }

    let limit = query.limit.unwrap_or(usize::MAX);
    matched.into_iter().take(limit).map(|(_, row)| row).collect()
}

/// Process-local store, for tests and for running without a backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Table, Vec<Value>>>, RemoteError> {
        self.tables
            .lock()
            .map_err(|e| RemoteError::Unavailable(format!("memory store poisoned: {}", e)))
    }

    /// Number of rows in a table
    pub fn len(&self, table: Table) -> usize {
        self.lock()
            .map(|tables| tables.get(&table).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl RemoteStore for MemoryStore {
    async fn insert(&self, table: Table, record: Value) -> Result<Value, RemoteError> {
        let row = with_row_id(record);
        self.lock()?.entry(table).or_default().push(row.clone());
        Ok(row)
    }

    async fn select(&self, query: &Select) -> Result<Vec<Value>, RemoteError> {
        let rows = self.lock()?.get(&query.table).cloned().unwrap_or_default();
        Ok(apply_select(rows, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn row(session: &str, hour: u32, score: u8) -> Value {
        json!({
            "session_id": session,
            "mood_score": score,
            "created_at": at(hour).to_rfc3339(),
        })
    }

    #[test]
    fn test_apply_select_filters_and_orders() {
        let rows = vec![row("a", 9, 3), row("b", 8, 1), row("a", 7, 5), row("a", 11, 2)];

        let asc = apply_select(
            rows.clone(),
            &Select::new(Table::MoodLogs, SortOrder::Ascending).session("a"),
        );
        let scores: Vec<_> = asc.iter().map(|r| r["mood_score"].as_u64().unwrap()).collect();
        assert_eq!(scores, vec![5, 3, 2]);

        let newest_in_range = apply_select(
            rows,
            &Select::new(Table::MoodLogs, SortOrder::Descending)
                .session("a")
                .within(TimeRange {
                    start: at(7),
                    end: at(11),
                })
                .limit(1),
        );
        assert_eq!(newest_in_range.len(), 1);
        assert_eq!(newest_in_range[0]["mood_score"], 3);
    }

    #[test]
    fn test_range_excludes_end_and_unparseable_rows() {
        let rows = vec![
            row("a", 10, 1),
            json!({"session_id": "a", "mood_score": 4, "created_at": "yesterday"}),
        ];
        let selected = apply_select(
            rows,
            &Select::new(Table::MoodLogs, SortOrder::Ascending).within(TimeRange {
                start: at(0),
                end: at(10),
            }),
        );
        assert!(selected.is_empty());
    }

    #[test]
    fn test_with_row_id_keeps_existing_id() {
        let row = with_row_id(json!({"id": "keep-me"}));
        assert_eq!(row["id"], "keep-me");

        let row = with_row_id(json!({"message": "hi"}));
        assert!(row["id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn test_memory_store_tables_are_separate() {
        let store = MemoryStore::new();
        store.insert(Table::MoodLogs, row("a", 9, 3)).await.unwrap();
        store
            .insert(
                Table::CommunityPosts,
                json!({"author_name": "Sam", "message": "hi", "created_at": at(8).to_rfc3339()}),
            )
            .await
            .unwrap();

        assert_eq!(store.len(Table::MoodLogs), 1);
        assert_eq!(store.len(Table::CommunityPosts), 1);

        let posts = store
            .select(&Select::new(Table::CommunityPosts, SortOrder::Descending))
            .await
            .unwrap();
        assert_eq!(posts[0]["author_name"], "Sam");
        assert!(posts[0]["id"].is_string());
    }
}
