//! Append-only mood log over a `RemoteStore`
//!
//! This is the error boundary for remote I/O: every call is bounded by a
//! timeout and every backend failure leaves here as a `MindhubError`.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::models::{CommunityPost, MoodEntry, NewMoodEntry};
use super::remote::{RemoteError, RemoteStore, Select, SortOrder, Table, TimeRange};
use crate::error::{MindhubError, Result};
use crate::identity::SessionId;

/// Bound on a single remote call when none is configured
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

enum Failure {
    Remote(RemoteError),
    TimedOut(Duration),
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Remote(e) => write!(f, "{}", e),
            Failure::TimedOut(after) => write!(f, "timed out after {:?}", after),
        }
    }
}

pub struct MoodHistoryStore<R> {
    remote: R,
    timeout: Duration,
}

impl<R: RemoteStore> MoodHistoryStore<R> {
    pub fn new(remote: R) -> Self {
        Self::with_timeout(remote, DEFAULT_REMOTE_TIMEOUT)
    }

    pub fn with_timeout(remote: R, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, RemoteError>>,
    ) -> std::result::Result<T, Failure> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(Failure::Remote),
            Err(_) => Err(Failure::TimedOut(self.timeout)),
        }
    }

    /// Write a new check-in and return it as stored
    pub async fn append(&self, entry: NewMoodEntry) -> Result<MoodEntry> {
        let record = serde_json::to_value(&entry)
            .map_err(|e| MindhubError::RemoteWriteFailure(e.to_string()))?;

        let row = self
            .bounded(self.remote.insert(Table::MoodLogs, record))
            .await
            .map_err(|failure| {
                tracing::warn!(session_id = %entry.session_id, error = %failure, "mood entry write failed");
                MindhubError::RemoteWriteFailure(failure.to_string())
            })?;

        let stored: MoodEntry = serde_json::from_value(row).map_err(|e| {
            MindhubError::RemoteWriteFailure(format!("store returned an unreadable row: {}", e))
        })?;
        tracing::info!(session_id = %stored.session_id, score = %stored.score, "mood entry recorded");
        Ok(stored)
    }

    async fn fetch(&self, what: &'static str, query: Select) -> Result<Vec<Value>> {
        self.bounded(self.remote.select(&query))
            .await
            .map_err(|failure| {
                tracing::warn!(what, error = %failure, "remote read failed");
                MindhubError::RemoteReadFailure {
                    what,
                    reason: failure.to_string(),
                }
            })
    }

    async fn read<T: DeserializeOwned>(&self, what: &'static str, query: Select) -> Result<Vec<T>> {
        let rows = self.fetch(what, query).await?;
        Ok(decode_rows(what, rows))
    }

    /// All check-ins for a session, oldest first
    pub async fn query_by_session(&self, session_id: &SessionId) -> Result<Vec<MoodEntry>> {
        let query = Select::new(Table::MoodLogs, SortOrder::Ascending).session(session_id.as_str());
        self.read("mood history", query).await
    }

    /// Newest readable check-in for a session with `created_at` inside `range`.
    ///
    /// Any row in the window counts: if rows exist but none decode, this is a
    /// read failure rather than an empty window.
    pub async fn latest_in_window(
        &self,
        session_id: &SessionId,
        range: TimeRange,
    ) -> Result<Option<MoodEntry>> {
        const WHAT: &str = "today's check-in";
        let query = Select::new(Table::MoodLogs, SortOrder::Descending)
            .session(session_id.as_str())
            .within(range);
        let rows = self.fetch(WHAT, query).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let found = rows.len();
        match decode_rows::<MoodEntry>(WHAT, rows).into_iter().next() {
            Some(entry) => Ok(Some(entry)),
            None => Err(MindhubError::RemoteReadFailure {
                what: WHAT,
                reason: format!("{} row(s) in the window, none readable", found),
            }),
        }
    }

    /// Community feed, newest first
    pub async fn query_recent(&self, limit: usize) -> Result<Vec<CommunityPost>> {
        let query = Select::new(Table::CommunityPosts, SortOrder::Descending).limit(limit);
        self.read("community feed", query).await
    }
}

/// Decode rows, skipping any that do not match the record shape
fn decode_rows<T: DeserializeOwned>(what: &'static str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(what, error = %e, "skipping malformed row");
                None
            }
        })
        .collect()
}
