//! One mood check-in per local calendar day per session
//!
//! The guard is re-check-then-write, not mutual exclusion: two check-ins
//! racing from different clients can both pass `check` before either write
//! lands. A duplicate day costs chart tidiness, not correctness; reads treat
//! the newest entry of the day as authoritative.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::Serialize;

use super::history::MoodHistoryStore;
use super::models::{MoodEntry, MoodScore, NewMoodEntry};
use super::remote::{RemoteStore, TimeRange};
use crate::error::{MindhubError, Result};
use crate::identity::SessionId;

/// Outcome of a throttle check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckInStatus {
    pub allowed: bool,
    /// Score of today's check-in, used to pre-select and lock the control
    pub existing_score: Option<MoodScore>,
}

impl CheckInStatus {
    fn from_existing(existing: Option<&MoodEntry>) -> Self {
        Self {
            allowed: existing.is_none(),
            existing_score: existing.map(|e| e.score),
        }
    }
}

/// First instant of `day` in `tz`, as UTC
fn local_midnight<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight falls in a DST gap: the day starts when the gap ends
        LocalResult::None => (1..=3)
            .find_map(|hours| {
                tz.from_local_datetime(&(midnight + TimeDelta::hours(hours)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}

/// The local calendar day containing `now`, as a UTC range
pub fn daily_window<Tz: TimeZone>(now: &DateTime<Tz>) -> TimeRange {
    let tz = now.timezone();
    let day = now.date_naive();
    let start = local_midnight(&tz, day);
    let end = match day.succ_opt() {
        Some(next) => local_midnight(&tz, next),
        None => start + TimeDelta::hours(24),
    };
    TimeRange { start, end }
}

pub struct MoodCheckInThrottle<R> {
    history: MoodHistoryStore<R>,
}

impl<R: RemoteStore> MoodCheckInThrottle<R> {
    pub fn new(history: MoodHistoryStore<R>) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &MoodHistoryStore<R> {
        &self.history
    }

    /// Whether `session_id` may still check in on `now`'s local day
    pub async fn check<Tz: TimeZone>(
        &self,
        session_id: &SessionId,
        now: &DateTime<Tz>,
    ) -> Result<CheckInStatus> {
        let window = daily_window(now);
        let existing = self.history.latest_in_window(session_id, window).await?;
        Ok(CheckInStatus::from_existing(existing.as_ref()))
    }

    /// Re-check and, if today is still open, append the check-in
    pub async fn record<Tz: TimeZone>(
        &self,
        session_id: &SessionId,
        score: MoodScore,
        emoji: Option<String>,
        now: &DateTime<Tz>,
    ) -> Result<MoodEntry> {
        let status = self.check(session_id, now).await?;
        if let Some(existing_score) = status.existing_score {
            tracing::info!(%session_id, %existing_score, "check-in rejected, already recorded today");
            return Err(MindhubError::ThrottleRejected { existing_score });
        }

        self.history
            .append(NewMoodEntry {
                session_id: session_id.clone(),
                score,
                emoji,
                created_at: now.with_timezone(&Utc),
            })
            .await
    }
}
