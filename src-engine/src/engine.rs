//! The check-in flow the UI drives: resolve the session, ask the throttle,
//! record a score. The breathing timer is independent and lives in
//! `breathing`.

use chrono::{DateTime, TimeZone};

use crate::error::Result;
use crate::identity::{KeyValueStore, SessionId, SessionIdentity};
use crate::mood::{
    summarize, CheckInStatus, CommunityPost, MoodCheckInThrottle, MoodEntry, MoodHistoryStore,
    MoodScore, MoodSummary, RemoteStore,
};

pub struct WellnessEngine<S, R> {
    identity: SessionIdentity<S>,
    throttle: MoodCheckInThrottle<R>,
}

impl<S: KeyValueStore, R: RemoteStore> WellnessEngine<S, R> {
    pub fn new(storage: S, history: MoodHistoryStore<R>) -> Self {
        Self {
            identity: SessionIdentity::new(storage),
            throttle: MoodCheckInThrottle::new(history),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.identity.get_or_create()
    }

    pub fn identity(&self) -> &SessionIdentity<S> {
        &self.identity
    }

    pub fn history(&self) -> &MoodHistoryStore<R> {
        self.throttle.history()
    }

    /// Whether the control should accept a score today
    pub async fn check_in_status<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<CheckInStatus> {
        self.throttle.check(&self.session_id(), now).await
    }

    /// Record today's score. Falls back to the score's own emoji.
    pub async fn check_in<Tz: TimeZone>(
        &self,
        score: MoodScore,
        emoji: Option<String>,
        now: &DateTime<Tz>,
    ) -> Result<MoodEntry> {
        let emoji = emoji.or_else(|| Some(score.emoji().to_string()));
        self.throttle
            .record(&self.session_id(), score, emoji, now)
            .await
    }

    /// This session's history, oldest first
    pub async fn history_entries(&self) -> Result<Vec<MoodEntry>> {
        self.history().query_by_session(&self.session_id()).await
    }

    pub async fn summary<Tz: TimeZone>(&self, tz: &Tz) -> Result<MoodSummary>
    where
        Tz::Offset: std::fmt::Display,
    {
        let entries = self.history_entries().await?;
        Ok(summarize(&entries, tz))
    }

    pub async fn community_feed(&self, limit: usize) -> Result<Vec<CommunityPost>> {
        self.history().query_recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MindhubError;
    use crate::identity::MemoryKv;
    use crate::mood::MemoryStore;
    use chrono::{FixedOffset, TimeDelta};

    fn engine() -> WellnessEngine<MemoryKv, MemoryStore> {
        WellnessEngine::new(MemoryKv::new(), MoodHistoryStore::new(MemoryStore::new()))
    }

    fn morning() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_check_in_flow() {
        let engine = engine();
        let now = morning();

        assert!(engine.check_in_status(&now).await.unwrap().allowed);

        let entry = engine
            .check_in(MoodScore::new(5).unwrap(), None, &now)
            .await
            .unwrap();
        assert_eq!(entry.emoji.as_deref(), Some("😄"));
        assert_eq!(entry.session_id, engine.session_id());

        let status = engine.check_in_status(&now).await.unwrap();
        assert!(!status.allowed);
        assert_eq!(status.existing_score, MoodScore::new(5));

        let err = engine
            .check_in(MoodScore::new(1).unwrap(), None, &(now + TimeDelta::hours(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, MindhubError::ThrottleRejected { .. }));
    }

    #[tokio::test]
    async fn test_summary_over_several_days() {
        let engine = engine();
        let start = morning();
        for (day, score) in [(0, 2), (1, 3), (2, 5)] {
            engine
                .check_in(
                    MoodScore::new(score).unwrap(),
                    Some("🌧".to_string()),
                    &(start + TimeDelta::days(day)),
                )
                .await
                .unwrap();
        }

        let summary = engine.summary(&start.timezone()).await.unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(3.3));
        let dates: Vec<&str> = summary.points.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["Mar 1", "Mar 2", "Mar 3"]);
        assert!(summary
            .points
            .iter()
            .all(|p| p.emoji.as_deref() == Some("🌧")));
    }
}
