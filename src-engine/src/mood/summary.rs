//! Derived history view for the mood chart

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use super::models::{MoodEntry, MoodScore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Short day label, e.g. "Mar 1"
    pub date: String,
    pub score: MoodScore,
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodSummary {
    pub count: usize,
    /// Mean score rounded to one decimal; `None` without check-ins
    pub average: Option<f64>,
    pub points: Vec<ChartPoint>,
}

/// Summarise entries (expected oldest first) with day labels in `tz`
pub fn summarize<Tz: TimeZone>(entries: &[MoodEntry], tz: &Tz) -> MoodSummary
where
    Tz::Offset: std::fmt::Display,
{
    let average = (!entries.is_empty()).then(|| {
        let total: u32 = entries.iter().map(|e| u32::from(e.score.value())).sum();
        let mean = f64::from(total) / entries.len() as f64;
        (mean * 10.0).round() / 10.0
    });

    let points = entries
        .iter()
        .map(|entry| ChartPoint {
            date: day_label(&entry.created_at.with_timezone(tz)),
            score: entry.score,
            emoji: entry.emoji.clone(),
        })
        .collect();

    MoodSummary {
        count: entries.len(),
        average,
        points,
    }
}

fn day_label<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%b %-d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SessionId;
    use chrono::{FixedOffset, Utc};

    fn entry(score: u8, created_at: &str) -> MoodEntry {
        MoodEntry {
            id: created_at.to_string(),
            session_id: SessionId::from("a"),
            score: MoodScore::new(score).unwrap(),
            emoji: None,
            created_at: created_at.parse().unwrap(),
        }
    }

    #[test]
    fn test_empty_history() {
        let summary = summarize(&[], &Utc);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, None);
        assert!(summary.points.is_empty());
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        let entries = vec![
            entry(4, "2026-03-01T12:00:00Z"),
            entry(5, "2026-03-02T12:00:00Z"),
            entry(5, "2026-03-03T12:00:00Z"),
        ];
        let summary = summarize(&entries, &Utc);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.7));
    }

    #[test]
    fn test_points_labelled_in_local_time() {
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        let entries = vec![entry(2, "2026-03-02T03:00:00Z")];

        let summary = summarize(&entries, &est);
        assert_eq!(summary.points[0].date, "Mar 1");
        assert_eq!(summarize(&entries, &Utc).points[0].date, "Mar 2");
    }
}
