//! Mood log and community feed records
//!
//! Field names follow the remote table columns (`mood_logs`,
//! `community_posts`) so rows round-trip through every backend unchanged.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::SessionId;

/// A 1-5 mood rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MoodScore(u8);

impl MoodScore {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Default emoji shown for this score
    pub fn emoji(self) -> &'static str {
        match self.0 {
            5 => "😄",
            4 => "🙂",
            3 => "😐",
            2 => "😔",
            _ => "😢",
        }
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            5 => "Great",
            4 => "Good",
            3 => "Okay",
            2 => "Low",
            _ => "Hard",
        }
    }

    /// All scores, best first (the order the check-in control lists them)
    pub fn all() -> impl Iterator<Item = MoodScore> {
        (Self::MIN..=Self::MAX).rev().map(MoodScore)
    }
}

impl TryFrom<u8> for MoodScore {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "mood score {} out of range {}..={}",
                value,
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<MoodScore> for u8 {
    fn from(score: MoodScore) -> Self {
        score.0
    }
}

impl fmt::Display for MoodScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mood check-in not yet accepted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMoodEntry {
    pub session_id: SessionId,
    #[serde(rename = "mood_score")]
    pub score: MoodScore,
    #[serde(rename = "mood_emoji")]
    pub emoji: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stored mood check-in. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    /// Store-assigned row id
    pub id: String,
    pub session_id: SessionId,
    #[serde(rename = "mood_score")]
    pub score: MoodScore,
    #[serde(rename = "mood_emoji", default)]
    pub emoji: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A read-only message in the community feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityPost {
    pub id: String,
    pub author_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
