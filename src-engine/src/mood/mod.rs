//! Mood check-ins: records, storage backends, the daily throttle and the
//! history summary.

pub mod backend;
pub mod history;
pub mod local;
pub mod models;
pub mod remote;
pub mod rest;
pub mod summary;
pub mod throttle;

pub use backend::Backend;
pub use history::MoodHistoryStore;
pub use local::LocalStore;
pub use models::{CommunityPost, MoodEntry, MoodScore, NewMoodEntry};
pub use remote::{MemoryStore, RemoteError, RemoteStore, Select, SortOrder, Table, TimeRange};
pub use rest::RestStore;
pub use summary::{summarize, MoodSummary};
pub use throttle::{daily_window, CheckInStatus, MoodCheckInThrottle};
