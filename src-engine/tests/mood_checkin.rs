// Integration tests for the daily check-in flow over the local file store

use chrono::{DateTime, FixedOffset, TimeZone};
use mindhub_engine_lib::{
    identity::{FileKv, KeyValueStore, SESSION_KEY},
    mood::{LocalStore, MoodHistoryStore, MoodScore, Table},
    MindhubError, WellnessEngine,
};
use tempfile::TempDir;

fn est() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).unwrap()
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    est().with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

fn engine(dir: &TempDir) -> WellnessEngine<FileKv, LocalStore> {
    let store = LocalStore::new(dir.path());
    WellnessEngine::new(
        FileKv::new(dir.path().join("storage.json")),
        MoodHistoryStore::new(store),
    )
}

fn score(value: u8) -> MoodScore {
    MoodScore::new(value).unwrap()
}

#[tokio::test]
async fn test_one_check_in_per_local_day() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);

    let status = engine.check_in_status(&at(1, 8, 0)).await.unwrap();
    assert!(status.allowed);
    assert_eq!(status.existing_score, None);

    let entry = engine.check_in(score(4), None, &at(1, 8, 0)).await.unwrap();
    assert_eq!(entry.emoji.as_deref(), Some(score(4).emoji()));

    let status = engine.check_in_status(&at(1, 22, 0)).await.unwrap();
    assert!(!status.allowed);
    assert_eq!(status.existing_score, Some(score(4)));

    let err = engine
        .check_in(score(2), None, &at(1, 23, 59))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MindhubError::ThrottleRejected { existing_score } if existing_score == score(4)
    ));

    // Next local midnight opens a new day
    let status = engine.check_in_status(&at(2, 0, 0)).await.unwrap();
    assert!(status.allowed);
    engine
        .check_in(score(2), Some("🌧".to_string()), &at(2, 0, 0))
        .await
        .unwrap();

    let entries = engine.history_entries().await.unwrap();
    let scores: Vec<u8> = entries.iter().map(|e| e.score.value()).collect();
    assert_eq!(scores, vec![4, 2]);
    assert_eq!(entries[1].emoji.as_deref(), Some("🌧"));
}

#[tokio::test]
async fn test_session_and_history_survive_restart() {
    let dir = TempDir::new().unwrap();

    let first_id = {
        let engine = engine(&dir);
        engine.check_in(score(5), None, &at(3, 9, 30)).await.unwrap();
        engine.session_id()
    };

    let engine = engine(&dir);
    assert_eq!(engine.session_id(), first_id);
    assert!(!engine.identity().is_ephemeral());

    let stored = FileKv::new(dir.path().join("storage.json"))
        .get(SESSION_KEY)
        .unwrap();
    assert_eq!(stored.as_deref(), Some(first_id.as_str()));

    let status = engine.check_in_status(&at(3, 18, 0)).await.unwrap();
    assert_eq!(status.existing_score, Some(score(5)));

    let summary = engine.summary(&est()).await.unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average, Some(5.0));
    assert_eq!(summary.points[0].date, "Mar 3");
}

#[tokio::test]
async fn test_sessions_do_not_share_history() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let shared_tables = LocalStore::new(first.path());

    let a = WellnessEngine::new(
        FileKv::new(first.path().join("storage.json")),
        MoodHistoryStore::new(shared_tables.clone()),
    );
    let b = WellnessEngine::new(
        FileKv::new(second.path().join("storage.json")),
        MoodHistoryStore::new(shared_tables.clone()),
    );
    assert_ne!(a.session_id(), b.session_id());

    a.check_in(score(3), None, &at(4, 12, 0)).await.unwrap();
    b.check_in(score(1), None, &at(4, 12, 5)).await.unwrap();

    assert_eq!(a.history_entries().await.unwrap().len(), 1);
    assert_eq!(b.history_entries().await.unwrap()[0].score, score(1));
    assert!(shared_tables.table_path(Table::MoodLogs).exists());
}

#[tokio::test]
async fn test_empty_feed_when_no_posts_table() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    assert!(engine.community_feed(20).await.unwrap().is_empty());

    let summary = engine.summary(&est()).await.unwrap();
    assert_eq!(summary.count, 0);
    assert_eq!(summary.average, None);
}
