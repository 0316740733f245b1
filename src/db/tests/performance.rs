use crate::db::*;
use chrono::NaiveDate;
use tempfile::TempDir;

fn row(ad_id: i64, device: &str, placement: &str, performance: &str) -> AdPerformanceRow {
    AdPerformanceRow {
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        ad_id,
        device: device.to_string(),
        placement: placement.to_string(),
        performance: performance.to_string(),
    }
}

#[tokio::test]
async fn test_open_creates_parent_directories_and_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("2024/03/01/facebook/ad-performance-act_1.sqlite3");

    let db = PerformanceDb::open(&path).await.unwrap();
    assert_eq!(db.count().await.unwrap(), 0);
    db.close().await;

    assert!(path.exists(), "empty day must still produce a file");
}

#[tokio::test]
async fn test_upsert_and_read_back() {
    let dir = TempDir::new().unwrap();
    let db = PerformanceDb::open(&dir.path().join("perf.sqlite3"))
        .await
        .unwrap();

    let rows = vec![
        row(2, "desktop", "facebook", r#"{"impressions":5}"#),
        row(1, "iphone", "instagram", r#"{"impressions":7}"#),
        row(1, "desktop", "facebook", r#"{"impressions":3}"#),
    ];
    assert_eq!(db.upsert(&rows).await.unwrap(), 3);

    let stored = db.rows().await.unwrap();
    assert_eq!(stored.len(), 3);
    // Ordered by primary key
    assert_eq!(stored[0], rows[2]);
    assert_eq!(stored[1], rows[1]);
    assert_eq!(stored[2], rows[0]);
}

#[tokio::test]
async fn test_upsert_replaces_rows_with_same_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("perf.sqlite3");

    let db = PerformanceDb::open(&path).await.unwrap();
    db.upsert(&[row(1, "desktop", "facebook", r#"{"impressions":3}"#)])
        .await
        .unwrap();
    db.close().await;

    // Redownload of the same day in a later run
    let db = PerformanceDb::open(&path).await.unwrap();
    db.upsert(&[
        row(1, "desktop", "facebook", r#"{"impressions":4}"#),
        row(1, "desktop", "audience_network", r#"{"impressions":1}"#),
    ])
    .await
    .unwrap();

    let stored = db.rows().await.unwrap();
    assert_eq!(stored.len(), 2);
    let facebook = stored
        .iter()
        .find(|r| r.placement == "facebook")
        .expect("facebook row");
    assert_eq!(facebook.performance, r#"{"impressions":4}"#);
}

#[tokio::test]
async fn test_upsert_empty_slice() {
    let dir = TempDir::new().unwrap();
    let db = PerformanceDb::open(&dir.path().join("perf.sqlite3"))
        .await
        .unwrap();

    assert_eq!(db.upsert(&[]).await.unwrap(), 0);
    assert_eq!(db.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_date_is_stored_as_iso_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("perf.sqlite3");
    let db = PerformanceDb::open(&path).await.unwrap();
    db.upsert(&[row(1, "desktop", "facebook", "{}")])
        .await
        .unwrap();
    db.close().await;

    let pool = sqlx::SqlitePool::connect(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    let date: String = sqlx::query_scalar("SELECT date FROM ad_performance")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(date, "2024-03-01");
    pool.close().await;
}

#[tokio::test]
async fn test_write_creates_file_only_with_its_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("2024/03/01/facebook/ad-performance-act_1.sqlite3");
    let tmp = dir.path().join("2024/03/01/facebook/ad-performance-act_1.sqlite3.tmp");

    let written = PerformanceDb::write(&path, &[row(1, "desktop", "facebook", "{}")])
        .await
        .unwrap();

    assert_eq!(written, 1);
    assert!(!tmp.exists());
    let db = PerformanceDb::open(&path).await.unwrap();
    assert_eq!(db.count().await.unwrap(), 1);
    db.close().await;
}

#[tokio::test]
async fn test_write_upserts_into_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("perf.sqlite3");

    PerformanceDb::write(&path, &[row(1, "desktop", "facebook", r#"{"impressions":1}"#)])
        .await
        .unwrap();
    PerformanceDb::write(
        &path,
        &[
            row(1, "desktop", "facebook", r#"{"impressions":2}"#),
            row(2, "iphone", "instagram", r#"{"impressions":3}"#),
        ],
    )
    .await
    .unwrap();

    let db = PerformanceDb::open(&path).await.unwrap();
    let rows = db.rows().await.unwrap();
    db.close().await;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].performance, r#"{"impressions":2}"#);
    assert!(!dir.path().join("perf.sqlite3.tmp").exists());
}

#[tokio::test]
async fn test_write_discards_leftover_temporary_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("perf.sqlite3");
    let tmp = dir.path().join("perf.sqlite3.tmp");

    let stale = PerformanceDb::open(&tmp).await.unwrap();
    stale.upsert(&[row(9, "desktop", "facebook", "{}")]).await.unwrap();
    stale.close().await;

    PerformanceDb::write(&path, &[row(1, "desktop", "facebook", "{}")])
        .await
        .unwrap();

    let db = PerformanceDb::open(&path).await.unwrap();
    let rows = db.rows().await.unwrap();
    db.close().await;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ad_id, 1);
    assert!(!tmp.exists());
}
