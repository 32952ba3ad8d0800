use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn missing_value_loads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let loaded = storage
        .load_session_value("last_profile_id")
        .await
        .expect("load");
    assert_eq!(loaded, None);
}

#[tokio::test]
async fn put_overwrites_previous_value() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .put_session_value("last_profile_id", "p1")
        .await
        .expect("first put");
    storage
        .put_session_value("last_profile_id", "p2")
        .await
        .expect("second put");

    let loaded = storage
        .load_session_value("last_profile_id")
        .await
        .expect("load")
        .expect("value present");
    assert_eq!(loaded.key, "last_profile_id");
    assert_eq!(loaded.value, "p2");
}

#[tokio::test]
async fn values_survive_reopening_the_database_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("intake.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage
        .put_session_value("last_profile_id", "p-durable")
        .await
        .expect("put");
    storage.pool().close().await;
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let loaded = reopened
        .load_session_value("last_profile_id")
        .await
        .expect("load")
        .expect("value present");
    assert_eq!(loaded.value, "p-durable");
}

#[test]
fn memory_urls_have_no_file_path() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/intake.db?mode=rwc"),
        Some(PathBuf::from("./data/intake.db"))
    );
}
