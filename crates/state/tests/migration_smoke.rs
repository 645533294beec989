use tempfile::TempDir;

#[tokio::test]
async fn migrations_apply_and_expose_core_tables() {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("relsync.sqlite");

    let pool = relsync_state::create_pool(&db_path)
        .await
        .expect("create pool");
    relsync_state::run_migrations(&pool)
        .await
        .expect("run migrations");

    let mut conn = pool.acquire().await.expect("acquire connection");

    for table in [
        "spaces",
        "space_resources",
        "cluster_relations",
        "data_sources",
        "databus_configs",
        "vm_storage_bindings",
        "es_storage_bindings",
        "doris_storage_bindings",
        "conditional_sinks",
        "result_table_configs",
        "data_links",
    ] {
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
                .bind(table)
                .fetch_optional(&mut *conn)
                .await
                .expect("check table existence");
        assert!(exists.is_some(), "expected table `{table}` to exist");
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("relsync.sqlite");

    let pool = relsync_state::create_pool(&db_path)
        .await
        .expect("create pool");
    relsync_state::run_migrations(&pool).await.expect("first run");
    relsync_state::run_migrations(&pool).await.expect("second run");
}

#[tokio::test]
async fn every_pooled_connection_gets_the_pragmas() {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("relsync.sqlite");

    let pool = relsync_state::create_pool(&db_path)
        .await
        .expect("create pool");

    // Hold two connections at once so they are distinct
    let mut first = pool.acquire().await.expect("first connection");
    let mut second = pool.acquire().await.expect("second connection");
    for conn in [&mut first, &mut second] {
        let synchronous: i64 = sqlx::query_scalar("PRAGMA synchronous")
            .fetch_one(&mut **conn)
            .await
            .expect("read synchronous");
        // NORMAL
        assert_eq!(synchronous, 1);

        let temp_store: i64 = sqlx::query_scalar("PRAGMA temp_store")
            .fetch_one(&mut **conn)
            .await
            .expect("read temp_store");
        // MEMORY
        assert_eq!(temp_store, 2);
    }
}
