use orderdesk_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn file_backed_pool_uses_wal_and_migrates() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("conversations.db");
    let path = path.to_str().expect("temp path should be utf-8");

    let pool = create_pool(path, DbRuntimeSettings::default()).expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");

    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .expect("failed to query journal_mode");
    assert_eq!(mode, "wal");

    let applied = run_migrations(&conn).expect("failed to run migrations");
    assert_eq!(applied, 2);

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .expect("failed to prepare table query");
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("failed to execute table query")
        .map(|r| r.expect("failed to read table name"))
        .collect();

    assert_eq!(
        tables,
        vec![
            "_orderdesk_migrations",
            "action_types",
            "conversations",
            "executed_functions",
            "messages",
        ]
    );
}

#[test]
fn second_connection_sees_migrated_schema() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("shared.db");
    let path = path.to_str().expect("temp path should be utf-8");

    let pool = create_pool(path, DbRuntimeSettings::default()).expect("failed to create pool");
    {
        let conn = pool.get().expect("failed to get connection");
        run_migrations(&conn).expect("failed to run migrations");
    }

    let other = pool.get().expect("failed to get second connection");
    let applied = run_migrations(&other).expect("re-running should succeed");
    assert_eq!(applied, 0);
}
