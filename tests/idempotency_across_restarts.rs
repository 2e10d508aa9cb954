//! The ledger table lives in the target database file, not in-process
//! state — a patch applied by one `PatchKit` instance must be recognized
//! as already-applied by a freshly constructed instance pointed at the
//! same file, simulating a process restart.

use std::sync::Arc;

use patchkit::{Engine, EngineRegistry, EventCode, PatchKit, PatchKitConfig, SqliteEngine};
use tempfile::tempdir;

mod common;
use common::init_tracing;

fn registry_over(db_path: &std::path::Path) -> EngineRegistry {
    let path = db_path.to_path_buf();
    EngineRegistry::new().register(
        "primary",
        Box::new(move || Ok(Arc::new(SqliteEngine::open(&path).unwrap()) as Arc<dyn Engine>)),
    )
}

#[test]
fn ledger_survives_a_fresh_patchkit_instance_over_the_same_file() {
    init_tracing();
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("app.db");
    {
        let setup = SqliteEngine::open(&db_path).unwrap();
        setup
            .execute("CREATE TABLE counters (id INTEGER PRIMARY KEY, n INTEGER NOT NULL)", &[])
            .unwrap();
        setup
            .execute("INSERT INTO counters (id, n) VALUES (1, 0)", &[])
            .unwrap();
    }

    let patch = br#"{
        "version": 1,
        "id": "bump-counter-1",
        "target": "primary",
        "actions": [{"type": "SqlAction", "sql": "UPDATE counters SET n = n + 1 WHERE id = 1"}]
    }"#;

    let first_kit = PatchKit::new(registry_over(&db_path), PatchKitConfig::default());
    let first = first_kit.apply(patch);
    assert!(first.success());
    drop(first_kit);

    let second_kit = PatchKit::new(registry_over(&db_path), PatchKitConfig::default());
    let second = second_kit.apply(patch);
    assert!(!second.success());
    assert!(second.events.iter().any(|e| e.code == EventCode::IdempotentSkip));

    let verify_engine = SqliteEngine::open(&db_path).unwrap();
    let n = verify_engine
        .query_scalar("SELECT n FROM counters WHERE id = 1", &[])
        .unwrap();
    assert_eq!(n.as_long(), 1, "counter must have been incremented exactly once");
}
