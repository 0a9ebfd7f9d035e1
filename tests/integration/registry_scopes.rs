//! Integration tests for registry scopes across threads

use bailiwick::{ContextError, ContextOptions, ContextRegistry, Mapping, Value};
use std::sync::Arc;

fn retries(n: i64) -> Mapping {
    Mapping::from([("retries", n)])
}

#[test]
fn test_threads_without_scope_share_root() {
    let registry = ContextRegistry::new();
    let created = registry
        .create("shared", retries(1), ContextOptions::default())
        .unwrap();
    created.freeze().unwrap();

    std::thread::scope(|s| {
        s.spawn(|| {
            let seen = registry.get("shared").unwrap();
            assert!(Arc::ptr_eq(&seen, &created));
            registry
                .create("from-worker", retries(2), ContextOptions::default())
                .unwrap();
        });
    });

    assert!(registry.get("from-worker").is_ok());
}

#[test]
fn test_scope_on_one_thread_is_invisible_to_others() {
    let registry = ContextRegistry::new();
    let _guard = registry.scope();
    registry
        .create("private", retries(1), ContextOptions::default())
        .unwrap();

    std::thread::scope(|s| {
        s.spawn(|| {
            assert_eq!(registry.scope_depth(), 0);
            assert_eq!(
                registry.get("private").unwrap_err(),
                ContextError::ContextNotFound("private".to_string())
            );
        });
    });

    assert!(registry.get("private").is_ok());
}

#[test]
fn test_snapshot_carries_view_to_worker() {
    let registry = ContextRegistry::new();
    let _guard = registry.scope();
    let ctx = registry
        .create("request", retries(4), ContextOptions::default())
        .unwrap();
    ctx.freeze().unwrap();

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.names(), vec!["request"]);

    std::thread::scope(|s| {
        s.spawn(|| {
            let worker_guard = registry.enter(&snapshot);
            assert_eq!(worker_guard.depth(), 1);
            let seen = registry.get("request").unwrap();
            assert_eq!(seen.get("retries").unwrap(), Value::from(4));

            registry
                .create("worker-only", retries(0), ContextOptions::default())
                .unwrap();
        });
    });

    // Names added by the worker stay in the worker's scope
    assert!(registry.get("worker-only").is_err());
}

#[test]
fn test_scope_sees_names_existing_at_entry_only() {
    let registry = ContextRegistry::new();
    registry
        .create("before", retries(1), ContextOptions::default())
        .unwrap();

    let guard = registry.scope();
    std::thread::scope(|s| {
        s.spawn(|| {
            registry
                .create("after", retries(2), ContextOptions::default())
                .unwrap();
        });
    });

    assert!(registry.get("before").is_ok());
    assert!(registry.get("after").is_err());
    drop(guard);
    assert!(registry.get("after").is_ok());
}

#[test]
fn test_scope_exits_on_panic() {
    let registry = ContextRegistry::new();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = registry.scope();
        registry
            .create("doomed", retries(1), ContextOptions::default())
            .unwrap();
        panic!("request failed");
    }));

    assert!(result.is_err());
    assert_eq!(registry.scope_depth(), 0);
    assert!(registry.get("doomed").is_err());
}

#[test]
fn test_seeded_names_are_shadowable_only_by_new_scopes() {
    let registry = ContextRegistry::new();
    registry
        .create("app", retries(1), ContextOptions::default())
        .unwrap();

    let _guard = registry.scope();
    assert!(matches!(
        registry.create("app", retries(2), ContextOptions::default()),
        Err(ContextError::DuplicateContext(_))
    ));
}
