//! Integration tests for the context container lifecycle

use bailiwick::{
    ContextDict, ContextError, ContextOptions, ContextRegistry, Key, Mapping, Value,
};
use std::sync::Arc;

#[test]
fn test_service_context_end_to_end() {
    let registry = ContextRegistry::new();
    let ctx = registry
        .create(
            "svc",
            [("retries", Value::from(3)), ("tags", Value::set(["a", "b"]))],
            ContextOptions::default(),
        )
        .unwrap();

    assert_eq!(
        ctx.get("retries").unwrap_err(),
        ContextError::NotFrozen("reading its members")
    );

    ctx.freeze().unwrap();

    assert_eq!(ctx.get("retries").unwrap(), Value::from(3));
    let tags = ctx.get("tags").unwrap();
    assert!(matches!(tags, Value::FrozenSet(_)));
    assert_eq!(tags, Value::frozen_set(["a", "b"]));

    let same = registry.get("svc").unwrap();
    assert!(Arc::ptr_eq(&same, &ctx));
}

#[test]
fn test_nested_containers_freeze_recursively() {
    let ctx = ContextDict::from_entries([(
        "a",
        Value::list([
            Value::from(1),
            Value::set([2, 3]),
            Value::map([("b", 4)]),
        ]),
    )]);
    ctx.freeze().unwrap();

    let a = ctx.get("a").unwrap();
    let items = a.as_tuple().expect("list freezes to a tuple");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], Value::from(1));
    assert!(matches!(items[1], Value::FrozenSet(_)));
    assert_eq!(items[1], Value::frozen_set([2, 3]));

    let inner = items[2].as_context().expect("map freezes to a context");
    assert!(inner.is_frozen());
    assert_eq!(inner.get("b").unwrap(), Value::from(4));
    assert!(a.is_immutable());
}

#[test]
fn test_scalars_survive_freeze_intact() {
    let ctx = ContextDict::from_entries([
        ("name", Value::from("bailiwick")),
        ("raw", Value::from(b"\x00\x01")),
        ("ratio", Value::from(0.5)),
        ("flag", Value::from(true)),
        ("nothing", Value::Null),
    ]);
    ctx.freeze().unwrap();

    assert_eq!(ctx.get("name").unwrap(), Value::from("bailiwick"));
    assert_eq!(ctx.get("raw").unwrap(), Value::from(b"\x00\x01"));
    assert_eq!(ctx.get("ratio").unwrap(), Value::from(0.5));
    assert_eq!(ctx.get("flag").unwrap(), Value::from(true));
    assert!(ctx.get("nothing").unwrap().is_null());
}

#[test]
fn test_embedded_mutable_context_is_copied_not_frozen() {
    let inner = Arc::new(ContextDict::from_entries([("x", 1)]));
    let outer = ContextDict::from_entries([("inner", Value::from(Arc::clone(&inner)))]);
    outer.freeze().unwrap();

    let frozen_inner = outer.get("inner").unwrap();
    let frozen_inner = frozen_inner.as_context().unwrap();
    assert!(frozen_inner.is_frozen());
    assert!(!Arc::ptr_eq(frozen_inner, &inner));

    assert!(!inner.is_frozen());
    inner.set("x", 2).unwrap();
    assert_eq!(frozen_inner.get("x").unwrap(), Value::from(1));
}

#[test]
fn test_frozen_context_rejects_mutation() {
    let ctx = ContextDict::from_entries([("k", 1)]);
    ctx.freeze().unwrap();

    assert_eq!(
        ctx.set("k", 2).unwrap_err(),
        ContextError::ImmutableState("assign to")
    );
    assert!(matches!(ctx.delete("k"), Err(ContextError::ImmutableState(_))));
    assert!(matches!(ctx.clear(), Err(ContextError::ImmutableState(_))));
    assert!(matches!(ctx.pop("k"), Err(ContextError::ImmutableState(_))));
    assert!(matches!(ctx.pop_item(), Err(ContextError::ImmutableState(_))));
    assert!(matches!(
        ctx.set_default("z", 0),
        Err(ContextError::ImmutableState(_))
    ));
    assert!(matches!(
        ctx.update_from([("k", 3)]),
        Err(ContextError::ImmutableState(_))
    ));
    assert_eq!(ctx.get("k").unwrap(), Value::from(1));
}

#[test]
fn test_read_gate_can_be_disabled() {
    let ctx = ContextDict::with_options(
        [("k", 1)],
        ContextOptions::new().with_read_gate(false),
    );
    assert_eq!(ctx.get("k").unwrap(), Value::from(1));
    ctx.set("k", 2).unwrap();
    assert_eq!(ctx.get("k").unwrap(), Value::from(2));
    assert_eq!(ctx.entries().unwrap().len(), 1);
}

#[test]
fn test_union_of_frozen_context_derives_mutable_copy() {
    let base = ContextDict::from_entries([("retries", 3), ("timeout", 30)]);
    base.freeze().unwrap();

    let derived = base.union([("retries", 5)]);
    assert!(!derived.is_frozen());
    assert!(derived.requires_frozen_for_read());
    assert!(derived.freezer().same_as(base.freezer()));

    derived.set("extra", true).unwrap();
    derived.freeze().unwrap();
    assert_eq!(derived.get("retries").unwrap(), Value::from(5));
    assert_eq!(derived.get("timeout").unwrap(), Value::from(30));
    assert_eq!(base.get("retries").unwrap(), Value::from(3));
    assert!(!base.contains_key("extra"));
}

#[test]
fn test_equal_entries_hash_equal_regardless_of_order() {
    let a = ContextDict::from_entries([("x", 1), ("y", 2)]);
    let b = ContextDict::from_entries([("y", 2), ("x", 1)]);
    a.freeze().unwrap();
    b.freeze().unwrap();

    assert_eq!(a, b);
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    assert_eq!(a, Mapping::from([("x", 1), ("y", 2)]));
}

#[test]
fn test_keys_preserve_insertion_order() {
    let ctx = ContextDict::from_entries([("b", 1), ("a", 2)]);
    ctx.set(3, "three").unwrap();
    let keys: Vec<Key> = ctx.keys().collect();
    assert_eq!(keys, vec![Key::from("b"), Key::from("a"), Key::Int(3)]);

    ctx.freeze().unwrap();
    let keys: Vec<Key> = ctx.keys().collect();
    assert_eq!(keys, vec![Key::from("b"), Key::from("a"), Key::Int(3)]);
}

#[test]
fn test_json_round_trip_through_frozen_context() {
    let json: serde_json::Value = serde_json::json!({
        "name": "svc",
        "ports": [80, 443],
        "limits": {"max": 10}
    });
    let object = json.as_object().unwrap().clone();

    let ctx = ContextDict::from_json(object, ContextOptions::default());
    assert!(serde_json::to_value(&ctx).is_err());

    ctx.freeze().unwrap();
    assert_eq!(serde_json::to_value(&ctx).unwrap(), json);
}
