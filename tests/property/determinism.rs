//! Property-based tests for determinism guarantees

use bailiwick::hasher;
use bailiwick::{ContextDict, Freezer, Mapping, Value};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
        proptest::collection::vec(any::<u8>(), 0..8).prop_map(Value::from),
    ]
}

fn nested() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::set),
            proptest::collection::vec(("[a-z]{1,4}", inner), 0..4)
                .prop_map(|entries| Value::map(Mapping::from(entries))),
        ]
    })
}

fn entries() -> impl Strategy<Value = Vec<(String, Value)>> {
    proptest::collection::btree_map("[a-z]{1,6}", nested(), 0..6)
        .prop_map(|m| m.into_iter().collect())
}

/// Test that insertion order never affects equality or fingerprint of frozen contexts
#[test]
fn test_frozen_context_order_independence_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&entries(), |entries| {
            let forward = ContextDict::from_entries(entries.clone());
            let mut reversed_entries = entries;
            reversed_entries.reverse();
            let reversed = ContextDict::from_entries(reversed_entries);

            forward.freeze().unwrap();
            reversed.freeze().unwrap();

            prop_assert_eq!(&forward, &reversed);
            prop_assert_eq!(forward.hash().unwrap(), reversed.hash().unwrap());
            Ok(())
        })
        .unwrap();
}

/// Test that freezing yields an immutable graph and is stable under refreezing
#[test]
fn test_freeze_produces_immutable_fixed_point_property() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let freezer = Freezer::default();

    runner
        .run(&nested(), |value| {
            let frozen = freezer.freeze(value.clone()).unwrap();
            prop_assert!(frozen.is_immutable());

            let refrozen = freezer.freeze(frozen.clone()).unwrap();
            prop_assert_eq!(&refrozen, &frozen);
            prop_assert_eq!(hasher::fingerprint(&refrozen), hasher::fingerprint(&frozen));
            Ok(())
        })
        .unwrap();
}

proptest! {
    /// Equal values always fingerprint equally
    #[test]
    fn prop_equal_values_share_fingerprint(value in nested()) {
        let copy = value.clone();
        prop_assert_eq!(&value, &copy);
        prop_assert_eq!(hasher::fingerprint(&value), hasher::fingerprint(&copy));
    }

    /// Set member order does not matter
    #[test]
    fn prop_set_order_independence(members in proptest::collection::vec(any::<i64>(), 0..10)) {
        let mut reversed = members.clone();
        reversed.reverse();
        let a = Value::set(members);
        let b = Value::frozen_set(reversed);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hasher::fingerprint(&a), hasher::fingerprint(&b));
    }
}
