//! Integration tests for caller-supplied freeze rules

use bailiwick::freezer::rules;
use bailiwick::{
    rule, ContextDict, ContextError, ContextOptions, Freezer, Object, RuleOutcome, Value,
};

struct Celsius(f64);

struct Labels(Vec<&'static str>);

struct SocketHandle;

fn celsius_to_float() -> impl bailiwick::FreezeRule {
    rule("celsius", |_: &Freezer, value: Value| {
        let degrees = value
            .as_object()
            .and_then(|o| o.downcast_ref::<Celsius>())
            .map(|c| c.0);
        match degrees {
            Some(d) => Ok(RuleOutcome::Frozen(Value::from(d))),
            None => Ok(RuleOutcome::Declined(value)),
        }
    })
}

#[test]
fn test_pre_rule_converts_custom_type() {
    let freezer = Freezer::builder().pre_rule(celsius_to_float()).build();
    let ctx = ContextDict::with_options(
        [("temp", Value::from(Object::new(Celsius(21.5))))],
        ContextOptions::new().with_freezer(freezer),
    );
    ctx.freeze().unwrap();
    assert_eq!(ctx.get("temp").unwrap(), Value::from(21.5));
}

#[test]
fn test_pre_rule_applies_inside_nested_containers() {
    let freezer = Freezer::builder().pre_rule(celsius_to_float()).build();
    let frozen = freezer
        .freeze(Value::list([
            Value::from(Object::new(Celsius(1.0))),
            Value::map([("inner", Value::from(Object::new(Celsius(2.0))))]),
        ]))
        .unwrap();

    let items = frozen.as_tuple().unwrap();
    assert_eq!(items[0], Value::from(1.0));
    let inner = items[1].as_context().unwrap();
    assert_eq!(inner.get("inner").unwrap(), Value::from(2.0));
    assert!(inner.freezer().same_as(&freezer));
}

#[test]
fn test_pre_rule_runs_before_builtins() {
    let freezer = Freezer::builder()
        .pre_rule(rule("shout", |_: &Freezer, value: Value| match value.as_str() {
            Some(s) => Ok(RuleOutcome::Frozen(Value::from(s.to_uppercase()))),
            None => Ok(RuleOutcome::Declined(value)),
        }))
        .build();
    assert_eq!(freezer.freeze(Value::from("quiet")).unwrap(), Value::from("QUIET"));
}

#[test]
fn test_post_rule_sees_only_unclaimed_values() {
    let freezer = Freezer::builder()
        .post_rule(rule("labels", |_: &Freezer, value: Value| {
            let labels = value
                .as_object()
                .and_then(|o| o.downcast_ref::<Labels>())
                .map(|l| Value::tuple(l.0.iter().copied()));
            match labels {
                Some(frozen) => Ok(RuleOutcome::Frozen(frozen)),
                None => Ok(RuleOutcome::Declined(value)),
            }
        }))
        .post_rule(rule("never", |_: &Freezer, value: Value| {
            assert!(
                !matches!(value, Value::List(_) | Value::Map(_) | Value::Set(_)),
                "container reached a post-rule: {:?}",
                value
            );
            Ok(RuleOutcome::Declined(value))
        }))
        .build();

    let frozen = freezer
        .freeze(Value::list([
            Value::from(Object::new(Labels(vec!["a", "b"]))),
            Value::set([1, 2]),
        ]))
        .unwrap();
    let items = frozen.as_tuple().unwrap();
    assert_eq!(items[0], Value::tuple(["a", "b"]));
    assert_eq!(items[1], Value::frozen_set([1, 2]));
}

#[test]
fn test_rule_order_is_reported() {
    let freezer = Freezer::builder()
        .pre_rule(celsius_to_float())
        .post_rule(rule("last", |_: &Freezer, v: Value| Ok(RuleOutcome::Declined(v))))
        .build();
    assert_eq!(
        freezer.rule_names(),
        vec!["celsius", "text", "binary", "mapping", "sequence", "set", "last"]
    );
}

#[test]
fn test_rejecting_rule_leaves_context_mutable() {
    let freezer = Freezer::builder()
        .pre_rule(rule("no-handles", |_: &Freezer, value: Value| {
            if value.as_object().map_or(false, |o| o.is::<SocketHandle>()) {
                return Err(ContextError::FreezeRejected {
                    rule: "no-handles".to_string(),
                    reason: "socket handles cannot be shared".to_string(),
                });
            }
            Ok(RuleOutcome::Declined(value))
        }))
        .build();

    let ctx = ContextDict::with_options(
        [
            ("port", Value::from(8080)),
            ("socket", Value::from(Object::new(SocketHandle))),
        ],
        ContextOptions::new().with_freezer(freezer),
    );

    let err = ctx.freeze().unwrap_err();
    assert!(matches!(err, ContextError::FreezeRejected { rule: ref name, .. } if name == "no-handles"));
    assert!(!ctx.is_frozen());
    assert_eq!(ctx.len(), 2);

    ctx.delete("socket").unwrap();
    ctx.freeze().unwrap();
    assert_eq!(ctx.get("port").unwrap(), Value::from(8080));
}

#[test]
fn test_unclaimed_object_passes_through_by_identity() {
    let handle = Object::new(SocketHandle);
    let frozen = Freezer::default()
        .freeze(Value::from(handle.clone()))
        .unwrap();
    assert!(frozen.as_object().unwrap().ptr_eq(&handle));
}

#[test]
fn test_builtin_rules_are_reusable_from_caller_rules() {
    // Treat every set as a plain sequence
    let freezer = Freezer::builder()
        .pre_rule(rule("sets-as-tuples", |freezer: &Freezer, value: Value| {
            match value {
                Value::Set(items) => rules::sequence(freezer, Value::List(items)),
                other => Ok(RuleOutcome::Declined(other)),
            }
        }))
        .build();
    let frozen = freezer.freeze(Value::set([3])).unwrap();
    assert_eq!(frozen, Value::tuple([3]));
}
