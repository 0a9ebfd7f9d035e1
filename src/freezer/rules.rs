//! Built-in freeze rules.
//!
//! Each rule either claims a value and returns its frozen form, or declines and hands the
//! value back unchanged. They are public so callers can reuse them inside their own rules.

use super::{Freezer, RuleOutcome};
use crate::context::ContextDict;
use crate::error::ContextError;
use crate::value::{FrozenSet, Value};
use std::sync::Arc;

/// Text is already immutable
pub fn text(_: &Freezer, value: Value) -> Result<RuleOutcome, ContextError> {
    match value {
        Value::Text(_) => Ok(RuleOutcome::Frozen(value)),
        other => Ok(RuleOutcome::Declined(other)),
    }
}

/// Binary is already immutable
pub fn binary(_: &Freezer, value: Value) -> Result<RuleOutcome, ContextError> {
    match value {
        Value::Bytes(_) => Ok(RuleOutcome::Frozen(value)),
        other => Ok(RuleOutcome::Declined(other)),
    }
}

/// Maps and contexts become a frozen context carrying this freezer
pub fn mapping(freezer: &Freezer, value: Value) -> Result<RuleOutcome, ContextError> {
    let entries = match value {
        Value::Map(m) => m,
        Value::Context(ctx) => ctx.store_snapshot(),
        other => return Ok(RuleOutcome::Declined(other)),
    };
    let frozen = freezer.freeze_entries(entries)?;
    Ok(RuleOutcome::Frozen(Value::Context(Arc::new(
        ContextDict::frozen_from(frozen, freezer.clone()),
    ))))
}

/// Anything with the element-wise capability becomes a tuple of frozen elements
///
/// Sets are excluded so that they reach the set rule; text and binary are claimed
/// earlier in the chain.
pub fn sequence(freezer: &Freezer, value: Value) -> Result<RuleOutcome, ContextError> {
    if matches!(value, Value::Set(_) | Value::FrozenSet(_)) {
        return Ok(RuleOutcome::Declined(value));
    }
    match value.elements() {
        Some(items) => {
            let frozen = items
                .into_iter()
                .map(|item| freezer.freeze(item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RuleOutcome::Frozen(Value::Tuple(frozen.into())))
        }
        None => Ok(RuleOutcome::Declined(value)),
    }
}

/// Sets become a frozen set of frozen members
pub fn set(freezer: &Freezer, value: Value) -> Result<RuleOutcome, ContextError> {
    let members = match value {
        Value::Set(items) => items,
        Value::FrozenSet(set) => set.as_slice().to_vec(),
        other => return Ok(RuleOutcome::Declined(other)),
    };
    let frozen = members
        .into_iter()
        .map(|member| freezer.freeze(member))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuleOutcome::Frozen(Value::FrozenSet(FrozenSet::new(frozen))))
}

/// Fallback applied when no rule matches
pub fn identity(value: Value) -> Value {
    value
}
