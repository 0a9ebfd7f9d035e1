//! Freezer
//!
//! Converts an arbitrary value graph into an equivalent graph built only from immutable
//! scalars and immutable containers. Conversion is an ordered rule dispatch: caller
//! pre-rules, the built-in rules (text, binary, mapping, sequence, set), then caller
//! post-rules. The first rule that matches wins; a value no rule claims is returned as-is.

pub mod rules;

use crate::error::ContextError;
use crate::value::{Mapping, Value};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Result of offering a value to a single rule
#[derive(Debug)]
pub enum RuleOutcome {
    /// The rule claimed the value and produced its frozen form
    Frozen(Value),
    /// The rule does not apply; the value is handed back for the next rule
    Declined(Value),
}

/// A single step of the freezer's dispatch chain
///
/// Rules receive the freezer so that container rules can recurse into their members.
/// Returning an error aborts the whole freeze; only caller-supplied rules do that, the
/// built-in chain never fails.
pub trait FreezeRule: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, freezer: &Freezer, value: Value) -> Result<RuleOutcome, ContextError>;
}

/// Signature shared by the built-in rules
pub type RuleFn = fn(&Freezer, Value) -> Result<RuleOutcome, ContextError>;

/// Built-in rules in dispatch order
///
/// Text and binary must precede the sequence rule: both expose the element-wise
/// capability and would otherwise be exploded into one value per char or byte.
const BUILTIN_RULES: [(&str, RuleFn); 5] = [
    ("text", rules::text),
    ("binary", rules::binary),
    ("mapping", rules::mapping),
    ("sequence", rules::sequence),
    ("set", rules::set),
];

/// Closure-backed rule, built with [`rule`]
pub struct FnRule<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a named [`FreezeRule`]
pub fn rule<F>(name: impl Into<String>, f: F) -> FnRule<F>
where
    F: Fn(&Freezer, Value) -> Result<RuleOutcome, ContextError> + Send + Sync,
{
    FnRule {
        name: name.into(),
        f,
    }
}

impl<F> FreezeRule for FnRule<F>
where
    F: Fn(&Freezer, Value) -> Result<RuleOutcome, ContextError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, freezer: &Freezer, value: Value) -> Result<RuleOutcome, ContextError> {
        (self.f)(freezer, value)
    }
}

struct RuleChain {
    pre_rules: Vec<Arc<dyn FreezeRule>>,
    post_rules: Vec<Arc<dyn FreezeRule>>,
}

/// Recursive value freezer
///
/// Cheap to clone: clones share the same rule chain, and [`Freezer::same_as`] tells them
/// apart from independently built freezers.
#[derive(Clone)]
pub struct Freezer {
    chain: Arc<RuleChain>,
}

impl Default for Freezer {
    fn default() -> Self {
        FreezerBuilder::default().build()
    }
}

impl Freezer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FreezerBuilder {
        FreezerBuilder::default()
    }

    /// Freeze a value, recursing through containers
    pub fn freeze(&self, value: Value) -> Result<Value, ContextError> {
        let mut value = value;

        for rule in &self.chain.pre_rules {
            match rule.apply(self, value)? {
                RuleOutcome::Frozen(frozen) => {
                    trace!(rule = rule.name(), "Pre-rule matched");
                    return Ok(frozen);
                }
                RuleOutcome::Declined(declined) => value = declined,
            }
        }

        for (_, builtin) in BUILTIN_RULES.iter() {
            match builtin(self, value)? {
                RuleOutcome::Frozen(frozen) => return Ok(frozen),
                RuleOutcome::Declined(declined) => value = declined,
            }
        }

        for rule in &self.chain.post_rules {
            match rule.apply(self, value)? {
                RuleOutcome::Frozen(frozen) => {
                    trace!(rule = rule.name(), "Post-rule matched");
                    return Ok(frozen);
                }
                RuleOutcome::Declined(declined) => value = declined,
            }
        }

        Ok(rules::identity(value))
    }

    /// Freeze every value of a mapping; keys are kept as-is
    pub fn freeze_entries(&self, mapping: Mapping) -> Result<Mapping, ContextError> {
        let mut frozen = Mapping::with_capacity(mapping.len());
        for (key, value) in mapping {
            frozen.insert(key, self.freeze(value)?);
        }
        Ok(frozen)
    }

    /// Rule names in dispatch order
    pub fn rule_names(&self) -> Vec<String> {
        self.chain
            .pre_rules
            .iter()
            .map(|r| r.name().to_string())
            .chain(BUILTIN_RULES.iter().map(|(name, _)| name.to_string()))
            .chain(self.chain.post_rules.iter().map(|r| r.name().to_string()))
            .collect()
    }

    /// True when both freezers share one rule chain
    pub fn same_as(&self, other: &Freezer) -> bool {
        Arc::ptr_eq(&self.chain, &other.chain)
    }
}

impl fmt::Debug for Freezer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Freezer({})", self.rule_names().join(", "))
    }
}

/// Builder for freezers with caller-supplied rules
#[derive(Default)]
pub struct FreezerBuilder {
    pre_rules: Vec<Arc<dyn FreezeRule>>,
    post_rules: Vec<Arc<dyn FreezeRule>>,
}

impl FreezerBuilder {
    /// Add a rule tried before the built-ins, after earlier pre-rules
    pub fn pre_rule(mut self, rule: impl FreezeRule + 'static) -> Self {
        self.pre_rules.push(Arc::new(rule));
        self
    }

    /// Add a rule tried after the built-ins, after earlier post-rules
    pub fn post_rule(mut self, rule: impl FreezeRule + 'static) -> Self {
        self.post_rules.push(Arc::new(rule));
        self
    }

    pub fn build(self) -> Freezer {
        Freezer {
            chain: Arc::new(RuleChain {
                pre_rules: self.pre_rules,
                post_rules: self.post_rules,
            }),
        }
    }
}
