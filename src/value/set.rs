//! Immutable unordered set of values.
//!
//! Members are indexed by fingerprint, so deduplication, membership and set equality are
//! linear in the number of members rather than quadratic.

use crate::hasher;
use crate::types::Fingerprint;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Fingerprint buckets over a member slice; each bucket holds member positions
///
/// Distinct values sharing a fingerprint land in one bucket and are told apart by `==`.
#[derive(Default)]
pub(crate) struct MemberIndex {
    buckets: HashMap<Fingerprint, Vec<usize>>,
}

impl MemberIndex {
    pub(crate) fn build(members: &[Value]) -> Self {
        let mut index = MemberIndex::default();
        for (position, member) in members.iter().enumerate() {
            index
                .buckets
                .entry(hasher::fingerprint(member))
                .or_default()
                .push(position);
        }
        index
    }

    pub(crate) fn contains(&self, members: &[Value], value: &Value) -> bool {
        self.find(members, &hasher::fingerprint(value), value)
    }

    fn find(&self, members: &[Value], fingerprint: &Fingerprint, value: &Value) -> bool {
        self.buckets
            .get(fingerprint)
            .map_or(false, |bucket| bucket.iter().any(|&i| members[i] == *value))
    }
}

/// Immutable, deduplicated, unordered set of [`Value`]s
///
/// Produced by the freezer's set rule. Cloning shares the underlying storage. Members are
/// expected to be immutable; the index is built once at construction.
#[derive(Clone)]
pub struct FrozenSet {
    members: Arc<[Value]>,
    index: Arc<MemberIndex>,
}

impl FrozenSet {
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let (members, index) = dedup_indexed(values.into_iter().map(Into::into));
        FrozenSet {
            members: members.into(),
            index: Arc::new(index),
        }
    }

    pub fn empty() -> Self {
        FrozenSet {
            members: Arc::from(Vec::new()),
            index: Arc::new(MemberIndex::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.index.contains(&self.members, value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.members.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.members
    }
}

fn dedup_indexed(values: impl Iterator<Item = Value>) -> (Vec<Value>, MemberIndex) {
    let mut unique: Vec<Value> = Vec::new();
    let mut index = MemberIndex::default();
    for value in values {
        let fingerprint = hasher::fingerprint(&value);
        if index.find(&unique, &fingerprint, &value) {
            continue;
        }
        index
            .buckets
            .entry(fingerprint)
            .or_default()
            .push(unique.len());
        unique.push(value);
    }
    (unique, index)
}

/// Drop repeated members, keeping the first occurrence
pub(crate) fn dedup(values: impl Iterator<Item = Value>) -> Vec<Value> {
    dedup_indexed(values).0
}

/// Set equality over arbitrary member slices (duplicates are ignored)
pub(crate) fn same_members(a: &[Value], b: &[Value]) -> bool {
    let (index_a, index_b) = (MemberIndex::build(a), MemberIndex::build(b));
    a.iter().all(|v| index_b.contains(b, v)) && b.iter().all(|v| index_a.contains(a, v))
}

impl PartialEq for FrozenSet {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.members, &other.members) {
            return true;
        }
        // Both sides are deduplicated, so equal sizes plus one-way containment suffice
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl Eq for FrozenSet {}

impl std::hash::Hash for FrozenSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write(&hasher::members_fingerprint(&self.members));
    }
}

impl fmt::Debug for FrozenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frozenset(")?;
        f.debug_set().entries(self.members.iter()).finish()?;
        write!(f, ")")
    }
}

impl<'a> IntoIterator for &'a FrozenSet {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Value> for FrozenSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        FrozenSet::new(iter)
    }
}
