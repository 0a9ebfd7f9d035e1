//! Value model
//!
//! Every entry stored in a context is a [`Value`]: a scalar, an opaque [`Object`], or a
//! container. Containers come in a mutable flavour (`Map`, `List`, `Set`) that callers build
//! and an immutable flavour (`Context`, `Tuple`, `FrozenSet`) that the freezer produces.

mod mapping;
mod set;

pub use mapping::Mapping;
pub use set::FrozenSet;

use crate::context::ContextDict;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A unit of context data
///
/// Equality follows mapping semantics: `Map` and `Context` with the same entries are equal,
/// as are `Set` and `FrozenSet` with the same members. `List` and `Tuple` never compare
/// equal to each other. Floats compare by bit pattern so that `Eq` and `Hash` agree.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Arc<str>),
    Bytes(Arc<[u8]>),
    Object(Object),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Mapping),
    Tuple(Arc<[Value]>),
    FrozenSet(FrozenSet),
    Context(Arc<ContextDict>),
}

impl Value {
    pub fn list<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::List(values.into_iter().map(Into::into).collect())
    }

    /// Mutable set; repeated members are dropped
    pub fn set<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::Set(set::dedup(values.into_iter().map(Into::into)))
    }

    pub fn map(mapping: impl Into<Mapping>) -> Self {
        Value::Map(mapping.into())
    }

    pub fn tuple<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::Tuple(values.into_iter().map(Into::into).collect())
    }

    pub fn frozen_set<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::FrozenSet(FrozenSet::new(values))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Object(o) => o.type_name(),
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Tuple(_) => "tuple",
            Value::FrozenSet(_) => "frozenset",
            Value::Context(_) => "context",
        }
    }

    /// True when nothing reachable from this value can change
    ///
    /// Opaque objects are trusted to be immutable.
    pub fn is_immutable(&self) -> bool {
        match self {
            Value::List(_) | Value::Set(_) | Value::Map(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_immutable),
            Value::FrozenSet(set) => set.iter().all(Value::is_immutable),
            Value::Context(ctx) => ctx.is_frozen(),
            _ => true,
        }
    }

    /// Element-wise iteration capability
    ///
    /// Text yields one single-character text per char and binary yields one int per byte,
    /// which is why the freezer must claim scalars before the sequence rule sees them.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::Text(s) => Some(s.chars().map(|c| Value::from(c.to_string())).collect()),
            Value::Bytes(b) => Some(b.iter().map(|&byte| Value::Int(i64::from(byte))).collect()),
            Value::List(items) | Value::Set(items) => Some(items.clone()),
            Value::Tuple(items) => Some(items.to_vec()),
            Value::FrozenSet(set) => Some(set.as_slice().to_vec()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_frozen_set(&self) -> Option<&FrozenSet> {
        match self {
            Value::FrozenSet(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_context(&self) -> Option<&Arc<ContextDict>> {
        match self {
            Value::Context(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    fn members(&self) -> Option<&[Value]> {
        match self {
            Value::Set(items) => Some(items),
            Value::FrozenSet(set) => Some(set.as_slice()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(_) | Value::FrozenSet(_), Value::Set(_) | Value::FrozenSet(_)) => {
                match (self.members(), other.members()) {
                    (Some(a), Some(b)) => set::same_members(a, b),
                    _ => false,
                }
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Context(a), Value::Context(b)) => a == b,
            (Value::Map(m), Value::Context(ctx)) | (Value::Context(ctx), Value::Map(m)) => {
                **ctx == *m
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write(&crate::hasher::fingerprint(self));
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Value::Object(o) => fmt::Debug::fmt(o, f),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Set(items) => f.debug_set().entries(items.iter()).finish(),
            Value::Map(m) => fmt::Debug::fmt(m, f),
            Value::Tuple(items) => {
                let mut tuple = f.debug_tuple("");
                for item in items.iter() {
                    tuple.field(item);
                }
                tuple.finish()
            }
            Value::FrozenSet(set) => fmt::Debug::fmt(set, f),
            Value::Context(ctx) => fmt::Debug::fmt(&**ctx, f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Object(o) => Err(S::Error::custom(format!(
                "opaque object of type {} cannot be serialized",
                o.type_name()
            ))),
            Value::List(items) | Value::Set(items) => serialize_seq(items, serializer),
            Value::Tuple(items) => serialize_seq(items, serializer),
            Value::FrozenSet(set) => serialize_seq(set.as_slice(), serializer),
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (key, value) in m.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Context(ctx) => ctx.serialize(serializer),
        }
    }
}

fn serialize_seq<S: Serializer>(items: &[Value], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(items.len()))?;
    for item in items {
        seq.serialize_element(item)?;
    }
    seq.end()
}

/// Opaque scalar the freezer passes through untouched
///
/// Objects compare and hash by identity: two clones of the same object are equal, two
/// separately constructed objects never are.
#[derive(Clone)]
pub struct Object {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Object {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Object {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        self.addr() == other.addr()
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object at {:#x}>", self.type_name, self.addr())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(Arc::from(s))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(Arc::from(b))
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(b: &[u8; N]) -> Self {
        Value::Bytes(Arc::from(&b[..]))
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Arc::from(b))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Value::Map(m)
    }
}

impl From<FrozenSet> for Value {
    fn from(set: FrozenSet) -> Self {
        Value::FrozenSet(set)
    }
}

impl From<ContextDict> for Value {
    fn from(ctx: ContextDict) -> Self {
        Value::Context(Arc::new(ctx))
    }
}

impl From<Arc<ContextDict>> for Value {
    fn from(ctx: Arc<ContextDict>) -> Self {
        Value::Context(ctx)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => Value::list(items),
            serde_json::Value::Object(fields) => Value::Map(fields.into_iter().collect()),
        }
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::from(s),
            toml::Value::Integer(i) => Value::Int(i),
            toml::Value::Float(x) => Value::Float(x),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::from(dt.to_string()),
            toml::Value::Array(items) => Value::list(items),
            toml::Value::Table(table) => Value::Map(table.into_iter().collect()),
        }
    }
}
