//! Fingerprint computation for value graphs using BLAKE3
//!
//! Fingerprints are deterministic across runs for everything except opaque objects, which
//! hash by identity. Mappings and sets are order-independent: member digests are sorted
//! before they are folded into the parent.

use crate::types::{Fingerprint, Key};
use crate::value::{Mapping, Value};
use blake3::Hasher;

/// Compute the fingerprint of a value
///
/// Equal values (per `Value`'s `PartialEq`) always produce equal fingerprints.
pub fn fingerprint(value: &Value) -> Fingerprint {
    let mut hasher = Hasher::new();
    hash_value(&mut hasher, value);
    *hasher.finalize().as_bytes()
}

/// Compute the fingerprint of a mapping's entry set
///
/// A `Value::Map` and a context with the same entries share this digest.
pub fn entries_fingerprint(mapping: &Mapping) -> Fingerprint {
    let mut digests: Vec<Fingerprint> = mapping
        .iter()
        .map(|(key, value)| {
            let mut hasher = Hasher::new();
            hash_key(&mut hasher, key);
            hash_value(&mut hasher, value);
            *hasher.finalize().as_bytes()
        })
        .collect();
    digests.sort_unstable();

    let mut hasher = Hasher::new();
    hasher.update(b"mapping");
    hasher.update(&(digests.len() as u64).to_be_bytes());
    for digest in &digests {
        hasher.update(digest);
    }
    *hasher.finalize().as_bytes()
}

/// Compute the fingerprint of a set's members (duplicates collapse)
pub fn members_fingerprint(members: &[Value]) -> Fingerprint {
    let mut digests: Vec<Fingerprint> = members.iter().map(fingerprint).collect();
    digests.sort_unstable();
    digests.dedup();

    let mut hasher = Hasher::new();
    hasher.update(b"set");
    hasher.update(&(digests.len() as u64).to_be_bytes());
    for digest in &digests {
        hasher.update(digest);
    }
    *hasher.finalize().as_bytes()
}

fn hash_key(hasher: &mut Hasher, key: &Key) {
    match key {
        Key::Bool(b) => {
            hasher.update(b"key:bool");
            hasher.update(&[u8::from(*b)]);
        }
        Key::Int(i) => {
            hasher.update(b"key:int");
            hasher.update(&i.to_be_bytes());
        }
        Key::Text(s) => {
            hasher.update(b"key:text");
            hash_bytes(hasher, s.as_bytes());
        }
        Key::Bytes(b) => {
            hasher.update(b"key:bytes");
            hash_bytes(hasher, b);
        }
    }
}

fn hash_value(hasher: &mut Hasher, value: &Value) {
    match value {
        Value::Null => {
            hasher.update(b"null");
        }
        Value::Bool(b) => {
            hasher.update(b"bool");
            hasher.update(&[u8::from(*b)]);
        }
        Value::Int(i) => {
            hasher.update(b"int");
            hasher.update(&i.to_be_bytes());
        }
        Value::Float(x) => {
            hasher.update(b"float");
            hasher.update(&x.to_bits().to_be_bytes());
        }
        Value::Text(s) => {
            hasher.update(b"text");
            hash_bytes(hasher, s.as_bytes());
        }
        Value::Bytes(b) => {
            hasher.update(b"bytes");
            hash_bytes(hasher, b);
        }
        Value::Object(o) => {
            hasher.update(b"object");
            hash_bytes(hasher, o.type_name().as_bytes());
            hasher.update(&(o.addr() as u64).to_be_bytes());
        }
        Value::List(items) => hash_sequence(hasher, b"list", items),
        Value::Tuple(items) => hash_sequence(hasher, b"tuple", items),
        Value::Set(items) => {
            hasher.update(&members_fingerprint(items));
        }
        Value::FrozenSet(set) => {
            hasher.update(&members_fingerprint(set.as_slice()));
        }
        Value::Map(mapping) => {
            hasher.update(&entries_fingerprint(mapping));
        }
        Value::Context(ctx) => {
            hasher.update(&ctx.entries_fingerprint());
        }
    }
}

fn hash_sequence(hasher: &mut Hasher, tag: &[u8], items: &[Value]) {
    hasher.update(tag);
    hasher.update(&(items.len() as u64).to_be_bytes());
    for item in items {
        hash_value(hasher, item);
    }
}

// Length prefix keeps adjacent variable-length fields unambiguous
fn hash_bytes(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}
