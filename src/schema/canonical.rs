//! Canonical JSON: one serialization used both to compute a document's digest and to
//! put it on the wire, so the bytes that get hashed are always the bytes that get sent.
//!
//! `serde_json`'s `Map` is backed by a `BTreeMap` unless the `preserve_order` feature is
//! enabled (this crate doesn't enable it), so round-tripping a document through
//! `serde_json::Value` sorts every object's keys lexicographically, at every depth, for
//! free. `to_vec` then emits compact JSON with no insignificant whitespace.

use crate::error::Result;
use serde::Serialize;

/// Serializes `doc` to canonical JSON bytes: sorted keys, no extra whitespace.
pub fn to_canonical_bytes<T: Serialize>(doc: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(doc)?;
    Ok(serde_json::to_vec(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Unsorted {
        zebra: u32,
        apple: u32,
        nested: Nested,
    }

    #[derive(Serialize)]
    struct Nested {
        b: u32,
        a: u32,
    }

    #[test]
    fn sorts_keys_at_every_depth() {
        let doc = Unsorted {
            zebra: 1,
            apple: 2,
            nested: Nested { b: 3, a: 4 },
        };
        let bytes = to_canonical_bytes(&doc).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"apple":2,"nested":{"a":4,"b":3},"zebra":1}"#);
    }

    #[test]
    fn identical_documents_hash_identically() {
        let a = to_canonical_bytes(&Unsorted {
            zebra: 1,
            apple: 2,
            nested: Nested { b: 3, a: 4 },
        })
        .unwrap();
        let b = to_canonical_bytes(&Unsorted {
            zebra: 1,
            apple: 2,
            nested: Nested { b: 3, a: 4 },
        })
        .unwrap();
        assert_eq!(a, b);
    }
}
