//! The per-program string dictionary and its lightweight [`Ident`] handles.
//!
//! String literals that appear in constants and annotations are stored once
//! in a [`StringDictionary`] owned by the program, and referenced everywhere
//! else through a `u32` handle.

use lasso::ThreadedRodeo;
use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A handle to a string stored in a [`StringDictionary`].
///
/// Handles are only meaningful for the dictionary that produced them. Moving
/// a value between programs means re-interning its strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Creates an `Ident` from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Ident` wraps a `u32`, and `try_from_usize` rejects anything that
// does not fit, so the round trip through `usize` is lossless.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// Deduplicating string storage backed by [`lasso::ThreadedRodeo`].
///
/// Keys are handed out sequentially from zero, so the dictionary can be
/// cloned or serialised as its ordered list of strings and rebuilt with
/// identical handles.
pub struct StringDictionary {
    rodeo: ThreadedRodeo<Ident>,
}

impl StringDictionary {
    /// Creates a new empty dictionary.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Stores a string, returning its handle. Storing the same text twice
    /// returns the same handle.
    pub fn intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Returns the handle for `s` if it has already been stored.
    pub fn get(&self, s: &str) -> Option<Ident> {
        self.rodeo.get(s)
    }

    /// Resolves a handle back to its text, or `None` if the handle did not
    /// come from this dictionary.
    pub fn try_resolve(&self, ident: Ident) -> Option<&str> {
        self.rodeo.try_resolve(&ident)
    }

    /// Resolves a handle back to its text.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not created by this dictionary.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// Returns the number of distinct strings stored.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns `true` if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }

    /// Iterates over the stored strings in handle order.
    pub fn strings(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.len() as u32).filter_map(|i| self.try_resolve(Ident(i)))
    }
}

impl Default for StringDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StringDictionary {
    fn clone(&self) -> Self {
        let copy = StringDictionary::new();
        for s in self.strings() {
            copy.intern(s);
        }
        copy
    }
}

impl fmt::Debug for StringDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.strings()).finish()
    }
}

impl Serialize for StringDictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for s in self.strings() {
            seq.serialize_element(s)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for StringDictionary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DictionaryVisitor;

        impl<'de> Visitor<'de> for DictionaryVisitor {
            type Value = StringDictionary;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of strings")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let dictionary = StringDictionary::new();
                while let Some(s) = seq.next_element::<String>()? {
                    dictionary.intern(&s);
                }
                Ok(dictionary)
            }
        }

        deserializer.deserialize_seq(DictionaryVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_resolve_roundtrip() {
        let dict = StringDictionary::new();
        let id = dict.intern("gain");
        assert_eq!(dict.resolve(id), "gain");
    }

    #[test]
    fn same_string_same_ident() {
        let dict = StringDictionary::new();
        assert_eq!(dict.intern("out"), dict.intern("out"));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn handles_are_sequential() {
        let dict = StringDictionary::new();
        assert_eq!(dict.intern("a").as_raw(), 0);
        assert_eq!(dict.intern("b").as_raw(), 1);
        assert_eq!(dict.intern("a").as_raw(), 0);
    }

    #[test]
    fn clone_preserves_handles() {
        let dict = StringDictionary::new();
        let a = dict.intern("alpha");
        let b = dict.intern("beta");
        let copy = dict.clone();
        assert_eq!(copy.resolve(a), "alpha");
        assert_eq!(copy.resolve(b), "beta");
        copy.intern("gamma");
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn unknown_handle_does_not_resolve() {
        let dict = StringDictionary::new();
        assert!(dict.try_resolve(Ident::from_raw(7)).is_none());
        assert!(dict.get("missing").is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let dict = StringDictionary::new();
        dict.intern("x");
        let y = dict.intern("y");
        let json = serde_json::to_string(&dict).unwrap();
        assert_eq!(json, r#"["x","y"]"#);
        let back: StringDictionary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.resolve(y), "y");
    }
}
