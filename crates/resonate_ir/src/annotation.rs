//! Free-form key/value metadata attached to modules, endpoints, variables
//! and functions.

use crate::constants::ConstantTable;
use crate::ids::ConstantId;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// An ordered list of `(key, constant)` properties.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    properties: Vec<(String, ConstantId)>,
}

impl Annotation {
    /// Creates an empty annotation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Sets a property, replacing an existing one with the same key in place.
    pub fn set(&mut self, key: impl Into<String>, value: ConstantId) {
        let key = key.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.properties.push((key, value)),
        }
    }

    /// Returns the constant stored under `key`.
    pub fn get(&self, key: &str) -> Option<ConstantId> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// Returns `true` if `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the value stored under `key`.
    pub fn get_value<'a>(&self, key: &str, constants: &'a ConstantTable) -> Option<&'a Value> {
        self.get(key).map(|id| constants.get(id))
    }

    /// Returns `true` only if `key` holds the boolean `true`.
    pub fn get_bool(&self, key: &str, constants: &ConstantTable) -> bool {
        self.get_value(key, constants)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Iterates over properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ConstantId)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Rebuilds the annotation with every constant passed through `map`.
    pub fn try_map_constants<E>(
        &self,
        map: &mut impl FnMut(ConstantId) -> Result<ConstantId, E>,
    ) -> Result<Annotation, E> {
        let properties = self
            .properties
            .iter()
            .map(|(k, v)| Ok((k.clone(), map(*v)?)))
            .collect::<Result<_, E>>()?;
        Ok(Annotation { properties })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut constants = ConstantTable::new();
        let min = constants.intern(Value::Float32(0.0));
        let max = constants.intern(Value::Float32(1.0));
        let mut annotation = Annotation::new();
        annotation.set("min", min);
        annotation.set("max", max);
        annotation.set("min", max);
        let keys: Vec<&str> = annotation.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["min", "max"]);
        assert_eq!(annotation.get("min"), Some(max));
    }

    #[test]
    fn get_bool_requires_true() {
        let mut constants = ConstantTable::new();
        let yes = constants.intern(Value::Bool(true));
        let one = constants.intern(Value::Int32(1));
        let mut annotation = Annotation::new();
        annotation.set("main", yes);
        annotation.set("other", one);
        assert!(annotation.get_bool("main", &constants));
        assert!(!annotation.get_bool("other", &constants));
        assert!(!annotation.get_bool("missing", &constants));
        assert!(annotation.has("other"));
    }
}
