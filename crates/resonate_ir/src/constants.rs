//! The program-wide constant table.

use crate::arena::Arena;
use crate::ids::ConstantId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Deduplicated storage for every constant in a program.
///
/// Structurally equal values share one [`ConstantId`]. The lookup index is
/// not serialised and is rebuilt on first use after deserialisation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConstantTable {
    values: Arena<ConstantId, Value>,
    #[serde(skip)]
    index: HashMap<Value, ConstantId>,
}

impl ConstantTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `value`, adding it if it is new.
    pub fn intern(&mut self, value: Value) -> ConstantId {
        if self.index.len() != self.values.len() {
            self.index = self.values.iter().map(|(id, v)| (v.clone(), id)).collect();
        }
        if let Some(id) = self.index.get(&value) {
            return *id;
        }
        let id = self.values.alloc(value.clone());
        self.index.insert(value, id);
        id
    }

    /// Returns the value behind a handle.
    pub fn get(&self, id: ConstantId) -> &Value {
        &self.values[id]
    }

    /// Returns the value behind a handle, if the handle is valid.
    pub fn try_get(&self, id: ConstantId) -> Option<&Value> {
        self.values.try_get(id)
    }

    /// Returns the number of distinct constants.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the table holds no constants.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn equal_values_share_a_handle() {
        let mut table = ConstantTable::new();
        let a = table.intern(Value::Float32(0.5));
        let b = table.intern(Value::Float32(0.5));
        let c = table.intern(Value::Float64(0.5));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(c), &Value::Float64(0.5));
    }

    #[test]
    fn aggregates_intern_structurally() {
        let mut table = ConstantTable::new();
        let ty = Type::array(Type::int32(), 2);
        let a = table.intern(Value::aggregate(ty.clone(), vec![Value::Int32(1), Value::Int32(2)]));
        let b = table.intern(Value::aggregate(ty, vec![Value::Int32(1), Value::Int32(2)]));
        assert_eq!(a, b);
    }

    #[test]
    fn index_rebuilt_after_deserialise() {
        let mut table = ConstantTable::new();
        let id = table.intern(Value::Int64(9));
        let json = serde_json::to_string(&table).unwrap();
        let mut restored: ConstantTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.intern(Value::Int64(9)), id);
        assert_eq!(restored.len(), 1);
    }
}
