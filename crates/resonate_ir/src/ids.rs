//! Opaque ID newtypes for all IR entities.
//!
//! Program-level arenas hand out [`ModuleId`], [`StructId`], [`FunctionId`]
//! and [`VariableId`]. Module-level arenas hand out [`EndpointId`],
//! [`InstanceId`] and [`ConnectionId`]. Each function owns a block arena
//! keyed by [`BlockId`]. Constants are interned into the program's constant
//! table and addressed by [`ConstantId`].

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// A module (processor, graph or namespace) in a program.
    ModuleId
);

define_id!(
    /// A struct definition in a program.
    StructId
);

define_id!(
    /// A function in a program.
    FunctionId
);

define_id!(
    /// A variable of any role: state, local, constant, parameter or external.
    VariableId
);

define_id!(
    /// A basic block within one function.
    BlockId
);

define_id!(
    /// An input or output endpoint of one module.
    EndpointId
);

define_id!(
    /// A processor instance (graph node) within one graph.
    InstanceId
);

define_id!(
    /// A connection within one graph.
    ConnectionId
);

define_id!(
    /// An interned constant in the program's constant table.
    ConstantId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_roundtrip() {
        assert_eq!(FunctionId::from_raw(42).as_raw(), 42);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(BlockId::from_raw(1));
        set.insert(BlockId::from_raw(2));
        set.insert(BlockId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = VariableId::from_raw(99);
        let json = serde_json::to_string(&id).unwrap();
        let restored: VariableId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
