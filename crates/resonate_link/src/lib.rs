//! Linking of a parsed resonate program.
//!
//! Linking turns a program as written into one the checker and a back end can
//! work with:
//!
//! 1. [`specialise_instances`] binds compile-time arguments by cloning the
//!    instantiated modules.
//! 2. [`link_endpoints`] resolves hoisted endpoint paths, creating
//!    intermediate endpoints and connections through nested graphs.
//!
//! The remaining modules are analyses used by the checker: connection
//! resolution ([`resolver`]), feedback detection in graphs ([`cycles`]) and
//! the function call graph ([`call_graph`]).

#![warn(missing_docs)]

pub mod call_graph;
pub mod cycles;
pub mod errors;
pub mod hoist;
pub mod resolver;
pub mod specialise;

pub use call_graph::{
    check_infinite_loops, check_recursion, check_stack_size, describe_size, CallGraph,
};
pub use cycles::{check_graph_cycles, InstanceGraph};
pub use hoist::link_endpoints;
pub use resolver::{
    check_connection, check_graph_connections, resolve_connection, ResolvedConnection, ResolvedEnd,
};
pub use specialise::specialise_instances;
