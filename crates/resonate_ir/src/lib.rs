//! The resonate intermediate representation.
//!
//! A [`Program`] owns every [`Module`] of a compilation together with the
//! shared [`ConstantTable`] and string dictionary. Modules are processors,
//! graphs or namespaces. Processors and graphs declare [`Endpoint`]s, graphs
//! hold [`ProcessorInstance`]s and [`Connection`]s, and every module may
//! declare structs, state variables and [`Function`]s made of [`Block`]s.
//!
//! All cross-references are arena IDs. Copying a program is a `Clone`, and
//! [`clone_modules`] / [`specialise_module`] copy module sets with every
//! reference remapped.

#![warn(missing_docs)]

pub mod annotation;
pub mod arena;
pub mod builder;
pub mod clone;
pub mod connection;
pub mod constants;
pub mod endpoint;
pub mod errors;
pub mod function;
pub mod ids;
pub mod instance;
pub mod module;
pub mod program;
pub mod stmt;
pub mod types;
pub mod typing;
pub mod value;
pub mod variable;

pub use annotation::Annotation;
pub use arena::{Arena, ArenaId};
pub use builder::FunctionBuilder;
pub use clone::{clone_modules, specialise_module};
pub use connection::{Connection, EndpointRef, InterpolationType};
pub use constants::ConstantTable;
pub use endpoint::{
    Endpoint, EndpointDetails, EndpointDirection, EndpointKind, PathSegment, CONSOLE_ENDPOINT_NAME,
};
pub use function::{Block, Function, FunctionKind};
pub use ids::*;
pub use instance::{ClockRatio, ProcessorInstance};
pub use module::{Module, ModuleKind, PATH_SEPARATOR};
pub use program::{Program, MAIN_ANNOTATION};
pub use stmt::{
    BinaryOp, Expr, ProcessorProperty, Statement, SubElementIndex, Terminator, UnaryOp,
};
pub use types::{CastKind, PrimitiveType, StructMember, Structure, Type, TypeRules};
pub use value::Value;
pub use variable::{Variable, VariableRole};
