//! Functions and their basic blocks.

use crate::annotation::Annotation;
use crate::arena::Arena;
use crate::ids::{BlockId, ModuleId, VariableId};
use crate::stmt::{Statement, Terminator};
use crate::types::Type;
use resonate_source::Span;
use serde::{Deserialize, Serialize};

/// The name of a processor's main loop.
pub const RUN_FUNCTION_NAME: &str = "run";
/// The name of the compiler-generated initialiser.
pub const SYSTEM_INIT_FUNCTION_NAME: &str = "_init";
/// The name of the user-written initialiser.
pub const USER_INIT_FUNCTION_NAME: &str = "init";

/// The role of a function, which decides who may call it and what it may
/// do.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum FunctionKind {
    /// An ordinary helper.
    Normal,
    /// An event handler.
    Event,
    /// A processor's `run` loop.
    Run,
    /// The generated initialiser.
    SystemInit,
    /// The user-written initialiser.
    UserInit,
    /// A built-in provided by the runtime, with no body.
    Intrinsic,
}

impl FunctionKind {
    /// Derives the kind of a function declared inside a processor from its
    /// name.
    pub fn for_processor_function(name: &str) -> Self {
        match name {
            RUN_FUNCTION_NAME => FunctionKind::Run,
            SYSTEM_INIT_FUNCTION_NAME => FunctionKind::SystemInit,
            USER_INIT_FUNCTION_NAME => FunctionKind::UserInit,
            _ => FunctionKind::Normal,
        }
    }

    /// Returns `true` for functions only the runtime may call.
    pub fn is_runtime_entry_point(self) -> bool {
        matches!(
            self,
            FunctionKind::Run | FunctionKind::UserInit | FunctionKind::SystemInit | FunctionKind::Event
        )
    }
}

/// A basic block: parameters, straight-line statements, one terminator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// The block label, starting with `@`.
    pub name: String,
    /// Values supplied by every branch into this block.
    pub parameters: Vec<VariableId>,
    /// The block's statements.
    pub statements: Vec<Statement>,
    /// How control leaves the block.
    pub terminator: Terminator,
    /// Where the block was declared.
    pub span: Span,
}

impl Block {
    /// Creates an empty block that returns.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.starts_with('@') {
            name
        } else {
            format!("@{name}")
        };
        Self {
            name,
            parameters: Vec::new(),
            statements: Vec::new(),
            terminator: Terminator::ReturnVoid,
            span: Span::DUMMY,
        }
    }

    /// Returns `true` if the block contains an `advance`.
    pub fn calls_advance(&self) -> bool {
        self.statements
            .iter()
            .any(|s| matches!(s, Statement::AdvanceClock))
    }
}

/// A function with a signature and, unless it is an intrinsic, a body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Function {
    /// The unqualified name.
    pub name: String,
    /// The module that declares it.
    pub module: ModuleId,
    /// The function's role.
    pub kind: FunctionKind,
    /// The return type.
    pub return_type: Type,
    /// Parameter variables, in order.
    pub parameters: Vec<VariableId>,
    /// Local variables declared at function scope.
    pub locals: Vec<VariableId>,
    /// The body. The first block is the entry.
    pub blocks: Arena<BlockId, Block>,
    /// Free-form metadata.
    pub annotation: Annotation,
    /// Where the function was declared.
    pub span: Span,
}

impl Function {
    /// Creates a function with no parameters and no body.
    pub fn new(name: impl Into<String>, module: ModuleId, kind: FunctionKind, return_type: Type) -> Self {
        Self {
            name: name.into(),
            module,
            kind,
            return_type,
            parameters: Vec::new(),
            locals: Vec::new(),
            blocks: Arena::new(),
            annotation: Annotation::new(),
            span: Span::DUMMY,
        }
    }

    /// Returns `true` if the function has at least one block.
    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Returns the entry block.
    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.ids().next()
    }

    /// Finds a block by label.
    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        self.blocks.position(|b| b.name == name)
    }

    /// Returns `true` if any block contains an `advance`.
    pub fn calls_advance(&self) -> bool {
        self.blocks.values().any(Block::calls_advance)
    }

    /// Iterates over every statement in block order.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.blocks.values().flat_map(|b| b.statements.iter())
    }
}
