//! Variables of every role.

use crate::annotation::Annotation;
use crate::ids::ConstantId;
use crate::types::Type;
use resonate_source::Span;
use serde::{Deserialize, Serialize};

/// What a variable is for and where it lives.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum VariableRole {
    /// Module state that persists between calls.
    State,
    /// A function-local that may be reassigned.
    MutableLocal,
    /// A function-local or module-level value assigned once.
    Constant,
    /// A function or block parameter.
    Parameter,
    /// State whose value is supplied from outside the program at link time.
    External,
}

/// A named, typed storage location.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variable {
    /// The variable name. Locals and parameters start with `$`.
    pub name: String,
    /// The variable type.
    pub ty: Type,
    /// The variable's role.
    pub role: VariableRole,
    /// The initial value of a state or constant variable.
    pub initial_value: Option<ConstantId>,
    /// Free-form metadata.
    pub annotation: Annotation,
    /// Where the variable was declared.
    pub span: Span,
}

impl Variable {
    /// Creates a variable without an initial value.
    pub fn new(name: impl Into<String>, ty: Type, role: VariableRole) -> Self {
        Self {
            name: name.into(),
            ty,
            role,
            initial_value: None,
            annotation: Annotation::new(),
            span: Span::DUMMY,
        }
    }

    /// Returns `true` for state and external variables.
    pub fn is_module_level(&self) -> bool {
        matches!(self.role, VariableRole::State | VariableRole::External)
    }
}
