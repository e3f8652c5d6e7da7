//! Expressions, statements and block terminators.
//!
//! These are closed sum types. Every pass matches on them exhaustively, so a
//! new variant is a compile error wherever it has not been handled.

use crate::ids::{BlockId, ConstantId, FunctionId, VariableId};
use crate::types::Type;
use serde::{Deserialize, Serialize};

/// A unary operator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Negate,
    /// Bitwise complement.
    BitwiseNot,
    /// Boolean not.
    LogicalNot,
}

/// A binary operator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitwiseOr,
    BitwiseAnd,
    BitwiseXor,
    LeftShift,
    RightShift,
    RightShiftUnsigned,
    LogicalOr,
    LogicalAnd,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl UnaryOp {
    /// All unary operators.
    pub const ALL: [UnaryOp; 3] = [UnaryOp::Negate, UnaryOp::BitwiseNot, UnaryOp::LogicalNot];

    /// Returns the HEART name.
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Negate => "negate",
            UnaryOp::BitwiseNot => "bitwise_not",
            UnaryOp::LogicalNot => "logical_not",
        }
    }

    /// Looks up an operator by its HEART name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl BinaryOp {
    /// All binary operators.
    pub const ALL: [BinaryOp; 19] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::Modulo,
        BinaryOp::BitwiseOr,
        BinaryOp::BitwiseAnd,
        BinaryOp::BitwiseXor,
        BinaryOp::LeftShift,
        BinaryOp::RightShift,
        BinaryOp::RightShiftUnsigned,
        BinaryOp::LogicalOr,
        BinaryOp::LogicalAnd,
        BinaryOp::Equals,
        BinaryOp::NotEquals,
        BinaryOp::LessThan,
        BinaryOp::LessThanOrEqual,
        BinaryOp::GreaterThan,
        BinaryOp::GreaterThanOrEqual,
    ];

    /// Returns the HEART name.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Modulo => "modulo",
            BinaryOp::BitwiseOr => "bitwise_or",
            BinaryOp::BitwiseAnd => "bitwise_and",
            BinaryOp::BitwiseXor => "bitwise_xor",
            BinaryOp::LeftShift => "left_shift",
            BinaryOp::RightShift => "right_shift",
            BinaryOp::RightShiftUnsigned => "right_shift_unsigned",
            BinaryOp::LogicalOr => "logical_or",
            BinaryOp::LogicalAnd => "logical_and",
            BinaryOp::Equals => "equals",
            BinaryOp::NotEquals => "not_equals",
            BinaryOp::LessThan => "less_than",
            BinaryOp::LessThanOrEqual => "less_than_or_equal",
            BinaryOp::GreaterThan => "greater_than",
            BinaryOp::GreaterThanOrEqual => "greater_than_or_equal",
        }
    }

    /// Looks up an operator by its HEART name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Returns `true` if the result is a bool regardless of operand types.
    pub fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::LogicalOr
                | BinaryOp::LogicalAnd
                | BinaryOp::Equals
                | BinaryOp::NotEquals
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }
}

/// A property of the processor the code runs in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ProcessorProperty {
    /// Seconds per frame.
    Period,
    /// Frames per second.
    Frequency,
    /// The instance's unique number.
    Id,
}

impl ProcessorProperty {
    /// Returns the HEART name, used after `processor.`.
    pub fn name(self) -> &'static str {
        match self {
            ProcessorProperty::Period => "period",
            ProcessorProperty::Frequency => "frequency",
            ProcessorProperty::Id => "id",
        }
    }

    /// Looks up a property by its HEART name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "period" => Some(ProcessorProperty::Period),
            "frequency" => Some(ProcessorProperty::Frequency),
            "id" => Some(ProcessorProperty::Id),
            _ => None,
        }
    }
}

/// How a sub-element is selected from its parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SubElementIndex {
    /// A constant element index.
    Fixed(u32),
    /// A runtime element index.
    Dynamic(Box<Expr>),
    /// A struct member by name.
    Member(String),
    /// The half-open element range `start..end`.
    Slice(u32, u32),
}

/// A side-effect-free expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Reads a variable.
    Variable(VariableId),
    /// A constant from the program's table.
    Constant(ConstantId),
    /// An element, member or slice of another value.
    SubElement {
        /// The value being indexed.
        parent: Box<Expr>,
        /// Which part of it.
        index: SubElementIndex,
    },
    /// An explicit conversion.
    Cast {
        /// The target type.
        ty: Type,
        /// The converted value.
        source: Box<Expr>,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        source: Box<Expr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// The left operand.
        lhs: Box<Expr>,
        /// The right operand.
        rhs: Box<Expr>,
    },
    /// A call to a function without side effects.
    PureCall {
        /// The callee.
        function: FunctionId,
        /// The arguments.
        args: Vec<Expr>,
    },
    /// A processor property such as the sample period.
    ProcessorProperty(ProcessorProperty),
}

impl Expr {
    /// Builds a binary expression.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Builds a constant element access.
    pub fn element(self, index: u32) -> Self {
        Expr::SubElement {
            parent: Box::new(self),
            index: SubElementIndex::Fixed(index),
        }
    }

    /// Builds a struct member access.
    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::SubElement {
            parent: Box::new(self),
            index: SubElementIndex::Member(name.into()),
        }
    }

    /// Visits this expression and every nested one, parents first.
    pub fn walk(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Variable(_) | Expr::Constant(_) | Expr::ProcessorProperty(_) => {}
            Expr::SubElement { parent, index } => {
                parent.walk(f);
                if let SubElementIndex::Dynamic(index) = index {
                    index.walk(f);
                }
            }
            Expr::Cast { source, .. } | Expr::Unary { source, .. } => source.walk(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            Expr::PureCall { args, .. } => args.iter().for_each(|a| a.walk(f)),
        }
    }

    /// Returns the variable at the root of an lvalue chain such as `$x[2].y`.
    pub fn root_variable(&self) -> Option<VariableId> {
        match self {
            Expr::Variable(v) => Some(*v),
            Expr::SubElement { parent, .. } => parent.root_variable(),
            _ => None,
        }
    }
}

/// A statement inside a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Stores a value.
    Assign {
        /// The lvalue written.
        target: Expr,
        /// The value stored.
        value: Expr,
    },
    /// Calls a function, optionally storing its result.
    Call {
        /// Where the result goes.
        target: Option<Expr>,
        /// The callee.
        function: FunctionId,
        /// The arguments.
        args: Vec<Expr>,
    },
    /// Reads the current frame of a stream or value input.
    ReadStream {
        /// Where the value goes.
        target: Expr,
        /// The input endpoint name.
        endpoint: String,
    },
    /// Writes to an output, or sends an event.
    WriteStream {
        /// The output endpoint name.
        endpoint: String,
        /// The element of an endpoint array.
        element: Option<Expr>,
        /// The value written.
        value: Expr,
    },
    /// Commits the current frame and waits for the next.
    AdvanceClock,
}

impl Statement {
    /// Visits every expression in the statement, including nested ones.
    pub fn walk_exprs(&self, f: &mut impl FnMut(&Expr)) {
        match self {
            Statement::Assign { target, value } => {
                target.walk(f);
                value.walk(f);
            }
            Statement::Call { target, args, .. } => {
                if let Some(target) = target {
                    target.walk(f);
                }
                args.iter().for_each(|a| a.walk(f));
            }
            Statement::ReadStream { target, .. } => target.walk(f),
            Statement::WriteStream { element, value, .. } => {
                if let Some(element) = element {
                    element.walk(f);
                }
                value.walk(f);
            }
            Statement::AdvanceClock => {}
        }
    }

    /// Returns every function this statement calls, including pure calls
    /// inside its expressions.
    pub fn called_functions(&self) -> Vec<FunctionId> {
        let mut calls = Vec::new();
        if let Statement::Call { function, .. } = self {
            calls.push(*function);
        }
        self.walk_exprs(&mut |e| {
            if let Expr::PureCall { function, .. } = e {
                calls.push(*function);
            }
        });
        calls
    }
}

/// The final instruction of a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Terminator {
    /// Jumps to a block, passing its parameters.
    Branch {
        /// The destination.
        target: BlockId,
        /// Arguments for the destination's parameters.
        args: Vec<Expr>,
    },
    /// Jumps to one of two blocks.
    BranchIf {
        /// The bool deciding the branch.
        condition: Expr,
        /// The true and false destinations.
        targets: [BlockId; 2],
        /// Arguments for each destination.
        args: [Vec<Expr>; 2],
    },
    /// Returns from a void function.
    ReturnVoid,
    /// Returns a value.
    ReturnValue(Expr),
}

impl Terminator {
    /// Returns the blocks this terminator can jump to.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Branch { target, .. } => vec![*target],
            Terminator::BranchIf { targets, .. } => targets.to_vec(),
            Terminator::ReturnVoid | Terminator::ReturnValue(_) => Vec::new(),
        }
    }

    /// Returns `true` for either kind of return.
    pub fn is_return(&self) -> bool {
        matches!(self, Terminator::ReturnVoid | Terminator::ReturnValue(_))
    }

    /// Visits every expression in the terminator, including nested ones.
    pub fn walk_exprs(&self, f: &mut impl FnMut(&Expr)) {
        match self {
            Terminator::Branch { args, .. } => args.iter().for_each(|a| a.walk(f)),
            Terminator::BranchIf { condition, args, .. } => {
                condition.walk(f);
                args.iter().flatten().for_each(|a| a.walk(f));
            }
            Terminator::ReturnVoid => {}
            Terminator::ReturnValue(value) => value.walk(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_names_roundtrip() {
        for op in BinaryOp::ALL {
            assert_eq!(BinaryOp::from_name(op.name()), Some(op));
        }
        for op in UnaryOp::ALL {
            assert_eq!(UnaryOp::from_name(op.name()), Some(op));
        }
        assert!(BinaryOp::LessThan.yields_bool());
        assert!(!BinaryOp::Multiply.yields_bool());
    }

    #[test]
    fn called_functions_include_pure_calls() {
        let helper = FunctionId::from_raw(3);
        let callee = FunctionId::from_raw(4);
        let stmt = Statement::Call {
            target: None,
            function: callee,
            args: vec![Expr::PureCall {
                function: helper,
                args: vec![],
            }],
        };
        assert_eq!(stmt.called_functions(), vec![callee, helper]);
    }

    #[test]
    fn root_variable_of_lvalue() {
        let v = VariableId::from_raw(1);
        let lvalue = Expr::Variable(v).element(2).member("gain");
        assert_eq!(lvalue.root_variable(), Some(v));
        assert_eq!(Expr::Constant(ConstantId::from_raw(0)).root_variable(), None);
    }

    #[test]
    fn successors() {
        let a = BlockId::from_raw(1);
        let b = BlockId::from_raw(2);
        let cond = Terminator::BranchIf {
            condition: Expr::Constant(ConstantId::from_raw(0)),
            targets: [a, b],
            args: [vec![], vec![]],
        };
        assert_eq!(cond.successors(), vec![a, b]);
        assert!(Terminator::ReturnVoid.successors().is_empty());
        assert!(Terminator::ReturnVoid.is_return());
    }
}
