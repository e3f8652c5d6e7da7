//! Result types of expressions.

use crate::program::Program;
use crate::stmt::{Expr, ProcessorProperty, SubElementIndex, UnaryOp};
use crate::types::Type;

impl Program {
    /// Returns the type an expression evaluates to.
    ///
    /// Indexing something that has no elements yields `void`, which every
    /// type check downstream rejects.
    pub fn expr_type(&self, expr: &Expr) -> Type {
        match expr {
            Expr::Variable(v) => self.variables[*v].ty.clone(),
            Expr::Constant(c) => self.constants.get(*c).ty(),
            Expr::SubElement { parent, index } => {
                let parent_type = self.expr_type(parent);
                self.sub_element_type(&parent_type, index)
            }
            Expr::Cast { ty, .. } => ty.clone(),
            Expr::Unary { op, source } => match op {
                UnaryOp::LogicalNot => Type::bool(),
                _ => self.expr_type(source).remove_qualifiers().clone(),
            },
            Expr::Binary { op, lhs, .. } => {
                if op.yields_bool() {
                    Type::bool()
                } else {
                    self.expr_type(lhs).remove_qualifiers().clone()
                }
            }
            Expr::PureCall { function, .. } => self.functions[*function].return_type.clone(),
            Expr::ProcessorProperty(property) => match property {
                ProcessorProperty::Period | ProcessorProperty::Frequency => Type::float64(),
                ProcessorProperty::Id => Type::int32(),
            },
        }
    }

    fn sub_element_type(&self, parent: &Type, index: &SubElementIndex) -> Type {
        let parent = parent.remove_qualifiers();
        match index {
            SubElementIndex::Fixed(_) | SubElementIndex::Dynamic(_) => {
                parent.element_type().unwrap_or_else(Type::void)
            }
            SubElementIndex::Member(name) => match parent {
                Type::Struct(id) => self.structs[*id]
                    .members
                    .iter()
                    .find(|m| &m.name == name)
                    .map_or_else(Type::void, |m| m.ty.clone()),
                _ => Type::void(),
            },
            SubElementIndex::Slice(start, end) => {
                let len = end.saturating_sub(*start);
                match parent {
                    Type::Vector { element, .. } => Type::vector(*element, len),
                    Type::Array { element, .. } => Type::array((**element).clone(), len),
                    _ => Type::void(),
                }
            }
        }
    }
}
