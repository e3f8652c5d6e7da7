//! Typed constant values.

use crate::types::{PrimitiveType, Type};
use resonate_common::Ident;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A constant of a known type.
///
/// Equality and hashing are structural. Floats compare by bit pattern, so
/// `NaN == NaN` and `0.0 != -0.0`, which is what constant interning needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    /// The void value.
    Void,
    /// A boolean.
    Bool(bool),
    /// A 32-bit integer.
    Int32(i32),
    /// A 64-bit integer.
    Int64(i64),
    /// A 32-bit float.
    Float32(f32),
    /// A 64-bit float.
    Float64(f64),
    /// A string literal held in the program's string dictionary.
    String(Ident),
    /// An array, vector or struct value with one value per element.
    Aggregate {
        /// The aggregate's type.
        ty: Type,
        /// Element or member values, in order.
        elements: Vec<Value>,
    },
    /// The zero value of a type.
    Zero(Type),
}

impl Value {
    /// Builds an aggregate, collapsing an empty element list to a zero value.
    pub fn aggregate(ty: Type, elements: Vec<Value>) -> Self {
        if elements.is_empty() {
            Value::Zero(ty)
        } else {
            Value::Aggregate { ty, elements }
        }
    }

    /// Returns the type of this value.
    pub fn ty(&self) -> Type {
        match self {
            Value::Void => Type::void(),
            Value::Bool(_) => Type::bool(),
            Value::Int32(_) => Type::int32(),
            Value::Int64(_) => Type::int64(),
            Value::Float32(_) => Type::float32(),
            Value::Float64(_) => Type::float64(),
            Value::String(_) => Type::StringLiteral,
            Value::Aggregate { ty, .. } | Value::Zero(ty) => ty.clone(),
        }
    }

    /// Returns the value as an integer, if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::Zero(ty) if ty.is_integer() => Some(0),
            _ => None,
        }
    }

    /// Returns the value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Zero(ty) if ty.is_bool() => Some(false),
            _ => None,
        }
    }

    /// Returns a numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Converts a scalar to another primitive type. Aggregates and strings
    /// only convert to their own type.
    pub fn cast_to(&self, ty: &Type) -> Option<Value> {
        let target = ty.remove_qualifiers();
        if &self.ty() == target {
            return Some(self.clone());
        }
        let primitive = target.scalar_primitive()?;
        let integer = || self.as_i64().or_else(|| self.as_f64().map(|f| f as i64));
        let converted = match primitive {
            PrimitiveType::Bool => Value::Bool(self.as_f64()? != 0.0),
            PrimitiveType::Int32 => Value::Int32(integer()? as i32),
            PrimitiveType::Int64 => Value::Int64(integer()?),
            PrimitiveType::Float32 => Value::Float32(self.as_f64()? as f32),
            PrimitiveType::Float64 => Value::Float64(self.as_f64()?),
            PrimitiveType::Void | PrimitiveType::Fixed => return None,
        };
        Some(converted)
    }

    /// Rebuilds the value with every embedded type and string passed
    /// through the given maps.
    pub fn try_rewrite<E>(
        &self,
        map_type: &mut impl FnMut(&Type) -> Result<Type, E>,
        map_string: &mut impl FnMut(Ident) -> Result<Ident, E>,
    ) -> Result<Value, E> {
        Ok(match self {
            Value::String(ident) => Value::String(map_string(*ident)?),
            Value::Zero(ty) => Value::Zero(map_type(ty)?),
            Value::Aggregate { ty, elements } => Value::Aggregate {
                ty: map_type(ty)?,
                elements: elements
                    .iter()
                    .map(|e| e.try_rewrite(map_type, map_string))
                    .collect::<Result<_, E>>()?,
            },
            other => other.clone(),
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (
                Value::Aggregate { ty: t1, elements: e1 },
                Value::Aggregate { ty: t2, elements: e2 },
            ) => t1 == t2 && e1 == e2,
            (Value::Zero(a), Value::Zero(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Void => {}
            Value::Bool(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float32(v) => v.to_bits().hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Aggregate { ty, elements } => {
                ty.hash(state);
                elements.hash(state);
            }
            Value::Zero(ty) => ty.hash(state),
        }
    }
}
