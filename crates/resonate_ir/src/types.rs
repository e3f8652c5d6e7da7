//! The type algebra: primitives, vectors, arrays, structs, and the const and
//! reference qualifiers, together with the cast lattice used by connections,
//! branch arguments and specialisation.

use crate::arena::Arena;
use crate::ids::{ModuleId, StructId};
use resonate_source::Span;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A scalar type that can appear on its own or as a vector element.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PrimitiveType {
    /// No value.
    Void,
    /// A boolean.
    Bool,
    /// A 32-bit signed integer.
    Int32,
    /// A 64-bit signed integer.
    Int64,
    /// A 32-bit float.
    Float32,
    /// A 64-bit float.
    Float64,
    /// A fixed-point number.
    Fixed,
}

impl PrimitiveType {
    /// Returns the HEART keyword for this type.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Void => "void",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::Float64 => "float64",
            PrimitiveType::Fixed => "fixed",
        }
    }

    /// Looks up a primitive by its HEART keyword.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "void" => PrimitiveType::Void,
            "bool" => PrimitiveType::Bool,
            "int32" => PrimitiveType::Int32,
            "int64" => PrimitiveType::Int64,
            "float32" => PrimitiveType::Float32,
            "float64" => PrimitiveType::Float64,
            "fixed" => PrimitiveType::Fixed,
            _ => return None,
        })
    }

    /// Size in bytes when packed into a stack frame.
    pub fn packed_size(self) -> u64 {
        match self {
            PrimitiveType::Void => 0,
            PrimitiveType::Bool => 1,
            PrimitiveType::Int32 | PrimitiveType::Float32 | PrimitiveType::Fixed => 4,
            PrimitiveType::Int64 | PrimitiveType::Float64 => 8,
        }
    }

    /// Returns `true` for `int32` and `int64`.
    pub fn is_integer(self) -> bool {
        matches!(self, PrimitiveType::Int32 | PrimitiveType::Int64)
    }

    /// Returns `true` for `float32` and `float64`.
    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveType::Float32 | PrimitiveType::Float64)
    }
}

/// A complete type description.
///
/// Struct types refer to a [`Structure`] in the program's struct arena, so a
/// `Type` on its own cannot print a struct's name; use
/// [`Type::describe`] with a name lookup for that.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Type {
    /// A scalar primitive.
    Primitive(PrimitiveType),
    /// A fixed-size vector of primitives.
    Vector {
        /// The element type.
        element: PrimitiveType,
        /// The number of lanes.
        size: u32,
    },
    /// A fixed-size or unsized array.
    Array {
        /// The element type.
        element: Box<Type>,
        /// The number of elements, or `None` for an unsized array.
        size: Option<u32>,
    },
    /// A user-defined struct.
    Struct(StructId),
    /// A string literal handle.
    StringLiteral,
    /// A const-qualified type.
    Const(Box<Type>),
    /// A reference to a value of the inner type.
    Reference(Box<Type>),
}

impl Type {
    /// The `void` type.
    pub fn void() -> Self {
        Type::Primitive(PrimitiveType::Void)
    }

    /// The `bool` type.
    pub fn bool() -> Self {
        Type::Primitive(PrimitiveType::Bool)
    }

    /// The `int32` type.
    pub fn int32() -> Self {
        Type::Primitive(PrimitiveType::Int32)
    }

    /// The `int64` type.
    pub fn int64() -> Self {
        Type::Primitive(PrimitiveType::Int64)
    }

    /// The `float32` type.
    pub fn float32() -> Self {
        Type::Primitive(PrimitiveType::Float32)
    }

    /// The `float64` type.
    pub fn float64() -> Self {
        Type::Primitive(PrimitiveType::Float64)
    }

    /// A vector of `size` lanes of `element`.
    pub fn vector(element: PrimitiveType, size: u32) -> Self {
        Type::Vector { element, size }
    }

    /// A fixed-size array.
    pub fn array(element: Type, size: u32) -> Self {
        Type::Array {
            element: Box::new(element),
            size: Some(size),
        }
    }

    /// An unsized array.
    pub fn unsized_array(element: Type) -> Self {
        Type::Array {
            element: Box::new(element),
            size: None,
        }
    }

    /// Adds a const qualifier. A reference stays outermost, so `T&` becomes
    /// `const T&`.
    pub fn make_const(self) -> Self {
        match self {
            Type::Const(_) => self,
            Type::Reference(inner) => Type::Reference(Box::new(inner.make_const())),
            other => Type::Const(Box::new(other)),
        }
    }

    /// Turns the type into a reference, unless it already is one.
    pub fn make_reference(self) -> Self {
        match self {
            Type::Reference(_) => self,
            other => Type::Reference(Box::new(other)),
        }
    }

    /// Strips an outer reference.
    pub fn remove_reference(&self) -> &Type {
        match self {
            Type::Reference(inner) => inner,
            other => other,
        }
    }

    /// Strips an outer const qualifier.
    pub fn remove_const(&self) -> &Type {
        match self {
            Type::Const(inner) => inner,
            other => other,
        }
    }

    /// Strips the reference and then the const qualifier.
    pub fn remove_qualifiers(&self) -> &Type {
        self.remove_reference().remove_const()
    }

    /// Returns `true` for a reference type.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference(_))
    }

    /// Returns `true` if the value (ignoring references) is const.
    pub fn is_const(&self) -> bool {
        matches!(self.remove_reference(), Type::Const(_))
    }

    /// Returns `true` for `void`, ignoring qualifiers.
    pub fn is_void(&self) -> bool {
        matches!(self.remove_qualifiers(), Type::Primitive(PrimitiveType::Void))
    }

    /// Returns `true` for an array of either kind, ignoring qualifiers.
    pub fn is_array(&self) -> bool {
        matches!(self.remove_qualifiers(), Type::Array { .. })
    }

    /// Returns `true` for an array with a known size.
    pub fn is_fixed_size_array(&self) -> bool {
        matches!(self.remove_qualifiers(), Type::Array { size: Some(_), .. })
    }

    /// Returns `true` for an unsized array.
    pub fn is_unsized_array(&self) -> bool {
        matches!(self.remove_qualifiers(), Type::Array { size: None, .. })
    }

    /// Returns `true` for a vector, ignoring qualifiers.
    pub fn is_vector(&self) -> bool {
        matches!(self.remove_qualifiers(), Type::Vector { .. })
    }

    /// Returns `true` for a struct, ignoring qualifiers.
    pub fn is_struct(&self) -> bool {
        matches!(self.remove_qualifiers(), Type::Struct(_))
    }

    /// Returns the primitive of a scalar or of a vector's lanes.
    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self.remove_qualifiers() {
            Type::Primitive(p) => Some(*p),
            Type::Vector { element, .. } => Some(*element),
            _ => None,
        }
    }

    /// Returns the primitive if this is a scalar or a one-lane vector.
    pub fn scalar_primitive(&self) -> Option<PrimitiveType> {
        match self.remove_qualifiers() {
            Type::Primitive(p) => Some(*p),
            Type::Vector { element, size: 1 } => Some(*element),
            _ => None,
        }
    }

    /// Returns `true` for a scalar of an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(self.remove_qualifiers(), Type::Primitive(p) if p.is_integer())
    }

    /// Returns `true` for a scalar bool.
    pub fn is_bool(&self) -> bool {
        matches!(self.remove_qualifiers(), Type::Primitive(PrimitiveType::Bool))
    }

    /// Returns the element type of an array or vector.
    pub fn element_type(&self) -> Option<Type> {
        match self.remove_qualifiers() {
            Type::Array { element, .. } => Some((**element).clone()),
            Type::Vector { element, .. } => Some(Type::Primitive(*element)),
            _ => None,
        }
    }

    /// Returns the number of elements of a fixed array or vector.
    pub fn element_count(&self) -> Option<u32> {
        match self.remove_qualifiers() {
            Type::Array { size, .. } => *size,
            Type::Vector { size, .. } => Some(*size),
            _ => None,
        }
    }

    /// Size in bytes when packed into a stack frame.
    ///
    /// References, unsized arrays and strings are pointer-sized. Sizes too
    /// large for a `u64` saturate at `u64::MAX`.
    pub fn packed_size(&self, structs: &Arena<StructId, Structure>) -> u64 {
        match self {
            Type::Primitive(p) => p.packed_size(),
            Type::Vector { element, size } => element.packed_size().saturating_mul(u64::from(*size)),
            Type::Array {
                element,
                size: Some(size),
            } => element.packed_size(structs).saturating_mul(u64::from(*size)),
            Type::Array { size: None, .. } | Type::Reference(_) | Type::StringLiteral => 8,
            Type::Struct(id) => structs.try_get(*id).map_or(0, |s| {
                s.members
                    .iter()
                    .fold(0u64, |total, m| total.saturating_add(m.ty.packed_size(structs)))
            }),
            Type::Const(inner) => inner.packed_size(structs),
        }
    }

    /// Applies `map` to every struct ID inside this type.
    pub fn try_map_structs<E>(
        &self,
        map: &mut impl FnMut(StructId) -> Result<StructId, E>,
    ) -> Result<Type, E> {
        Ok(match self {
            Type::Struct(id) => Type::Struct(map(*id)?),
            Type::Array { element, size } => Type::Array {
                element: Box::new(element.try_map_structs(map)?),
                size: *size,
            },
            Type::Const(inner) => Type::Const(Box::new(inner.try_map_structs(map)?)),
            Type::Reference(inner) => Type::Reference(Box::new(inner.try_map_structs(map)?)),
            other => other.clone(),
        })
    }

    /// Formats the type in HEART syntax, using `struct_name` for struct
    /// types.
    pub fn describe(&self, struct_name: &dyn Fn(StructId) -> String) -> String {
        match self {
            Type::Primitive(p) => p.name().to_string(),
            Type::Vector { element, size } => format!("{}<{size}>", element.name()),
            Type::Array {
                element,
                size: Some(size),
            } => format!("{}[{size}]", element.describe(struct_name)),
            Type::Array { element, size: None } => format!("{}[]", element.describe(struct_name)),
            Type::Struct(id) => struct_name(*id),
            Type::StringLiteral => "string".to_string(),
            Type::Const(inner) => format!("const {}", inner.describe(struct_name)),
            Type::Reference(inner) => format!("{}&", inner.describe(struct_name)),
        }
    }
}

/// One named member of a [`Structure`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructMember {
    /// The member name.
    pub name: String,
    /// The member type.
    pub ty: Type,
}

/// A named struct with ordered members.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Structure {
    /// The unqualified struct name.
    pub name: String,
    /// The module that declares the struct.
    pub module: ModuleId,
    /// Members in declaration order.
    pub members: Vec<StructMember>,
    /// Where the struct was declared.
    pub span: Span,
}

impl Structure {
    /// Creates a struct with no members.
    pub fn new(name: impl Into<String>, module: ModuleId) -> Self {
        Self {
            name: name.into(),
            module,
            members: Vec::new(),
            span: Span::DUMMY,
        }
    }

    /// Returns the index of the named member.
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }
}

/// Finds a cycle of by-value struct containment that starts and ends at
/// `start`. The returned path begins with `start`.
///
/// Arrays of a struct count as containment; references do not.
pub fn find_struct_cycle(
    structs: &Arena<StructId, Structure>,
    start: StructId,
) -> Option<Vec<StructId>> {
    fn contained(ty: &Type, out: &mut Vec<StructId>) {
        match ty {
            Type::Struct(id) => out.push(*id),
            Type::Array { element, .. } => contained(element, out),
            Type::Const(inner) => contained(inner, out),
            _ => {}
        }
    }

    fn visit(
        structs: &Arena<StructId, Structure>,
        target: StructId,
        current: StructId,
        path: &mut Vec<StructId>,
        visited: &mut HashSet<StructId>,
    ) -> bool {
        let Some(structure) = structs.try_get(current) else {
            return false;
        };
        let mut children = Vec::new();
        for member in &structure.members {
            contained(&member.ty, &mut children);
        }
        for child in children {
            if child == target {
                return true;
            }
            if visited.insert(child) {
                path.push(child);
                if visit(structs, target, child, path, visited) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    let mut path = vec![start];
    let mut visited = HashSet::from([start]);
    visit(structs, start, start, &mut path, &mut visited).then_some(path)
}

/// How a value of one type converts into another.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CastKind {
    /// The types are the same.
    Identity,
    /// A widening numeric conversion that loses nothing.
    Lossless,
    /// A conversion that may lose precision; needs an explicit cast.
    Reduction,
    /// A single value broadcast into every element of an array or vector.
    ValueToArray,
    /// A fixed-size array passed where an unsized one is expected.
    FixedToUnsizedArray,
    /// A one-lane vector used as its scalar, or the reverse.
    SingleElementToScalar,
    /// No conversion exists.
    NotPossible,
}

impl CastKind {
    /// Returns `true` if the conversion may happen without an explicit cast.
    pub fn is_silent(self) -> bool {
        matches!(
            self,
            CastKind::Identity
                | CastKind::Lossless
                | CastKind::ValueToArray
                | CastKind::FixedToUnsizedArray
                | CastKind::SingleElementToScalar
        )
    }
}

/// The conversion rules between types.
pub struct TypeRules;

impl TypeRules {
    /// Classifies the conversion from `source` to `dest`.
    pub fn cast_kind(dest: &Type, source: &Type) -> CastKind {
        if let Type::Reference(dest_inner) = dest {
            let target = dest_inner.remove_const();
            let compatible = target == source.remove_qualifiers()
                && (dest_inner.is_const() || !source.is_const());
            return if compatible {
                CastKind::Identity
            } else {
                CastKind::NotPossible
            };
        }

        let d = dest.remove_qualifiers();
        let s = source.remove_qualifiers();

        if d == s {
            return CastKind::Identity;
        }
        if d.is_void() || s.is_void() {
            return CastKind::NotPossible;
        }
        if let (Some(dp), Some(sp)) = (d.scalar_primitive(), s.scalar_primitive()) {
            return match primitive_cast(dp, sp) {
                CastKind::Identity => CastKind::SingleElementToScalar,
                other => other,
            };
        }

        match d {
            Type::Array { element, size } => match s {
                Type::Array {
                    element: source_element,
                    size: Some(_),
                } if size.is_none() && source_element == element => CastKind::FixedToUnsizedArray,
                Type::Array {
                    element: source_element,
                    size: source_size,
                } if source_size == size => match Self::cast_kind(element, source_element) {
                    k if k.is_silent() => CastKind::Lossless,
                    CastKind::NotPossible => CastKind::NotPossible,
                    _ => CastKind::Reduction,
                },
                _ if size.is_some() && Self::cast_kind(element, s).is_silent() => CastKind::ValueToArray,
                _ => CastKind::NotPossible,
            },
            Type::Vector { element, size } => {
                if let Type::Vector {
                    element: source_element,
                    size: source_size,
                } = s
                {
                    if source_size == size {
                        return primitive_cast(*element, *source_element);
                    }
                    return CastKind::NotPossible;
                }
                match s.scalar_primitive().map(|sp| primitive_cast(*element, sp)) {
                    Some(k) if k.is_silent() => CastKind::ValueToArray,
                    Some(CastKind::Reduction) => CastKind::Reduction,
                    _ => CastKind::NotPossible,
                }
            }
            _ => CastKind::NotPossible,
        }
    }

    /// Returns `true` if `source` converts to `dest` without an explicit
    /// cast.
    pub fn can_silently_cast(dest: &Type, source: &Type) -> bool {
        Self::cast_kind(dest, source).is_silent()
    }

    /// Returns `true` if an explicit cast from `source` to `dest` exists.
    pub fn can_cast(dest: &Type, source: &Type) -> bool {
        Self::cast_kind(dest, source) != CastKind::NotPossible
    }

    /// Compares two frame types, treating a one-lane vector as its scalar.
    pub fn equal_ignoring_vector_size1(a: &Type, b: &Type) -> bool {
        fn normalise(ty: &Type) -> Type {
            match ty.remove_qualifiers() {
                Type::Vector { element, size: 1 } => Type::Primitive(*element),
                Type::Array { element, size } => Type::Array {
                    element: Box::new(normalise(element)),
                    size: *size,
                },
                other => other.clone(),
            }
        }
        normalise(a) == normalise(b)
    }
}

fn primitive_cast(dest: PrimitiveType, source: PrimitiveType) -> CastKind {
    use PrimitiveType::*;

    if dest == source {
        return CastKind::Identity;
    }
    match (dest, source) {
        (Void, _) | (_, Void) => CastKind::NotPossible,
        (Int64, Int32) => CastKind::Lossless,
        (Float64, Int32 | Int64 | Float32) => CastKind::Lossless,
        _ => CastKind::Reduction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_names(_: StructId) -> String {
        "S".to_string()
    }

    #[test]
    fn descriptions() {
        assert_eq!(Type::vector(PrimitiveType::Float32, 4).describe(&no_names), "float32<4>");
        assert_eq!(Type::array(Type::int32(), 8).describe(&no_names), "int32[8]");
        assert_eq!(Type::unsized_array(Type::float64()).describe(&no_names), "float64[]");
        assert_eq!(
            Type::float32().make_reference().make_const().describe(&no_names),
            "const float32&"
        );
        assert_eq!(Type::Struct(StructId::from_raw(0)).describe(&no_names), "S");
    }

    #[test]
    fn const_stays_inside_reference() {
        let ty = Type::int32().make_reference().make_const();
        assert!(ty.is_reference());
        assert!(ty.is_const());
        assert_eq!(ty.remove_qualifiers(), &Type::int32());
    }

    #[test]
    fn lossless_casts() {
        assert!(TypeRules::can_silently_cast(&Type::int64(), &Type::int32()));
        assert!(TypeRules::can_silently_cast(&Type::float64(), &Type::int32()));
        assert!(TypeRules::can_silently_cast(&Type::float64(), &Type::float32()));
        assert!(!TypeRules::can_silently_cast(&Type::int32(), &Type::int64()));
        assert!(!TypeRules::can_silently_cast(&Type::float32(), &Type::float64()));
        assert!(!TypeRules::can_silently_cast(&Type::float32(), &Type::int32()));
        assert!(TypeRules::can_cast(&Type::float32(), &Type::float64()));
    }

    #[test]
    fn vector_and_array_casts() {
        let f4 = Type::vector(PrimitiveType::Float32, 4);
        assert!(TypeRules::can_silently_cast(&f4, &Type::float32()));
        let v1 = Type::vector(PrimitiveType::Float32, 1);
        assert_eq!(TypeRules::cast_kind(&Type::float32(), &v1), CastKind::SingleElementToScalar);
        assert!(TypeRules::can_silently_cast(&Type::array(Type::float32(), 4), &Type::float32()));
        assert_eq!(
            TypeRules::cast_kind(&Type::unsized_array(Type::int32()), &Type::array(Type::int32(), 3)),
            CastKind::FixedToUnsizedArray
        );
        assert!(!TypeRules::can_silently_cast(&Type::array(Type::int32(), 3), &Type::array(Type::int32(), 4)));
        assert!(!TypeRules::can_silently_cast(&Type::void(), &Type::int32()));
    }

    #[test]
    fn references_need_exact_types() {
        let float_ref = Type::float32().make_reference();
        assert!(TypeRules::can_silently_cast(&float_ref, &Type::float32()));
        assert!(!TypeRules::can_silently_cast(&float_ref, &Type::float64()));
        assert!(!TypeRules::can_silently_cast(&float_ref, &Type::float32().make_const()));
        let const_ref = Type::float32().make_reference().make_const();
        assert!(TypeRules::can_silently_cast(&const_ref, &Type::float32().make_const()));
    }

    #[test]
    fn frame_type_comparison() {
        let v1 = Type::vector(PrimitiveType::Float32, 1);
        assert!(TypeRules::equal_ignoring_vector_size1(&v1, &Type::float32()));
        assert!(!TypeRules::equal_ignoring_vector_size1(
            &Type::vector(PrimitiveType::Float32, 2),
            &Type::float32()
        ));
        assert!(TypeRules::equal_ignoring_vector_size1(&Type::float32().make_const(), &Type::float32()));
    }

    #[test]
    fn packed_sizes() {
        let mut structs: Arena<StructId, Structure> = Arena::new();
        let mut voice = Structure::new("Voice", ModuleId::from_raw(0));
        voice.members.push(StructMember { name: "gain".into(), ty: Type::float32() });
        voice.members.push(StructMember { name: "phase".into(), ty: Type::float64() });
        let id = structs.alloc(voice);
        assert_eq!(Type::Struct(id).packed_size(&structs), 12);
        assert_eq!(Type::array(Type::Struct(id), 4).packed_size(&structs), 48);
        assert_eq!(Type::vector(PrimitiveType::Int32, 4).packed_size(&structs), 16);
        assert_eq!(Type::int64().make_reference().packed_size(&structs), 8);
        assert_eq!(Type::bool().packed_size(&structs), 1);

        let huge = Type::array(Type::array(Type::float64(), u32::MAX), u32::MAX);
        assert_eq!(huge.packed_size(&structs), u64::MAX);
    }

    #[test]
    fn struct_cycles() {
        let mut structs: Arena<StructId, Structure> = Arena::new();
        let a = structs.alloc(Structure::new("A", ModuleId::from_raw(0)));
        let b = structs.alloc(Structure::new("B", ModuleId::from_raw(0)));
        structs[a].members.push(StructMember { name: "b".into(), ty: Type::array(Type::Struct(b), 2) });
        assert!(find_struct_cycle(&structs, a).is_none());

        structs[b].members.push(StructMember { name: "a".into(), ty: Type::Struct(a) });
        assert_eq!(find_struct_cycle(&structs, a), Some(vec![a, b]));
    }

    #[test]
    fn references_do_not_form_struct_cycles() {
        let mut structs: Arena<StructId, Structure> = Arena::new();
        let a = structs.alloc(Structure::new("A", ModuleId::from_raw(0)));
        structs[a].members.push(StructMember {
            name: "next".into(),
            ty: Type::Struct(a).make_reference(),
        });
        assert!(find_struct_cycle(&structs, a).is_none());
        structs[a].members.push(StructMember { name: "me".into(), ty: Type::Struct(a) });
        assert_eq!(find_struct_cycle(&structs, a), Some(vec![a]));
    }

    #[test]
    fn primitive_names_roundtrip() {
        for p in [PrimitiveType::Bool, PrimitiveType::Int64, PrimitiveType::Fixed] {
            assert_eq!(PrimitiveType::from_name(p.name()), Some(p));
        }
        assert_eq!(PrimitiveType::from_name("float16"), None);
    }
}
