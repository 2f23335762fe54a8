//! The kestrel HIR type system.
//!
//! Provides the complete set of types used by the middle-end: primitives
//! (`bool`, `char`, sized integers, floats, `void`), pointers, arrays with
//! per-dimension sizes, tuples, function types, named external references,
//! and `string`.
//!
//! Types are structural: two types with the same shape are the same type.
//! Structural identity is enforced by the [`TypeFactory`](crate::type_factory::TypeFactory),
//! which interns every constructed type and hands out [`TypeId`]s with O(1)
//! equality.

use serde::{Deserialize, Serialize};

use crate::type_factory::TypeId;

/// Primitive (scalar) type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Bool,
    Char,
    Float32,
    Float64,
    Int16,
    Int32,
    Int64,
    Int8,
    UInt16,
    UInt32,
    UInt64,
    UInt8,
    Void,
}

impl PrimitiveType {
    /// The lowercase name used by the textual formatter.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Char => "char",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::Float64 => "float64",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::UInt16 => "uint16",
            PrimitiveType::UInt32 => "uint32",
            PrimitiveType::UInt64 => "uint64",
            PrimitiveType::UInt8 => "uint8",
            PrimitiveType::Void => "void",
        }
    }

    /// Number of bits a value of this type occupies. `bool` is 1, `void` 0.
    pub fn bit_size(self) -> u32 {
        match self {
            PrimitiveType::Bool => 1,
            PrimitiveType::Char => 16,
            PrimitiveType::Float32 => 32,
            PrimitiveType::Float64 => 64,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 16,
            PrimitiveType::Int32 | PrimitiveType::UInt32 => 32,
            PrimitiveType::Int64 | PrimitiveType::UInt64 => 64,
            PrimitiveType::Int8 | PrimitiveType::UInt8 => 8,
            PrimitiveType::Void => 0,
        }
    }

    /// Returns `true` for the signed integer kinds.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::Int8 | PrimitiveType::Int16 | PrimitiveType::Int32 | PrimitiveType::Int64
        )
    }

    pub fn register_class(self) -> RegisterClass {
        match self {
            PrimitiveType::Bool | PrimitiveType::Char => RegisterClass::General,
            PrimitiveType::Float32 | PrimitiveType::Float64 => RegisterClass::Float,
            PrimitiveType::Int8
            | PrimitiveType::Int16
            | PrimitiveType::Int32
            | PrimitiveType::Int64
            | PrimitiveType::UInt8
            | PrimitiveType::UInt16
            | PrimitiveType::UInt32
            | PrimitiveType::UInt64 => RegisterClass::Integer,
            PrimitiveType::Void => RegisterClass::Void,
        }
    }
}

/// Which kind of register holds a value of a given type.
///
/// `General` and `Integer` are equivalent for allocation purposes; the
/// distinction is kept so the back end can tell address-like values from
/// arithmetic ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterClass {
    Float,
    General,
    Integer,
    Tuple,
    Void,
}

/// A kestrel HIR type. Each variant represents a distinct kind of type.
///
/// Nested types refer to other types by [`TypeId`]; the factory guarantees
/// the ids are valid within the factory that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HirType {
    /// Primitive scalar type.
    Primitive(PrimitiveType),

    /// Pointer to another type: `T*`.
    Pointer { pointee: TypeId },

    /// Array with per-dimension sizes. A dimension of `-1` is unbounded.
    Array { element: TypeId, dimensions: Vec<i32> },

    /// Tuple of two or more non-void member types.
    Tuple { members: Vec<TypeId> },

    /// Function type: return type plus parameters type. The parameters type
    /// is a single type -- `void` for no parameters, a tuple for several.
    Function {
        return_type: TypeId,
        parameters_type: TypeId,
    },

    /// Named external reference type (class, interface, struct).
    External { name: String },

    /// The built-in string reference type.
    String,
}

impl HirType {
    pub fn register_class(&self) -> RegisterClass {
        match self {
            HirType::Primitive(kind) => kind.register_class(),
            HirType::Tuple { .. } => RegisterClass::Tuple,
            HirType::Pointer { .. }
            | HirType::Array { .. }
            | HirType::Function { .. }
            | HirType::External { .. }
            | HirType::String => RegisterClass::General,
        }
    }

    pub fn is_float(&self) -> bool {
        self.register_class() == RegisterClass::Float
    }

    pub fn is_integer(&self) -> bool {
        self.register_class() == RegisterClass::Integer
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_void(&self) -> bool {
        matches!(self, HirType::Primitive(PrimitiveType::Void))
    }

    /// Returns `true` for reference-like types whose default value is the
    /// typed `null` literal.
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            HirType::Pointer { .. } | HirType::Array { .. } | HirType::External { .. } | HirType::String
        )
    }
}
