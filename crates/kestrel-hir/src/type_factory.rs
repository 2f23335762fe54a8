//! TypeId and the interning TypeFactory.
//!
//! Every type has a unique [`TypeId`] providing O(1) structural identity:
//! two `pointer_type` / `array_type` / `tuple_type` / `function_type` /
//! `external_type` calls with structurally equal arguments return the same
//! id. The factory pre-registers the 13 primitive types plus `string` on
//! construction.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{HirType, PrimitiveType, RegisterClass};

/// Unique identifier for a type within its [`TypeFactory`].
///
/// The inner value is an index into the factory's type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Pre-registered TypeId constants for built-in types.
impl TypeId {
    pub const BOOL: TypeId = TypeId(0);
    pub const CHAR: TypeId = TypeId(1);
    pub const FLOAT32: TypeId = TypeId(2);
    pub const FLOAT64: TypeId = TypeId(3);
    pub const INT16: TypeId = TypeId(4);
    pub const INT32: TypeId = TypeId(5);
    pub const INT64: TypeId = TypeId(6);
    pub const INT8: TypeId = TypeId(7);
    pub const UINT16: TypeId = TypeId(8);
    pub const UINT32: TypeId = TypeId(9);
    pub const UINT64: TypeId = TypeId(10);
    pub const UINT8: TypeId = TypeId(11);
    pub const VOID: TypeId = TypeId(12);
    pub const STRING: TypeId = TypeId(13);
}

/// Structural key for the intern table. Primitives and `string` are
/// pre-registered and never looked up through the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Pointer(TypeId),
    Array(TypeId, Vec<i32>),
    Tuple(Vec<TypeId>),
    Function(TypeId, TypeId),
    External(String),
}

/// Interning factory for all types of one compilation session.
///
/// Types are immortal within their factory: ids stay valid for the factory's
/// lifetime and constructed types are never removed.
#[derive(Debug, Clone)]
pub struct TypeFactory {
    /// Types indexed by TypeId.0
    types: Vec<HirType>,
    /// Structural intern table for composite types.
    interned: HashMap<TypeKey, TypeId>,
}

impl TypeFactory {
    /// Number of built-in types pre-registered on construction.
    const BUILTIN_COUNT: u32 = 14;

    /// Creates a factory with the 13 primitive types and `string`
    /// pre-registered at the [`TypeId`] constants.
    pub fn new() -> Self {
        let types = vec![
            HirType::Primitive(PrimitiveType::Bool),
            HirType::Primitive(PrimitiveType::Char),
            HirType::Primitive(PrimitiveType::Float32),
            HirType::Primitive(PrimitiveType::Float64),
            HirType::Primitive(PrimitiveType::Int16),
            HirType::Primitive(PrimitiveType::Int32),
            HirType::Primitive(PrimitiveType::Int64),
            HirType::Primitive(PrimitiveType::Int8),
            HirType::Primitive(PrimitiveType::UInt16),
            HirType::Primitive(PrimitiveType::UInt32),
            HirType::Primitive(PrimitiveType::UInt64),
            HirType::Primitive(PrimitiveType::UInt8),
            HirType::Primitive(PrimitiveType::Void),
            HirType::String,
        ];
        debug_assert_eq!(types.len() as u32, Self::BUILTIN_COUNT);

        TypeFactory {
            types,
            interned: HashMap::new(),
        }
    }

    fn intern(&mut self, key: TypeKey, ty: HirType) -> TypeId {
        if let Some(&id) = self.interned.get(&key) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        self.interned.insert(key, id);
        id
    }

    /// Returns the pre-registered [`TypeId`] for a primitive kind.
    pub fn primitive_type(&self, kind: PrimitiveType) -> TypeId {
        match kind {
            PrimitiveType::Bool => TypeId::BOOL,
            PrimitiveType::Char => TypeId::CHAR,
            PrimitiveType::Float32 => TypeId::FLOAT32,
            PrimitiveType::Float64 => TypeId::FLOAT64,
            PrimitiveType::Int16 => TypeId::INT16,
            PrimitiveType::Int32 => TypeId::INT32,
            PrimitiveType::Int64 => TypeId::INT64,
            PrimitiveType::Int8 => TypeId::INT8,
            PrimitiveType::UInt16 => TypeId::UINT16,
            PrimitiveType::UInt32 => TypeId::UINT32,
            PrimitiveType::UInt64 => TypeId::UINT64,
            PrimitiveType::UInt8 => TypeId::UINT8,
            PrimitiveType::Void => TypeId::VOID,
        }
    }

    pub fn bool_type(&self) -> TypeId {
        TypeId::BOOL
    }

    pub fn void_type(&self) -> TypeId {
        TypeId::VOID
    }

    pub fn string_type(&self) -> TypeId {
        TypeId::STRING
    }

    /// Returns the interned pointer type `pointee*`.
    pub fn pointer_type(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeKey::Pointer(pointee), HirType::Pointer { pointee })
    }

    /// Returns the interned array type with the given element type and
    /// per-dimension sizes. A dimension of `-1` is unbounded.
    pub fn array_type(&mut self, element: TypeId, dimensions: &[i32]) -> TypeId {
        debug_assert!(!dimensions.is_empty());
        debug_assert!(dimensions.iter().all(|&d| d >= -1));
        self.intern(
            TypeKey::Array(element, dimensions.to_vec()),
            HirType::Array {
                element,
                dimensions: dimensions.to_vec(),
            },
        )
    }

    /// Returns the interned tuple type. Tuples have at least two members and
    /// no `void` member.
    pub fn tuple_type(&mut self, members: &[TypeId]) -> TypeId {
        debug_assert!(members.len() >= 2);
        debug_assert!(members.iter().all(|&m| m != TypeId::VOID));
        self.intern(
            TypeKey::Tuple(members.to_vec()),
            HirType::Tuple {
                members: members.to_vec(),
            },
        )
    }

    /// Returns the interned function type `return_type(parameters_type)`.
    ///
    /// `parameters_type` is a single type: `void` for a nullary function, a
    /// tuple for more than one parameter.
    pub fn function_type(&mut self, return_type: TypeId, parameters_type: TypeId) -> TypeId {
        self.intern(
            TypeKey::Function(return_type, parameters_type),
            HirType::Function {
                return_type,
                parameters_type,
            },
        )
    }

    /// Returns the interned external reference type with the given name.
    pub fn external_type(&mut self, name: &str) -> TypeId {
        self.intern(
            TypeKey::External(name.to_string()),
            HirType::External {
                name: name.to_string(),
            },
        )
    }

    /// Looks up a type by id.
    pub fn get(&self, id: TypeId) -> Option<&HirType> {
        self.types.get(id.0 as usize)
    }

    /// Looks up a type by id, panicking on an unknown id. Unknown ids are
    /// internal inconsistencies: every `TypeId` handed out by this factory
    /// stays valid for its lifetime.
    pub fn kind(&self, id: TypeId) -> &HirType {
        &self.types[id.0 as usize]
    }

    pub fn register_class(&self, id: TypeId) -> RegisterClass {
        self.kind(id).register_class()
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        id == TypeId::VOID
    }

    /// Returns the pointee type if `id` is a pointer type.
    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            HirType::Pointer { pointee } => Some(*pointee),
            _ => None,
        }
    }

    /// Returns `(return_type, parameters_type)` if `id` is a function type.
    pub fn function_parts(&self, id: TypeId) -> Option<(TypeId, TypeId)> {
        match self.kind(id) {
            HirType::Function {
                return_type,
                parameters_type,
            } => Some((*return_type, *parameters_type)),
            _ => None,
        }
    }
}

impl Default for TypeFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_factory_has_builtin_types() {
        let factory = TypeFactory::new();
        assert!(matches!(
            factory.kind(TypeId::BOOL),
            HirType::Primitive(PrimitiveType::Bool)
        ));
        assert!(matches!(
            factory.kind(TypeId::INT32),
            HirType::Primitive(PrimitiveType::Int32)
        ));
        assert!(matches!(
            factory.kind(TypeId::VOID),
            HirType::Primitive(PrimitiveType::Void)
        ));
        assert!(matches!(factory.kind(TypeId::STRING), HirType::String));
    }

    #[test]
    fn primitive_type_ids_are_stable() {
        let factory = TypeFactory::new();
        assert_eq!(factory.primitive_type(PrimitiveType::Bool), TypeId::BOOL);
        assert_eq!(factory.primitive_type(PrimitiveType::Int32), TypeId::INT32);
        assert_eq!(factory.primitive_type(PrimitiveType::UInt8), TypeId::UINT8);
        assert_eq!(factory.primitive_type(PrimitiveType::Void), TypeId::VOID);
    }

    #[test]
    fn pointer_type_interns() {
        let mut factory = TypeFactory::new();
        let a = factory.pointer_type(TypeId::INT32);
        let b = factory.pointer_type(TypeId::INT32);
        assert_eq!(a, b);

        let c = factory.pointer_type(TypeId::BOOL);
        assert_ne!(a, c);
        assert_eq!(factory.pointee(a), Some(TypeId::INT32));
    }

    #[test]
    fn array_type_interns_by_element_and_dimensions() {
        let mut factory = TypeFactory::new();
        let a = factory.array_type(TypeId::INT32, &[-1]);
        let b = factory.array_type(TypeId::INT32, &[-1]);
        assert_eq!(a, b);

        let c = factory.array_type(TypeId::INT32, &[4]);
        let d = factory.array_type(TypeId::INT32, &[4, 2]);
        assert_ne!(a, c);
        assert_ne!(c, d);
    }

    #[test]
    fn tuple_type_interns_by_member_sequence() {
        let mut factory = TypeFactory::new();
        let a = factory.tuple_type(&[TypeId::INT32, TypeId::BOOL]);
        let b = factory.tuple_type(&[TypeId::INT32, TypeId::BOOL]);
        assert_eq!(a, b);

        // Order matters.
        let c = factory.tuple_type(&[TypeId::BOOL, TypeId::INT32]);
        assert_ne!(a, c);
    }

    #[test]
    fn function_type_interns_by_return_and_parameters() {
        let mut factory = TypeFactory::new();
        let a = factory.function_type(TypeId::INT32, TypeId::VOID);
        let b = factory.function_type(TypeId::INT32, TypeId::VOID);
        assert_eq!(a, b);

        let c = factory.function_type(TypeId::VOID, TypeId::VOID);
        assert_ne!(a, c);
        assert_eq!(factory.function_parts(a), Some((TypeId::INT32, TypeId::VOID)));
    }

    #[test]
    fn external_type_interns_by_name() {
        let mut factory = TypeFactory::new();
        let a = factory.external_type("System.Console");
        let b = factory.external_type("System.Console");
        assert_eq!(a, b);
        assert_ne!(a, factory.external_type("System.Object"));
    }

    #[test]
    fn nested_composite_types() {
        let mut factory = TypeFactory::new();
        let ptr = factory.pointer_type(TypeId::INT32);
        let ptr_ptr = factory.pointer_type(ptr);
        assert_eq!(factory.pointee(ptr_ptr), Some(ptr));

        let again = factory.pointer_type(factory.pointee(ptr_ptr).unwrap());
        assert_eq!(again, ptr);
    }

    #[test]
    fn get_out_of_range_returns_none() {
        let factory = TypeFactory::new();
        assert!(factory.get(TypeId(999)).is_none());
    }

    proptest! {
        #[test]
        fn array_interning_is_idempotent(dims in proptest::collection::vec(-1i32..16, 1..4)) {
            let mut factory = TypeFactory::new();
            let a = factory.array_type(TypeId::INT32, &dims);
            let b = factory.array_type(TypeId::INT32, &dims);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn distinct_dimension_vectors_get_distinct_ids(
            dims_a in proptest::collection::vec(-1i32..16, 1..4),
            dims_b in proptest::collection::vec(-1i32..16, 1..4),
        ) {
            prop_assume!(dims_a != dims_b);
            let mut factory = TypeFactory::new();
            let a = factory.array_type(TypeId::INT32, &dims_a);
            let b = factory.array_type(TypeId::INT32, &dims_b);
            prop_assert_ne!(a, b);
        }
    }
}
