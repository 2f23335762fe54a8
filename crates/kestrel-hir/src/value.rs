//! Value node payloads for the dataflow graph.
//!
//! Values form a closed set represented as the [`Value`] sum:
//! basic blocks, instructions, literals, and named references. Every value
//! carries a type; consumers are tracked through use-def edges owned by the
//! [`ValueGraph`](crate::graph::ValueGraph).

use serde::{Deserialize, Serialize};

use crate::id::{FunctionId, ValueId};
use crate::instruction::InstData;
use crate::type_factory::TypeId;

/// A node of the dataflow graph.
#[derive(Debug, Clone)]
pub enum Value {
    Block(BlockData),
    Inst(InstData),
    Literal(LiteralData),
    Reference(ReferenceData),
}

impl Value {
    /// The type of this value. For instructions this is the output type
    /// (`void` if the instruction produces nothing).
    pub fn ty(&self) -> TypeId {
        match self {
            Value::Block(block) => block.ty,
            Value::Inst(inst) => inst.ty,
            Value::Literal(literal) => literal.ty,
            Value::Reference(reference) => reference.ty,
        }
    }

    pub fn as_block(&self) -> Option<&BlockData> {
        match self {
            Value::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_inst(&self) -> Option<&InstData> {
        match self {
            Value::Inst(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&LiteralData> {
        match self {
            Value::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ReferenceData> {
        match self {
            Value::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Value::Block(_))
    }

    pub fn is_inst(&self) -> bool {
        matches!(self, Value::Inst(_))
    }
}

/// A basic block: an ordered list of non-phi instructions plus a list of
/// phis, owned by at most one function.
///
/// Predecessors are derived from the use-def list (terminators referencing
/// this block) and successors from the block operands of the terminator, so
/// the block itself stores neither.
#[derive(Debug, Clone)]
pub struct BlockData {
    /// Positive display id while attached to a function; 0 when detached.
    pub id: u32,
    /// Owning function, if attached.
    pub function: Option<FunctionId>,
    /// Blocks are `void`-typed values.
    pub ty: TypeId,
    pub(crate) instructions: Vec<ValueId>,
    pub(crate) phis: Vec<ValueId>,
}

impl BlockData {
    /// The ordered non-phi instructions of this block.
    pub fn instructions(&self) -> &[ValueId] {
        &self.instructions
    }

    /// The phi instructions of this block.
    pub fn phis(&self) -> &[ValueId] {
        &self.phis
    }

    pub fn first_instruction(&self) -> Option<ValueId> {
        self.instructions.first().copied()
    }

    pub fn last_instruction(&self) -> Option<ValueId> {
        self.instructions.last().copied()
    }
}

/// Literal payload. Small literals are interned per (kind, value); strings
/// by content; `null` per pointed-at type; `void` is a singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Char(char),
    Float32(f32),
    Float64(f64),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int8(i8),
    Str(String),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt8(u8),
    Null,
    Void,
}

impl Literal {
    /// The intern key for this literal at the given type. Floats key on
    /// their bit pattern so `0.0`/`-0.0` intern separately and `NaN` keys
    /// are stable.
    pub(crate) fn key(&self, ty: TypeId) -> LiteralKey {
        match self {
            Literal::Bool(v) => LiteralKey::Bool(*v),
            Literal::Char(v) => LiteralKey::Char(*v),
            Literal::Float32(v) => LiteralKey::Float32(v.to_bits()),
            Literal::Float64(v) => LiteralKey::Float64(v.to_bits()),
            Literal::Int16(v) => LiteralKey::Int16(*v),
            Literal::Int32(v) => LiteralKey::Int32(*v),
            Literal::Int64(v) => LiteralKey::Int64(*v),
            Literal::Int8(v) => LiteralKey::Int8(*v),
            Literal::Str(v) => LiteralKey::Str(v.clone()),
            Literal::UInt16(v) => LiteralKey::UInt16(*v),
            Literal::UInt32(v) => LiteralKey::UInt32(*v),
            Literal::UInt64(v) => LiteralKey::UInt64(*v),
            Literal::UInt8(v) => LiteralKey::UInt8(*v),
            Literal::Null => LiteralKey::Null(ty),
            Literal::Void => LiteralKey::Void,
        }
    }
}

/// A literal together with its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralData {
    pub value: Literal,
    pub ty: TypeId,
}

/// Hashable intern key for literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum LiteralKey {
    Bool(bool),
    Char(char),
    Float32(u32),
    Float64(u64),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int8(i8),
    Str(String),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt8(u8),
    Null(TypeId),
    Void,
}

/// A named symbolic value, e.g. the target of a `call` to an external
/// function. Interned by (name, type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub name: String,
    pub ty: TypeId,
}
