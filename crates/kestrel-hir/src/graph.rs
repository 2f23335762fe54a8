//! ValueGraph: the dataflow store for every value of a compilation session.
//!
//! [`ValueGraph`] owns blocks, instructions, literals, and references as
//! nodes of one `StableGraph`; the region is released wholesale when the
//! graph is dropped, and ids stay stable across removals. Use-def edges are
//! graph edges from a consuming instruction to the value it reads, weighted
//! by the operand slot. A value's users are its incoming edges; a block's
//! predecessors fall out of its users (the terminators that name it) and
//! its successors out of its terminator's block operands.
//!
//! The graph doubles as the value factory: literal and reference
//! constructors intern per key, instruction constructors wire operand edges
//! at birth. All structural mutation beyond construction goes through the
//! [`Editor`](crate::editor::Editor); read-only accessors are provided for
//! traversals and queries.

use std::collections::HashMap;

use indexmap::IndexSet;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::function::Function;
use crate::id::{FunctionId, ValueId};
use crate::instruction::{InstData, Opcode};
use crate::type_factory::{TypeFactory, TypeId};
use crate::types::HirType;
use crate::value::{BlockData, Literal, LiteralData, LiteralKey, ReferenceData, Value};

/// An operand slot: a use-def edge from an instruction to the value one of
/// its operand slots reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseEdge {
    pub slot: u16,
}

/// One user of a value: the consuming instruction and the operand slot
/// through which it reads the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UseRef {
    pub instruction: ValueId,
    pub slot: u16,
}

/// The dataflow store and value factory of one compilation session.
#[derive(Debug, Clone, Default)]
pub struct ValueGraph {
    pub(crate) values: StableGraph<Value, UseEdge, Directed, u32>,
    literals: HashMap<LiteralKey, ValueId>,
    references: HashMap<(String, TypeId), ValueId>,
    pub(crate) functions: HashMap<FunctionId, Function>,
    next_function_id: u32,
}

impl ValueGraph {
    pub fn new() -> Self {
        ValueGraph {
            values: StableGraph::new(),
            literals: HashMap::new(),
            references: HashMap::new(),
            functions: HashMap::new(),
            next_function_id: 0,
        }
    }

    /// Drops every value and function at once. Interned literals and
    /// references are forgotten along with their nodes.
    pub fn clear(&mut self) {
        self.values.clear();
        self.literals.clear();
        self.references.clear();
        self.functions.clear();
        self.next_function_id = 0;
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    /// Creates an empty function of the given function type. The canonical
    /// entry/exit skeleton is established by the first
    /// [`Editor`](crate::editor::Editor) opened on it.
    pub fn new_function(&mut self, types: &TypeFactory, ty: TypeId) -> FunctionId {
        debug_assert!(types.function_parts(ty).is_some());
        let id = FunctionId(self.next_function_id);
        self.next_function_id += 1;
        self.functions.insert(id, Function::new(id, ty));
        id
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(&id)
    }

    pub fn functions(&self) -> &HashMap<FunctionId, Function> {
        &self.functions
    }

    // -----------------------------------------------------------------------
    // Node accessors
    // -----------------------------------------------------------------------

    /// Looks up a value node. Unknown ids are internal inconsistencies.
    pub fn value(&self, id: ValueId) -> &Value {
        self.values
            .node_weight(id.into())
            .expect("unknown value id")
    }

    pub fn get(&self, id: ValueId) -> Option<&Value> {
        self.values.node_weight(id.into())
    }

    /// The value's type.
    pub fn ty(&self, id: ValueId) -> TypeId {
        self.value(id).ty()
    }

    /// The block payload of `id`; panics if `id` is not a block.
    pub fn block(&self, id: ValueId) -> &BlockData {
        self.value(id).as_block().expect("value is not a block")
    }

    /// The instruction payload of `id`; panics if `id` is not an instruction.
    pub fn inst(&self, id: ValueId) -> &InstData {
        self.value(id).as_inst().expect("value is not an instruction")
    }

    pub fn is_block(&self, id: ValueId) -> bool {
        self.value(id).is_block()
    }

    pub(crate) fn block_mut(&mut self, id: ValueId) -> &mut BlockData {
        match self.values.node_weight_mut(id.into()) {
            Some(Value::Block(block)) => block,
            _ => panic!("value is not a block"),
        }
    }

    pub(crate) fn inst_mut(&mut self, id: ValueId) -> &mut InstData {
        match self.values.node_weight_mut(id.into()) {
            Some(Value::Inst(inst)) => inst,
            _ => panic!("value is not an instruction"),
        }
    }

    // -----------------------------------------------------------------------
    // Literals and references
    // -----------------------------------------------------------------------

    fn literal(&mut self, value: Literal, ty: TypeId) -> ValueId {
        let key = value.key(ty);
        if let Some(&id) = self.literals.get(&key) {
            return id;
        }
        let id = ValueId::from(
            self.values
                .add_node(Value::Literal(LiteralData { value, ty })),
        );
        self.literals.insert(key, id);
        id
    }

    pub fn bool_literal(&mut self, value: bool) -> ValueId {
        self.literal(Literal::Bool(value), TypeId::BOOL)
    }

    pub fn char_literal(&mut self, value: char) -> ValueId {
        self.literal(Literal::Char(value), TypeId::CHAR)
    }

    pub fn float32_literal(&mut self, value: f32) -> ValueId {
        self.literal(Literal::Float32(value), TypeId::FLOAT32)
    }

    pub fn float64_literal(&mut self, value: f64) -> ValueId {
        self.literal(Literal::Float64(value), TypeId::FLOAT64)
    }

    pub fn int8_literal(&mut self, value: i8) -> ValueId {
        self.literal(Literal::Int8(value), TypeId::INT8)
    }

    pub fn int16_literal(&mut self, value: i16) -> ValueId {
        self.literal(Literal::Int16(value), TypeId::INT16)
    }

    pub fn int32_literal(&mut self, value: i32) -> ValueId {
        self.literal(Literal::Int32(value), TypeId::INT32)
    }

    pub fn int64_literal(&mut self, value: i64) -> ValueId {
        self.literal(Literal::Int64(value), TypeId::INT64)
    }

    pub fn uint8_literal(&mut self, value: u8) -> ValueId {
        self.literal(Literal::UInt8(value), TypeId::UINT8)
    }

    pub fn uint16_literal(&mut self, value: u16) -> ValueId {
        self.literal(Literal::UInt16(value), TypeId::UINT16)
    }

    pub fn uint32_literal(&mut self, value: u32) -> ValueId {
        self.literal(Literal::UInt32(value), TypeId::UINT32)
    }

    pub fn uint64_literal(&mut self, value: u64) -> ValueId {
        self.literal(Literal::UInt64(value), TypeId::UINT64)
    }

    pub fn string_literal(&mut self, value: &str) -> ValueId {
        self.literal(Literal::Str(value.to_string()), TypeId::STRING)
    }

    /// The typed `null` singleton for a pointer/reference/array/string type.
    pub fn null_literal(&mut self, ty: TypeId) -> ValueId {
        self.literal(Literal::Null, ty)
    }

    /// The `void` singleton.
    pub fn void_literal(&mut self) -> ValueId {
        self.literal(Literal::Void, TypeId::VOID)
    }

    /// The canonical default value of `ty`: the zero literal for value
    /// primitives, `void` for `void`, the typed `null` for reference-like
    /// types. Tuple and function types have no default value.
    pub fn default_value(&mut self, types: &TypeFactory, ty: TypeId) -> ValueId {
        use crate::types::PrimitiveType as P;
        match types.kind(ty) {
            HirType::Primitive(kind) => match kind {
                P::Bool => self.bool_literal(false),
                P::Char => self.char_literal('\0'),
                P::Float32 => self.float32_literal(0.0),
                P::Float64 => self.float64_literal(0.0),
                P::Int16 => self.int16_literal(0),
                P::Int32 => self.int32_literal(0),
                P::Int64 => self.int64_literal(0),
                P::Int8 => self.int8_literal(0),
                P::UInt16 => self.uint16_literal(0),
                P::UInt32 => self.uint32_literal(0),
                P::UInt64 => self.uint64_literal(0),
                P::UInt8 => self.uint8_literal(0),
                P::Void => self.void_literal(),
            },
            HirType::Pointer { .. } | HirType::Array { .. } | HirType::External { .. } | HirType::String => {
                self.null_literal(ty)
            }
            HirType::Tuple { .. } | HirType::Function { .. } => {
                panic!("type {ty} has no default value")
            }
        }
    }

    /// Returns the interned named reference of the given type.
    pub fn reference(&mut self, name: &str, ty: TypeId) -> ValueId {
        let key = (name.to_string(), ty);
        if let Some(&id) = self.references.get(&key) {
            return id;
        }
        let id = ValueId::from(self.values.add_node(Value::Reference(ReferenceData {
            name: name.to_string(),
            ty,
        })));
        self.references.insert(key, id);
        id
    }

    // -----------------------------------------------------------------------
    // Block and instruction construction
    // -----------------------------------------------------------------------

    pub(crate) fn new_block_node(&mut self) -> ValueId {
        ValueId::from(self.values.add_node(Value::Block(BlockData {
            id: 0,
            function: None,
            ty: TypeId::VOID,
            instructions: Vec::new(),
            phis: Vec::new(),
        })))
    }

    fn new_inst_node(&mut self, opcode: Opcode, ty: TypeId, operands: &[ValueId]) -> ValueId {
        let id = ValueId::from(self.values.add_node(Value::Inst(InstData::new(opcode, ty))));
        for (slot, &operand) in operands.iter().enumerate() {
            self.add_operand(id, slot as u16, operand);
        }
        id
    }

    /// `entry() -> parameters_type`.
    pub fn new_entry(&mut self, parameters_type: TypeId) -> ValueId {
        self.new_inst_node(Opcode::Entry, parameters_type, &[])
    }

    /// `exit()`.
    pub fn new_exit(&mut self) -> ValueId {
        self.new_inst_node(Opcode::Exit, TypeId::VOID, &[])
    }

    /// Conditional `br(cond, true_block, false_block)`.
    pub fn new_branch(&mut self, condition: ValueId, true_block: ValueId, false_block: ValueId) -> ValueId {
        self.new_inst_node(Opcode::Branch, TypeId::VOID, &[condition, true_block, false_block])
    }

    /// Unconditional `br(target_block)`.
    pub fn new_jump(&mut self, target: ValueId) -> ValueId {
        self.new_inst_node(Opcode::Branch, TypeId::VOID, &[target])
    }

    /// `call(callee, arguments)`. The output type is the callee's return
    /// type; the callee must have a function type.
    pub fn new_call(&mut self, types: &TypeFactory, callee: ValueId, arguments: ValueId) -> ValueId {
        let (return_type, _) = types
            .function_parts(self.ty(callee))
            .expect("call callee must have a function type");
        self.new_inst_node(Opcode::Call, return_type, &[callee, arguments])
    }

    /// `load(pointer)`. The output type is the pointee; the pointer must
    /// have a pointer type.
    pub fn new_load(&mut self, types: &TypeFactory, pointer: ValueId) -> ValueId {
        let pointee = types
            .pointee(self.ty(pointer))
            .expect("load operand must have a pointer type");
        self.new_inst_node(Opcode::Load, pointee, &[pointer])
    }

    /// `store(pointer, value)`.
    pub fn new_store(&mut self, pointer: ValueId, value: ValueId) -> ValueId {
        self.new_inst_node(Opcode::Store, TypeId::VOID, &[pointer, value])
    }

    /// `ret(value, exit_block)`.
    pub fn new_return(&mut self, value: ValueId, exit_block: ValueId) -> ValueId {
        self.new_inst_node(Opcode::Return, TypeId::VOID, &[value, exit_block])
    }

    /// A `phi` with no inputs yet; inputs are added per predecessor through
    /// [`Editor::set_phi_input`](crate::editor::Editor::set_phi_input).
    pub(crate) fn new_phi_node(&mut self, ty: TypeId) -> ValueId {
        self.new_inst_node(Opcode::Phi, ty, &[])
    }

    // -----------------------------------------------------------------------
    // Use-def edges
    // -----------------------------------------------------------------------

    pub(crate) fn add_operand(&mut self, inst: ValueId, slot: u16, value: ValueId) {
        self.values.add_edge(inst.into(), value.into(), UseEdge { slot });
    }

    pub(crate) fn set_operand(&mut self, inst: ValueId, slot: u16, new_value: ValueId) {
        let edge = self
            .values
            .edges_directed(inst.into(), Direction::Outgoing)
            .find(|e| e.weight().slot == slot)
            .map(|e| e.id())
            .expect("operand slot does not exist");
        self.values.remove_edge(edge);
        self.values.add_edge(inst.into(), new_value.into(), UseEdge { slot });
    }

    /// Detaches every operand slot of `inst` from its value's user list.
    pub(crate) fn reset_operands(&mut self, inst: ValueId) {
        let edges: Vec<_> = self
            .values
            .edges_directed(inst.into(), Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for edge in edges {
            self.values.remove_edge(edge);
        }
    }

    /// The value read by operand slot `slot` of `inst`.
    pub fn operand(&self, inst: ValueId, slot: u16) -> Option<ValueId> {
        self.values
            .edges_directed(inst.into(), Direction::Outgoing)
            .find(|e| e.weight().slot == slot)
            .map(|e| ValueId::from(e.target()))
    }

    /// All operands of `inst` in slot order.
    pub fn operands(&self, inst: ValueId) -> Vec<ValueId> {
        let mut slots: Vec<(u16, ValueId)> = self
            .values
            .edges_directed(inst.into(), Direction::Outgoing)
            .map(|e| (e.weight().slot, ValueId::from(e.target())))
            .collect();
        slots.sort_by_key(|&(slot, _)| slot);
        slots.into_iter().map(|(_, value)| value).collect()
    }

    pub fn operand_count(&self, inst: ValueId) -> usize {
        self.values
            .edges_directed(inst.into(), Direction::Outgoing)
            .count()
    }

    /// The operands of `inst` that are blocks, in slot order.
    pub fn block_operands(&self, inst: ValueId) -> Vec<ValueId> {
        self.operands(inst)
            .into_iter()
            .filter(|&v| self.is_block(v))
            .collect()
    }

    /// Every user of `value`, ordered by the user's display id then slot.
    pub fn users(&self, value: ValueId) -> Vec<UseRef> {
        let mut users: Vec<UseRef> = self
            .values
            .edges_directed(value.into(), Direction::Incoming)
            .map(|e| UseRef {
                instruction: ValueId::from(e.source()),
                slot: e.weight().slot,
            })
            .collect();
        users.sort_by_key(|u| (self.inst(u.instruction).id, u.slot));
        users
    }

    pub fn has_users(&self, value: ValueId) -> bool {
        self.values
            .edges_directed(value.into(), Direction::Incoming)
            .next()
            .is_some()
    }

    // -----------------------------------------------------------------------
    // Control flow
    // -----------------------------------------------------------------------

    /// The predecessors of `block`: the blocks of the attached terminators
    /// that name `block` as an operand. Deduplicated and ordered by block id.
    pub fn predecessors(&self, block: ValueId) -> Vec<ValueId> {
        let mut predecessors: IndexSet<ValueId> = IndexSet::new();
        for user in self.users(block) {
            let inst = self.inst(user.instruction);
            if !inst.is_terminator() {
                continue;
            }
            let Some(pred) = inst.block else { continue };
            predecessors.insert(pred);
        }
        let mut predecessors: Vec<ValueId> = predecessors.into_iter().collect();
        predecessors.sort_by_key(|&b| self.block(b).id);
        predecessors
    }

    /// The successors of `block`: the block operands of its terminator, in
    /// operand order.
    pub fn successors(&self, block: ValueId) -> Vec<ValueId> {
        match self.block(block).last_instruction() {
            Some(last) => self.block_operands(last),
            None => Vec::new(),
        }
    }

    pub fn has_more_than_one_predecessor(&self, block: ValueId) -> bool {
        self.predecessors(block).len() > 1
    }

    /// The block placed immediately after `block` in the function's layout.
    pub fn block_after(&self, function: FunctionId, block: ValueId) -> Option<ValueId> {
        let blocks = &self.functions.get(&function)?.blocks;
        let position = blocks.iter().position(|&b| b == block)?;
        blocks.get(position + 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_intern_per_value() {
        let mut graph = ValueGraph::new();
        assert_eq!(graph.int32_literal(42), graph.int32_literal(42));
        assert_ne!(graph.int32_literal(42), graph.int32_literal(43));
        assert_eq!(graph.void_literal(), graph.void_literal());
        assert_eq!(graph.string_literal("a"), graph.string_literal("a"));
        assert_ne!(graph.string_literal("a"), graph.string_literal("b"));
    }

    #[test]
    fn null_literals_intern_per_type() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let int_ptr = types.pointer_type(TypeId::INT32);
        let bool_ptr = types.pointer_type(TypeId::BOOL);
        assert_eq!(graph.null_literal(int_ptr), graph.null_literal(int_ptr));
        assert_ne!(graph.null_literal(int_ptr), graph.null_literal(bool_ptr));
    }

    #[test]
    fn default_values_are_canonical() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        assert_eq!(
            graph.default_value(&types, TypeId::INT32),
            graph.int32_literal(0)
        );
        assert_eq!(
            graph.default_value(&types, TypeId::BOOL),
            graph.bool_literal(false)
        );
        assert_eq!(graph.default_value(&types, TypeId::VOID), graph.void_literal());

        let ptr = types.pointer_type(TypeId::INT32);
        assert_eq!(graph.default_value(&types, ptr), graph.null_literal(ptr));
        assert_eq!(
            graph.default_value(&types, TypeId::STRING),
            graph.null_literal(TypeId::STRING)
        );
        // Idempotent.
        assert_eq!(
            graph.default_value(&types, TypeId::INT32),
            graph.default_value(&types, TypeId::INT32)
        );
    }

    #[test]
    fn references_intern_by_name_and_type() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let fn_ty = types.function_type(TypeId::INT32, TypeId::INT32);
        let a = graph.reference("Sample.Bar", fn_ty);
        let b = graph.reference("Sample.Bar", fn_ty);
        assert_eq!(a, b);
        assert_ne!(a, graph.reference("Sample.Baz", fn_ty));
    }

    #[test]
    fn instruction_operands_are_use_def_edges() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let ptr_ty = types.pointer_type(TypeId::INT32);
        let null = graph.null_literal(ptr_ty);
        let one = graph.int32_literal(1);
        let store = graph.new_store(null, one);

        assert_eq!(graph.operand(store, 0), Some(null));
        assert_eq!(graph.operand(store, 1), Some(one));
        assert_eq!(graph.operands(store), vec![null, one]);
        assert_eq!(graph.operand_count(store), 2);

        let users = graph.users(one);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].instruction, store);
        assert_eq!(users[0].slot, 1);
    }

    #[test]
    fn set_operand_moves_use_def_edge() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let ptr_ty = types.pointer_type(TypeId::INT32);
        let null = graph.null_literal(ptr_ty);
        let one = graph.int32_literal(1);
        let two = graph.int32_literal(2);
        let store = graph.new_store(null, one);

        graph.set_operand(store, 1, two);
        assert_eq!(graph.operand(store, 1), Some(two));
        assert!(graph.users(one).is_empty());
        assert_eq!(graph.users(two).len(), 1);
    }

    #[test]
    fn reset_operands_detaches_all_slots() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let ptr_ty = types.pointer_type(TypeId::INT32);
        let null = graph.null_literal(ptr_ty);
        let one = graph.int32_literal(1);
        let store = graph.new_store(null, one);

        graph.reset_operands(store);
        assert_eq!(graph.operand_count(store), 0);
        assert!(graph.users(null).is_empty());
        assert!(graph.users(one).is_empty());
    }

    #[test]
    fn call_output_type_comes_from_callee() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let fn_ty = types.function_type(TypeId::INT32, TypeId::VOID);
        let callee = graph.reference("Sample.Foo", fn_ty);
        let arg = graph.void_literal();
        let call = graph.new_call(&types, callee, arg);
        assert_eq!(graph.ty(call), TypeId::INT32);
        assert_eq!(graph.inst(call).opcode, Opcode::Call);
    }
}
