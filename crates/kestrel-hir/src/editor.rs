//! The Editor: the single authority for IR mutation.
//!
//! All structural changes to a function go through an [`Editor`]: splicing
//! blocks, appending and removing instructions, rewriting operands and phi
//! inputs. The editor maintains use-def edges on every rewrite and runs
//! per-block validation on [`commit`](Editor::commit), accumulating
//! [`Diagnostic`]s instead of failing. Validation failures leave the graph
//! structurally consistent; they only mark the function invalid for the
//! next pass.
//!
//! `edit` calls stack: opening several blocks and committing them one at a
//! time is the normal shape of a pass.

use crate::graph::ValueGraph;
use crate::id::{FunctionId, SourceLocation, ValueId};
use crate::instruction::Opcode;
use crate::error::HirError;
use crate::type_factory::{TypeFactory, TypeId};
use crate::validate::{Diagnostic, Validator};

/// Exclusive editing session over one function.
pub struct Editor<'a> {
    graph: &'a mut ValueGraph,
    types: &'a TypeFactory,
    function: FunctionId,
    open_blocks: Vec<ValueId>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Editor<'a> {
    /// Opens an editor over `function`. If the function is empty, the
    /// canonical skeleton is established first: an entry block holding
    /// `entry` and a default `ret`, and an exit block holding `exit`.
    pub fn new(
        graph: &'a mut ValueGraph,
        types: &'a TypeFactory,
        function: FunctionId,
    ) -> Result<Self, HirError> {
        if graph.function(function).is_none() {
            return Err(HirError::FunctionNotFound { id: function });
        }
        let mut editor = Editor {
            graph,
            types,
            function,
            open_blocks: Vec::new(),
            diagnostics: Vec::new(),
        };
        editor.initialize_function_if_needed();
        Ok(editor)
    }

    pub fn graph(&self) -> &ValueGraph {
        self.graph
    }

    pub fn types(&self) -> &TypeFactory {
        self.types
    }

    pub fn function(&self) -> FunctionId {
        self.function
    }

    pub fn entry_block(&self) -> ValueId {
        self.graph.functions[&self.function].entry_block()
    }

    pub fn exit_block(&self) -> ValueId {
        self.graph.functions[&self.function].exit_block()
    }

    /// Diagnostics accumulated by commits and function validation.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn current_block(&self) -> ValueId {
        *self.open_blocks.last().expect("no block under edit")
    }

    fn initialize_function_if_needed(&mut self) {
        if !self.graph.functions[&self.function].is_empty() {
            return;
        }

        let entry = self.graph.new_block_node();
        let exit = self.graph.new_block_node();
        {
            let function = self.graph.functions.get_mut(&self.function).unwrap();
            let entry_id = function.next_block_id();
            let exit_id = function.next_block_id();
            function.blocks.push(entry);
            function.blocks.push(exit);
            self.graph.block_mut(entry).id = entry_id;
            self.graph.block_mut(exit).id = exit_id;
        }
        self.graph.block_mut(entry).function = Some(self.function);
        self.graph.block_mut(exit).function = Some(self.function);

        let (return_type, parameters_type) = self
            .types
            .function_parts(self.graph.functions[&self.function].ty)
            .expect("function value must have a function type");

        // The default `ret` refers to the exit block, so the exit block is
        // populated first.
        self.edit(exit);
        let exit_inst = self.graph.new_exit();
        self.append(exit_inst);
        self.commit();

        self.edit(entry);
        let entry_inst = self.graph.new_entry(parameters_type);
        self.append(entry_inst);
        let default = self.graph.default_value(self.types, return_type);
        self.set_return(default);
        self.commit();
    }

    // -----------------------------------------------------------------------
    // Block editing
    // -----------------------------------------------------------------------

    /// Opens `block` for edits. Edits stack; each `edit` is closed by a
    /// matching [`commit`](Editor::commit).
    pub fn edit(&mut self, block: ValueId) {
        debug_assert!(!self.open_blocks.contains(&block));
        self.open_blocks.push(block);
    }

    /// Closes the topmost edit and validates the block, accumulating any
    /// diagnostics. Returns `false` if validation reported an error.
    pub fn commit(&mut self) -> bool {
        let block = self.open_blocks.pop().expect("commit without matching edit");
        let mut validator = Validator::new(self.graph, self.types, self.function);
        let valid = validator.validate_block(block);
        self.diagnostics.extend(validator.into_diagnostics());
        valid
    }

    /// Validates the whole function, including phi contracts, accumulating
    /// any diagnostics.
    pub fn validate_function(&mut self) -> bool {
        let mut validator = Validator::new(self.graph, self.types, self.function);
        let valid = validator.validate_function();
        self.diagnostics.extend(validator.into_diagnostics());
        valid
    }

    /// Allocates a block and splices it before `before` in the function's
    /// block list. The new block starts empty and is not opened for edit.
    pub fn new_block_before(&mut self, before: ValueId) -> ValueId {
        let block = self.graph.new_block_node();
        {
            let function = self.graph.functions.get_mut(&self.function).unwrap();
            let id = function.next_block_id();
            let position = function
                .blocks
                .iter()
                .position(|&b| b == before)
                .expect("reference block is not in this function");
            function.blocks.insert(position, block);
            self.graph.block_mut(block).id = id;
        }
        self.graph.block_mut(block).function = Some(self.function);
        block
    }

    /// Allocates a block before the exit block.
    pub fn new_block(&mut self) -> ValueId {
        let exit = self.exit_block();
        self.new_block_before(exit)
    }

    // -----------------------------------------------------------------------
    // Instruction editing
    // -----------------------------------------------------------------------

    /// Appends an unattached instruction to the block under edit, assigning
    /// its display id.
    pub fn append(&mut self, inst: ValueId) {
        let block = self.current_block();
        let id = self
            .graph
            .functions
            .get_mut(&self.function)
            .unwrap()
            .next_instruction_id();
        {
            let data = self.graph.inst_mut(inst);
            debug_assert_eq!(data.id, 0, "instruction is already attached");
            data.id = id;
            data.block = Some(block);
        }
        self.graph.block_mut(block).instructions.push(inst);
    }

    /// Inserts an unattached instruction before `before` within the block
    /// under edit; `None` appends.
    pub fn insert_before(&mut self, inst: ValueId, before: Option<ValueId>) {
        let Some(before) = before else {
            self.append(inst);
            return;
        };
        let block = self.current_block();
        debug_assert_eq!(self.graph.inst(before).block, Some(block));
        let id = self
            .graph
            .functions
            .get_mut(&self.function)
            .unwrap()
            .next_instruction_id();
        {
            let data = self.graph.inst_mut(inst);
            debug_assert_eq!(data.id, 0, "instruction is already attached");
            data.id = id;
            data.block = Some(block);
        }
        let block_data = self.graph.block_mut(block);
        let position = block_data
            .instructions
            .iter()
            .position(|&i| i == before)
            .expect("reference instruction is not in the edited block");
        block_data.instructions.insert(position, inst);
    }

    /// Detaches `inst` from its block and resets every operand slot, so the
    /// use-def lists of its operands no longer mention it.
    pub fn remove(&mut self, inst: ValueId) {
        self.graph.reset_operands(inst);
        let (block, opcode) = {
            let data = self.graph.inst_mut(inst);
            let block = data.block.take().expect("instruction is not attached");
            data.id = 0;
            data.phi_blocks.clear();
            (block, data.opcode)
        };
        let block_data = self.graph.block_mut(block);
        if opcode == Opcode::Phi {
            block_data.phis.retain(|&phi| phi != inst);
        } else {
            block_data.instructions.retain(|&i| i != inst);
        }
    }

    /// Creates a phi of the given type at the head of the edited block's
    /// phi list. Inputs are added lazily per predecessor through
    /// [`set_phi_input`](Editor::set_phi_input).
    pub fn new_phi(&mut self, ty: TypeId) -> ValueId {
        let block = self.current_block();
        let phi = self.graph.new_phi_node(ty);
        let id = self
            .graph
            .functions
            .get_mut(&self.function)
            .unwrap()
            .next_instruction_id();
        {
            let data = self.graph.inst_mut(phi);
            data.id = id;
            data.block = Some(block);
        }
        self.graph.block_mut(block).phis.insert(0, phi);
        phi
    }

    // -----------------------------------------------------------------------
    // Terminators
    // -----------------------------------------------------------------------

    fn remove_terminator(&mut self) {
        let block = self.current_block();
        if let Some(last) = self.graph.block(block).last_instruction() {
            if self.graph.inst(last).is_terminator() {
                self.remove(last);
            }
        }
    }

    /// Replaces the edited block's terminator with a conditional branch.
    pub fn set_branch(&mut self, condition: ValueId, true_block: ValueId, false_block: ValueId) {
        self.remove_terminator();
        let inst = self.graph.new_branch(condition, true_block, false_block);
        self.append(inst);
    }

    /// Replaces the edited block's terminator with an unconditional branch.
    pub fn set_jump(&mut self, target: ValueId) {
        self.remove_terminator();
        let inst = self.graph.new_jump(target);
        self.append(inst);
    }

    /// Replaces the edited block's terminator with `ret value, exit`.
    pub fn set_return(&mut self, value: ValueId) {
        self.remove_terminator();
        let exit = self.exit_block();
        let inst = self.graph.new_return(value, exit);
        self.append(inst);
    }

    // -----------------------------------------------------------------------
    // Operand manipulation
    // -----------------------------------------------------------------------

    /// Rewrites operand slot `slot` of `inst`, maintaining use-def edges.
    pub fn set_input(&mut self, inst: ValueId, slot: u16, new_value: ValueId) {
        self.graph.set_operand(inst, slot, new_value);
    }

    /// Sets the phi's input for `predecessor`, creating the input slot on
    /// first use.
    pub fn set_phi_input(&mut self, phi: ValueId, predecessor: ValueId, value: ValueId) {
        debug_assert_eq!(self.graph.inst(phi).opcode, Opcode::Phi);
        match self.graph.inst(phi).phi_input_for(predecessor) {
            Some(slot) => self.graph.set_operand(phi, slot, value),
            None => {
                let slot = self.graph.inst(phi).phi_blocks().len() as u16;
                self.graph.inst_mut(phi).phi_blocks.push(predecessor);
                self.graph.add_operand(phi, slot, value);
            }
        }
    }

    /// Rewrites every phi input key in `block` from `old_pred` to
    /// `new_pred`.
    pub fn replace_phi_inputs(&mut self, block: ValueId, old_pred: ValueId, new_pred: ValueId) {
        let phis = self.graph.block(block).phis().to_vec();
        for phi in phis {
            for pred in self.graph.inst_mut(phi).phi_blocks.iter_mut() {
                if *pred == old_pred {
                    *pred = new_pred;
                }
            }
        }
    }

    /// Stamps a source location onto an instruction.
    pub fn set_location(&mut self, inst: ValueId, location: SourceLocation) {
        self.graph.inst_mut(inst).location = location;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ErrorCode;

    fn new_void_function() -> (TypeFactory, ValueGraph, FunctionId) {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let fn_ty = types.function_type(TypeId::VOID, TypeId::VOID);
        let function = graph.new_function(&types, fn_ty);
        (types, graph, function)
    }

    #[test]
    fn initialize_builds_entry_and_exit() {
        let (types, mut graph, function) = new_void_function();
        Editor::new(&mut graph, &types, function).unwrap();

        let f = graph.function(function).unwrap();
        assert_eq!(f.blocks().len(), 2);
        let entry = f.entry_block();
        let exit = f.exit_block();
        assert_eq!(graph.block(entry).id, 1);
        assert_eq!(graph.block(exit).id, 2);

        let first = graph.block(entry).first_instruction().unwrap();
        assert_eq!(graph.inst(first).opcode, Opcode::Entry);
        let last = graph.block(entry).last_instruction().unwrap();
        assert_eq!(graph.inst(last).opcode, Opcode::Return);
        // ret targets the exit block.
        assert_eq!(graph.operand(last, 1), Some(exit));

        let exit_inst = graph.block(exit).first_instruction().unwrap();
        assert_eq!(graph.inst(exit_inst).opcode, Opcode::Exit);
        // Instruction numbering: exit first, then entry, then ret.
        assert_eq!(graph.inst(exit_inst).id, 1);
        assert_eq!(graph.inst(first).id, 2);
        assert_eq!(graph.inst(last).id, 3);
    }

    #[test]
    fn reopening_does_not_reinitialize() {
        let (types, mut graph, function) = new_void_function();
        Editor::new(&mut graph, &types, function).unwrap();
        Editor::new(&mut graph, &types, function).unwrap();
        assert_eq!(graph.function(function).unwrap().blocks().len(), 2);
    }

    #[test]
    fn new_block_splices_before_exit() {
        let (types, mut graph, function) = new_void_function();
        let mut editor = Editor::new(&mut graph, &types, function).unwrap();
        let block = editor.new_block();
        let f = graph.function(function).unwrap();
        assert_eq!(f.blocks().len(), 3);
        assert_eq!(f.blocks()[1], block);
        assert_eq!(graph.block(block).id, 3);
        assert_eq!(graph.block(block).function, Some(function));
    }

    #[test]
    fn set_branch_replaces_terminator() {
        let (types, mut graph, function) = new_void_function();
        let mut editor = Editor::new(&mut graph, &types, function).unwrap();
        let target = editor.new_block();
        let entry = editor.entry_block();

        editor.edit(entry);
        editor.set_jump(target);
        assert!(editor.commit());

        let last = graph.block(graph.function(function).unwrap().entry_block())
            .last_instruction()
            .unwrap();
        assert_eq!(graph.inst(last).opcode, Opcode::Branch);
        assert_eq!(graph.operands(last), vec![target]);
        // Only entry + br remain.
        assert_eq!(
            graph
                .block(graph.function(function).unwrap().entry_block())
                .instructions()
                .len(),
            2
        );
    }

    #[test]
    fn remove_detaches_operand_slots() {
        let (types, mut graph, function) = new_void_function();
        let mut editor = Editor::new(&mut graph, &types, function).unwrap();
        let entry = editor.entry_block();
        let ret = editor.graph().block(entry).last_instruction().unwrap();
        let operand = editor.graph().operand(ret, 0).unwrap();

        editor.edit(entry);
        editor.remove(ret);

        assert!(graph.users(operand).is_empty());
        assert_eq!(graph.inst(ret).id, 0);
        assert_eq!(graph.inst(ret).block, None);
    }

    #[test]
    fn committing_an_empty_block_reports_empty() {
        let (types, mut graph, function) = new_void_function();
        let mut editor = Editor::new(&mut graph, &types, function).unwrap();
        let block = editor.new_block();
        editor.edit(block);
        assert!(!editor.commit());
        assert_eq!(editor.diagnostics().len(), 1);
        assert_eq!(editor.diagnostics()[0].code, ErrorCode::BasicBlockEmpty);
    }

    #[test]
    fn stacked_edits_commit_in_lifo_order() {
        let (types, mut graph, function) = new_void_function();
        let void_value = graph.void_literal();
        let mut editor = Editor::new(&mut graph, &types, function).unwrap();
        let block = editor.new_block();
        let entry = editor.entry_block();

        editor.edit(entry);
        editor.set_jump(block);
        editor.edit(block); // stacked on top of `entry`
        editor.set_return(void_value);
        assert!(editor.commit()); // closes `block`
        assert!(editor.commit()); // closes `entry`
        assert!(editor.diagnostics().is_empty());
    }

    #[test]
    fn phi_inputs_are_created_lazily() {
        let (types, mut graph, function) = new_void_function();
        let one = graph.int32_literal(1);
        let two = graph.int32_literal(2);
        let mut editor = Editor::new(&mut graph, &types, function).unwrap();
        let a = editor.new_block();
        let b = editor.new_block();
        let join = editor.new_block();

        editor.edit(join);
        let phi = editor.new_phi(TypeId::INT32);
        editor.set_phi_input(phi, a, one);
        editor.set_phi_input(phi, b, two);
        // Overwriting an existing key reuses the slot.
        editor.set_phi_input(phi, a, two);

        assert_eq!(editor.graph().inst(phi).phi_blocks(), &[a, b]);
        assert_eq!(editor.graph().operand(phi, 0), Some(two));
        assert_eq!(editor.graph().operand(phi, 1), Some(two));
    }

    #[test]
    fn replace_phi_inputs_rewrites_keys() {
        let (types, mut graph, function) = new_void_function();
        let one = graph.int32_literal(1);
        let mut editor = Editor::new(&mut graph, &types, function).unwrap();
        let a = editor.new_block();
        let b = editor.new_block();
        let join = editor.new_block();

        editor.edit(join);
        let phi = editor.new_phi(TypeId::INT32);
        editor.set_phi_input(phi, a, one);
        editor.replace_phi_inputs(join, a, b);

        assert_eq!(editor.graph().inst(phi).phi_blocks(), &[b]);
        assert_eq!(editor.graph().operand(phi, 0), Some(one));
    }
}
