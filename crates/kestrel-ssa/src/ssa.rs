//! CFG to pruned-SSA conversion.
//!
//! Three phases over a function in home/load/store form:
//!
//! 1. **Phi placement.** For each promotable home, seed a work set with the
//!    dominance frontiers of the entry block and of every block storing to
//!    the home, then iterate frontiers-of-frontiers, inserting one phi per
//!    work-set block.
//! 2. **Rename.** DFS over the dominator tree with one value stack per
//!    home: phis and stored values push, loads are replaced by the stack
//!    top and deleted, and each successor phi's input for the current block
//!    is patched to the stack top. Pushes are popped on scope exit in LIFO
//!    order.
//! 3. **Cleanup.** Delete the home instructions themselves.
//!
//! Single-input phis are left in place; the validator flags them with the
//! `Validate.Phi.One` warning.
//!
//! The builder refuses to run over a function that fails validation. It
//! assumes ordinary control flow; exceptional edges would require liveness.

use std::collections::HashMap;

use indexmap::IndexSet;

use kestrel_hir::{Editor, FunctionId, Opcode, TypeFactory, ValueGraph, ValueId};

use crate::dominator::{compute_dominator_tree, DominatorTree};
use crate::error::SsaError;
use crate::usage::{UsedIn, VariableUsages};

/// Converts one function from home/load/store form into pruned SSA.
pub struct SsaBuilder<'a> {
    graph: &'a mut ValueGraph,
    types: &'a TypeFactory,
    function: FunctionId,
    usages: &'a VariableUsages,
    dominator_tree: DominatorTree,
    /// One value stack per home; phis share their home's stack.
    stacks: Vec<Vec<ValueId>>,
    stack_index: HashMap<ValueId, usize>,
}

impl<'a> SsaBuilder<'a> {
    pub fn new(
        graph: &'a mut ValueGraph,
        types: &'a TypeFactory,
        function: FunctionId,
        usages: &'a VariableUsages,
    ) -> Self {
        let dominator_tree = compute_dominator_tree(graph, function);
        SsaBuilder {
            graph,
            types,
            function,
            usages,
            dominator_tree,
            stacks: Vec::new(),
            stack_index: HashMap::new(),
        }
    }

    /// Runs all three phases. On success every promoted home, and every
    /// load and store of it, is gone and all joins carry phis.
    pub fn run(mut self) -> Result<(), SsaError> {
        self.check_input()?;

        let homes = self.usages.local_variables_of(self.function).to_vec();
        for &home in &homes {
            self.insert_phis(home)?;
        }

        let entry = self.graph.function(self.function).unwrap().entry_block();
        self.rename_block(entry)?;

        for &home in &homes {
            let block = self
                .graph
                .inst(home)
                .block
                .expect("home must still be attached");
            let mut editor = Editor::new(self.graph, self.types, self.function)?;
            editor.edit(block);
            editor.remove(home);
            editor.commit();
        }
        Ok(())
    }

    fn check_input(&mut self) -> Result<(), SsaError> {
        let mut editor = Editor::new(self.graph, self.types, self.function)?;
        if !editor.validate_function() {
            return Err(SsaError::InvalidFunction {
                id: self.function,
                diagnostics: editor.diagnostics().to_vec(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase A: phi placement
    // -----------------------------------------------------------------------

    fn insert_phis(&mut self, home: ValueId) -> Result<(), SsaError> {
        let stack = self.stacks.len();
        self.stacks.push(Vec::new());
        self.stack_index.insert(home, stack);

        let data = self.usages.data_for(home).expect("home was not analyzed");
        if data.used_in == UsedIn::SingleBlock {
            return Ok(());
        }
        let ty = data.ty;

        let entry = self.graph.function(self.function).unwrap().entry_block();
        let mut work_set: IndexSet<ValueId> = IndexSet::new();
        for &frontier in &self.dominator_tree.node_of(entry).frontiers {
            work_set.insert(frontier);
        }

        // Every store to the home seeds its block's frontiers.
        for user in self.graph.users(home) {
            let inst = self.graph.inst(user.instruction);
            if inst.opcode != Opcode::Store {
                continue;
            }
            let Some(block) = inst.block else { continue };
            if work_set.contains(&block) {
                continue;
            }
            for &frontier in &self.dominator_tree.node_of(block).frontiers {
                work_set.insert(frontier);
            }
        }

        let mut work_list: Vec<ValueId> = work_set.iter().copied().collect();
        while let Some(block) = work_list.pop() {
            let mut editor = Editor::new(&mut *self.graph, self.types, self.function)?;
            editor.edit(block);
            let phi = editor.new_phi(ty);
            editor.commit();
            self.stack_index.insert(phi, stack);

            for &frontier in &self.dominator_tree.node_of(block).frontiers {
                if work_set.insert(frontier) {
                    work_list.push(frontier);
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase B: rename
    // -----------------------------------------------------------------------

    fn rename_block(&mut self, block: ValueId) -> Result<(), SsaError> {
        // Stacks pushed in this scope, popped in LIFO order on exit.
        let mut pushed: Vec<usize> = Vec::new();

        let phis = self.graph.block(block).phis().to_vec();
        for phi in phis {
            if let Some(&stack) = self.stack_index.get(&phi) {
                self.stacks[stack].push(phi);
                pushed.push(stack);
            }
        }

        // Iterate over a snapshot: loads and stores are removed mid-walk.
        let instructions = self.graph.block(block).instructions().to_vec();
        for inst in instructions {
            match self.graph.inst(inst).opcode {
                Opcode::Load => {
                    let Some(pointer) = self.graph.operand(inst, 0) else {
                        continue;
                    };
                    let Some(&stack) = self.stack_index.get(&pointer) else {
                        continue;
                    };
                    let new_value = *self.stacks[stack]
                        .last()
                        .expect("variable loaded before any reaching store");
                    let users = self.graph.users(inst);
                    let mut editor = Editor::new(&mut *self.graph, self.types, self.function)?;
                    for user in users {
                        editor.set_input(user.instruction, user.slot, new_value);
                    }
                    editor.edit(block);
                    editor.remove(inst);
                    editor.commit();
                }
                Opcode::Store => {
                    let Some(pointer) = self.graph.operand(inst, 0) else {
                        continue;
                    };
                    let Some(&stack) = self.stack_index.get(&pointer) else {
                        continue;
                    };
                    let value = self
                        .graph
                        .operand(inst, 1)
                        .expect("store must have a value operand");
                    self.stacks[stack].push(value);
                    pushed.push(stack);
                    let mut editor = Editor::new(&mut *self.graph, self.types, self.function)?;
                    editor.edit(block);
                    editor.remove(inst);
                    editor.commit();
                }
                _ => {}
            }
        }

        // Patch this block's input slot in every successor phi.
        for successor in self.graph.successors(block) {
            let mut updates: Vec<(ValueId, ValueId)> = Vec::new();
            for &phi in self.graph.block(successor).phis() {
                let Some(&stack) = self.stack_index.get(&phi) else {
                    continue;
                };
                let new_value = *self.stacks[stack]
                    .last()
                    .expect("phi input has no reaching definition");
                updates.push((phi, new_value));
            }
            if !updates.is_empty() {
                let mut editor = Editor::new(&mut *self.graph, self.types, self.function)?;
                editor.edit(successor);
                for (phi, value) in updates {
                    editor.set_phi_input(phi, block, value);
                }
                editor.commit();
            }
        }

        let children = self.dominator_tree.node_of(block).children.clone();
        for child in children {
            self.rename_block(child)?;
        }

        for stack in pushed.into_iter().rev() {
            self.stacks[stack].pop();
        }
        Ok(())
    }
}
