//! Critical-edge removal.
//!
//! An edge `P -> S` is critical when `P` has two or more successors and
//! either `S` carries a phi or the edge is a back edge in reverse
//! post-order. Splitting inserts a fresh block `N` immediately after `P`
//! holding a single unconditional branch to `S`, redirects `P`'s
//! terminator, and rewrites `S`'s phi input keys from `P` to `N` -- so
//! every phi keeps exactly one input per predecessor.
//!
//! Edges are collected up front: redirecting terminators while iterating
//! predecessor lists would invalidate them.

use kestrel_hir::{Editor, FunctionId, TypeFactory, ValueGraph, ValueId};

use crate::cfg::{BlockOrder, ControlFlowGraph, Order};
use crate::error::SsaError;

/// Splits every critical edge of one function.
pub struct RemoveCriticalEdges<'a> {
    graph: &'a mut ValueGraph,
    types: &'a TypeFactory,
    function: FunctionId,
}

impl<'a> RemoveCriticalEdges<'a> {
    pub fn new(graph: &'a mut ValueGraph, types: &'a TypeFactory, function: FunctionId) -> Self {
        RemoveCriticalEdges {
            graph,
            types,
            function,
        }
    }

    pub fn run(mut self) -> Result<(), SsaError> {
        self.check_input()?;

        let rpo = {
            let cfg = ControlFlowGraph::new(self.graph, self.function);
            BlockOrder::compute(&cfg, Order::ReversePostOrder)
        };

        // Collection phase.
        let mut items: Vec<(ValueId, ValueId)> = Vec::new();
        for block in rpo.iter() {
            let has_phis = !self.graph.block(block).phis().is_empty();
            let predecessors = self.graph.predecessors(block);
            let has_back_edge = predecessors
                .iter()
                .any(|&p| rpo.contains(p) && rpo.position_of(p) >= rpo.position_of(block));
            if !has_phis && !has_back_edge {
                continue;
            }
            for &predecessor in &predecessors {
                if self.graph.successors(predecessor).len() >= 2 {
                    items.push((block, predecessor));
                }
            }
        }

        // Rewriting phase.
        for (block, predecessor) in items {
            let after = self
                .graph
                .block_after(self.function, predecessor)
                .expect("a block with successors cannot be the layout tail");

            let mut editor = Editor::new(&mut *self.graph, self.types, self.function)?;
            let new_block = editor.new_block_before(after);
            editor.edit(new_block);
            editor.set_jump(block);
            editor.commit();

            // Redirect the predecessor's terminator.
            let last = editor
                .graph()
                .block(predecessor)
                .last_instruction()
                .expect("predecessor must have a terminator");
            let operands = editor.graph().operands(last);
            editor.edit(predecessor);
            for (slot, operand) in operands.iter().enumerate() {
                if *operand == block {
                    editor.set_input(last, slot as u16, new_block);
                }
            }
            editor.commit();

            editor.edit(block);
            editor.replace_phi_inputs(block, predecessor, new_block);
            editor.commit();
        }
        Ok(())
    }

    fn check_input(&mut self) -> Result<(), SsaError> {
        let mut editor = Editor::new(&mut *self.graph, self.types, self.function)?;
        if !editor.validate_function() {
            return Err(SsaError::InvalidFunction {
                id: self.function,
                diagnostics: editor.diagnostics().to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::FlowGraph;
    use kestrel_hir::testing::TestFunction;
    use kestrel_hir::TypeId;

    /// No multi-successor predecessors, nothing to split.
    #[test]
    fn straight_line_function_is_untouched() {
        let mut test = TestFunction::new();
        let block_count = test.graph.function(test.function).unwrap().blocks().len();
        RemoveCriticalEdges::new(&mut test.graph, &test.types, test.function)
            .run()
            .unwrap();
        assert_eq!(
            test.graph.function(test.function).unwrap().blocks().len(),
            block_count
        );
    }

    /// A conditional branch into a phi block gets its edge split.
    #[test]
    fn splits_branch_edge_into_phi_block() {
        let mut test = TestFunction::with_signature(TypeId::INT32, TypeId::BOOL);
        let condition = test.entry_value();
        let one = test.graph.int32_literal(1);
        let two = test.graph.int32_literal(2);
        let entry = test.entry_block();

        // entry -> {merge, side}; side -> merge; merge has a phi.
        let mut editor = test.editor();
        let merge = editor.new_block();
        let side = editor.new_block();

        editor.edit(entry);
        editor.set_branch(condition, merge, side);
        editor.commit();

        editor.edit(side);
        editor.set_jump(merge);
        editor.commit();

        editor.edit(merge);
        let phi = editor.new_phi(TypeId::INT32);
        editor.set_phi_input(phi, entry, one);
        editor.set_phi_input(phi, side, two);
        editor.set_return(phi);
        editor.commit();
        assert!(editor.validate_function());
        drop(editor);

        RemoveCriticalEdges::new(&mut test.graph, &test.types, test.function)
            .run()
            .unwrap();

        // The entry -> merge edge was critical; entry -> side was not.
        let successors = test.graph.successors(entry);
        assert_eq!(successors.len(), 2);
        let split = successors[0];
        assert_ne!(split, merge);
        assert_eq!(successors[1], side);
        assert_eq!(test.graph.successors(split), vec![merge]);
        assert_eq!(test.graph.predecessors(split), vec![entry]);

        // Phi inputs follow the rewritten predecessors.
        let phi_blocks = test.graph.inst(phi).phi_blocks().to_vec();
        assert!(phi_blocks.contains(&split));
        assert!(phi_blocks.contains(&side));
        assert!(!phi_blocks.contains(&entry));

        // Postcondition: no critical edges remain.
        assert_no_critical_edges(&test);
    }

    fn assert_no_critical_edges(test: &TestFunction) {
        let cfg = ControlFlowGraph::new(&test.graph, test.function);
        for &block in test.graph.function(test.function).unwrap().blocks() {
            if test.graph.block(block).phis().is_empty() {
                continue;
            }
            for predecessor in cfg.predecessors(block) {
                assert!(
                    test.graph.successors(predecessor).len() < 2,
                    "critical edge left into a phi block"
                );
            }
        }
    }
}
