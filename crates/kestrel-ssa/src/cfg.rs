//! Abstract graph view and traversal orders over the CFG.
//!
//! [`FlowGraph`] is the predecessor/successor/entry provider the analyses
//! are written against; [`ControlFlowGraph`] implements it for a function's
//! basic blocks, deriving edges from use-def lists and terminator operands.
//! [`BlockOrder`] materializes one of the four DFS orders; reverse
//! post-order is the canonical deterministic iteration order for dataflow.
//! Blocks unreachable from the entry are not emitted.

use std::collections::HashMap;

use kestrel_hir::{Function, FunctionId, ValueGraph, ValueId};

/// Abstract predecessor/successor/entry provider.
pub trait FlowGraph {
    fn entry(&self) -> ValueId;
    fn predecessors(&self, value: ValueId) -> Vec<ValueId>;
    fn successors(&self, value: ValueId) -> Vec<ValueId>;

    fn has_more_than_one_predecessor(&self, value: ValueId) -> bool {
        self.predecessors(value).len() > 1
    }
}

/// The control-flow graph of one function.
pub struct ControlFlowGraph<'a> {
    graph: &'a ValueGraph,
    function: &'a Function,
}

impl<'a> ControlFlowGraph<'a> {
    pub fn new(graph: &'a ValueGraph, function: FunctionId) -> Self {
        let function = graph.function(function).expect("unknown function");
        ControlFlowGraph { graph, function }
    }
}

impl FlowGraph for ControlFlowGraph<'_> {
    fn entry(&self) -> ValueId {
        self.function.entry_block()
    }

    fn predecessors(&self, value: ValueId) -> Vec<ValueId> {
        self.graph.predecessors(value)
    }

    fn successors(&self, value: ValueId) -> Vec<ValueId> {
        self.graph.successors(value)
    }

    fn has_more_than_one_predecessor(&self, value: ValueId) -> bool {
        self.graph.has_more_than_one_predecessor(value)
    }
}

/// DFS visit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    PostOrder,
    PreOrder,
    ReversePostOrder,
    ReversePreOrder,
}

/// A materialized traversal order with O(1) position lookup.
#[derive(Debug, Clone)]
pub struct BlockOrder {
    list: Vec<ValueId>,
    positions: HashMap<ValueId, usize>,
}

impl BlockOrder {
    /// Runs a DFS from the graph's entry and records nodes in the requested
    /// order.
    pub fn compute<G: FlowGraph>(graph: &G, order: Order) -> BlockOrder {
        let mut list = Vec::new();
        let mut visited = std::collections::HashSet::new();
        visit(graph, graph.entry(), order, &mut visited, &mut list);
        if matches!(order, Order::ReversePostOrder | Order::ReversePreOrder) {
            list.reverse();
        }
        let positions = list
            .iter()
            .enumerate()
            .map(|(position, &value)| (value, position))
            .collect();
        BlockOrder { list, positions }
    }

    pub fn list(&self) -> &[ValueId] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, value: ValueId) -> bool {
        self.positions.contains_key(&value)
    }

    /// The position of `value` in this order; panics if `value` was not
    /// reachable.
    pub fn position_of(&self, value: ValueId) -> usize {
        self.positions[&value]
    }

    pub fn iter(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.list.iter().copied()
    }
}

fn visit<G: FlowGraph>(
    graph: &G,
    value: ValueId,
    order: Order,
    visited: &mut std::collections::HashSet<ValueId>,
    list: &mut Vec<ValueId>,
) {
    if !visited.insert(value) {
        return;
    }
    if matches!(order, Order::PreOrder | Order::ReversePreOrder) {
        list.push(value);
    }
    for successor in graph.successors(value) {
        visit(graph, successor, order, visited, list);
    }
    if matches!(order, Order::PostOrder | Order::ReversePostOrder) {
        list.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_hir::testing::{sample_function, TestFunction};

    #[test]
    fn empty_function_orders() {
        let test = TestFunction::new();
        let cfg = ControlFlowGraph::new(&test.graph, test.function);
        let entry = test.entry_block();
        let exit = test.exit_block();

        let rpo = BlockOrder::compute(&cfg, Order::ReversePostOrder);
        assert_eq!(rpo.list(), &[entry, exit]);
        assert_eq!(rpo.position_of(entry), 0);
        assert_eq!(rpo.position_of(exit), 1);

        let po = BlockOrder::compute(&cfg, Order::PostOrder);
        assert_eq!(po.list(), &[exit, entry]);

        let pre = BlockOrder::compute(&cfg, Order::PreOrder);
        assert_eq!(pre.list(), &[entry, exit]);

        let reverse_pre = BlockOrder::compute(&cfg, Order::ReversePreOrder);
        assert_eq!(reverse_pre.list(), &[exit, entry]);
    }

    #[test]
    fn sample_function_reverse_post_order() {
        let (test, blocks) = sample_function();
        let cfg = ControlFlowGraph::new(&test.graph, test.function);
        let entry = test.entry_block();
        let exit = test.exit_block();

        let rpo = BlockOrder::compute(&cfg, Order::ReversePostOrder);
        assert_eq!(
            rpo.list(),
            &[
                entry, blocks[0], blocks[1], blocks[2], blocks[6], blocks[3], blocks[4], blocks[5],
                exit
            ]
        );
        // Every edge source precedes its non-back-edge target.
        assert!(rpo.position_of(blocks[0]) < rpo.position_of(blocks[1]));
        assert!(rpo.position_of(blocks[2]) < rpo.position_of(blocks[3]));
    }

    #[test]
    fn unreachable_blocks_are_not_emitted() {
        let mut test = TestFunction::new();
        let void_value = test.graph.void_literal();
        let mut editor = test.editor();
        let orphan = editor.new_block();
        editor.edit(orphan);
        editor.set_return(void_value);
        editor.commit();
        drop(editor);

        let cfg = ControlFlowGraph::new(&test.graph, test.function);
        let rpo = BlockOrder::compute(&cfg, Order::ReversePostOrder);
        assert!(!rpo.contains(orphan));
        assert_eq!(rpo.len(), 2);
    }

    #[test]
    fn predecessors_come_from_terminators() {
        let (test, blocks) = sample_function();
        let cfg = ControlFlowGraph::new(&test.graph, test.function);
        assert_eq!(cfg.predecessors(blocks[1]), vec![blocks[0], blocks[4]]);
        assert_eq!(cfg.successors(blocks[6]), vec![blocks[3]]);
        assert!(cfg.has_more_than_one_predecessor(blocks[5]));
        // The exit block's predecessor is the `ret` block.
        assert_eq!(cfg.predecessors(test.exit_block()), vec![blocks[5]]);
    }
}
