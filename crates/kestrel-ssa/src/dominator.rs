//! Dominator-tree construction with dominance frontiers.
//!
//! Implements the iterative data-flow algorithm of Cooper, Harvey and
//! Kennedy: immediate dominators are found by intersecting predecessor
//! chains over reverse post-order until a fixed point, which converges
//! deterministically on reducible and irreducible graphs alike. Children
//! and frontier lists are insertion-ordered following RPO.
//!
//! The tree is a frozen analysis result: it does not observe later edits to
//! the graph it was computed from.

use std::collections::HashMap;

use kestrel_hir::{FunctionId, ValueGraph, ValueId};

use crate::cfg::{BlockOrder, ControlFlowGraph, FlowGraph, Order};

/// Per-value node of the dominator tree.
#[derive(Debug, Clone, Default)]
pub struct DomNode {
    /// Immediate dominator; `None` for the entry.
    pub parent: Option<ValueId>,
    /// Distance from the root; the entry has depth 1.
    pub depth: u32,
    /// Values immediately dominated by this one, in RPO.
    pub children: Vec<ValueId>,
    /// Dominance frontier, deduplicated, in RPO-driven insertion order.
    pub frontiers: Vec<ValueId>,
}

/// Dominator tree over every value reachable from a graph's entry.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    nodes: HashMap<ValueId, DomNode>,
}

impl DominatorTree {
    /// The node for `value`; panics if `value` was not reachable when the
    /// tree was built.
    pub fn node_of(&self, value: ValueId) -> &DomNode {
        self.nodes
            .get(&value)
            .expect("value is not in the dominator tree")
    }

    pub fn get(&self, value: ValueId) -> Option<&DomNode> {
        self.nodes.get(&value)
    }

    /// Returns `true` if `a` dominates `b` (reflexively).
    pub fn dominates(&self, a: ValueId, b: ValueId) -> bool {
        let target_depth = self.node_of(a).depth;
        let mut runner = b;
        loop {
            if runner == a {
                return true;
            }
            let node = self.node_of(runner);
            if node.depth <= target_depth {
                return false;
            }
            match node.parent {
                Some(parent) => runner = parent,
                None => return false,
            }
        }
    }
}

/// Builds a [`DominatorTree`] for any [`FlowGraph`].
pub struct DominatorTreeBuilder<'a, G: FlowGraph> {
    graph: &'a G,
    rpo: BlockOrder,
}

impl<'a, G: FlowGraph> DominatorTreeBuilder<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        let rpo = BlockOrder::compute(graph, Order::ReversePostOrder);
        DominatorTreeBuilder { graph, rpo }
    }

    pub fn build(self) -> DominatorTree {
        let entry = self.graph.entry();
        let mut nodes: HashMap<ValueId, DomNode> = self
            .rpo
            .iter()
            .map(|value| (value, DomNode::default()))
            .collect();

        // Sentinel: the entry is its own parent during the fixed point.
        {
            let entry_node = nodes.get_mut(&entry).unwrap();
            entry_node.parent = Some(entry);
            entry_node.depth = 1;
        }

        self.compute_parents(&mut nodes);
        nodes.get_mut(&entry).unwrap().parent = None;
        self.compute_children(&mut nodes);
        self.compute_frontiers(entry, &mut nodes);

        DominatorTree { nodes }
    }

    /// Predecessors restricted to reachable values.
    fn reachable_predecessors(&self, value: ValueId) -> Vec<ValueId> {
        self.graph
            .predecessors(value)
            .into_iter()
            .filter(|&p| self.rpo.contains(p))
            .collect()
    }

    fn compute_parents(&self, nodes: &mut HashMap<ValueId, DomNode>) {
        let mut changed = true;
        while changed {
            changed = false;
            for value in self.rpo.iter() {
                if self.compute_parent_for(value, nodes) {
                    changed = true;
                }
            }
        }
    }

    fn compute_parent_for(&self, value: ValueId, nodes: &mut HashMap<ValueId, DomNode>) -> bool {
        let predecessors = self.reachable_predecessors(value);
        let Some(&first) = predecessors
            .iter()
            .find(|&&p| nodes[&p].parent.is_some())
        else {
            return false;
        };

        let mut candidate = first;
        for &predecessor in &predecessors {
            if predecessor != candidate && nodes[&predecessor].parent.is_some() {
                candidate = self.intersect(candidate, predecessor, nodes);
            }
        }

        if nodes[&value].parent != Some(candidate) {
            let depth = nodes[&candidate].depth + 1;
            let node = nodes.get_mut(&value).unwrap();
            node.parent = Some(candidate);
            node.depth = depth;
            return true;
        }
        false
    }

    fn intersect(
        &self,
        mut finger1: ValueId,
        mut finger2: ValueId,
        nodes: &HashMap<ValueId, DomNode>,
    ) -> ValueId {
        while finger1 != finger2 {
            while self.rpo.position_of(finger1) > self.rpo.position_of(finger2) {
                finger1 = nodes[&finger1].parent.expect("dominator chain broke");
            }
            while self.rpo.position_of(finger2) > self.rpo.position_of(finger1) {
                finger2 = nodes[&finger2].parent.expect("dominator chain broke");
            }
        }
        finger1
    }

    fn compute_children(&self, nodes: &mut HashMap<ValueId, DomNode>) {
        for value in self.rpo.iter() {
            if let Some(parent) = nodes[&value].parent {
                nodes.get_mut(&parent).unwrap().children.push(value);
            }
        }
    }

    /// Walks up the dominator chain from each predecessor of every join
    /// point, recording the join in each ancestor's frontier.
    fn compute_frontiers(&self, entry: ValueId, nodes: &mut HashMap<ValueId, DomNode>) {
        for value in self.rpo.iter() {
            if value == entry {
                continue;
            }
            let predecessors = self.reachable_predecessors(value);
            if predecessors.len() < 2 {
                continue;
            }
            let stop = nodes[&value].parent;
            for predecessor in predecessors {
                let mut runner = predecessor;
                while Some(runner) != stop {
                    let node = nodes.get_mut(&runner).unwrap();
                    if !node.frontiers.contains(&value) {
                        node.frontiers.push(value);
                    }
                    runner = node.parent.expect("dominator chain broke");
                }
            }
        }
    }
}

/// Convenience entry point over a function's CFG.
pub fn compute_dominator_tree(graph: &ValueGraph, function: FunctionId) -> DominatorTree {
    let cfg = ControlFlowGraph::new(graph, function);
    DominatorTreeBuilder::new(&cfg).build()
}
