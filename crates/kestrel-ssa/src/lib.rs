pub mod cfg;
pub mod critical_edge;
pub mod dominator;
pub mod error;
pub mod ssa;
pub mod usage;

// Re-export commonly used types
pub use cfg::{BlockOrder, ControlFlowGraph, FlowGraph, Order};
pub use critical_edge::RemoveCriticalEdges;
pub use dominator::{compute_dominator_tree, DomNode, DominatorTree, DominatorTreeBuilder};
pub use error::SsaError;
pub use ssa::SsaBuilder;
pub use usage::{FunctionUsage, UsedIn, VariableAnalyzer, VariableData, VariableUsages};
