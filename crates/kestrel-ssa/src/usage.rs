//! Variable-usage analysis over home/load/store form.
//!
//! The front-end lowering materializes each source variable as a "home"
//! instruction producing a pointer; reads become `load home` and writes
//! `store home, v`. [`VariableAnalyzer`] is told about every home as the
//! lowering emits it, then [`analyze`](VariableAnalyzer::analyze) classifies
//! each home as single-block, multi-block, or non-local (referenced from a
//! block of another function), and collects per-function read/write sets.
//!
//! The result is a frozen value: later edits to the graph invalidate it.

use std::collections::HashMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use kestrel_hir::{FunctionId, Opcode, TypeFactory, TypeId, ValueGraph, ValueId};

/// Where a home is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsedIn {
    /// Only in the block that materializes it.
    SingleBlock,
    /// In more than one block of the owning function.
    MultipleBlocks,
    /// From a block of a different function (a closure capture).
    NonLocal,
}

/// Classification record of one home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableData {
    pub home: ValueId,
    /// The variable's type (the pointee of the home's pointer type).
    pub ty: TypeId,
    /// The function owning the home's block.
    pub owner: FunctionId,
    pub used_in: UsedIn,
}

/// Per-function usage sets.
#[derive(Debug, Clone, Default)]
pub struct FunctionUsage {
    /// Homes owned by this function, in registration order, excluding
    /// non-local ones. These are the SSA-promotion candidates.
    pub local_variables: Vec<ValueId>,
    /// Homes this function reads before any write.
    pub non_local_reads: IndexSet<ValueId>,
    /// Homes this function writes.
    pub non_local_writes: IndexSet<ValueId>,
}

/// The frozen analysis result.
#[derive(Debug, Clone, Default)]
pub struct VariableUsages {
    variables: HashMap<ValueId, VariableData>,
    functions: HashMap<FunctionId, FunctionUsage>,
}

impl VariableUsages {
    pub fn data_for(&self, home: ValueId) -> Option<&VariableData> {
        self.variables.get(&home)
    }

    /// The promotion candidates of `function`, in registration order.
    pub fn local_variables_of(&self, function: FunctionId) -> &[ValueId] {
        self.functions
            .get(&function)
            .map(|usage| usage.local_variables.as_slice())
            .unwrap_or(&[])
    }

    pub fn usage_of(&self, function: FunctionId) -> Option<&FunctionUsage> {
        self.functions.get(&function)
    }

    /// Returns `true` if `home` is live outside its materializing block.
    pub fn is_alive_outside_home_block(&self, home: ValueId) -> bool {
        self.data_for(home)
            .is_some_and(|data| data.used_in != UsedIn::SingleBlock)
    }
}

/// Accumulates home registrations, then classifies them in one sweep.
#[derive(Debug, Default)]
pub struct VariableAnalyzer {
    variables: HashMap<ValueId, VariableData>,
    functions: HashMap<FunctionId, FunctionUsage>,
}

impl VariableAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function(&mut self, function: FunctionId) {
        self.functions.entry(function).or_default();
    }

    /// Registers a home instruction. The home must be attached and produce
    /// a pointer.
    pub fn register_variable(&mut self, graph: &ValueGraph, types: &TypeFactory, home: ValueId) {
        debug_assert!(!self.variables.contains_key(&home));
        let block = graph.inst(home).block.expect("home must be attached");
        let owner = graph
            .block(block)
            .function
            .expect("home block must belong to a function");
        let ty = types
            .pointee(graph.ty(home))
            .expect("home must produce a pointer");
        self.functions
            .entry(owner)
            .or_default()
            .local_variables
            .push(home);
        self.variables.insert(
            home,
            VariableData {
                home,
                ty,
                owner,
                used_in: UsedIn::SingleBlock,
            },
        );
    }

    /// Visits every block of every registered function and classifies the
    /// registered homes. Stores targeting unregistered values are skipped.
    pub fn analyze(mut self, graph: &ValueGraph) -> VariableUsages {
        let function_ids: Vec<FunctionId> = self.functions.keys().copied().collect();
        for function_id in function_ids {
            let Some(function) = graph.function(function_id) else {
                continue;
            };
            for &block in function.blocks() {
                for &inst in graph.block(block).instructions() {
                    match graph.inst(inst).opcode {
                        Opcode::Store => {
                            if let Some(home) = graph.operand(inst, 0) {
                                if self.variables.contains_key(&home) {
                                    self.did_set_variable(graph, home, block);
                                }
                            }
                        }
                        Opcode::Load => {
                            if let Some(home) = graph.operand(inst, 0) {
                                if self.variables.contains_key(&home) {
                                    self.did_use_variable(graph, home, block);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        // Non-local homes need liveness to promote; drop them from the
        // candidate lists.
        let variables = &self.variables;
        for usage in self.functions.values_mut() {
            usage
                .local_variables
                .retain(|home| variables[home].used_in != UsedIn::NonLocal);
        }

        VariableUsages {
            variables: self.variables,
            functions: self.functions,
        }
    }

    fn did_set_variable(&mut self, graph: &ValueGraph, home: ValueId, block: ValueId) {
        self.update_usage(graph, home, block);
        let function = graph
            .block(block)
            .function
            .expect("store block must belong to a function");
        let usage = self.functions.entry(function).or_default();
        usage.non_local_writes.insert(home);
        usage.non_local_reads.shift_remove(&home);
    }

    fn did_use_variable(&mut self, graph: &ValueGraph, home: ValueId, block: ValueId) {
        self.update_usage(graph, home, block);
        let function = graph
            .block(block)
            .function
            .expect("load block must belong to a function");
        let usage = self.functions.entry(function).or_default();
        if usage.non_local_writes.contains(&home) {
            return;
        }
        usage.non_local_reads.insert(home);
    }

    fn update_usage(&mut self, graph: &ValueGraph, home: ValueId, block: ValueId) {
        let home_block = graph.inst(home).block.expect("home must be attached");
        if home_block == block {
            return;
        }
        let data = self.variables.get_mut(&home).unwrap();
        if graph.block(block).function == Some(data.owner) {
            if data.used_in == UsedIn::SingleBlock {
                data.used_in = UsedIn::MultipleBlocks;
            }
        } else {
            data.used_in = UsedIn::NonLocal;
        }
    }
}
