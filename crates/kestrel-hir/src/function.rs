//! Function values: ordered block lists plus per-function id counters.

use serde::{Deserialize, Serialize};

use crate::id::{FunctionId, ValueId};
use crate::type_factory::TypeId;

/// A function: an ordered list of basic blocks.
///
/// The first block is the unique entry (its first instruction is `entry`)
/// and the last is the unique exit (its first instruction is `exit`). The
/// [`Editor`](crate::editor::Editor) establishes this shape on first open
/// and keeps new blocks spliced between the two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    /// The function type (`return_type(parameters_type)`).
    pub ty: TypeId,
    pub(crate) blocks: Vec<ValueId>,
    /// Display-id counters. Blocks and instructions number independently,
    /// both starting at 1.
    pub(crate) last_block_id: u32,
    pub(crate) last_instruction_id: u32,
}

impl Function {
    pub(crate) fn new(id: FunctionId, ty: TypeId) -> Self {
        Function {
            id,
            ty,
            blocks: Vec::new(),
            last_block_id: 0,
            last_instruction_id: 0,
        }
    }

    /// The blocks of this function in layout order.
    pub fn blocks(&self) -> &[ValueId] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The entry block. The function must be initialized.
    pub fn entry_block(&self) -> ValueId {
        self.blocks[0]
    }

    /// The exit block. The function must be initialized.
    pub fn exit_block(&self) -> ValueId {
        self.blocks[self.blocks.len() - 1]
    }

    pub(crate) fn next_block_id(&mut self) -> u32 {
        self.last_block_id += 1;
        self.last_block_id
    }

    pub(crate) fn next_instruction_id(&mut self) -> u32 {
        self.last_instruction_id += 1;
        self.last_instruction_id
    }
}
