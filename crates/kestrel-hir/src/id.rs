//! Stable ID newtypes for IR entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `ValueId` cannot be accidentally used where a `FunctionId` is
//! expected.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Stable identifier of a value node in the [`ValueGraph`](crate::graph::ValueGraph).
/// Maps to a petgraph `NodeIndex<u32>`.
///
/// A `ValueId` names a node slot, not a display id: blocks and instructions
/// additionally carry a positive per-function display id while attached (the
/// number rendered as `block3` or `%7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Function identity within a value graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

/// Opaque source-location token attached to every instruction.
///
/// The middle-end only stores and copies these; decoding them back into
/// file/line positions is the front end's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation(pub u32);

impl SourceLocation {
    /// The "no location" sentinel used for synthesized instructions.
    pub const NONE: SourceLocation = SourceLocation(u32::MAX);

    /// Returns `true` if this is the sentinel location.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bridge between ValueId and petgraph's NodeIndex<u32>.

impl From<NodeIndex<u32>> for ValueId {
    fn from(idx: NodeIndex<u32>) -> Self {
        ValueId(idx.index() as u32)
    }
}

impl From<ValueId> for NodeIndex<u32> {
    fn from(id: ValueId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}
