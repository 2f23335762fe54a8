//! The instruction set: opcodes and instruction payloads.
//!
//! The opcode enumeration is the public vocabulary of the middle-end;
//! expanding it is a breaking change. Each opcode has a fixed operand shape
//! enforced by the [`Validator`](crate::validate::Validator):
//!
//! ```text
//! entry() -> parameters_type
//! exit()
//! br(cond: bool, true_block, false_block)
//! br(target_block)
//! ty %r = call(callee: fn_type, args: parameters_type)
//! ty %r = load(ptr: T*)
//! store(ptr: T*, value: T)
//! ret(value: return_type, exit_block)
//! ty %r = phi(block_1: value_1, ...)
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{SourceLocation, ValueId};
use crate::type_factory::TypeId;

/// Instruction opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Branch,
    Call,
    Entry,
    Exit,
    Load,
    Phi,
    Return,
    Store,
}

impl Opcode {
    /// Mnemonic used by the textual formatter.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Branch => "br",
            Opcode::Call => "call",
            Opcode::Entry => "entry",
            Opcode::Exit => "exit",
            Opcode::Load => "load",
            Opcode::Phi => "phi",
            Opcode::Return => "ret",
            Opcode::Store => "store",
        }
    }

    /// Returns `true` for instructions that must be placed at the end of a
    /// block.
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Branch | Opcode::Exit | Opcode::Return)
    }

    /// Returns `true` if an instruction with this opcode can be removed when
    /// its output has no users. `call` and `store` have side effects;
    /// terminators and `entry` carry control-flow meaning.
    pub fn can_be_removed(self) -> bool {
        matches!(self, Opcode::Load | Opcode::Phi)
    }
}

/// Payload of an instruction value.
///
/// Operand slots live as use-def edges in the [`ValueGraph`](crate::graph::ValueGraph);
/// the payload stores only what the edges cannot: identity, output type,
/// block membership, and for phis the predecessor key of each input slot.
#[derive(Debug, Clone)]
pub struct InstData {
    /// Positive display id while attached; 0 when detached.
    pub id: u32,
    pub opcode: Opcode,
    /// Output type; `void` if the instruction produces nothing.
    pub ty: TypeId,
    /// The block this instruction belongs to, if attached.
    pub block: Option<ValueId>,
    pub location: SourceLocation,
    /// For `phi` only: the predecessor block keying operand slot `i`.
    pub(crate) phi_blocks: SmallVec<[ValueId; 2]>,
}

impl InstData {
    pub(crate) fn new(opcode: Opcode, ty: TypeId) -> Self {
        InstData {
            id: 0,
            opcode,
            ty,
            block: None,
            location: SourceLocation::NONE,
            phi_blocks: SmallVec::new(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }

    /// For phis, the predecessor block of each input slot, in slot order.
    pub fn phi_blocks(&self) -> &[ValueId] {
        &self.phi_blocks
    }

    /// The input slot keyed by `block`, if this phi has one.
    pub fn phi_input_for(&self, block: ValueId) -> Option<u16> {
        self.phi_blocks.iter().position(|&b| b == block).map(|i| i as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics() {
        assert_eq!(Opcode::Branch.mnemonic(), "br");
        assert_eq!(Opcode::Call.mnemonic(), "call");
        assert_eq!(Opcode::Entry.mnemonic(), "entry");
        assert_eq!(Opcode::Exit.mnemonic(), "exit");
        assert_eq!(Opcode::Load.mnemonic(), "load");
        assert_eq!(Opcode::Phi.mnemonic(), "phi");
        assert_eq!(Opcode::Return.mnemonic(), "ret");
        assert_eq!(Opcode::Store.mnemonic(), "store");
    }

    #[test]
    fn terminators() {
        assert!(Opcode::Branch.is_terminator());
        assert!(Opcode::Exit.is_terminator());
        assert!(Opcode::Return.is_terminator());
        assert!(!Opcode::Call.is_terminator());
        assert!(!Opcode::Entry.is_terminator());
        assert!(!Opcode::Load.is_terminator());
        assert!(!Opcode::Phi.is_terminator());
        assert!(!Opcode::Store.is_terminator());
    }

    #[test]
    fn side_effects() {
        assert!(Opcode::Load.can_be_removed());
        assert!(Opcode::Phi.can_be_removed());
        assert!(!Opcode::Call.can_be_removed());
        assert!(!Opcode::Store.can_be_removed());
        assert!(!Opcode::Return.can_be_removed());
    }

    #[test]
    fn phi_input_lookup() {
        let mut inst = InstData::new(Opcode::Phi, TypeId::INT32);
        inst.phi_blocks.push(ValueId(4));
        inst.phi_blocks.push(ValueId(9));
        assert_eq!(inst.phi_input_for(ValueId(4)), Some(0));
        assert_eq!(inst.phi_input_for(ValueId(9)), Some(1));
        assert_eq!(inst.phi_input_for(ValueId(5)), None);
    }

    #[test]
    fn serde_roundtrip_opcode() {
        let json = serde_json::to_string(&Opcode::Return).unwrap();
        let back: Opcode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Opcode::Return);
    }
}
