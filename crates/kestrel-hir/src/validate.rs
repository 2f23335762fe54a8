//! Structural and typing validation with structured diagnostics.
//!
//! Validation never panics and never throws: every violation becomes a
//! [`Diagnostic`] carrying an [`ErrorCode`], the primary value, and detail
//! values (operand index, expected type, observed value). Codes render as
//! `Category.Subcategory.Name`, e.g. `Validate.BasicBlock.Empty`.
//!
//! Per-block validation (run on every editor commit) checks block shape and
//! non-phi instruction contracts. Phi contracts reference predecessor sets,
//! which are in flux while a pass is rewriting control flow, so they are
//! only checked by whole-function validation at pass boundaries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::ValueGraph;
use crate::id::{FunctionId, ValueId};
use crate::instruction::Opcode;
use crate::type_factory::{TypeFactory, TypeId};

/// Validation error codes, rendered as `Validate.<Subcategory>.<Name>`.
///
/// The enumeration is part of the middle-end's interface; expanding it is a
/// breaking change for diagnostic printers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Basic block
    BasicBlockEmpty,
    BasicBlockEntry,
    BasicBlockExit,
    BasicBlockNoFunction,
    BasicBlockNoId,
    BasicBlockNoTerminator,
    // Function
    FunctionEmpty,
    FunctionExit,
    FunctionNoEntry,
    FunctionNoExit,
    // Instruction
    InstructionNoId,
    InstructionOperand,
    InstructionOutput,
    InstructionTerminator,
    // Phi
    PhiCount,
    PhiNotFound,
    PhiOne,
}

impl ErrorCode {
    pub fn severity(self) -> Severity {
        match self {
            ErrorCode::PhiOne => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::BasicBlockEmpty => "BasicBlock.Empty",
            ErrorCode::BasicBlockEntry => "BasicBlock.Entry",
            ErrorCode::BasicBlockExit => "BasicBlock.Exit",
            ErrorCode::BasicBlockNoFunction => "BasicBlock.NoFunction",
            ErrorCode::BasicBlockNoId => "BasicBlock.NoId",
            ErrorCode::BasicBlockNoTerminator => "BasicBlock.NoTerminator",
            ErrorCode::FunctionEmpty => "Function.Empty",
            ErrorCode::FunctionExit => "Function.Exit",
            ErrorCode::FunctionNoEntry => "Function.NoEntry",
            ErrorCode::FunctionNoExit => "Function.NoExit",
            ErrorCode::InstructionNoId => "Instruction.NoId",
            ErrorCode::InstructionOperand => "Instruction.Operand",
            ErrorCode::InstructionOutput => "Instruction.Output",
            ErrorCode::InstructionTerminator => "Instruction.Terminator",
            ErrorCode::PhiCount => "Phi.Count",
            ErrorCode::PhiNotFound => "Phi.NotFound",
            ErrorCode::PhiOne => "Phi.One",
        };
        write!(f, "Validate.{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A detail value attached to a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detail {
    /// An operand index.
    Index(i32),
    /// An expected or observed type.
    Type(TypeId),
    /// An expected or observed value.
    Value(ValueId),
}

/// One validation finding: `(code, primary_value, detail_values)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub value: ValueId,
    pub details: Vec<Detail>,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

/// Read-only checker over one function. Findings accumulate; a validation
/// entry point returns `false` iff it recorded at least one error-severity
/// diagnostic.
pub struct Validator<'a> {
    graph: &'a ValueGraph,
    types: &'a TypeFactory,
    function: FunctionId,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Validator<'a> {
    pub fn new(graph: &'a ValueGraph, types: &'a TypeFactory, function: FunctionId) -> Self {
        Validator {
            graph,
            types,
            function,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn error(&mut self, code: ErrorCode, value: ValueId) {
        self.diagnostics.push(Diagnostic {
            code,
            value,
            details: Vec::new(),
        });
    }

    fn error_with(&mut self, code: ErrorCode, value: ValueId, details: Vec<Detail>) {
        self.diagnostics.push(Diagnostic { code, value, details });
    }

    fn operand_error(&mut self, inst: ValueId, index: i32, detail: Option<Detail>) {
        let mut details = vec![Detail::Index(index)];
        details.extend(detail);
        self.error_with(ErrorCode::InstructionOperand, inst, details);
    }

    // -----------------------------------------------------------------------
    // Block validation
    // -----------------------------------------------------------------------

    /// Validates block shape and the contracts of its non-phi instructions.
    pub fn validate_block(&mut self, block: ValueId) -> bool {
        let data = self.graph.block(block);
        if data.id == 0 {
            self.error(ErrorCode::BasicBlockNoId, block);
            return false;
        }
        let Some(function) = data.function else {
            self.error(ErrorCode::BasicBlockNoFunction, block);
            return false;
        };
        if data.instructions.is_empty() {
            self.error(ErrorCode::BasicBlockEmpty, block);
            return false;
        }

        let function = &self.graph.functions[&function];
        let first = data.first_instruction().unwrap();
        if self.graph.inst(first).opcode == Opcode::Entry && function.entry_block() != block {
            self.error_with(
                ErrorCode::BasicBlockEntry,
                block,
                vec![Detail::Value(function.entry_block())],
            );
            return false;
        }
        if self.graph.inst(first).opcode == Opcode::Exit && function.exit_block() != block {
            self.error_with(
                ErrorCode::BasicBlockExit,
                block,
                vec![Detail::Value(function.exit_block())],
            );
            return false;
        }

        let mut found_terminator = false;
        let mut valid = true;
        for &inst in &data.instructions {
            if self.graph.inst(inst).id == 0 {
                self.error(ErrorCode::InstructionNoId, inst);
                return false;
            }
            if found_terminator {
                // Anything after the terminator is misplaced.
                self.error(ErrorCode::InstructionTerminator, inst);
                return false;
            }
            if self.graph.inst(inst).is_terminator() {
                found_terminator = true;
            }
            if !self.validate_instruction(inst) {
                valid = false;
            }
        }
        if !found_terminator {
            self.error(ErrorCode::BasicBlockNoTerminator, block);
            return false;
        }
        valid
    }

    // -----------------------------------------------------------------------
    // Function validation
    // -----------------------------------------------------------------------

    /// Validates the whole function: shape, every block, every phi.
    pub fn validate_function(&mut self) -> bool {
        let function = &self.graph.functions[&self.function];
        if function.is_empty() {
            self.error_function(ErrorCode::FunctionEmpty);
            return false;
        }
        let entry = function.entry_block();
        match self.graph.block(entry).first_instruction() {
            Some(first) if self.graph.inst(first).opcode == Opcode::Entry => {}
            _ => {
                self.error_function(ErrorCode::FunctionNoEntry);
                return false;
            }
        }

        let blocks = function.blocks().to_vec();
        let mut found_exit = false;
        let mut valid = true;
        for block in blocks {
            if self.graph.block(block).id == 0 {
                self.error(ErrorCode::BasicBlockNoId, block);
                return false;
            }
            if !self.validate_block(block) {
                valid = false;
            }
            for &phi in self.graph.block(block).phis() {
                if !self.validate_phi(phi) {
                    valid = false;
                }
            }
            let is_exit = self
                .graph
                .block(block)
                .last_instruction()
                .is_some_and(|last| self.graph.inst(last).opcode == Opcode::Exit);
            if is_exit {
                if found_exit {
                    self.error_function(ErrorCode::FunctionExit);
                    return false;
                }
                found_exit = true;
            }
        }
        if !found_exit {
            self.error_function(ErrorCode::FunctionNoExit);
            return false;
        }
        valid
    }

    fn error_function(&mut self, code: ErrorCode) {
        // The function has no value node; report against its entry block if
        // it has one, else a null value id.
        let function = &self.graph.functions[&self.function];
        let value = function.blocks().first().copied().unwrap_or(ValueId(0));
        self.error(code, value);
    }

    // -----------------------------------------------------------------------
    // Instruction validation
    // -----------------------------------------------------------------------

    /// Validates one non-phi instruction's operand shape and typing.
    pub fn validate_instruction(&mut self, inst: ValueId) -> bool {
        let before = self.error_count();
        match self.graph.inst(inst).opcode {
            Opcode::Branch => self.check_branch(inst),
            Opcode::Call => self.check_call(inst),
            Opcode::Entry => self.check_entry(inst),
            Opcode::Exit => self.check_exit(inst),
            Opcode::Load => self.check_load(inst),
            Opcode::Phi => self.check_phi(inst),
            Opcode::Return => self.check_return(inst),
            Opcode::Store => self.check_store(inst),
        }
        self.error_count() == before
    }

    /// Validates one phi against its block's predecessor set.
    pub fn validate_phi(&mut self, phi: ValueId) -> bool {
        let before = self.error_count();
        self.check_phi(phi);
        self.error_count() == before
    }

    fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    fn operand_ty(&self, inst: ValueId, slot: u16) -> Option<TypeId> {
        self.graph.operand(inst, slot).map(|v| self.graph.ty(v))
    }

    fn operand_is_block(&self, inst: ValueId, slot: u16) -> bool {
        self.graph
            .operand(inst, slot)
            .is_some_and(|v| self.graph.is_block(v))
    }

    fn check_branch(&mut self, inst: ValueId) {
        if self.graph.ty(inst) != TypeId::VOID {
            self.error(ErrorCode::InstructionOutput, inst);
            return;
        }
        if self.graph.operand_count(inst) == 1 {
            // Unconditional branch.
            if !self.operand_is_block(inst, 0) {
                self.operand_error(inst, 0, None);
            }
            return;
        }
        if self.operand_ty(inst, 0) != Some(TypeId::BOOL) {
            self.operand_error(inst, 0, None);
            return;
        }
        if !self.operand_is_block(inst, 1) {
            self.operand_error(inst, 1, None);
            return;
        }
        if !self.operand_is_block(inst, 2) {
            self.operand_error(inst, 2, None);
        }
    }

    fn check_call(&mut self, inst: ValueId) {
        let Some(callee_ty) = self.operand_ty(inst, 0) else {
            self.operand_error(inst, 0, None);
            return;
        };
        let Some((return_type, parameters_type)) = self.types.function_parts(callee_ty) else {
            self.operand_error(inst, 0, Some(Detail::Type(callee_ty)));
            return;
        };
        if self.graph.ty(inst) != return_type {
            self.error_with(
                ErrorCode::InstructionOutput,
                inst,
                vec![Detail::Type(return_type)],
            );
            return;
        }
        if self.operand_ty(inst, 1) != Some(parameters_type) {
            self.operand_error(inst, 1, Some(Detail::Type(parameters_type)));
        }
    }

    fn check_entry(&mut self, inst: ValueId) {
        let function = &self.graph.functions[&self.function];
        let (_, parameters_type) = self
            .types
            .function_parts(function.ty)
            .expect("function value must have a function type");
        if self.graph.ty(inst) != parameters_type {
            self.error_with(
                ErrorCode::InstructionOutput,
                inst,
                vec![Detail::Type(parameters_type)],
            );
        }
    }

    fn check_exit(&mut self, inst: ValueId) {
        if self.graph.ty(inst) != TypeId::VOID {
            self.error(ErrorCode::InstructionOutput, inst);
        }
    }

    fn check_load(&mut self, inst: ValueId) {
        let Some(pointer_ty) = self.operand_ty(inst, 0) else {
            self.operand_error(inst, 0, None);
            return;
        };
        let Some(pointee) = self.types.pointee(pointer_ty) else {
            self.operand_error(inst, 0, Some(Detail::Type(pointer_ty)));
            return;
        };
        if self.graph.ty(inst) != pointee {
            self.error_with(
                ErrorCode::InstructionOutput,
                inst,
                vec![Detail::Type(pointer_ty)],
            );
        }
    }

    fn check_phi(&mut self, phi: ValueId) {
        let data = self.graph.inst(phi);
        let Some(block) = data.block else {
            self.error(ErrorCode::InstructionNoId, phi);
            return;
        };
        for predecessor in self.graph.predecessors(block) {
            if data.phi_input_for(predecessor).is_none() {
                self.error_with(
                    ErrorCode::PhiNotFound,
                    phi,
                    vec![Detail::Value(predecessor)],
                );
                return;
            }
        }
        let output_ty = data.ty;
        let count = data.phi_blocks().len();
        for slot in 0..count {
            let Some(input) = self.graph.operand(phi, slot as u16) else {
                self.operand_error(phi, slot as i32, None);
                return;
            };
            if self.graph.ty(input) != output_ty {
                self.operand_error(phi, slot as i32, Some(Detail::Value(input)));
                return;
            }
        }
        if count == 0 {
            self.error(ErrorCode::PhiCount, phi);
            return;
        }
        if count == 1 {
            // Legal but suspicious; warning severity.
            self.error(ErrorCode::PhiOne, phi);
        }
    }

    fn check_return(&mut self, inst: ValueId) {
        let function = &self.graph.functions[&self.function];
        let (return_type, _) = self
            .types
            .function_parts(function.ty)
            .expect("function value must have a function type");
        let exit_block = function.exit_block();
        if self.operand_ty(inst, 0) != Some(return_type) {
            self.operand_error(inst, 0, Some(Detail::Type(return_type)));
            return;
        }
        if self.graph.operand(inst, 1) != Some(exit_block) {
            self.operand_error(inst, 1, Some(Detail::Value(exit_block)));
        }
    }

    fn check_store(&mut self, inst: ValueId) {
        if self.graph.ty(inst) != TypeId::VOID {
            self.error(ErrorCode::InstructionOutput, inst);
            return;
        }
        let Some(pointer_ty) = self.operand_ty(inst, 0) else {
            self.operand_error(inst, 0, None);
            return;
        };
        let Some(pointee) = self.types.pointee(pointer_ty) else {
            self.operand_error(inst, 0, Some(Detail::Type(pointer_ty)));
            return;
        };
        if self.operand_ty(inst, 1) != Some(pointee) {
            self.operand_error(inst, 1, Some(Detail::Type(pointee)));
        }
    }
}
