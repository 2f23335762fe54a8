//! Error types for the kestrel-ssa passes.

use thiserror::Error;

use kestrel_hir::{Diagnostic, FunctionId, HirError};

/// Errors produced by the kestrel-ssa crate.
///
/// Passes refuse to run over a function that fails validation and hand the
/// findings back to the caller.
#[derive(Debug, Error)]
pub enum SsaError {
    /// The input function failed whole-function validation.
    #[error("function {id} failed validation with {} finding(s)", diagnostics.len())]
    InvalidFunction {
        id: FunctionId,
        diagnostics: Vec<Diagnostic>,
    },

    #[error(transparent)]
    Hir(#[from] HirError),
}
