//! API-level error types for kestrel-hir.
//!
//! Uses `thiserror` for structured, matchable variants. These are distinct
//! from IR validation failures, which are reported as
//! [`Diagnostic`](crate::validate::Diagnostic) values rather than Rust
//! errors.

use thiserror::Error;

use crate::id::FunctionId;
use crate::type_factory::TypeId;

/// Errors produced by the kestrel-hir crate.
#[derive(Debug, Error)]
pub enum HirError {
    /// A function id was not found in the value graph.
    #[error("function not found: FunctionId({id})", id = id.0)]
    FunctionNotFound { id: FunctionId },

    /// A type id was not found in the type factory.
    #[error("type not found: {id}")]
    TypeNotFound { id: TypeId },
}
