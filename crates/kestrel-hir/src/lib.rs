pub mod editor;
pub mod error;
pub mod format;
pub mod function;
pub mod graph;
pub mod id;
pub mod instruction;
pub mod testing;
pub mod type_factory;
pub mod types;
pub mod validate;
pub mod value;

// Re-export commonly used types
pub use editor::Editor;
pub use error::HirError;
pub use format::{format_function, format_type, format_value};
pub use function::Function;
pub use graph::{UseEdge, UseRef, ValueGraph};
pub use id::{FunctionId, SourceLocation, ValueId};
pub use instruction::{InstData, Opcode};
pub use type_factory::{TypeFactory, TypeId};
pub use types::{HirType, PrimitiveType, RegisterClass};
pub use validate::{Detail, Diagnostic, ErrorCode, Severity, Validator};
pub use value::{BlockData, Literal, LiteralData, ReferenceData, Value};
