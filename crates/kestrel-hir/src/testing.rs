//! Shared fixtures for the kestrel test suites.
//!
//! [`TestFunction`] bundles a type factory, a value graph, and one function,
//! with shortcuts for opening editors and formatting. [`sample_function`]
//! builds the seven-block irreducible-looking graph used by the dominator
//! and traversal tests.

use crate::editor::Editor;
use crate::format::{format_function, format_value};
use crate::graph::ValueGraph;
use crate::id::{FunctionId, ValueId};
use crate::type_factory::{TypeFactory, TypeId};
use crate::validate::{Detail, Diagnostic, Validator};

/// A factory, a graph, and one initialized function.
pub struct TestFunction {
    pub types: TypeFactory,
    pub graph: ValueGraph,
    pub function: FunctionId,
}

impl TestFunction {
    /// A fresh `void(void)` function.
    pub fn new() -> Self {
        Self::with_signature(TypeId::VOID, TypeId::VOID)
    }

    /// A fresh `return_type(parameters_type)` function with the canonical
    /// entry/exit skeleton established.
    pub fn with_signature(return_type: TypeId, parameters_type: TypeId) -> Self {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let fn_ty = types.function_type(return_type, parameters_type);
        let function = graph.new_function(&types, fn_ty);
        Editor::new(&mut graph, &types, function).unwrap();
        TestFunction {
            types,
            graph,
            function,
        }
    }

    /// Opens an editor over the function.
    pub fn editor(&mut self) -> Editor<'_> {
        Editor::new(&mut self.graph, &self.types, self.function).unwrap()
    }

    pub fn entry_block(&self) -> ValueId {
        self.graph.function(self.function).unwrap().entry_block()
    }

    pub fn exit_block(&self) -> ValueId {
        self.graph.function(self.function).unwrap().exit_block()
    }

    /// The `entry` instruction, usable as a value of the parameters type.
    pub fn entry_value(&self) -> ValueId {
        self.graph
            .block(self.entry_block())
            .first_instruction()
            .unwrap()
    }

    pub fn format(&self) -> String {
        format_function(&self.graph, &self.types, self.function)
    }

    /// Runs whole-function validation and returns its findings.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut validator = Validator::new(&self.graph, &self.types, self.function);
        validator.validate_function();
        validator.into_diagnostics()
    }
}

impl Default for TestFunction {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders diagnostics one per line: `<code> <value> <detail> ...`.
pub fn diagnostics_to_string(
    graph: &ValueGraph,
    types: &TypeFactory,
    diagnostics: &[Diagnostic],
) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        out.push_str(&format!(
            "{} {}",
            diagnostic.code,
            format_value(graph, types, diagnostic.value)
        ));
        for detail in &diagnostic.details {
            let rendered = match detail {
                Detail::Index(index) => index.to_string(),
                Detail::Type(ty) => crate::format::format_type(types, *ty),
                Detail::Value(value) => format_value(graph, types, *value),
            };
            out.push_str(&format!(" {rendered}"));
        }
        out.push('\n');
    }
    out
}

/// Builds the seven-block sample graph:
///
/// ```text
///      B0---------+    B0 -> B1, B5
///      |          |
///      B1<------+ |    B1 -> B2, B4
///      |        | |
///   +->B2-->B6  | |    B2 -> B3, B6
///   |  |    |   | |
///   +--B3<--+   | |    B3 -> B2, B4
///      |        | |
///      B4<------+ |    B4 -> B1, B5
///      |          |    B6 -> B3
///      B5<--------+
/// ```
///
/// Returns the fixture plus `[B0..B6]`.
pub fn sample_function() -> (TestFunction, [ValueId; 7]) {
    let mut test = TestFunction::with_signature(TypeId::VOID, TypeId::BOOL);
    let void_value = test.graph.void_literal();
    let condition = test.entry_value();
    let entry = test.entry_block();

    let mut editor = test.editor();
    let mut blocks = [ValueId(0); 7];
    for block in &mut blocks {
        *block = editor.new_block();
    }

    editor.edit(entry);
    editor.set_jump(blocks[0]);
    editor.commit();

    editor.edit(blocks[0]);
    editor.set_branch(condition, blocks[1], blocks[5]);
    editor.commit();

    editor.edit(blocks[1]);
    editor.set_branch(condition, blocks[2], blocks[4]);
    editor.commit();

    editor.edit(blocks[2]);
    editor.set_branch(condition, blocks[3], blocks[6]);
    editor.commit();

    editor.edit(blocks[3]);
    editor.set_branch(condition, blocks[2], blocks[4]);
    editor.commit();

    editor.edit(blocks[4]);
    editor.set_branch(condition, blocks[1], blocks[5]);
    editor.commit();

    editor.edit(blocks[5]);
    editor.set_return(void_value);
    editor.commit();

    editor.edit(blocks[6]);
    editor.set_jump(blocks[3]);
    editor.commit();

    drop(editor);
    (test, blocks)
}
