//! Deterministic human-readable printer for types, values, and functions.
//!
//! The output is the contract the test suite asserts against:
//!
//! ```text
//! Function <return_type>(<parameters_type>)
//! block<id>:
//!   // In: block<id>, ...
//!   // Out: block<id>, ...
//!   [<out_type> %<result_id> = ]<mnemonic> <operand>, <operand>, ...
//! ```
//!
//! Operands render as `block<id>` for blocks, `%<id>` for instruction
//! results, backquoted names for references, and `<type> <value>` for
//! literals (`null` as `static_cast<T>(null)`, the void literal as bare
//! `void`). Phi inputs render as `block<id>: <value>` pairs. Predecessor
//! lists are ordered by block id; successor lists follow terminator operand
//! order.

use crate::graph::ValueGraph;
use crate::id::{FunctionId, ValueId};
use crate::instruction::Opcode;
use crate::type_factory::{TypeFactory, TypeId};
use crate::types::HirType;
use crate::value::{Literal, Value};

/// Renders a type.
pub fn format_type(types: &TypeFactory, ty: TypeId) -> String {
    match types.kind(ty) {
        HirType::Primitive(kind) => kind.name().to_string(),
        HirType::Pointer { pointee } => format!("{}*", format_type(types, *pointee)),
        HirType::Array { element, dimensions } => {
            let dims: Vec<String> = dimensions
                .iter()
                .map(|&d| if d < 0 { String::new() } else { d.to_string() })
                .collect();
            format!("{}[{}]", format_type(types, *element), dims.join(", "))
        }
        HirType::Tuple { members } => {
            let members: Vec<String> = members.iter().map(|&m| format_type(types, m)).collect();
            format!("({})", members.join(", "))
        }
        HirType::Function {
            return_type,
            parameters_type,
        } => format!(
            "{}({})",
            format_type(types, *return_type),
            format_type(types, *parameters_type)
        ),
        HirType::External { name } => name.clone(),
        HirType::String => "string".to_string(),
    }
}

/// Renders a value as it appears in operand position.
pub fn format_value(graph: &ValueGraph, types: &TypeFactory, value: ValueId) -> String {
    match graph.value(value) {
        Value::Block(block) => format!("block{}", block.id),
        Value::Inst(inst) => format!("%{}", inst.id),
        Value::Reference(reference) => format!("`{}`", reference.name),
        Value::Literal(literal) => {
            let ty = format_type(types, literal.ty);
            match &literal.value {
                Literal::Bool(v) => format!("{ty} {v}"),
                Literal::Char(v) => format!("{ty} '{v}'"),
                Literal::Float32(v) => format!("{ty} {v}f"),
                Literal::Float64(v) => format!("{ty} {v}"),
                Literal::Int16(v) => format!("{ty} {v}"),
                Literal::Int32(v) => format!("{ty} {v}"),
                Literal::Int64(v) => format!("{ty} {v}"),
                Literal::Int8(v) => format!("{ty} {v}"),
                Literal::Str(v) => format!("{ty} \"{v}\""),
                Literal::UInt16(v) => format!("{ty} {v}"),
                Literal::UInt32(v) => format!("{ty} {v}"),
                Literal::UInt64(v) => format!("{ty} {v}"),
                Literal::UInt8(v) => format!("{ty} {v}"),
                Literal::Null => format!("static_cast<{ty}>(null)"),
                Literal::Void => "void".to_string(),
            }
        }
    }
}

/// Renders one instruction without indentation or newline.
pub fn format_instruction(graph: &ValueGraph, types: &TypeFactory, inst: ValueId) -> String {
    let data = graph.inst(inst);
    let mut out = String::new();
    if data.ty != TypeId::VOID {
        out.push_str(&format!("{} %{} = ", format_type(types, data.ty), data.id));
    }
    out.push_str(data.opcode.mnemonic());

    let operands: Vec<String> = if data.opcode == Opcode::Phi {
        data.phi_blocks()
            .iter()
            .enumerate()
            .map(|(slot, &pred)| {
                let input = graph
                    .operand(inst, slot as u16)
                    .map(|v| format_value(graph, types, v))
                    .unwrap_or_else(|| "?".to_string());
                format!("block{}: {}", graph.block(pred).id, input)
            })
            .collect()
    } else {
        graph
            .operands(inst)
            .iter()
            .map(|&operand| format_value(graph, types, operand))
            .collect()
    };
    if !operands.is_empty() {
        out.push(' ');
        out.push_str(&operands.join(", "));
    }
    out
}

/// Renders a whole function in layout order.
pub fn format_function(graph: &ValueGraph, types: &TypeFactory, function: FunctionId) -> String {
    let function = graph.function(function).expect("unknown function");
    let mut out = format!("Function {}\n", format_type(types, function.ty));
    for &block in function.blocks() {
        let data = graph.block(block);
        out.push_str(&format!("block{}:\n", data.id));

        let predecessors: Vec<String> = graph
            .predecessors(block)
            .iter()
            .map(|&p| format!("block{}", graph.block(p).id))
            .collect();
        if predecessors.is_empty() {
            out.push_str("  // In:\n");
        } else {
            out.push_str(&format!("  // In: {}\n", predecessors.join(", ")));
        }

        let successors: Vec<String> = graph
            .successors(block)
            .iter()
            .map(|&s| format!("block{}", graph.block(s).id))
            .collect();
        if successors.is_empty() {
            out.push_str("  // Out:\n");
        } else {
            out.push_str(&format!("  // Out: {}\n", successors.join(", ")));
        }

        for &phi in data.phis() {
            out.push_str("  ");
            out.push_str(&format_instruction(graph, types, phi));
            out.push('\n');
        }
        for &inst in data.instructions() {
            out.push_str("  ");
            out.push_str(&format_instruction(graph, types, inst));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;

    #[test]
    fn format_primitive_and_composite_types() {
        let mut types = TypeFactory::new();
        assert_eq!(format_type(&types, TypeId::INT32), "int32");
        assert_eq!(format_type(&types, TypeId::VOID), "void");
        assert_eq!(format_type(&types, TypeId::STRING), "string");

        let ptr = types.pointer_type(TypeId::INT32);
        assert_eq!(format_type(&types, ptr), "int32*");

        let array = types.array_type(TypeId::INT32, &[-1]);
        assert_eq!(format_type(&types, array), "int32[]");
        let sized = types.array_type(TypeId::INT32, &[3, 4]);
        assert_eq!(format_type(&types, sized), "int32[3, 4]");

        let tuple = types.tuple_type(&[TypeId::INT32, TypeId::BOOL]);
        assert_eq!(format_type(&types, tuple), "(int32, bool)");

        let fn_ty = types.function_type(TypeId::INT32, tuple);
        assert_eq!(format_type(&types, fn_ty), "int32((int32, bool))");

        let external = types.external_type("System.Console");
        assert_eq!(format_type(&types, external), "System.Console");
    }

    #[test]
    fn format_literals() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();

        let int = graph.int32_literal(42);
        assert_eq!(format_value(&graph, &types, int), "int32 42");

        let boolean = graph.bool_literal(true);
        assert_eq!(format_value(&graph, &types, boolean), "bool true");

        let float = graph.float32_literal(1.5);
        assert_eq!(format_value(&graph, &types, float), "float32 1.5f");

        let string = graph.string_literal("hi");
        assert_eq!(format_value(&graph, &types, string), "string \"hi\"");

        let void_value = graph.void_literal();
        assert_eq!(format_value(&graph, &types, void_value), "void");

        let ptr = types.pointer_type(TypeId::INT32);
        let null = graph.null_literal(ptr);
        assert_eq!(format_value(&graph, &types, null), "static_cast<int32*>(null)");

        let fn_ty = types.function_type(TypeId::INT32, TypeId::VOID);
        let reference = graph.reference("Sample.Bar", fn_ty);
        assert_eq!(format_value(&graph, &types, reference), "`Sample.Bar`");
    }

    #[test]
    fn format_empty_function() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let fn_ty = types.function_type(TypeId::VOID, TypeId::VOID);
        let function = graph.new_function(&types, fn_ty);
        Editor::new(&mut graph, &types, function).unwrap();

        let expected = [
            "Function void(void)",
            "block1:",
            "  // In:",
            "  // Out: block2",
            "  entry",
            "  ret void, block2",
            "block2:",
            "  // In: block1",
            "  // Out:",
            "  exit",
            "",
        ]
        .join("\n");
        assert_eq!(format_function(&graph, &types, function), expected);
    }

    #[test]
    fn format_branching_function() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();
        let fn_ty = types.function_type(TypeId::VOID, TypeId::BOOL);
        let function = graph.new_function(&types, fn_ty);
        let void_value = graph.void_literal();

        let mut editor = Editor::new(&mut graph, &types, function).unwrap();
        let entry = editor.entry_block();
        let condition = editor.graph().block(entry).first_instruction().unwrap();
        let merge = editor.new_block();

        editor.edit(entry);
        editor.set_branch(condition, merge, merge);
        assert!(editor.commit());
        editor.edit(merge);
        editor.set_return(void_value);
        assert!(editor.commit());

        insta::assert_snapshot!(format_function(&graph, &types, function), @r"
        Function void(bool)
        block1:
          // In:
          // Out: block3, block3
          bool %2 = entry
          br %2, block3, block3
        block3:
          // In: block1
          // Out: block2
          ret void, block2
        block2:
          // In: block3
          // Out:
          exit
        ");
    }

    #[test]
    fn format_type_and_value_snapshots() {
        let mut types = TypeFactory::new();
        let mut graph = ValueGraph::new();

        let ptr = types.pointer_type(TypeId::INT32);
        let fn_ty = types.function_type(ptr, TypeId::VOID);
        insta::assert_snapshot!(format_type(&types, fn_ty), @"int32*(void)");

        let null = graph.null_literal(ptr);
        insta::assert_snapshot!(format_value(&graph, &types, null), @"static_cast<int32*>(null)");

        let greeting = graph.string_literal("hello");
        insta::assert_snapshot!(format_value(&graph, &types, greeting), @r#"string "hello""#);
    }
}
