//! Top-level driver: walks the whole translation unit, emitting
//! `.data` globals and one `.text` function body per `FunctionDef`,
//! then assembles the final NASM source.
//!
//! Grounded on `codegen.c`'s `codegen_generate_root`: iterate top-level
//! nodes once for data, once for function bodies.

use super::expressions::ExprCodegen;
use super::globals::GlobalTable;
use super::state::CodegenState;
use super::statements::{arg_base_offset, gen_epilogue, gen_prologue, FunctionCodegen};
use crate::ast::{Ast, NodeKind};
use rcc_core::{CompileError, Datatype};
use std::collections::HashMap;

/// Generates the full NASM source for `ast`, returning the assembled
/// text (`.data` / `.text` / `.rodata`, in that order).
pub fn generate(ast: &Ast) -> Result<String, CompileError> {
    let globals = GlobalTable::build(ast);
    let mut state = CodegenState::new();

    emit_global_data(ast, &globals, &mut state);

    for &node_id in &ast.top_level {
        if let NodeKind::FunctionDef {
            name,
            args,
            body,
            is_forward_declaration: false,
            ..
        } = &ast.get(node_id).kind
        {
            gen_function(ast, &globals, name, args, *body, &mut state)?;
        }
    }

    Ok(state.finish())
}

fn emit_global_data(ast: &Ast, globals: &GlobalTable, state: &mut CodegenState) {
    for &node_id in &ast.top_level {
        if let NodeKind::VarDecl { name, datatype, initializer } = &ast.get(node_id).kind {
            let mut datatype = datatype.clone();
            globals.patch_struct_size(&mut datatype);
            let datatype = &datatype;
            let directive = data_directive_for(datatype);
            if initializer.is_none() {
                state.emit_data(format!("{name}: {directive} 0"));
            } else if let NodeKind::IntLiteral(v) = &ast.get(*initializer).kind {
                state.emit_data(format!("{name}: {directive} {v}"));
            } else if let NodeKind::StringLiteral(s) = &ast.get(*initializer).kind {
                let label = state.intern_string(s);
                state.emit_data(format!("{name}: dd {label}"));
            } else {
                state.emit_data(format!("{name}: {directive} 0"));
            }
        }
    }
}

fn data_directive_for(datatype: &Datatype) -> &'static str {
    if datatype.is_pointer {
        return "dd";
    }
    match datatype.size() {
        1 => "db",
        2 => "dw",
        _ => "dd",
    }
}

fn gen_function(
    ast: &Ast,
    globals: &GlobalTable,
    name: &str,
    args: &[crate::ast::FunctionArg],
    body: crate::ast::NodeId,
    state: &mut CodegenState,
) -> Result<(), CompileError> {
    state.emit_text(format!("global {name}"));
    state.label(name);
    gen_prologue(state);

    let mut locals_types: HashMap<String, Datatype> = HashMap::new();
    let mut locals: HashMap<String, isize> = HashMap::new();
    let mut offset = arg_base_offset();
    for arg in args {
        let mut datatype = arg.datatype.clone();
        globals.patch_struct_size(&mut datatype);
        locals.insert(arg.name.clone(), offset);
        offset += datatype.size().max(rcc_core::WORD_SIZE) as isize;
        locals_types.insert(arg.name.clone(), datatype);
    }
    state.locals = locals;
    state.next_local_offset = 0;

    let mut func = FunctionCodegen {
        ast,
        exprs: ExprCodegen {
            ast,
            globals,
            locals_types,
        },
        label_positions: Default::default(),
        goto_targets: Default::default(),
        break_labels: Vec::new(),
        continue_labels: Vec::new(),
    };

    if state.next_local_offset != 0 {
        return Err(CompileError::codegen("internal: stale local offset before function body"));
    }
    reserve_frame_space(ast, globals, body, state);

    func.gen_statement(body, state)?;
    func.finish()?;

    if !ends_in_return(ast, body) {
        gen_epilogue(state);
    }

    Ok(())
}

/// Pre-scans the function body for `VarDecl`s so `sub esp, N` can
/// reserve the whole frame up front, matching the original compiler's
/// single-pass stack allocation rather than growing `esp` statement by
/// statement. Rounded up to a 16-byte boundary per spec §4.7.
fn reserve_frame_space(ast: &Ast, globals: &GlobalTable, body: crate::ast::NodeId, state: &mut CodegenState) {
    let total = align16(count_locals_size(ast, globals, body));
    if total > 0 {
        state.instr(format!("sub esp, {total}"));
    }
}

fn align16(size: usize) -> usize {
    (size + 15) & !15
}

fn count_locals_size(ast: &Ast, globals: &GlobalTable, node_id: crate::ast::NodeId) -> usize {
    if node_id.is_none() {
        return 0;
    }
    match &ast.get(node_id).kind {
        NodeKind::Block { statements } => statements.iter().map(|&s| count_locals_size(ast, globals, s)).sum(),
        NodeKind::VarDecl { datatype, .. } => {
            let mut datatype = datatype.clone();
            globals.patch_struct_size(&mut datatype);
            datatype.size().max(rcc_core::WORD_SIZE)
        }
        NodeKind::If { then_branch, else_branch, .. } => {
            count_locals_size(ast, globals, *then_branch) + count_locals_size(ast, globals, *else_branch)
        }
        NodeKind::While { body, .. } | NodeKind::DoWhile { body, .. } => count_locals_size(ast, globals, *body),
        NodeKind::For { body, .. } => count_locals_size(ast, globals, *body),
        NodeKind::Switch { body, .. } => count_locals_size(ast, globals, *body),
        _ => 0,
    }
}

fn ends_in_return(ast: &Ast, node_id: crate::ast::NodeId) -> bool {
    if node_id.is_none() {
        return false;
    }
    match &ast.get(node_id).kind {
        NodeKind::Return { .. } => true,
        NodeKind::Block { statements } => statements.last().is_some_and(|&s| ends_in_return(ast, s)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn generate_source(src: &str) -> String {
        let tokens = Lexer::new(src, "t.c").tokenize_all().unwrap();
        let mut parser = Parser::new(&tokens);
        parser.parse_program().unwrap();
        generate(&parser.ast).unwrap()
    }

    #[test]
    fn function_emits_global_directive_and_label() {
        let asm = generate_source("int main() { return 0; }");
        assert!(asm.contains("global main"));
        assert!(asm.contains("main:"));
    }

    #[test]
    fn global_var_decl_emits_data_entry() {
        let asm = generate_source("int counter = 7;\nint main() { return 0; }");
        assert!(asm.contains("counter: dd 7"));
    }

    #[test]
    fn local_decls_reserve_stack_space_aligned_to_16() {
        let asm = generate_source("int main() { int a = 1; int b = 2; return a + b; }");
        assert!(asm.contains("sub esp, 16"));
    }

    #[test]
    fn function_with_explicit_return_skips_duplicate_epilogue() {
        let asm = generate_source("int main() { return 0; }");
        assert_eq!(asm.matches("pop ebp").count(), 1);
    }
}
