//! Statement code generation: control flow, `goto`/label checking,
//! and local variable allocation.

use super::expressions::ExprCodegen;
use super::state::CodegenState;
use crate::ast::{Ast, NodeId, NodeKind};
use rcc_core::{CompileError, StackElement, WORD_SIZE};
use std::collections::{HashMap, HashSet};

/// Per-function codegen context: tracks `goto`/label bookkeeping (NASM
/// resolves the actual forward jump; this just checks every `goto`
/// names a label that exists somewhere in the function, the way
/// `validator.c` checks jump targets ahead of codegen) and the
/// break/continue target label stack for loop bodies.
pub struct FunctionCodegen<'a> {
    pub ast: &'a Ast,
    pub exprs: ExprCodegen<'a>,
    pub label_positions: HashSet<String>,
    pub goto_targets: HashSet<String>,
    pub break_labels: Vec<String>,
    pub continue_labels: Vec<String>,
}

impl<'a> FunctionCodegen<'a> {
    /// Verifies every `goto` encountered during codegen named a label
    /// that was actually defined somewhere in the function body.
    pub fn finish(&self) -> Result<(), CompileError> {
        for target in &self.goto_targets {
            if !self.label_positions.contains(target) {
                return Err(CompileError::codegen(format!("'goto {target}' has no matching label")));
            }
        }
        Ok(())
    }

    pub fn gen_statement(&mut self, node_id: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        if node_id.is_none() {
            return Ok(());
        }
        let node = self.ast.get(node_id);
        match &node.kind {
            NodeKind::Block { statements } => {
                for &stmt in statements {
                    self.gen_statement(stmt, state)?;
                }
                Ok(())
            }
            NodeKind::VarDecl { name, datatype, initializer } => {
                let mut datatype = datatype.clone();
                self.exprs.globals.patch_struct_size(&mut datatype);
                let offset = state.reserve_local(name, datatype.size());
                self.exprs.locals_types.insert(name.clone(), datatype);
                if !initializer.is_none() {
                    self.exprs.gen(*initializer, state)?;
                    state.instr(format!("mov [ebp{offset:+}], eax"));
                }
                Ok(())
            }
            NodeKind::ExpressionStatement { expr } => self.exprs.gen(*expr, state),
            NodeKind::Return { value } => {
                if !value.is_none() {
                    self.exprs.gen(*value, state)?;
                }
                state.instr("mov esp, ebp");
                state.instr("pop ebp");
                state.instr("ret");
                Ok(())
            }
            NodeKind::If { condition, then_branch, else_branch } => {
                let else_label = state.new_label("if_else");
                let end_label = state.new_label("if_end");
                self.exprs.gen(*condition, state)?;
                state.instr("cmp eax, 0");
                state.instr(format!("je {else_label}"));
                self.gen_statement(*then_branch, state)?;
                state.instr(format!("jmp {end_label}"));
                state.label(&else_label);
                self.gen_statement(*else_branch, state)?;
                state.label(&end_label);
                Ok(())
            }
            NodeKind::While { condition, body } => {
                let start_label = state.new_label("while_start");
                let end_label = state.new_label("while_end");
                self.break_labels.push(end_label.clone());
                self.continue_labels.push(start_label.clone());
                state.label(&start_label);
                self.exprs.gen(*condition, state)?;
                state.instr("cmp eax, 0");
                state.instr(format!("je {end_label}"));
                self.gen_statement(*body, state)?;
                state.instr(format!("jmp {start_label}"));
                state.label(&end_label);
                self.break_labels.pop();
                self.continue_labels.pop();
                Ok(())
            }
            NodeKind::DoWhile { condition, body } => {
                let start_label = state.new_label("do_start");
                let end_label = state.new_label("do_end");
                self.break_labels.push(end_label.clone());
                self.continue_labels.push(start_label.clone());
                state.label(&start_label);
                self.gen_statement(*body, state)?;
                self.exprs.gen(*condition, state)?;
                state.instr("cmp eax, 0");
                state.instr(format!("jne {start_label}"));
                state.label(&end_label);
                self.break_labels.pop();
                self.continue_labels.pop();
                Ok(())
            }
            NodeKind::For { init, condition, step, body } => {
                let start_label = state.new_label("for_start");
                let step_label = state.new_label("for_step");
                let end_label = state.new_label("for_end");
                self.break_labels.push(end_label.clone());
                self.continue_labels.push(step_label.clone());
                if !init.is_none() {
                    self.exprs.gen(*init, state)?;
                }
                state.label(&start_label);
                if !condition.is_none() {
                    self.exprs.gen(*condition, state)?;
                    state.instr("cmp eax, 0");
                    state.instr(format!("je {end_label}"));
                }
                self.gen_statement(*body, state)?;
                state.label(&step_label);
                if !step.is_none() {
                    self.exprs.gen(*step, state)?;
                }
                state.instr(format!("jmp {start_label}"));
                state.label(&end_label);
                self.break_labels.pop();
                self.continue_labels.pop();
                Ok(())
            }
            NodeKind::Break => {
                let label = self
                    .break_labels
                    .last()
                    .cloned()
                    .ok_or_else(|| CompileError::codegen("'break' outside a loop"))?;
                state.instr(format!("jmp {label}"));
                Ok(())
            }
            NodeKind::Continue => {
                let label = self
                    .continue_labels
                    .last()
                    .cloned()
                    .ok_or_else(|| CompileError::codegen("'continue' outside a loop"))?;
                state.instr(format!("jmp {label}"));
                Ok(())
            }
            NodeKind::Label { name } => {
                state.label(name);
                self.label_positions.insert(name.clone());
                Ok(())
            }
            NodeKind::Goto { label } => {
                state.instr(format!("jmp {label}"));
                self.goto_targets.insert(label.clone());
                Ok(())
            }
            NodeKind::Switch { discriminant, body } => self.gen_switch(*discriminant, *body, state),
            other => Err(CompileError::codegen(format!("unsupported statement {other:?}"))),
        }
    }

    /// `switch`/`case`/`default`: a flat `cmp eax, N; je case_N` chain
    /// against the discriminant (only direct statements of `body` are
    /// scanned for labels, matching C's own flat-label switch body —
    /// no goto-style dispatch table, same unoptimized style as the
    /// rest of this module's `if`/`while` emission), falling through to
    /// `default:` or straight past the switch if no case matches.
    /// `break;` inside any case arm reuses the existing `break_labels`
    /// stack, jumping to the switch's own end label.
    fn gen_switch(&mut self, discriminant: NodeId, body: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        let end_label = state.new_label("switch_end");
        self.exprs.gen(discriminant, state)?;

        let statements = match &self.ast.get(body).kind {
            NodeKind::Block { statements } => statements.clone(),
            _ => vec![body],
        };

        let mut labels: HashMap<NodeId, String> = HashMap::new();
        let mut default_label: Option<String> = None;
        for &stmt in &statements {
            match &self.ast.get(stmt).kind {
                NodeKind::Case { .. } => {
                    labels.insert(stmt, state.new_label("case"));
                }
                NodeKind::Default => {
                    let label = state.new_label("switch_default");
                    default_label = Some(label.clone());
                    labels.insert(stmt, label);
                }
                _ => {}
            }
        }

        for &stmt in &statements {
            if let NodeKind::Case { value } = &self.ast.get(stmt).kind {
                let NodeKind::IntLiteral(v) = &self.ast.get(*value).kind else {
                    return Err(CompileError::codegen("case label must be an integer constant"));
                };
                state.instr(format!("cmp eax, {v}"));
                state.instr(format!("je {}", labels[&stmt]));
            }
        }
        state.instr(format!("jmp {}", default_label.unwrap_or_else(|| end_label.clone())));

        self.break_labels.push(end_label.clone());
        for &stmt in &statements {
            if let Some(label) = labels.get(&stmt) {
                state.label(label);
            } else {
                self.gen_statement(stmt, state)?;
            }
        }
        self.break_labels.pop();
        state.label(&end_label);
        Ok(())
    }
}

/// Emits a function's prologue (`push ebp` / `mov ebp, esp`) and
/// epilogue, with `frame` mirroring both pushes/pops.
pub fn gen_prologue(state: &mut CodegenState) {
    state.instr("push ebp");
    state.frame.push(StackElement::SavedBasePointer);
    state.instr("mov ebp, esp");
}

pub fn gen_epilogue(state: &mut CodegenState) {
    state.instr("mov esp, ebp");
    state.frame.pop_expecting(&StackElement::SavedBasePointer);
    state.instr("pop ebp");
    state.instr("ret");
    state.frame.assert_empty_at_return();
}

/// Offset of the first named argument relative to `ebp`: past the
/// saved return address and saved `ebp` itself.
pub const fn arg_base_offset() -> isize {
    (2 * WORD_SIZE) as isize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::globals::GlobalTable;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn codegen_body(src: &str) -> String {
        let full = format!("int main() {{ {src} }}");
        let tokens = Lexer::new(&full, "t.c").tokenize_all().unwrap();
        let mut parser = Parser::new(&tokens);
        parser.parse_program().unwrap();
        let globals = GlobalTable::build(&parser.ast);
        let func_id = parser.ast.top_level[0];
        let NodeKind::FunctionDef { body, .. } = &parser.ast.get(func_id).kind else { panic!() };
        let mut func = FunctionCodegen {
            ast: &parser.ast,
            exprs: ExprCodegen {
                ast: &parser.ast,
                globals: &globals,
                locals_types: Default::default(),
            },
            label_positions: Default::default(),
            goto_targets: Default::default(),
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
        };
        let mut state = CodegenState::new();
        gen_prologue(&mut state);
        func.gen_statement(*body, &mut state).unwrap();
        func.finish().unwrap();
        state.finish()
    }

    #[test]
    fn if_emits_else_and_end_labels() {
        let asm = codegen_body("if (1) { return 1; } else { return 2; }");
        assert!(asm.contains("if_else_0"));
        assert!(asm.contains("if_end_1"));
    }

    #[test]
    fn while_loop_wires_break_to_end_label() {
        let asm = codegen_body("while (1) { break; }");
        assert!(asm.contains("while_end_1"));
    }

    #[test]
    fn local_var_decl_stores_initializer_at_offset() {
        let asm = codegen_body("int x = 5; return x;");
        assert!(asm.contains("mov [ebp-4], eax"));
    }

    #[test]
    fn goto_without_matching_label_fails_finish() {
        let full = "int main() { goto nowhere; }";
        let tokens = Lexer::new(full, "t.c").tokenize_all().unwrap();
        let mut parser = Parser::new(&tokens);
        parser.parse_program().unwrap();
        let globals = GlobalTable::build(&parser.ast);
        let func_id = parser.ast.top_level[0];
        let NodeKind::FunctionDef { body, .. } = &parser.ast.get(func_id).kind else { panic!() };
        let mut func = FunctionCodegen {
            ast: &parser.ast,
            exprs: ExprCodegen {
                ast: &parser.ast,
                globals: &globals,
                locals_types: Default::default(),
            },
            label_positions: Default::default(),
            goto_targets: Default::default(),
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
        };
        let mut state = CodegenState::new();
        func.gen_statement(*body, &mut state).unwrap();
        assert!(func.finish().is_err());
    }
}
