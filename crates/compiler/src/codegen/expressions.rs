//! Expression code generation (spec §4.7 / C7).
//!
//! Built on the resolver's (C5) entity chain for everything that
//! touches memory (variables, struct fields, array/pointer
//! dereference); arithmetic/logical/assignment operators are handled
//! directly here the way `codegen.c`'s expression switch does, since
//! they don't need chain-walking. Short-circuit `&&`/`||` use the
//! `endc_N`/`endc_N_positive` label-pair convention named in spec §4.7.

use super::globals::GlobalTable;
use super::state::CodegenState;
use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, UnaryOp};
use crate::resolver::{Entity, EntityFlags, EntityKind, Resolver, VariableLookup};
use rcc_core::{CompileError, Datatype, StackElement};
use std::collections::HashMap;

/// Where a resolved chain's final address lives once `gen_address` has
/// walked it: either still compile-time-foldable as `ebp`-relative (no
/// pointer was ever dereferenced), or materialized in `ebx` because a
/// `->`/chained-pointer step required a runtime load.
enum ChainAddress {
    Local(isize),
    Ebx,
}

struct CodegenVars<'a> {
    locals: &'a HashMap<String, isize>,
    locals_types: &'a HashMap<String, Datatype>,
    globals: &'a GlobalTable,
}

impl<'a> VariableLookup for CodegenVars<'a> {
    fn lookup(&self, name: &str) -> Option<(isize, Datatype)> {
        if let Some(&offset) = self.locals.get(name) {
            let dt = self.locals_types.get(name).cloned().unwrap_or_else(|| Datatype::new(rcc_core::PrimitiveKind::Int));
            return Some((offset, dt));
        }
        self.globals.globals.get(name).map(|dt| (0, dt.clone()))
    }

    fn struct_field_offset(&self, struct_name: &str, field: &str) -> Option<(isize, Datatype)> {
        self.globals.structs.get(struct_name)?.offset_of(field)
    }
}

pub struct ExprCodegen<'a> {
    pub ast: &'a Ast,
    pub globals: &'a GlobalTable,
    pub locals_types: std::collections::HashMap<String, Datatype>,
}

impl<'a> ExprCodegen<'a> {
    /// Generates code that leaves the expression's value in `eax`.
    pub fn gen(&self, node_id: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        let node = self.ast.get(node_id);
        match &node.kind {
            NodeKind::IntLiteral(v) => {
                state.instr(format!("mov eax, {v}"));
                Ok(())
            }
            NodeKind::StringLiteral(s) => {
                let label = state.intern_string(s);
                state.instr(format!("mov eax, {label}"));
                Ok(())
            }
            NodeKind::Binary { op: BinaryOp::Assign, left, right } => self.gen_assign(*left, *right, state),
            NodeKind::Binary { op: BinaryOp::LogicalAnd, left, right } => self.gen_logical_and(*left, *right, state),
            NodeKind::Binary { op: BinaryOp::LogicalOr, left, right } => self.gen_logical_or(*left, *right, state),
            NodeKind::Binary { op, left, right } => self.gen_binary(*op, *left, *right, state),
            NodeKind::Unary { op, operand } => self.gen_unary(*op, *operand, state),
            NodeKind::FunctionCall { callee, args } => self.gen_call(*callee, args, state),
            NodeKind::Identifier(_) | NodeKind::FieldAccess { .. } | NodeKind::ArrayAccess { .. } => {
                self.gen_chain(node_id, state)
            }
            NodeKind::Cast { operand, .. } => self.gen(*operand, state),
            NodeKind::Ternary { condition, then_branch, else_branch } => {
                self.gen_ternary(*condition, *then_branch, *else_branch, state)
            }
            other => Err(CompileError::codegen(format!("unsupported expression node {other:?}"))),
        }
    }

    /// Walks the resolver's entity chain in order, left to right,
    /// rather than only consulting the last entity — a chain like
    /// `p->b` must load `p`'s pointer *value* before adding `b`'s field
    /// offset, which a last-entity-only read cannot express. Folds
    /// every offset that doesn't cross a pointer dereference into a
    /// single compile-time `ebp`-relative constant; the first `->` (or
    /// chained pointer hop) promotes the address into `ebx`, after
    /// which every further offset becomes an `add ebx, N`.
    fn gen_address(&self, entities: &[Entity], locals: &HashMap<String, isize>, state: &mut CodegenState) -> Result<ChainAddress, CompileError> {
        let mut entities = entities.iter();
        let first = entities
            .next()
            .ok_or_else(|| CompileError::codegen("resolver produced empty chain"))?;

        let mut addr = match &first.kind {
            EntityKind::Variable { name } if locals.contains_key(name) => ChainAddress::Local(first.offset),
            EntityKind::Variable { name } => {
                state.instr(format!("mov ebx, {name}"));
                ChainAddress::Ebx
            }
            EntityKind::CompileTimeConstant { .. } => ChainAddress::Local(0),
            other => return Err(CompileError::codegen(format!("unsupported chain head {other:?}"))),
        };

        for entity in entities {
            if entity.flags.contains(EntityFlags::DO_INDIRECTION) {
                addr = match addr {
                    ChainAddress::Local(off) => {
                        state.instr(format!("mov ebx, [ebp{off:+}]"));
                        ChainAddress::Ebx
                    }
                    ChainAddress::Ebx => {
                        state.instr("mov ebx, [ebx]");
                        ChainAddress::Ebx
                    }
                };
                if entity.offset != 0 {
                    state.instr(format!("add ebx, {}", entity.offset));
                }
            } else {
                addr = match addr {
                    ChainAddress::Local(off) => ChainAddress::Local(off + entity.offset),
                    ChainAddress::Ebx => {
                        if entity.offset != 0 {
                            state.instr(format!("add ebx, {}", entity.offset));
                        }
                        ChainAddress::Ebx
                    }
                };
            }
        }
        Ok(addr)
    }

    fn gen_chain(&self, node_id: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        let locals = state.locals.clone();
        let vars = CodegenVars {
            locals: &locals,
            locals_types: &self.locals_types,
            globals: self.globals,
        };
        let resolver = Resolver::new(self.ast, &vars);
        let result = resolver.follow(node_id)?;

        match self.gen_address(&result.entities, &locals, state)? {
            ChainAddress::Local(off) => state.instr(format!("mov eax, [ebp{off:+}]")),
            ChainAddress::Ebx => state.instr("mov eax, [ebx]"),
        }
        Ok(())
    }

    /// Computes the lvalue's address into `eax`, used by assignment
    /// and by `&expr`.
    fn gen_lvalue_address(&self, node_id: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        let locals = state.locals.clone();
        let vars = CodegenVars {
            locals: &locals,
            locals_types: &self.locals_types,
            globals: self.globals,
        };
        let resolver = Resolver::new(self.ast, &vars);
        let result = resolver.follow(node_id)?;

        match self.gen_address(&result.entities, &locals, state)? {
            ChainAddress::Local(off) => state.instr(format!("lea eax, [ebp{off:+}]")),
            ChainAddress::Ebx => state.instr("mov eax, ebx"),
        }
        Ok(())
    }

    fn gen_assign(&self, left: NodeId, right: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        self.gen(right, state)?;
        state.frame.push(StackElement::Unknown);
        state.instr("push eax");
        self.gen_lvalue_address(left, state)?;
        state.instr("mov ebx, eax");
        state.instr("pop eax");
        state.frame.pop_expecting(&StackElement::Unknown);
        state.instr("mov [ebx], eax");
        Ok(())
    }

    /// Best-effort signedness of an expression's value, consulted by
    /// `gen_binary` to pick `imul`/`idiv`/`sar` vs. `mul`/`div`/`shr`
    /// (spec §4.7: the choice follows the *left* operand's sign). Casts
    /// and named storage (variables/fields/array elements) carry a real
    /// `Datatype`; everything else defaults to signed, matching the
    /// engine's previous always-signed behavior for shapes that don't
    /// carry their own sign (literals, nested arithmetic).
    fn infer_signed(&self, node_id: NodeId, state: &CodegenState) -> bool {
        match &self.ast.get(node_id).kind {
            NodeKind::Cast { target, .. } => target.signed,
            NodeKind::Unary { op: UnaryOp::Negate | UnaryOp::BitNot, operand } => self.infer_signed(*operand, state),
            NodeKind::Identifier(_) | NodeKind::FieldAccess { .. } | NodeKind::ArrayAccess { .. } => {
                self.datatype_of(node_id, state).map(|dt| dt.signed).unwrap_or(true)
            }
            _ => true,
        }
    }

    fn datatype_of(&self, node_id: NodeId, state: &CodegenState) -> Option<Datatype> {
        let vars = CodegenVars {
            locals: &state.locals,
            locals_types: &self.locals_types,
            globals: self.globals,
        };
        let resolver = Resolver::new(self.ast, &vars);
        let result = resolver.follow(node_id).ok()?;
        result.entities.last().map(|e| e.datatype.clone())
    }

    fn gen_binary(&self, op: BinaryOp, left: NodeId, right: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        let left_signed = self.infer_signed(left, state);
        self.gen(left, state)?;
        state.frame.push(StackElement::Unknown);
        state.instr("push eax");
        self.gen(right, state)?;
        state.instr("mov ebx, eax");
        state.instr("pop eax");
        state.frame.pop_expecting(&StackElement::Unknown);

        match op {
            BinaryOp::Add => state.instr("add eax, ebx"),
            BinaryOp::Sub => state.instr("sub eax, ebx"),
            BinaryOp::Mul => {
                if left_signed {
                    state.instr("imul eax, ebx");
                } else {
                    state.instr("mul ebx");
                }
            }
            BinaryOp::Div => {
                if left_signed {
                    state.instr("cdq");
                    state.instr("idiv ebx");
                } else {
                    state.instr("xor edx, edx");
                    state.instr("div ebx");
                }
            }
            BinaryOp::Mod => {
                if left_signed {
                    state.instr("cdq");
                    state.instr("idiv ebx");
                } else {
                    state.instr("xor edx, edx");
                    state.instr("div ebx");
                }
                state.instr("mov eax, edx");
            }
            BinaryOp::BitAnd => state.instr("and eax, ebx"),
            BinaryOp::BitOr => state.instr("or eax, ebx"),
            BinaryOp::BitXor => state.instr("xor eax, ebx"),
            BinaryOp::Shl => {
                state.instr("mov ecx, ebx");
                state.instr("sal eax, cl");
            }
            BinaryOp::Shr => {
                state.instr("mov ecx, ebx");
                if left_signed {
                    state.instr("sar eax, cl");
                } else {
                    state.instr("shr eax, cl");
                }
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
                state.instr("cmp eax, ebx");
                let set = match op {
                    BinaryOp::Lt => "setl",
                    BinaryOp::Gt => "setg",
                    BinaryOp::Le => "setle",
                    BinaryOp::Ge => "setge",
                    BinaryOp::Eq => "sete",
                    BinaryOp::Ne => "setne",
                    _ => unreachable!(),
                };
                state.instr(format!("{set} al"));
                state.instr("movzx eax, al");
            }
            BinaryOp::Comma => {}
            BinaryOp::Assign | BinaryOp::LogicalAnd | BinaryOp::LogicalOr => unreachable!("handled by caller"),
        }
        Ok(())
    }

    /// Short-circuit `&&`: if the left side is false, jump straight to
    /// `endc_N` with `eax` already zero; otherwise fall through to
    /// evaluate the right side, whose truthiness becomes the result.
    fn gen_logical_and(&self, left: NodeId, right: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        let end_label = state.new_label("endc");
        self.gen(left, state)?;
        state.instr("cmp eax, 0");
        state.instr(format!("je {end_label}"));
        self.gen(right, state)?;
        state.instr("cmp eax, 0");
        state.instr("setne al");
        state.instr("movzx eax, al");
        state.label(&end_label);
        Ok(())
    }

    /// Short-circuit `||`: the `_positive` label marks the early-true
    /// exit so both paths converge with `eax` already normalized to 0/1.
    fn gen_logical_or(&self, left: NodeId, right: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        let end_label = state.new_label("endc");
        let positive_label = format!("{end_label}_positive");
        self.gen(left, state)?;
        state.instr("cmp eax, 0");
        state.instr(format!("jne {positive_label}"));
        self.gen(right, state)?;
        state.instr("cmp eax, 0");
        state.instr("setne al");
        state.instr("movzx eax, al");
        state.instr(format!("jmp {end_label}"));
        state.label(&positive_label);
        state.instr("mov eax, 1");
        state.label(&end_label);
        Ok(())
    }

    /// `cond ? then : else`, same `cmp`/`je`/`jmp` shape as `If` in
    /// `codegen/statements.rs` but as an expression: both branches
    /// converge on the same `end` label with their value already in
    /// `eax`.
    fn gen_ternary(&self, condition: NodeId, then_branch: NodeId, else_branch: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        let else_label = state.new_label("ternary_else");
        let end_label = state.new_label("ternary_end");
        self.gen(condition, state)?;
        state.instr("cmp eax, 0");
        state.instr(format!("je {else_label}"));
        self.gen(then_branch, state)?;
        state.instr(format!("jmp {end_label}"));
        state.label(&else_label);
        self.gen(else_branch, state)?;
        state.label(&end_label);
        Ok(())
    }

    fn gen_unary(&self, op: UnaryOp, operand: NodeId, state: &mut CodegenState) -> Result<(), CompileError> {
        match op {
            UnaryOp::AddressOf => self.gen_lvalue_address(operand, state),
            UnaryOp::Indirection => {
                self.gen(operand, state)?;
                state.instr("mov eax, [eax]");
                Ok(())
            }
            UnaryOp::Negate => {
                self.gen(operand, state)?;
                state.instr("neg eax");
                Ok(())
            }
            UnaryOp::LogicalNot => {
                self.gen(operand, state)?;
                state.instr("cmp eax, 0");
                state.instr("sete al");
                state.instr("movzx eax, al");
                Ok(())
            }
            UnaryOp::BitNot => {
                self.gen(operand, state)?;
                state.instr("not eax");
                Ok(())
            }
            UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                Err(CompileError::codegen("increment/decrement operators are not yet supported"))
            }
        }
    }

    /// Pushes arguments right-to-left (the cdecl convention the
    /// original NASM output follows) and calls, then cleans up the
    /// argument stack space the resolver already sized
    /// (`resolver_build_function_call_args`).
    fn gen_call(&self, callee: NodeId, args: &[NodeId], state: &mut CodegenState) -> Result<(), CompileError> {
        let name = match &self.ast.get(callee).kind {
            NodeKind::Identifier(name) => name.clone(),
            _ => return Err(CompileError::codegen("indirect calls are not yet supported")),
        };

        if let Some(result) = self.gen_native_call(&name, args, state)? {
            return Ok(result);
        }

        let mut pushed_bytes = 0usize;
        for &arg in args.iter().rev() {
            self.gen(arg, state)?;
            state.instr("push eax");
            state.frame.push(StackElement::Unknown);
            pushed_bytes += rcc_core::WORD_SIZE;
        }
        state.instr(format!("call {name}"));
        if pushed_bytes > 0 {
            state.instr(format!("add esp, {pushed_bytes}"));
            for _ in 0..(pushed_bytes / rcc_core::WORD_SIZE) {
                state.frame.pop_expecting(&StackElement::Unknown);
            }
        }
        Ok(())
    }

    /// `va_start`/`va_end`/`__builtin_va_arg`: native-function symbols
    /// resolved directly to inline stack arithmetic rather than an
    /// ordinary `call`, per spec §4's supplemented varargs feature.
    fn gen_native_call(&self, name: &str, args: &[NodeId], state: &mut CodegenState) -> Result<Option<()>, CompileError> {
        use crate::builtins::{VA_ARG, VA_END, VA_START};
        match name {
            VA_START => {
                // va_start(list, last_named_arg): list = address just
                // past the last named parameter on the stack.
                self.gen_lvalue_address(args[0], state)?;
                state.instr("mov ebx, eax");
                self.gen_lvalue_address(args[1], state)?;
                state.instr(format!("add eax, {}", rcc_core::WORD_SIZE));
                state.instr("mov [ebx], eax");
                Ok(Some(()))
            }
            VA_END => Ok(Some(())),
            VA_ARG => {
                self.gen(args[0], state)?;
                state.instr("mov ebx, eax");
                state.instr("mov eax, [ebx]");
                state.instr(format!("add ebx, {}", rcc_core::WORD_SIZE));
                Ok(Some(()))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn codegen_function_body(src: &str) -> String {
        let full = format!("int main() {{ {src} }}");
        let tokens = Lexer::new(&full, "t.c").tokenize_all().unwrap();
        let mut parser = Parser::new(&tokens);
        parser.parse_program().unwrap();
        let globals = GlobalTable::build(&parser.ast);
        let gen = ExprCodegen {
            ast: &parser.ast,
            globals: &globals,
            locals_types: Default::default(),
        };
        let func_id = parser.ast.top_level[0];
        let NodeKind::FunctionDef { body, .. } = &parser.ast.get(func_id).kind else { panic!() };
        let NodeKind::Block { statements } = &parser.ast.get(*body).kind else { panic!() };
        let NodeKind::ExpressionStatement { expr } = &parser.ast.get(statements[0]).kind else {
            panic!("expected expression statement")
        };
        let mut state = CodegenState::new();
        gen.gen(*expr, &mut state).unwrap();
        state.finish()
    }

    #[test]
    fn addition_emits_add_instruction() {
        let asm = codegen_function_body("1 + 2;");
        assert!(asm.contains("add eax, ebx"));
    }

    #[test]
    fn logical_and_emits_short_circuit_labels() {
        let asm = codegen_function_body("1 && 2;");
        assert!(asm.contains("endc_0"));
        assert!(asm.contains("je endc_0"));
    }

    #[test]
    fn logical_or_emits_positive_label() {
        let asm = codegen_function_body("1 || 2;");
        assert!(asm.contains("endc_0_positive"));
    }

    #[test]
    fn string_literal_interns_into_rodata() {
        let asm = codegen_function_body(r#""hello";"#);
        assert!(asm.contains("section .rodata"));
        assert!(asm.contains("str_0"));
    }

    #[test]
    fn ternary_emits_else_and_end_labels() {
        let asm = codegen_function_body("1 ? 2 : 3;");
        assert!(asm.contains("ternary_else_0"));
        assert!(asm.contains("ternary_end_1"));
        assert!(asm.contains("je ternary_else_0"));
    }

    #[test]
    fn shift_operators_emit_arithmetic_mnemonics() {
        let asm = codegen_function_body("1 << 2;");
        assert!(asm.contains("sal eax, cl"));
        let asm = codegen_function_body("1 >> 2;");
        assert!(asm.contains("sar eax, cl"));
    }

    #[test]
    fn unsigned_left_operand_uses_unsigned_div_and_shr() {
        let asm = codegen_function_body("(unsigned int)1 / 2;");
        assert!(asm.contains("div ebx"));
        assert!(!asm.contains("idiv ebx"));
        let asm = codegen_function_body("(unsigned int)1 >> 2;");
        assert!(asm.contains("shr eax, cl"));
    }
}
