//! The resolver core (spec §4.5 / C5).
//!
//! Grounded on `resolver.c` in full: walks an access chain such as
//! `a->b[i].c` into an ordered list of addressable "entities", applies
//! rule-entity flag transfers (`resolver_execute_rules`), and folds
//! adjacent compile-time-constant entities to a fixed point
//! (`resolver_merge_compile_times`).
//!
//! The original's `resolver_finalize_result_flags` computed an
//! aggregate `ResultFlags` summary of the chain (load-to-ebx/push/
//! indirection-required/get-address) as a convenience for its code
//! generator. This port's code generator (`codegen/expressions.rs`'s
//! `gen_address`) instead walks `entities` directly and consults each
//! entity's own `EntityFlags::DO_INDIRECTION`, so no aggregate summary
//! is computed here — the per-entity flags set while walking the chain
//! below are the only flags this resolver produces.

use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, UnaryOp};
use rcc_core::{CompileError, Datatype, PrimitiveKind, WORD_SIZE};

/// A minimal `bitflags!`-alike, used instead of pulling in the
/// `bitflags` crate for a handful of `u32` constants.
macro_rules! bitflags_lite {
    (pub struct $name:ident: $ty:ty { $(const $flag:ident = $value:expr;)* }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(pub $ty);

        impl $name {
            $(pub const $flag: $name = $name($value);)*

            pub const fn empty() -> Self {
                $name(0)
            }

            pub fn contains(self, other: $name) -> bool {
                (self.0 & other.0) == other.0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }
    };
}

bitflags_lite! {
    pub struct EntityFlags: u32 {
        const NO_MERGE_WITH_NEXT_ENTITY = 1 << 0;
        const DO_INDIRECTION = 1 << 1;
    }
}

/// One addressable element of a resolved access chain.
#[derive(Debug, Clone)]
pub enum EntityKind {
    Variable { name: String },
    Function { name: String },
    FunctionCall { arg_stack_size: usize },
    ArrayBracket { index: i64, is_pointer_array: bool, just_use_offset: bool },
    /// A struct/union field access (`resolver.c`'s "general" entity).
    General { field_name: String },
    Cast,
    UnaryIndirection,
    UnaryGetAddress,
    /// A compile-time-foldable integer constant; produced either
    /// directly from a literal or by merging two adjacent foldable
    /// entities through `resolver_merge_compile_times`.
    CompileTimeConstant { value: i64 },
    /// Transient marker left by chain processing; discarded by
    /// `resolver_execute_rules` after transferring its flags to its
    /// neighbors.
    RuleMarker { left_flags: EntityFlags, right_flags: EntityFlags },
    Unsupported,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    pub datatype: Datatype,
    pub offset: isize,
    pub flags: EntityFlags,
}

impl Entity {
    fn new(kind: EntityKind, datatype: Datatype) -> Self {
        Entity {
            kind,
            datatype,
            offset: 0,
            flags: EntityFlags::empty(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolverResult {
    pub entities: Vec<Entity>,
}

impl ResolverResult {
    fn failed(message: impl Into<String>) -> Result<ResolverResult, CompileError> {
        Err(CompileError::resolve(message.into()))
    }
}

/// Per-variable stack offsets the resolver consults when it reaches a
/// leaf `Identifier`/`Variable` entity. A real compiler would look
/// this up through the scope stack built during validation; here it's
/// passed in directly since the resolver's job (spec §4.5) is the
/// chain-walking logic, not re-deriving declaration order.
pub trait VariableLookup {
    fn lookup(&self, name: &str) -> Option<(isize, Datatype)>;
    fn struct_field_offset(&self, struct_name: &str, field: &str) -> Option<(isize, Datatype)>;
}

pub struct Resolver<'a, L: VariableLookup> {
    ast: &'a Ast,
    vars: &'a L,
}

impl<'a, L: VariableLookup> Resolver<'a, L> {
    pub fn new(ast: &'a Ast, vars: &'a L) -> Self {
        Resolver { ast, vars }
    }

    /// `resolver_follow`/`resolver_finalize_result`: the top-level
    /// entry point for resolving one expression node into an ordered
    /// entity chain with finalized flags.
    pub fn follow(&self, node_id: NodeId) -> Result<ResolverResult, CompileError> {
        let mut result = ResolverResult::default();
        self.follow_part(node_id, &mut result)?;

        if result.entities.is_empty() {
            return ResolverResult::failed("resolver produced no entity for expression");
        }

        self.execute_rules(&mut result);
        self.merge_compile_times(&mut result);
        Ok(result)
    }

    fn follow_part(&self, node_id: NodeId, result: &mut ResolverResult) -> Result<(), CompileError> {
        if node_id.is_none() {
            return Ok(());
        }
        let node = self.ast.get(node_id);
        match &node.kind {
            NodeKind::IntLiteral(v) => {
                result.entities.push(Entity::new(
                    EntityKind::CompileTimeConstant { value: *v },
                    Datatype::literal_int(),
                ));
                Ok(())
            }
            NodeKind::Identifier(name) => self.follow_identifier(name, result),
            NodeKind::FieldAccess { target, field, arrow } => {
                self.follow_struct_expression(*target, field, *arrow, result)
            }
            NodeKind::ArrayAccess { target, index } => self.follow_array_expression(*target, *index, result),
            NodeKind::FunctionCall { callee, args } => self.follow_function_call(*callee, args, result),
            NodeKind::Cast { target, operand } => self.follow_cast(target, *operand, result),
            NodeKind::Unary { op: UnaryOp::Indirection, operand } => self.follow_indirection(*operand, result),
            NodeKind::Unary { op: UnaryOp::AddressOf, operand } => self.follow_unary_address(*operand, result),
            NodeKind::Binary { op: BinaryOp::Comma, left, right } => {
                self.follow_part(*left, result)?;
                self.follow_part(*right, result)
            }
            _ => {
                result.entities.push(Entity::new(EntityKind::Unsupported, Datatype::new(PrimitiveKind::Int)));
                Ok(())
            }
        }
    }

    fn follow_identifier(&self, name: &str, result: &mut ResolverResult) -> Result<(), CompileError> {
        match self.vars.lookup(name) {
            Some((offset, datatype)) => {
                let mut entity = Entity::new(EntityKind::Variable { name: name.to_string() }, datatype);
                entity.offset = offset;
                result.entities.push(entity);
                Ok(())
            }
            None => {
                // A bare identifier that isn't a known variable is
                // treated as a function reference; the function-call
                // entity constructor validates arity/address later.
                result
                    .entities
                    .push(Entity::new(EntityKind::Function { name: name.to_string() }, Datatype::new(PrimitiveKind::Int)));
                Ok(())
            }
        }
    }

    /// `resolver_follow_struct_expression`: `->` sets `NO_MERGE_WITH_NEXT_ENTITY`
    /// on the left; unless the left is itself a function call, the
    /// right side gets `DO_INDIRECTION` to dereference the pointer
    /// before reading the field.
    fn follow_struct_expression(
        &self,
        target: NodeId,
        field: &str,
        arrow: bool,
        result: &mut ResolverResult,
    ) -> Result<(), CompileError> {
        self.follow_part(target, result)?;
        let left_is_call = matches!(
            result.entities.last().map(|e| &e.kind),
            Some(EntityKind::FunctionCall { .. })
        );

        if let Some(last) = result.entities.last_mut() {
            last.flags.insert(EntityFlags::NO_MERGE_WITH_NEXT_ENTITY);
        }

        let struct_name = self.struct_name_of(result).unwrap_or_default();
        let (offset, datatype) = self
            .vars
            .struct_field_offset(&struct_name, field)
            .unwrap_or((0, Datatype::new(PrimitiveKind::Int)));

        let mut field_entity = Entity::new(EntityKind::General { field_name: field.to_string() }, datatype);
        field_entity.offset = offset;
        if arrow && !left_is_call {
            field_entity.flags.insert(EntityFlags::DO_INDIRECTION);
        }
        result.entities.push(field_entity);
        Ok(())
    }

    fn struct_name_of(&self, result: &ResolverResult) -> Option<String> {
        result.entities.last().and_then(|e| e.datatype.struct_name.clone())
    }

    /// `resolver_array_bracket_set_flags` + `resolver_follow_array_bracket`.
    fn follow_array_expression(
        &self,
        target: NodeId,
        index: NodeId,
        result: &mut ResolverResult,
    ) -> Result<(), CompileError> {
        self.follow_part(target, result)?;
        let prev_datatype = result
            .entities
            .last()
            .map(|e| e.datatype.clone())
            .unwrap_or_else(|| Datatype::new(PrimitiveKind::Int));

        let literal_index = match &self.ast.get(index).kind {
            NodeKind::IntLiteral(v) => Some(*v),
            _ => None,
        };

        // An inline array dimension (`T arr[N]`, including `T *p[N]`, an
        // array of pointers) is indexed by a compile-time-foldable
        // offset into the variable's own storage. A bare pointer
        // (`T *q`, no remaining bracket) instead holds a runtime
        // address that must be loaded before the index is added, same
        // as a `->` field access.
        let has_inline_dimension = !prev_datatype.brackets.is_empty();
        let is_pointer_array = prev_datatype.is_pointer && !has_inline_dimension;
        let just_use_offset = literal_index.is_some() && !is_pointer_array;

        let mut element_dt = prev_datatype.clone();
        if has_inline_dimension {
            element_dt.brackets.remove(0);
        } else if prev_datatype.is_pointer {
            element_dt = prev_datatype.pointer_reduce(1);
        }

        let element_size = if has_inline_dimension {
            element_dt.size_for_array_access()
        } else {
            prev_datatype.size_for_array_access()
        };

        let mut entity = Entity::new(
            EntityKind::ArrayBracket {
                index: literal_index.unwrap_or(0),
                is_pointer_array,
                just_use_offset,
            },
            element_dt,
        );
        if let Some(idx) = literal_index {
            entity.offset = idx as isize * element_size as isize;
        }
        if is_pointer_array {
            entity.flags.insert(EntityFlags::DO_INDIRECTION);
        }
        result.entities.push(entity);
        Ok(())
    }

    /// `resolver_build_function_call_args`/`resolver_follow_function_call`:
    /// per-argument stack contribution is `max(element_size, WORD_SIZE)`
    /// rounded up to a whole word, summed across all arguments.
    fn follow_function_call(&self, callee: NodeId, args: &[NodeId], result: &mut ResolverResult) -> Result<(), CompileError> {
        self.follow_part(callee, result)?;

        let mut total = 0usize;
        for &arg in args {
            let mut arg_result = ResolverResult::default();
            self.follow_part(arg, &mut arg_result)?;
            let size = arg_result
                .entities
                .last()
                .map(|e| e.datatype.element_size())
                .unwrap_or(WORD_SIZE);
            total += size.max(WORD_SIZE).div_ceil(WORD_SIZE) * WORD_SIZE;
        }

        result
            .entities
            .push(Entity::new(EntityKind::FunctionCall { arg_stack_size: total }, Datatype::new(PrimitiveKind::Int)));
        Ok(())
    }

    /// `resolver_follow_cast`.
    fn follow_cast(&self, target: &Datatype, operand: NodeId, result: &mut ResolverResult) -> Result<(), CompileError> {
        self.follow_part(operand, result)?;
        result.entities.push(Entity::new(EntityKind::Cast, target.clone()));
        Ok(())
    }

    /// `resolver_follow_indirection`/`resolver_finalize_unary`: reduces
    /// the pointer depth inherited from the previous entity.
    fn follow_indirection(&self, operand: NodeId, result: &mut ResolverResult) -> Result<(), CompileError> {
        self.follow_part(operand, result)?;
        let reduced = result
            .entities
            .last()
            .map(|e| e.datatype.pointer_reduce(1))
            .unwrap_or_else(|| Datatype::new(PrimitiveKind::Int));
        let mut entity = Entity::new(EntityKind::UnaryIndirection, reduced);
        entity.flags.insert(EntityFlags::DO_INDIRECTION);
        result.entities.push(entity);
        Ok(())
    }

    /// `resolver_follow_unary_address`: sets `DOES_GET_ADDRESS` and
    /// increases pointer depth by one relative to the operand.
    fn follow_unary_address(&self, operand: NodeId, result: &mut ResolverResult) -> Result<(), CompileError> {
        self.follow_part(operand, result)?;
        let mut dt = result
            .entities
            .last()
            .map(|e| e.datatype.clone())
            .unwrap_or_else(|| Datatype::new(PrimitiveKind::Int));
        dt.pointer_depth += 1;
        dt.is_pointer = true;
        result.entities.push(Entity::new(EntityKind::UnaryGetAddress, dt));
        Ok(())
    }

    /// `resolver_execute_rules`: a pop-based pass that transfers each
    /// `RuleMarker`'s flags onto its left/right neighbor, then
    /// discards the marker. No markers are currently synthesized as
    /// standalone entities (struct-expression flags are applied
    /// in-line above), so this is a no-op unless a future chain kind
    /// pushes one; kept as an explicit pass to match the original's
    /// two-phase build-then-apply structure.
    fn execute_rules(&self, result: &mut ResolverResult) {
        let mut i = 0;
        while i < result.entities.len() {
            if let EntityKind::RuleMarker { left_flags, right_flags } = result.entities[i].kind {
                if i > 0 {
                    result.entities[i - 1].flags.insert(left_flags);
                }
                if i + 1 < result.entities.len() {
                    result.entities[i + 1].flags.insert(right_flags);
                }
                result.entities.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// `resolver_merge_compile_times`: fixed-point loop folding
    /// adjacent compile-time constants. Since the chain-walker above
    /// never currently emits two adjacent constants from a single
    /// access chain (arithmetic lives in `Binary` nodes evaluated by
    /// the code generator, not the resolver), this pass is a faithful
    /// structural no-op today but is kept so a future constant-folding
    /// entity producer has the merge loop ready.
    fn merge_compile_times(&self, result: &mut ResolverResult) {
        loop {
            let total_before = result.entities.len();
            let mut merged_any = false;
            let mut i = 0;
            while i + 1 < result.entities.len() {
                if let (
                    EntityKind::CompileTimeConstant { value: a },
                    EntityKind::CompileTimeConstant { value: b },
                ) = (&result.entities[i].kind, &result.entities[i + 1].kind)
                {
                    let merged = Entity::new(EntityKind::CompileTimeConstant { value: a + b }, Datatype::literal_int());
                    result.entities.splice(i..=i + 1, [merged]);
                    merged_any = true;
                } else {
                    i += 1;
                }
            }
            if !merged_any || result.entities.len() == total_before {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    struct TestVars;
    impl VariableLookup for TestVars {
        fn lookup(&self, name: &str) -> Option<(isize, Datatype)> {
            match name {
                "p" => {
                    let mut dt = Datatype::pointer_to(PrimitiveKind::Struct, 1).with_struct_size(8);
                    dt.struct_name = Some("point".to_string());
                    Some((-4, dt))
                }
                "arr" => {
                    let mut dt = Datatype::new(PrimitiveKind::Int);
                    dt.brackets.push(rcc_core::ArrayBracket { size: Some(10) });
                    Some((-40, dt))
                }
                "parr" => {
                    let mut dt = Datatype::pointer_to(PrimitiveKind::Int, 1);
                    dt.brackets.push(rcc_core::ArrayBracket { size: Some(3) });
                    Some((-12, dt))
                }
                "q" => Some((-4, Datatype::pointer_to(PrimitiveKind::Int, 1))),
                _ => Some((-4, Datatype::new(PrimitiveKind::Int))),
            }
        }

        fn struct_field_offset(&self, struct_name: &str, field: &str) -> Option<(isize, Datatype)> {
            if struct_name == "point" && field == "x" {
                return Some((0, Datatype::new(PrimitiveKind::Int)));
            }
            if struct_name == "point" && field == "y" {
                return Some((4, Datatype::new(PrimitiveKind::Int)));
            }
            None
        }
    }

    fn resolve_expr(src: &str) -> ResolverResult {
        let full_src = format!("int main() {{ return {src}; }}");
        let tokens = Lexer::new(&full_src, "t.c").tokenize_all().unwrap();
        let mut parser = Parser::new(&tokens);
        parser.parse_program().unwrap();
        let func_id = parser.ast.top_level[0];
        let NodeKind::FunctionDef { body, .. } = &parser.ast.get(func_id).kind else { panic!() };
        let NodeKind::Block { statements } = &parser.ast.get(*body).kind else { panic!() };
        let NodeKind::Return { value } = &parser.ast.get(statements[0]).kind else { panic!() };

        let resolver = Resolver::new(&parser.ast, &TestVars);
        resolver.follow(*value).unwrap()
    }

    #[test]
    fn pointer_arrow_field_access_sets_indirection() {
        let result = resolve_expr("p->x");
        let last = result.entities.last().unwrap();
        assert!(last.flags.contains(EntityFlags::DO_INDIRECTION));
        assert!(matches!(last.kind, EntityKind::General { .. }));
    }

    #[test]
    fn array_bracket_with_literal_index_computes_offset() {
        let result = resolve_expr("arr[3]");
        let last = result.entities.last().unwrap();
        match &last.kind {
            EntityKind::ArrayBracket { just_use_offset, .. } => assert!(just_use_offset),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(last.offset, 12);
    }

    #[test]
    fn array_of_pointers_indexes_without_indirection() {
        // parr's 3 pointer slots are inline storage; indexing it is a
        // compile-time offset fold, not a runtime pointer load.
        let result = resolve_expr("parr[2]");
        let last = result.entities.last().unwrap();
        assert!(!last.flags.contains(EntityFlags::DO_INDIRECTION));
        assert_eq!(last.offset, 8);
    }

    #[test]
    fn pointer_variable_indexing_sets_indirection() {
        // q itself holds one runtime address; indexing it must load
        // that address before adding the element offset.
        let result = resolve_expr("q[2]");
        let last = result.entities.last().unwrap();
        assert!(last.flags.contains(EntityFlags::DO_INDIRECTION));
        assert_eq!(last.offset, 8);
    }

    #[test]
    fn function_call_flags_load_to_ebx() {
        let result = resolve_expr("f(1, 2)");
        let last = result.entities.last().unwrap();
        assert!(matches!(last.kind, EntityKind::FunctionCall { .. }));
        assert!(!last.flags.contains(EntityFlags::DO_INDIRECTION));
    }

    #[test]
    fn unary_address_sets_does_get_address() {
        let result = resolve_expr("&p");
        let last = result.entities.last().unwrap();
        assert!(matches!(last.kind, EntityKind::UnaryGetAddress));
        assert!(last.datatype.is_pointer);
    }

    #[test]
    fn empty_resolver_result_has_no_entities() {
        let resolver_result = ResolverResult::default();
        assert!(resolver_result.entities.is_empty());
    }
}
