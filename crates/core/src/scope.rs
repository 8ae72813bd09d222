//! Symbol tables and resolver scopes (spec §4.3 / C3).
//!
//! Grounded on `symresolver.c`: a stack of symbol tables (`symresolver_new_table`
//! / `symresolver_end_table`), linear-scan first-match lookup
//! (`symresolver_get_symbol`), and native-function symbols for `va_start`,
//! `va_end`, `__builtin_va_arg` (spec §4 supplemented features).

use crate::datatype::Datatype;
use std::collections::HashMap;

/// What a symbol name is bound to. `AstNode` carries only an opaque
/// index into the AST arena the resolver owns; this crate has no
/// dependency on the AST type itself.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    /// Ordinary variable, function, or struct/union declaration. The
    /// `node_id` indexes the owning crate's AST arena.
    AstNode { node_id: usize, datatype: Datatype },
    /// `va_start`/`va_end`/`__builtin_va_arg`: resolved specially by
    /// the code generator rather than through ordinary call codegen.
    NativeFunction { name: &'static str },
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
}

/// Failure to register a symbol because the name is already bound in
/// the current table (`symresolver_register_symbol` returning NULL in
/// the original, surfaced here as an explicit error per spec §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSymbol(pub String);

/// A stack of symbol tables, one pushed per scope. Lookup scans from
/// the innermost table outward and returns the first match, matching
/// `symresolver_get_symbol`'s linear first-match semantics (no
/// shadowing diagnostics — an inner declaration simply wins).
#[derive(Debug, Default)]
pub struct SymbolTableStack {
    tables: Vec<HashMap<String, Symbol>>,
}

impl SymbolTableStack {
    pub fn new() -> Self {
        SymbolTableStack { tables: Vec::new() }
    }

    /// `symresolver_new_table`.
    pub fn push_table(&mut self) {
        self.tables.push(HashMap::new());
    }

    /// `symresolver_end_table`.
    pub fn pop_table(&mut self) {
        self.tables.pop();
    }

    pub fn depth(&self) -> usize {
        self.tables.len()
    }

    /// `symresolver_register_symbol`: fails if the name already exists
    /// in the *current* (innermost) table. Shadowing an outer table's
    /// symbol is allowed.
    pub fn register(&mut self, symbol: Symbol) -> Result<(), DuplicateSymbol> {
        let table = self
            .tables
            .last_mut()
            .expect("register called with no table pushed");
        if table.contains_key(&symbol.name) {
            return Err(DuplicateSymbol(symbol.name));
        }
        table.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// `symresolver_get_symbol`: scans innermost-to-outermost, returns
    /// the first match.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.tables
            .iter()
            .rev()
            .find_map(|table| table.get(name))
    }

    /// True only in the outermost (global) table.
    pub fn is_global_scope(&self) -> bool {
        self.tables.len() == 1
    }

    /// Seeds the global table with the native-function symbols spec §4
    /// requires (`va_start`, `va_end`, `__builtin_va_arg`).
    pub fn register_native_functions(&mut self) {
        const NATIVE_FNS: &[&str] = &["va_start", "va_end", "__builtin_va_arg"];
        for name in NATIVE_FNS {
            let _ = self.register(Symbol {
                name: (*name).to_string(),
                kind: SymbolKind::NativeFunction { name },
            });
        }
    }
}

/// A resolver-side scope: distinct from the symbol table stack above
/// (`resolver.c`'s scope functions track declared-variable stack
/// offsets and flags, not name -> AST bindings). Each pushed scope
/// remembers the stack-frame offset it started at so the simulated
/// stack frame can unwind cleanly at scope exit.
#[derive(Debug, Clone)]
pub struct ResolverScope {
    pub base_offset: isize,
    pub is_function_scope: bool,
}

#[derive(Debug, Default)]
pub struct ResolverScopeStack {
    scopes: Vec<ResolverScope>,
}

impl ResolverScopeStack {
    pub fn new() -> Self {
        ResolverScopeStack { scopes: Vec::new() }
    }

    pub fn push(&mut self, base_offset: isize, is_function_scope: bool) {
        self.scopes.push(ResolverScope {
            base_offset,
            is_function_scope,
        });
    }

    pub fn pop(&mut self) -> Option<ResolverScope> {
        self.scopes.pop()
    }

    pub fn current(&self) -> Option<&ResolverScope> {
        self.scopes.last()
    }

    /// Walks outward to the nearest function-scope boundary, used when
    /// resolving a `return` or varargs access that must ignore nested
    /// block scopes.
    pub fn nearest_function_scope(&self) -> Option<&ResolverScope> {
        self.scopes.iter().rev().find(|s| s.is_function_scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::PrimitiveKind;

    fn var(name: &str) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::AstNode {
                node_id: 0,
                datatype: Datatype::new(PrimitiveKind::Int),
            },
        }
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut stack = SymbolTableStack::new();
        stack.push_table();
        stack.register(var("x")).unwrap();
        stack.push_table();
        stack.register(var("x")).unwrap();
        assert_eq!(stack.lookup("x").unwrap().name, "x");
        stack.pop_table();
        assert_eq!(stack.lookup("x").unwrap().name, "x");
    }

    #[test]
    fn duplicate_in_same_table_is_rejected() {
        let mut stack = SymbolTableStack::new();
        stack.push_table();
        stack.register(var("x")).unwrap();
        let err = stack.register(var("x")).unwrap_err();
        assert_eq!(err, DuplicateSymbol("x".to_string()));
    }

    #[test]
    fn lookup_misses_after_table_popped() {
        let mut stack = SymbolTableStack::new();
        stack.push_table();
        stack.push_table();
        stack.register(var("y")).unwrap();
        stack.pop_table();
        assert!(stack.lookup("y").is_none());
    }

    #[test]
    fn native_functions_are_preregistered() {
        let mut stack = SymbolTableStack::new();
        stack.push_table();
        stack.register_native_functions();
        assert!(matches!(
            stack.lookup("va_start").unwrap().kind,
            SymbolKind::NativeFunction { .. }
        ));
    }

    #[test]
    fn resolver_scope_finds_nearest_function_boundary() {
        let mut scopes = ResolverScopeStack::new();
        scopes.push(0, true);
        scopes.push(8, false);
        scopes.push(16, false);
        assert_eq!(scopes.nearest_function_scope().unwrap().base_offset, 0);
    }
}
