//! Native-function symbol registry (spec §4 supplemented feature).
//!
//! `va_start`, `va_end`, and `__builtin_va_arg` are registered as
//! `SymbolKind::NativeFunction` symbols (grounded on `symresolver.c`'s
//! `SYMBOL_TYPE_NATIVE_FUNCTION`) rather than ordinary AST-node
//! functions, since the code generator lowers calls to them directly
//! to stack arithmetic instead of emitting a `call` instruction.
//! `stdarg_internal.h`'s synthetic `va_list` typedef (served by the
//! static-include registry in `preprocessor::includes`) gives user
//! code the type these three operate on.

pub const VA_START: &str = "va_start";
pub const VA_END: &str = "va_end";
pub const VA_ARG: &str = "__builtin_va_arg";

pub const NATIVE_FUNCTIONS: &[&str] = &[VA_START, VA_END, VA_ARG];

pub fn is_native_function(name: &str) -> bool {
    NATIVE_FUNCTIONS.contains(&name)
}
