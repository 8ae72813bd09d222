//! rcc-core: the language-agnostic foundation shared by every stage of
//! the rosebud-style C compiler.
//!
//! # Modules
//!
//! - `datatype`: the datatype model — primitive kinds, pointer depth,
//!   array brackets, and the size/reduce operations the resolver and
//!   code generator both depend on.
//! - `error`: the shared `CompileError` taxonomy and source `Position`.
//! - `scope`: the symbol table stack and the resolver's own scope
//!   stack (two distinct notions of "scope", kept separate).
//! - `stack_frame`: the simulated stack frame the code generator uses
//!   to mirror the assembly it emits.

pub mod datatype;
pub mod error;
pub mod scope;
pub mod stack_frame;

pub use datatype::{ArrayBracket, Datatype, PrimitiveKind, WORD_SIZE};
pub use error::{CompileError, Diagnostics, Position};
pub use scope::{
    DuplicateSymbol, ResolverScope, ResolverScopeStack, Symbol, SymbolKind, SymbolTableStack,
};
pub use stack_frame::{FrameEntry, SimulatedStackFrame, StackElement};
