//! Code generation (spec §4.7-4.8 / C6-C8): the NASM backend.
//!
//! Submodules mirror the original compiler's split between buffered
//! output state (`codegen.c`'s `asm_push` machinery), expression
//! codegen driven by the resolver's entity chain, statement/control-flow
//! codegen, global/struct layout bookkeeping, the forward-reference
//! fixup system, and the top-level per-function driver.

pub mod expressions;
pub mod fixup;
pub mod globals;
pub mod program;
pub mod state;
pub mod statements;

pub use globals::GlobalTable;
pub use program::generate;
pub use state::CodegenState;
