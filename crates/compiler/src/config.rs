//! Compiler configuration (spec §6, §4.9 / C9 CLI driver contract).
//!
//! Grounded on the teacher's `CompilerConfig` builder: a plain struct
//! with `with_*` methods rather than a derive-heavy options type, kept
//! `Clone` so a base config can be reused across multiple `compile_file`
//! calls in tests.

use std::path::{Path, PathBuf};

use crate::preprocessor::includes::default_include_dirs;

/// `object` adds the "export as object" flag to the NASM invocation;
/// `exec` is the default, matching spec §6's CLI contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Exec,
    Object,
}

impl OutputMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exec" => Some(OutputMode::Exec),
            "object" => Some(OutputMode::Object),
            _ => None,
        }
    }
}

/// Compilation options: source/output paths, NASM invocation mode,
/// and the include search path. Defaults match spec §6 exactly
/// (`./test.c`, `./test`, `exec`, the four-entry include path).
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub mode: OutputMode,
    pub include_dirs: Vec<PathBuf>,
    /// Whether to shell out to NASM after codegen ("exec nasm" flag).
    pub invoke_nasm: bool,
    /// Binary name/path used to invoke NASM; overridable so tests don't
    /// need a real NASM toolchain installed.
    pub nasm_binary: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            input_path: PathBuf::from("./test.c"),
            output_path: PathBuf::from("./test"),
            mode: OutputMode::Exec,
            include_dirs: default_include_dirs(),
            invoke_nasm: true,
            nasm_binary: "nasm".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = path.into();
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    /// Disables the NASM invocation, leaving only the `.asm` text
    /// written to `output_path` — used by tests that don't want to
    /// depend on a real NASM toolchain.
    pub fn without_nasm(mut self) -> Self {
        self.invoke_nasm = false;
        self
    }

    pub fn with_nasm_binary(mut self, binary: impl Into<String>) -> Self {
        self.nasm_binary = binary.into();
        self
    }

    /// Directory `#include "..."` should search first, before the
    /// configured search path.
    pub fn input_dir(&self) -> &Path {
        self.input_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_contract() {
        let config = CompilerConfig::default();
        assert_eq!(config.input_path, PathBuf::from("./test.c"));
        assert_eq!(config.output_path, PathBuf::from("./test"));
        assert_eq!(config.mode, OutputMode::Exec);
        assert!(config.invoke_nasm);
    }

    #[test]
    fn mode_parses_exec_and_object_only() {
        assert_eq!(OutputMode::parse("exec"), Some(OutputMode::Exec));
        assert_eq!(OutputMode::parse("object"), Some(OutputMode::Object));
        assert_eq!(OutputMode::parse("bogus"), None);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = CompilerConfig::new()
            .with_input("a.c")
            .with_output("a.asm")
            .with_mode(OutputMode::Object)
            .without_nasm();
        assert_eq!(config.input_path, PathBuf::from("a.c"));
        assert!(!config.invoke_nasm);
        assert_eq!(config.mode, OutputMode::Object);
    }
}
