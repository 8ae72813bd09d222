//! rcc: a rosebud-style C-subset compiler targeting 32-bit x86 NASM
//! assembly.
//!
//! Pipeline: preprocess -> lex -> parse -> validate -> codegen ->
//! (optionally) invoke NASM, mirroring `compiler.c`'s `compile_file`
//! stage order.

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod config;
pub mod expr_engine;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod resolver;
pub mod validator;

pub use config::{CompilerConfig, OutputMode};

use lexer::Lexer;
use parser::Parser;
use preprocessor::Preprocessor;
use rcc_core::{CompileError, Position};
use std::fs;
use std::path::Path;
use std::process::{Command, ExitStatus};
use validator::Validator;

/// Runs the front end and code generator for `config`, writing the
/// generated NASM text to `config.output_path`. Does not invoke NASM;
/// see [`assemble`] and [`compile_file`] for that.
pub fn compile(config: &CompilerConfig) -> Result<(), CompileError> {
    tracing::info!(input = %config.input_path.display(), "compiling");

    let source = fs::read_to_string(&config.input_path).map_err(|e| {
        CompileError::io(format!("reading '{}': {e}", config.input_path.display()))
    })?;

    let preprocessed = preprocess_source(&source, config)?;
    tracing::debug!(len = preprocessed.len(), "preprocessing complete");

    let tokens = Lexer::new(&preprocessed, config.input_path.clone()).tokenize_all()?;
    tracing::trace!(count = tokens.len(), "lexing complete");

    let mut parser = Parser::new(&tokens);
    parser.parse_program()?;
    tracing::info!(nodes = parser.ast.len(), "parsing complete");

    let mut validator = Validator::new(&parser.ast);
    validator.validate()?;
    for warning in validator.diagnostics.warnings() {
        tracing::warn!("{warning}");
    }

    let asm = codegen::generate(&parser.ast)?;
    tracing::info!("codegen complete");

    fs::write(&config.output_path, asm)?;
    Ok(())
}

/// Runs the full pipeline for `config`: [`compile`], then — if
/// `config.invoke_nasm` — [`assemble`]. Collapses NASM's exit status
/// into a `CompileError`; callers that need NASM's raw exit code for
/// spec §6's exit-code passthrough should call `compile`/`assemble`
/// directly instead (see `main.rs`).
pub fn compile_file(config: &CompilerConfig) -> Result<(), CompileError> {
    compile(config)?;
    if config.invoke_nasm {
        let status = assemble(config)?;
        if !status.success() {
            return Err(CompileError::io(format!(
                "nasm exited with status {:?}",
                status.code()
            )));
        }
    }
    Ok(())
}

/// Expands `source` into a single preprocessed text: macro expansion,
/// conditional compilation, and `#include` splicing, grounded on
/// `cprocess.c`'s line-by-line `compile_process_next_char` drive.
fn preprocess_source(source: &str, config: &CompilerConfig) -> Result<String, CompileError> {
    let mut pp = Preprocessor::new(config.include_dirs.clone());
    let mut out = String::new();
    preprocess_into(&mut pp, source, &config.input_path, &mut out)?;
    Ok(out)
}

fn preprocess_into(
    pp: &mut Preprocessor,
    source: &str,
    filename: &Path,
    out: &mut String,
) -> Result<(), CompileError> {
    for (i, line) in source.lines().enumerate() {
        let pos = Position::new(i + 1, 1, filename.to_path_buf());
        let trimmed = line.trim_start();

        if pp.is_active() {
            if let Some(rest) = trimmed.strip_prefix("#include") {
                let (name, quoted) = parse_include_spec(rest.trim(), &pos)?;
                include_file(pp, &name, quoted, filename, out)?;
                continue;
            }
        }

        let expanded = pp.process_line(line, &pos)?;
        out.push_str(&expanded);
        out.push('\n');
    }
    Ok(())
}

fn parse_include_spec(rest: &str, pos: &Position) -> Result<(String, bool), CompileError> {
    if let Some(name) = rest.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Ok((name.to_string(), true));
    }
    if let Some(name) = rest.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return Ok((name.to_string(), false));
    }
    Err(CompileError::preprocess(
        format!("malformed #include '{rest}'"),
        pos.clone(),
    ))
}

/// Splices an included file's (preprocessed) content into `out`. A
/// static header body is expanded in place with no filesystem access;
/// a real file is read and preprocessed with a child process that
/// shares the parent's macro table (`cprocess.c`'s
/// `compile_process_create` parent-sharing behavior), and any macros
/// it defines are merged back so later lines in the parent see them.
fn include_file(
    pp: &mut Preprocessor,
    name: &str,
    quoted: bool,
    including_file: &Path,
    out: &mut String,
) -> Result<(), CompileError> {
    if let Some(body) = preprocessor::includes::static_include_body(name) {
        return preprocess_into(pp, body, Path::new(name), out);
    }

    let including_dir = including_file.parent().unwrap_or_else(|| Path::new("."));
    let resolved = preprocessor::includes::resolve_include(name, quoted, including_dir, &pp.include_dirs)?;

    let mut child = pp.child_for_include();
    let included_source = fs::read_to_string(&resolved)?;
    preprocess_into(&mut child, &included_source, &resolved, out)?;
    pp.macros = child.macros;
    Ok(())
}

/// Shells out to NASM per spec §6: `nasm -f elf32 <OUTPUT>`, or with
/// `-o <OUTPUT>.o` appended in `Object` mode. Returns the raw
/// [`ExitStatus`] rather than collapsing it, so the CLI can exit with
/// NASM's own code as spec §6 requires.
pub fn assemble(config: &CompilerConfig) -> Result<ExitStatus, CompileError> {
    let mut cmd = Command::new(&config.nasm_binary);
    cmd.arg("-f").arg("elf32").arg(&config.output_path);
    if config.mode == OutputMode::Object {
        cmd.arg("-o").arg(format!("{}.o", config.output_path.display()));
    }
    tracing::info!(binary = %config.nasm_binary, "invoking nasm");

    cmd.status()
        .map_err(|e| CompileError::io(format!("running '{}': {e}", config.nasm_binary)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_source(src: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(src.as_bytes()).unwrap();
        file
    }

    #[test]
    fn compile_file_writes_assembly_without_invoking_nasm() {
        let src = write_source("int main() { return 0; }");
        let output = tempfile::NamedTempFile::new().unwrap();
        let config = CompilerConfig::new()
            .with_input(src.path())
            .with_output(output.path())
            .without_nasm();

        compile_file(&config).unwrap();

        let asm = fs::read_to_string(output.path()).unwrap();
        assert!(asm.contains("global main"));
    }

    #[test]
    fn object_macro_survives_preprocessing_into_codegen() {
        let src = write_source("#define ANSWER 42\nint main() { return ANSWER; }");
        let output = tempfile::NamedTempFile::new().unwrap();
        let config = CompilerConfig::new()
            .with_input(src.path())
            .with_output(output.path())
            .without_nasm();

        compile_file(&config).unwrap();

        let asm = fs::read_to_string(output.path()).unwrap();
        assert!(asm.contains("mov eax, 42"));
    }

    #[test]
    fn conditional_compilation_excludes_disabled_branch() {
        let src = write_source(
            "#if 0\nint dead() { return 1; }\n#endif\nint main() { return 0; }",
        );
        let output = tempfile::NamedTempFile::new().unwrap();
        let config = CompilerConfig::new()
            .with_input(src.path())
            .with_output(output.path())
            .without_nasm();

        compile_file(&config).unwrap();

        let asm = fs::read_to_string(output.path()).unwrap();
        assert!(!asm.contains("dead"));
    }

    #[test]
    fn missing_input_file_is_an_io_error() {
        let config = CompilerConfig::new()
            .with_input("/nonexistent/path/does_not_exist.c")
            .without_nasm();
        assert!(compile_file(&config).is_err());
    }
}
