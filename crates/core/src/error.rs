//! Source positions and the shared error taxonomy.
//!
//! Mirrors `struct pos` from the original compiler: every diagnostic
//! carries a line, column, and filename so the driver can format
//! `msg on line L, col C in file F` exactly as `compiler_error`/
//! `compiler_warning` do.

use std::fmt;
use std::path::PathBuf;

/// A location in a source file. 1-indexed, matching NASM listings and
/// the original `compiler_error` output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
    pub filename: PathBuf,
}

impl Position {
    pub fn new(line: usize, col: usize, filename: impl Into<PathBuf>) -> Self {
        Position {
            line,
            col,
            filename: filename.into(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "on line {}, col {} in file {}",
            self.line,
            self.col,
            self.filename.display()
        )
    }
}

/// The compiler's error taxonomy (spec §7). Every stage's `Result` uses
/// this type; the first error is fatal and terminates compilation.
#[derive(Debug, Clone)]
pub enum CompileError {
    Lex { message: String, pos: Position },
    Preprocess { message: String, pos: Position },
    Parse { message: String, pos: Position },
    Validation { message: String, pos: Option<Position> },
    Resolve { message: String },
    Codegen { message: String },
    Io { message: String },
}

impl CompileError {
    pub fn lex(message: impl Into<String>, pos: Position) -> Self {
        CompileError::Lex {
            message: message.into(),
            pos,
        }
    }

    pub fn preprocess(message: impl Into<String>, pos: Position) -> Self {
        CompileError::Preprocess {
            message: message.into(),
            pos,
        }
    }

    pub fn parse(message: impl Into<String>, pos: Position) -> Self {
        CompileError::Parse {
            message: message.into(),
            pos,
        }
    }

    pub fn validation(message: impl Into<String>, pos: Option<Position>) -> Self {
        CompileError::Validation {
            message: message.into(),
            pos,
        }
    }

    pub fn resolve(message: impl Into<String>) -> Self {
        CompileError::Resolve {
            message: message.into(),
        }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        CompileError::Codegen {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        CompileError::Io {
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex { message, pos } => write!(f, "{} {}", message, pos),
            CompileError::Preprocess { message, pos } => write!(f, "{} {}", message, pos),
            CompileError::Parse { message, pos } => write!(f, "{} {}", message, pos),
            CompileError::Validation { message, pos } => match pos {
                Some(pos) => write!(f, "{} {}", message, pos),
                None => write!(f, "{}", message),
            },
            CompileError::Resolve { message } => write!(f, "{}", message),
            CompileError::Codegen { message } => write!(f, "{}", message),
            CompileError::Io { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::io(e.to_string())
    }
}

/// A non-fatal diagnostic sink, the `compiler_warning` counterpart to
/// the fatal `CompileError` path. Warnings are collected rather than
/// exiting and do not affect the process exit code.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn warn(&mut self, message: impl Into<String>, pos: &Position) {
        let text = format!("{} {}", message.into(), pos);
        tracing::warn!("{}", text);
        self.warnings.push(text);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_display_matches_compiler_error_format() {
        let pos = Position::new(12, 4, "test.c");
        assert_eq!(pos.to_string(), "on line 12, col 4 in file test.c");
    }

    #[test]
    fn diagnostics_collects_without_exiting() {
        let mut diags = Diagnostics::new();
        diags.warn("unused static function 'f'", &Position::new(3, 1, "a.c"));
        assert_eq!(diags.warnings().len(), 1);
        assert!(diags.warnings()[0].contains("unused static function"));
    }
}
