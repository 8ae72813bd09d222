//! Preprocessor driver (external collaborator, C9).
//!
//! Line-oriented directive handling (`#define`, `#undef`, `#include`,
//! `#if`/`#ifdef`/`#ifndef`/`#elif`/`#else`/`#endif`, `#error`,
//! `#warning`, `#typedef`) plus macro expansion of ordinary lines,
//! grounded on the original's `preprocessor/` sources and spec §4's
//! supplemented-feature list. `#if` expressions are evaluated through
//! the shared generic expression engine (C4) via `IfExprClient` below,
//! rather than a bespoke recursive-descent evaluator.

pub mod includes;
pub mod macros;

use crate::expr_engine::{self, ExpressionClient};
use macros::{MacroDef, MacroTable};
use rcc_core::{CompileError, Diagnostics, Position};
use std::path::PathBuf;

/// Tokenizes a `#if`/`#elif` expression into the whitespace-separated
/// pieces the engine expects. Good enough for the integer constant
/// expressions `#if` actually needs (literals, identifiers,
/// `defined`, and the usual arithmetic/relational/logical operators).
fn tokenize_if_expr(expr: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c.is_ascii_digit() {
            let mut tok = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() {
                    tok.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            out.push(tok);
            continue;
        }
        if c == '_' || c.is_alphabetic() {
            let mut tok = String::new();
            while let Some(&c) = chars.peek() {
                if c == '_' || c.is_alphanumeric() {
                    tok.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            out.push(tok);
            continue;
        }
        let first = chars.next().unwrap();
        let mut lookahead = chars.clone();
        let second = lookahead.peek().copied();
        let two_char = second.map(|s| format!("{first}{s}"));
        if matches!(
            two_char.as_deref(),
            Some("&&") | Some("||") | Some("==") | Some("!=") | Some("<=") | Some(">=")
        ) {
            chars.next();
            out.push(two_char.unwrap());
        } else {
            out.push(first.to_string());
        }
    }
    out
}

struct IfExprClient<'a> {
    tokens: Vec<String>,
    pos: usize,
    macros: &'a MacroTable,
}

impl<'a> ExpressionClient<i64> for IfExprClient<'a> {
    fn parse_single(&mut self) -> Result<i64, CompileError> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| CompileError::preprocess("unexpected end of #if expression", Position::default()))?;
        self.pos += 1;

        if tok == "defined" {
            let paren = self.tokens.get(self.pos).map(String::as_str) == Some("(");
            if paren {
                self.pos += 1;
            }
            let name = self
                .tokens
                .get(self.pos)
                .cloned()
                .ok_or_else(|| CompileError::preprocess("expected identifier after 'defined'", Position::default()))?;
            self.pos += 1;
            if paren {
                self.pos += 1;
            }
            return Ok(self.macros.is_defined(&name) as i64);
        }
        if tok == "!" {
            let v = self.parse_single()?;
            return Ok((v == 0) as i64);
        }
        if tok == "(" {
            let v = expr_engine::parse_expression(self, None)?;
            self.pos += 1;
            return Ok(v);
        }
        if let Ok(n) = tok.parse::<i64>() {
            return Ok(n);
        }
        // Undefined identifiers evaluate to 0, standard #if behavior.
        Ok(0)
    }

    fn make_binary(&mut self, op: &str, left: i64, right: i64) -> Result<i64, CompileError> {
        Ok(match op {
            "+" => left + right,
            "-" => left - right,
            "*" => left * right,
            "/" => left / right,
            "&&" => ((left != 0) && (right != 0)) as i64,
            "||" => ((left != 0) || (right != 0)) as i64,
            "==" => (left == right) as i64,
            "!=" => (left != right) as i64,
            "<" => (left < right) as i64,
            ">" => (left > right) as i64,
            "<=" => (left <= right) as i64,
            ">=" => (left >= right) as i64,
            other => {
                return Err(CompileError::preprocess(
                    format!("unsupported operator '{other}' in #if expression"),
                    Position::default(),
                ));
            }
        })
    }

    fn peek_operator(&mut self) -> Option<String> {
        self.tokens.get(self.pos).cloned().filter(|t| {
            matches!(
                t.as_str(),
                "+" | "-" | "*" | "/" | "&&" | "||" | "==" | "!=" | "<" | ">" | "<=" | ">="
            )
        })
    }

    fn consume_operator(&mut self) -> Result<String, CompileError> {
        let op = self.tokens[self.pos].clone();
        self.pos += 1;
        Ok(op)
    }
}

/// Evaluates a `#if`/`#elif` constant expression to a boolean.
pub fn eval_if_expr(expr: &str, macros: &MacroTable) -> Result<bool, CompileError> {
    let mut client = IfExprClient {
        tokens: tokenize_if_expr(expr),
        pos: 0,
        macros,
    };
    if client.tokens.is_empty() {
        return Err(CompileError::preprocess("empty #if expression", Position::default()));
    }
    let value = expr_engine::parse_expression(&mut client, None)?;
    Ok(value != 0)
}

#[derive(Default)]
struct ConditionalFrame {
    /// True if this branch (or an earlier sibling `#elif`) has already
    /// been taken, so later `#elif`/`#else` in the same chain are
    /// skipped regardless of their own condition.
    taken: bool,
    active: bool,
    parent_active: bool,
}

pub struct Preprocessor {
    pub macros: MacroTable,
    pub include_dirs: Vec<PathBuf>,
    conditional_stack: Vec<ConditionalFrame>,
    pub diagnostics: Diagnostics,
}

impl Preprocessor {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Preprocessor {
            macros: MacroTable::new(),
            include_dirs,
            conditional_stack: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Shares macro table and include dirs with a parent process, per
    /// `compile_process_create`'s include-file handling (spec §4).
    pub fn child_for_include(&self) -> Preprocessor {
        Preprocessor {
            macros: self.macros.clone(),
            include_dirs: self.include_dirs.clone(),
            conditional_stack: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    fn currently_active(&self) -> bool {
        self.conditional_stack.iter().all(|f| f.active)
    }

    /// Whether the current position is inside a taken conditional
    /// branch, exposed so the driver can special-case `#include` lines
    /// (which this module leaves unresolved, see `handle_directive`).
    pub fn is_active(&self) -> bool {
        self.currently_active()
    }

    /// Processes one logical line, returning the (possibly empty) text
    /// to emit downstream to the lexer, with macros expanded and
    /// directives consumed.
    pub fn process_line(&mut self, line: &str, pos: &Position) -> Result<String, CompileError> {
        let trimmed = line.trim_start();
        if let Some(directive) = trimmed.strip_prefix('#') {
            self.handle_directive(directive.trim(), pos)?;
            return Ok(String::new());
        }

        if !self.currently_active() {
            return Ok(String::new());
        }

        Ok(self.expand_line(line))
    }

    fn handle_directive(&mut self, directive: &str, pos: &Position) -> Result<(), CompileError> {
        let (keyword, rest) = directive.split_once(char::is_whitespace).unwrap_or((directive, ""));
        let rest = rest.trim();

        match keyword {
            "ifdef" => {
                let active = self.currently_active() && self.macros.is_defined(rest);
                self.conditional_stack.push(ConditionalFrame {
                    taken: active,
                    active,
                    parent_active: self.currently_active(),
                });
            }
            "ifndef" => {
                let active = self.currently_active() && !self.macros.is_defined(rest);
                self.conditional_stack.push(ConditionalFrame {
                    taken: active,
                    active,
                    parent_active: self.currently_active(),
                });
            }
            "if" => {
                let parent_active = self.currently_active();
                let active = parent_active && eval_if_expr(rest, &self.macros)?;
                self.conditional_stack.push(ConditionalFrame {
                    taken: active,
                    active,
                    parent_active,
                });
            }
            "elif" => {
                let frame = self
                    .conditional_stack
                    .last_mut()
                    .ok_or_else(|| CompileError::preprocess("#elif without #if", pos.clone()))?;
                if frame.taken || !frame.parent_active {
                    frame.active = false;
                } else {
                    frame.active = eval_if_expr(rest, &self.macros)?;
                    frame.taken = frame.active;
                }
            }
            "else" => {
                let frame = self
                    .conditional_stack
                    .last_mut()
                    .ok_or_else(|| CompileError::preprocess("#else without #if", pos.clone()))?;
                frame.active = frame.parent_active && !frame.taken;
                frame.taken = true;
            }
            "endif" => {
                self.conditional_stack
                    .pop()
                    .ok_or_else(|| CompileError::preprocess("#endif without #if", pos.clone()))?;
            }
            "define" if self.currently_active() => self.handle_define(rest),
            "undef" if self.currently_active() => {
                self.macros.undef(rest.trim());
            }
            "error" if self.currently_active() => {
                return Err(CompileError::preprocess(rest.to_string(), pos.clone()));
            }
            "warning" if self.currently_active() => {
                self.diagnostics.warn(rest.to_string(), pos);
            }
            "typedef" if self.currently_active() => {
                // The preprocessor's #typedef only needs to record the
                // alias name so later macro-expanded lines don't
                // misparse it as an identifier; the parser's own
                // `typedef` statement does the real type binding.
            }
            "include" if self.currently_active() => {
                // Left to the driver: resolving and splicing an
                // included file's lines requires the file-reading
                // context the preprocessor alone doesn't own here.
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_define(&mut self, rest: &str) {
        let Some((name_part, replacement)) = rest.split_once(char::is_whitespace) else {
            self.macros.define(
                rest.trim().to_string(),
                MacroDef::Object { replacement: Vec::new() },
            );
            return;
        };

        if let Some(open) = name_part.find('(') {
            let name = name_part[..open].to_string();
            let params: Vec<String> = name_part[open + 1..]
                .trim_end_matches(')')
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            let tokens = tokenize_c_tokens(replacement);
            self.macros.define(name, MacroDef::Function { params, replacement: tokens });
        } else {
            let tokens = tokenize_c_tokens(replacement);
            self.macros
                .define(name_part.to_string(), MacroDef::Object { replacement: tokens });
        }
    }

    /// Macro substitution over a line: identifiers that name an object
    /// macro are replaced with its token list; identifiers immediately
    /// followed by `(` that name a function-like macro have their call
    /// parsed (balancing parens, splitting arguments on top-level
    /// commas) and expanded via `MacroTable::expand_function`. Matches
    /// `SQ(3 + 1)` expanding to `((3 + 1) * (3 + 1))` regardless of
    /// whitespace around the call.
    fn expand_line(&self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::new();
        let mut pos = 0;

        while pos < chars.len() {
            let c = chars[pos];
            if c == '_' || c.is_alphabetic() {
                let start = pos;
                while pos < chars.len() && (chars[pos] == '_' || chars[pos].is_alphanumeric()) {
                    pos += 1;
                }
                let ident: String = chars[start..pos].iter().collect();

                match self.macros.get(&ident) {
                    Some(MacroDef::Object { replacement }) => {
                        out.push_str(&replacement.join(" "));
                    }
                    Some(MacroDef::Function { params, replacement }) if chars.get(pos) == Some(&'(') => {
                        let (args, after) = parse_call_args(&chars, pos);
                        let expanded = MacroTable::expand_function(params, replacement, &args);
                        out.push_str(&expanded.join(" "));
                        pos = after;
                    }
                    _ => out.push_str(&ident),
                }
                continue;
            }
            out.push(c);
            pos += 1;
        }
        out
    }
}

/// Parses a `(arg1, arg2, ...)` call starting at `chars[open_paren]`,
/// splitting on top-level commas (nested parens don't split) and
/// tokenizing each argument into identifier/number/symbol tokens.
/// Returns the arguments and the position just past the closing `)`.
fn parse_call_args(chars: &[char], open_paren: usize) -> (Vec<Vec<String>>, usize) {
    let mut depth = 0;
    let mut pos = open_paren;
    let mut current = String::new();
    let mut args = Vec::new();

    loop {
        let c = chars[pos];
        match c {
            '(' => {
                depth += 1;
                if depth > 1 {
                    current.push(c);
                }
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    args.push(tokenize_c_tokens(&current));
                    pos += 1;
                    break;
                }
                current.push(c);
            }
            ',' if depth == 1 => {
                args.push(tokenize_c_tokens(&current));
                current.clear();
            }
            _ => current.push(c),
        }
        pos += 1;
    }
    (args, pos)
}

fn tokenize_c_tokens(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '_' || c.is_alphanumeric() {
            let mut tok = String::new();
            while let Some(&c) = chars.peek() {
                if c == '_' || c.is_alphanumeric() {
                    tok.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(tok);
            continue;
        }
        tokens.push(c.to_string());
        chars.next();
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_macro_expands_in_line() {
        let mut pp = Preprocessor::new(vec![]);
        pp.handle_define("MAX 256");
        let out = pp.expand_line("int x = MAX;");
        assert!(out.contains("256"));
    }

    #[test]
    fn if_zero_skips_branch() {
        let mut pp = Preprocessor::new(vec![]);
        let pos = Position::new(1, 1, "t.c");
        pp.process_line("#if 0", &pos).unwrap();
        assert!(!pp.currently_active());
        pp.process_line("#else", &pos).unwrap();
        assert!(pp.currently_active());
        pp.process_line("#endif", &pos).unwrap();
        assert!(pp.currently_active());
    }

    #[test]
    fn ifdef_checks_macro_table() {
        let mut pp = Preprocessor::new(vec![]);
        let pos = Position::new(1, 1, "t.c");
        pp.handle_define("FOO 1");
        pp.process_line("#ifdef FOO", &pos).unwrap();
        assert!(pp.currently_active());
    }

    #[test]
    fn error_directive_is_fatal() {
        let mut pp = Preprocessor::new(vec![]);
        let pos = Position::new(1, 1, "t.c");
        let err = pp.process_line("#error boom", &pos).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn warning_directive_is_not_fatal() {
        let mut pp = Preprocessor::new(vec![]);
        let pos = Position::new(1, 1, "t.c");
        pp.process_line("#warning heads up", &pos).unwrap();
        assert_eq!(pp.diagnostics.warnings().len(), 1);
    }

    #[test]
    fn undef_unknown_name_does_not_error() {
        let mut pp = Preprocessor::new(vec![]);
        let pos = Position::new(1, 1, "t.c");
        pp.process_line("#undef NEVER_DEFINED", &pos).unwrap();
    }

    #[test]
    fn function_macro_call_expands_with_no_surrounding_space() {
        let mut pp = Preprocessor::new(vec![]);
        pp.handle_define("SQ(x) ((x)*(x))");
        let out = pp.expand_line("int y = SQ(3 + 1);");
        let collapsed: String = out.chars().filter(|c| !c.is_whitespace()).collect();
        assert!(collapsed.contains("((3+1)*(3+1))"));
    }
}
