//! Tokenizer (external collaborator, C9).
//!
//! Grounded on `compiler.h`'s `TOKEN_TYPE_*` enum and `struct tokent`,
//! and the lexing behavior implied by `cprocess.c`'s character-level
//! `compile_process_next_char`/`peek_char`/`push_char` (line/col
//! tracking via the file's own `ungetc`-style pushback).

use rcc_core::{CompileError, Position};
use std::iter::Peekable;
use std::path::PathBuf;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Keyword(String),
    IntegerLiteral(i64),
    StringLiteral(String),
    CharLiteral(char),
    Symbol(String),
    /// A `#directive` line start, emitted only for the preprocessor's
    /// own lexing pass over `#if` expressions; the main lexer expands
    /// directives away before the parser ever sees this variant.
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
    /// True if a macro expanded into this token, so the preprocessor
    /// (and `__LINE__` handling) can tell generated tokens from source.
    pub from_macro: bool,
}

const KEYWORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "struct", "union", "unsigned", "signed", "static",
    "const", "extern", "return", "if", "else", "while", "for", "do", "break", "continue", "goto",
    "switch", "case", "default", "sizeof", "typedef", "enum",
];

const MULTI_CHAR_SYMBOLS: &[&str] = &[
    "->", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "...",
];

pub struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    source: &'a str,
    filename: PathBuf,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, filename: impl Into<PathBuf>) -> Self {
        Lexer {
            chars: source.char_indices().peekable(),
            source,
            filename: filename.into(),
            line: 1,
            col: 1,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.col, self.filename.clone())
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some((_, '/')) => {
                            while !matches!(self.peek_char(), Some('\n') | None) {
                                self.bump();
                            }
                        }
                        Some((_, '*')) => {
                            self.bump();
                            self.bump();
                            loop {
                                match self.bump() {
                                    None => break,
                                    Some('*') if self.peek_char() == Some('/') => {
                                        self.bump();
                                        break;
                                    }
                                    _ => {}
                                }
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_whitespace_and_comments();
        let start_pos = self.pos();
        let Some(c) = self.peek_char() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                pos: start_pos,
                from_macro: false,
            });
        };

        if c.is_ascii_digit() {
            return self.lex_number(start_pos);
        }
        if c == '_' || c.is_alphabetic() {
            return self.lex_identifier(start_pos);
        }
        if c == '"' {
            return self.lex_string(start_pos);
        }
        if c == '\'' {
            return self.lex_char(start_pos);
        }
        self.lex_symbol(start_pos)
    }

    fn lex_number(&mut self, pos: Position) -> Result<Token, CompileError> {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == 'x' || c == 'X' || c.is_ascii_hexdigit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16)
                .map_err(|e| CompileError::lex(format!("invalid hex literal: {e}"), pos.clone()))?
        } else {
            text.parse::<i64>()
                .map_err(|e| CompileError::lex(format!("invalid integer literal: {e}"), pos.clone()))?
        };
        Ok(Token {
            kind: TokenKind::IntegerLiteral(value),
            pos,
            from_macro: false,
        })
    }

    fn lex_identifier(&mut self, pos: Position) -> Result<Token, CompileError> {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c == '_' || c.is_alphanumeric() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = if KEYWORDS.contains(&text.as_str()) {
            TokenKind::Keyword(text)
        } else {
            TokenKind::Identifier(text)
        };
        Ok(Token {
            kind,
            pos,
            from_macro: false,
        })
    }

    fn lex_string(&mut self, pos: Position) -> Result<Token, CompileError> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => text.push(self.read_escape()?),
                Some(c) => text.push(c),
                None => return Err(CompileError::lex("unterminated string literal", pos)),
            }
        }
        Ok(Token {
            kind: TokenKind::StringLiteral(text),
            pos,
            from_macro: false,
        })
    }

    fn lex_char(&mut self, pos: Position) -> Result<Token, CompileError> {
        self.bump();
        let c = match self.bump() {
            Some('\\') => self.read_escape()?,
            Some(c) => c,
            None => return Err(CompileError::lex("unterminated char literal", pos)),
        };
        if self.bump() != Some('\'') {
            return Err(CompileError::lex("char literal must be one character", pos));
        }
        Ok(Token {
            kind: TokenKind::CharLiteral(c),
            pos,
            from_macro: false,
        })
    }

    fn read_escape(&mut self) -> Result<char, CompileError> {
        Ok(match self.bump() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            Some(other) => other,
            None => return Err(CompileError::lex("unterminated escape sequence", self.pos())),
        })
    }

    fn lex_symbol(&mut self, pos: Position) -> Result<Token, CompileError> {
        for sym in MULTI_CHAR_SYMBOLS {
            if self.source[self.byte_offset()..].starts_with(sym) {
                for _ in 0..sym.chars().count() {
                    self.bump();
                }
                return Ok(Token {
                    kind: TokenKind::Symbol((*sym).to_string()),
                    pos,
                    from_macro: false,
                });
            }
        }
        let c = self.bump().unwrap();
        Ok(Token {
            kind: TokenKind::Symbol(c.to_string()),
            pos,
            from_macro: false,
        })
    }

    fn byte_offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len())
    }

    /// Tokenizes the whole remaining input, stopping at (and including)
    /// the first `Eof` token.
    pub fn tokenize_all(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = matches!(tok.kind, TokenKind::Eof);
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, "test.c")
            .tokenize_all()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_arrow_as_one_token() {
        let k = kinds("a->b");
        assert_eq!(
            k,
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Symbol("->".into()),
                TokenKind::Identifier("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_keyword_vs_identifier() {
        let k = kinds("int x");
        assert_eq!(k[0], TokenKind::Keyword("int".into()));
        assert_eq!(k[1], TokenKind::Identifier("x".into()));
    }

    #[test]
    fn lexes_hex_and_decimal_integers() {
        let k = kinds("0x10 16");
        assert_eq!(k[0], TokenKind::IntegerLiteral(16));
        assert_eq!(k[1], TokenKind::IntegerLiteral(16));
    }

    #[test]
    fn skips_line_and_block_comments() {
        let k = kinds("a // comment\n/* block */ b");
        assert_eq!(
            k,
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Identifier("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literal_handles_escapes() {
        let k = kinds(r#""a\nb""#);
        assert_eq!(k[0], TokenKind::StringLiteral("a\nb".into()));
    }
}
