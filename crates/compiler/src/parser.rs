//! Recursive-descent parser for declarations and statements, with
//! expressions delegated to the shared generic expression engine (C4).
//!
//! Grounded on the top-level shape of `compiler.c`'s `parse` pass and
//! `expressionable.c`'s token-dispatch loop (`expressionable_parse_single_with_flags`),
//! reused here through `ParserExprClient`.

use crate::ast::{Ast, BinaryOp, FunctionArg, NodeId, NodeKind, StructField, UnaryOp};
use crate::expr_engine::{self, ExpressionClient};
use crate::lexer::{Token, TokenKind};
use rcc_core::{ArrayBracket, CompileError, Datatype, PrimitiveKind, Position};

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    pub ast: Ast,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            ast: Ast::new(),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_n(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn is_symbol(&self, s: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Symbol(sym) if sym == s)
    }

    fn is_keyword(&self, k: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(kw) if kw == k)
    }

    fn expect_symbol(&mut self, s: &str) -> Result<(), CompileError> {
        if self.is_symbol(s) {
            self.bump();
            Ok(())
        } else {
            Err(CompileError::parse(
                format!("expected '{s}'"),
                self.peek().pos.clone(),
            ))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        match self.bump().kind {
            TokenKind::Identifier(name) => Ok(name),
            other => Err(CompileError::parse(
                format!("expected identifier, found {other:?}"),
                self.peek().pos.clone(),
            )),
        }
    }

    /// Parses the whole translation unit's top-level declarations.
    pub fn parse_program(&mut self) -> Result<(), CompileError> {
        while !matches!(self.peek().kind, TokenKind::Eof) {
            let node = self.parse_top_level_decl()?;
            self.ast.top_level.push(node);
        }
        Ok(())
    }

    fn is_type_keyword(&self) -> bool {
        matches!(
            &self.peek().kind,
            TokenKind::Keyword(k) if matches!(
                k.as_str(),
                "void" | "char" | "short" | "int" | "long" | "struct" | "union" | "unsigned" | "signed" | "const" | "static" | "extern"
            )
        )
    }

    fn parse_type(&mut self) -> Result<Datatype, CompileError> {
        let mut dt = Datatype::new(PrimitiveKind::Int);
        let mut kind_set = false;

        loop {
            match &self.peek().kind {
                TokenKind::Keyword(k) if k == "const" => {
                    dt.is_const = true;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "static" => {
                    dt.is_static = true;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "extern" => {
                    dt.is_extern = true;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "unsigned" => {
                    dt.signed = false;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "signed" => {
                    dt.signed = true;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "void" => {
                    dt.kind = PrimitiveKind::Void;
                    kind_set = true;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "char" => {
                    dt.kind = PrimitiveKind::Char;
                    kind_set = true;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "short" => {
                    dt.kind = PrimitiveKind::Short;
                    kind_set = true;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "int" => {
                    dt.kind = PrimitiveKind::Int;
                    kind_set = true;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "long" => {
                    dt.kind = PrimitiveKind::Long;
                    kind_set = true;
                    self.bump();
                }
                TokenKind::Keyword(k) if k == "struct" || k == "union" => {
                    let is_union = k == "union";
                    self.bump();
                    let name = self.expect_identifier()?;
                    dt.kind = if is_union { PrimitiveKind::Union } else { PrimitiveKind::Struct };
                    dt.struct_name = Some(name);
                    kind_set = true;
                }
                _ => break,
            }
        }

        if !kind_set {
            return Err(CompileError::parse("expected a type", self.peek().pos.clone()));
        }

        while self.is_symbol("*") {
            self.bump();
            dt.pointer_depth += 1;
            dt.is_pointer = true;
        }

        Ok(dt)
    }

    /// Parses zero or more trailing `[N]` declarator dimensions onto
    /// `dt.brackets`, e.g. the `[3]` in `int *p[3];`. An empty `[]` is
    /// left with `size: None`, matching `array_total_elements`'s
    /// "incomplete until the caller patches it in" contract.
    fn parse_array_brackets(&mut self, dt: &mut Datatype) -> Result<(), CompileError> {
        while self.is_symbol("[") {
            self.bump();
            let size = if self.is_symbol("]") {
                None
            } else {
                let TokenKind::IntegerLiteral(n) = self.peek().kind else {
                    return Err(CompileError::parse("expected array size", self.peek().pos.clone()));
                };
                self.bump();
                Some(n as usize)
            };
            self.expect_symbol("]")?;
            dt.brackets.push(ArrayBracket { size });
        }
        Ok(())
    }

    fn parse_top_level_decl(&mut self) -> Result<NodeId, CompileError> {
        let pos = self.peek().pos.clone();
        if self.is_keyword("typedef") {
            self.bump();
            let underlying = self.parse_type()?;
            let alias = self.expect_identifier()?;
            self.expect_symbol(";")?;
            return Ok(self.ast.push(NodeKind::TypedefDef { alias, underlying }, pos));
        }

        if self.is_keyword("struct") || self.is_keyword("union") {
            if matches!(self.peek_n(2).kind, TokenKind::Symbol(ref s) if s == "{")
                || matches!(self.peek_n(1).kind, TokenKind::Symbol(ref s) if s == "{")
            {
                return self.parse_struct_def();
            }
        }

        let mut datatype = self.parse_type()?;
        let name = self.expect_identifier()?;

        if !self.is_symbol("(") {
            self.parse_array_brackets(&mut datatype)?;
            let initializer = if self.is_symbol("=") {
                self.bump();
                self.parse_expr()?
            } else {
                NodeId::NONE
            };
            self.expect_symbol(";")?;
            return Ok(self.ast.push(NodeKind::VarDecl { name, datatype, initializer }, pos));
        }

        let return_type = datatype;
        self.expect_symbol("(")?;
        let (args, is_variadic) = self.parse_function_params()?;
        self.expect_symbol(")")?;

        if self.is_symbol(";") {
            self.bump();
            return Ok(self.ast.push(
                NodeKind::FunctionDef {
                    name,
                    return_type,
                    args,
                    is_variadic,
                    body: NodeId::NONE,
                    is_forward_declaration: true,
                },
                pos,
            ));
        }

        let body = self.parse_block()?;
        Ok(self.ast.push(
            NodeKind::FunctionDef {
                name,
                return_type,
                args,
                is_variadic,
                body,
                is_forward_declaration: false,
            },
            pos,
        ))
    }

    fn parse_function_params(&mut self) -> Result<(Vec<FunctionArg>, bool), CompileError> {
        let mut args = Vec::new();
        let mut is_variadic = false;
        while !self.is_symbol(")") {
            if self.is_symbol("...") {
                self.bump();
                is_variadic = true;
                break;
            }
            let datatype = self.parse_type()?;
            let name = self.expect_identifier()?;
            args.push(FunctionArg { name, datatype });
            if self.is_symbol(",") {
                self.bump();
            } else {
                break;
            }
        }
        Ok((args, is_variadic))
    }

    fn parse_struct_def(&mut self) -> Result<NodeId, CompileError> {
        let pos = self.peek().pos.clone();
        let is_union = self.is_keyword("union");
        self.bump();

        let name = if let TokenKind::Identifier(_) = &self.peek().kind {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        if self.is_symbol(";") {
            self.bump();
            return Ok(self.ast.push(
                NodeKind::StructDef {
                    name,
                    is_union,
                    fields: Vec::new(),
                    is_forward_declaration: true,
                },
                pos,
            ));
        }

        self.expect_symbol("{")?;
        let mut fields = Vec::new();
        while !self.is_symbol("}") {
            let mut datatype = self.parse_type()?;
            let field_name = self.expect_identifier()?;
            self.parse_array_brackets(&mut datatype)?;
            self.expect_symbol(";")?;
            fields.push(StructField { name: field_name, datatype });
        }
        self.expect_symbol("}")?;
        self.expect_symbol(";")?;

        Ok(self.ast.push(
            NodeKind::StructDef {
                name,
                is_union,
                fields,
                is_forward_declaration: false,
            },
            pos,
        ))
    }

    fn parse_block(&mut self) -> Result<NodeId, CompileError> {
        let pos = self.peek().pos.clone();
        self.expect_symbol("{")?;
        let mut statements = Vec::new();
        while !self.is_symbol("}") {
            statements.push(self.parse_statement()?);
        }
        self.expect_symbol("}")?;
        Ok(self.ast.push(NodeKind::Block { statements }, pos))
    }

    fn parse_statement(&mut self) -> Result<NodeId, CompileError> {
        let pos = self.peek().pos.clone();

        if self.is_symbol("{") {
            return self.parse_block();
        }
        if self.is_keyword("return") {
            self.bump();
            let value = if self.is_symbol(";") {
                NodeId::NONE
            } else {
                self.parse_expr()?
            };
            self.expect_symbol(";")?;
            return Ok(self.ast.push(NodeKind::Return { value }, pos));
        }
        if self.is_keyword("if") {
            self.bump();
            self.expect_symbol("(")?;
            let condition = self.parse_expr()?;
            self.expect_symbol(")")?;
            let then_branch = self.parse_statement()?;
            let else_branch = if self.is_keyword("else") {
                self.bump();
                self.parse_statement()?
            } else {
                NodeId::NONE
            };
            return Ok(self.ast.push(
                NodeKind::If { condition, then_branch, else_branch },
                pos,
            ));
        }
        if self.is_keyword("while") {
            self.bump();
            self.expect_symbol("(")?;
            let condition = self.parse_expr()?;
            self.expect_symbol(")")?;
            let body = self.parse_statement()?;
            return Ok(self.ast.push(NodeKind::While { condition, body }, pos));
        }
        if self.is_keyword("do") {
            self.bump();
            let body = self.parse_statement()?;
            if !self.is_keyword("while") {
                return Err(CompileError::parse("expected 'while' after do-block", self.peek().pos.clone()));
            }
            self.bump();
            self.expect_symbol("(")?;
            let condition = self.parse_expr()?;
            self.expect_symbol(")")?;
            self.expect_symbol(";")?;
            return Ok(self.ast.push(NodeKind::DoWhile { condition, body }, pos));
        }
        if self.is_keyword("for") {
            self.bump();
            self.expect_symbol("(")?;
            let init = if self.is_symbol(";") { NodeId::NONE } else { self.parse_expr()? };
            self.expect_symbol(";")?;
            let condition = if self.is_symbol(";") { NodeId::NONE } else { self.parse_expr()? };
            self.expect_symbol(";")?;
            let step = if self.is_symbol(")") { NodeId::NONE } else { self.parse_expr()? };
            self.expect_symbol(")")?;
            let body = self.parse_statement()?;
            return Ok(self.ast.push(NodeKind::For { init, condition, step, body }, pos));
        }
        if self.is_keyword("switch") {
            self.bump();
            self.expect_symbol("(")?;
            let discriminant = self.parse_expr()?;
            self.expect_symbol(")")?;
            let body = self.parse_statement()?;
            return Ok(self.ast.push(NodeKind::Switch { discriminant, body }, pos));
        }
        if self.is_keyword("case") {
            self.bump();
            let value = self.parse_expr()?;
            self.expect_symbol(":")?;
            return Ok(self.ast.push(NodeKind::Case { value }, pos));
        }
        if self.is_keyword("default") {
            self.bump();
            self.expect_symbol(":")?;
            return Ok(self.ast.push(NodeKind::Default, pos));
        }
        if self.is_keyword("break") {
            self.bump();
            self.expect_symbol(";")?;
            return Ok(self.ast.push(NodeKind::Break, pos));
        }
        if self.is_keyword("continue") {
            self.bump();
            self.expect_symbol(";")?;
            return Ok(self.ast.push(NodeKind::Continue, pos));
        }
        if self.is_keyword("goto") {
            self.bump();
            let label = self.expect_identifier()?;
            self.expect_symbol(";")?;
            return Ok(self.ast.push(NodeKind::Goto { label }, pos));
        }
        if let TokenKind::Identifier(name) = self.peek().kind.clone() {
            if matches!(self.peek_n(1).kind, TokenKind::Symbol(ref s) if s == ":") {
                self.bump();
                self.bump();
                return Ok(self.ast.push(NodeKind::Label { name }, pos));
            }
        }
        if self.is_type_keyword() {
            let mut datatype = self.parse_type()?;
            let name = self.expect_identifier()?;
            self.parse_array_brackets(&mut datatype)?;
            let initializer = if self.is_symbol("=") {
                self.bump();
                self.parse_expr()?
            } else {
                NodeId::NONE
            };
            self.expect_symbol(";")?;
            return Ok(self.ast.push(NodeKind::VarDecl { name, datatype, initializer }, pos));
        }

        let expr = self.parse_expr()?;
        self.expect_symbol(";")?;
        Ok(self.ast.push(NodeKind::ExpressionStatement { expr }, pos))
    }

    fn parse_expr(&mut self) -> Result<NodeId, CompileError> {
        let pos = self.peek().pos.clone();
        let condition = {
            let mut client = ParserExprClient { parser: self };
            expr_engine::parse_expression(&mut client, None)?
        };
        if !self.is_symbol("?") {
            return Ok(condition);
        }
        self.bump();
        let then_branch = self.parse_expr()?;
        self.expect_symbol(":")?;
        let else_branch = self.parse_expr()?;
        Ok(self.ast.push(NodeKind::Ternary { condition, then_branch, else_branch }, pos))
    }

    fn parse_unary_or_primary(&mut self) -> Result<NodeId, CompileError> {
        let pos = self.peek().pos.clone();

        if self.is_symbol("*") {
            self.bump();
            let operand = self.parse_unary_or_primary()?;
            return Ok(self.ast.push(NodeKind::Unary { op: UnaryOp::Indirection, operand }, pos));
        }
        if self.is_symbol("&") {
            self.bump();
            let operand = self.parse_unary_or_primary()?;
            return Ok(self.ast.push(NodeKind::Unary { op: UnaryOp::AddressOf, operand }, pos));
        }
        if self.is_symbol("-") {
            self.bump();
            let operand = self.parse_unary_or_primary()?;
            return Ok(self.ast.push(NodeKind::Unary { op: UnaryOp::Negate, operand }, pos));
        }
        if self.is_symbol("!") {
            self.bump();
            let operand = self.parse_unary_or_primary()?;
            return Ok(self.ast.push(NodeKind::Unary { op: UnaryOp::LogicalNot, operand }, pos));
        }
        if self.is_symbol("~") {
            self.bump();
            let operand = self.parse_unary_or_primary()?;
            return Ok(self.ast.push(NodeKind::Unary { op: UnaryOp::BitNot, operand }, pos));
        }
        if self.is_symbol("(") {
            // Disambiguate a cast `(type) expr` from a parenthesized
            // expression by checking whether a type keyword follows.
            if matches!(&self.peek_n(1).kind, TokenKind::Keyword(k) if matches!(
                k.as_str(), "void" | "char" | "short" | "int" | "long" | "struct" | "union" | "unsigned" | "signed"
            )) {
                self.bump();
                let target = self.parse_type()?;
                self.expect_symbol(")")?;
                let operand = self.parse_unary_or_primary()?;
                return Ok(self.ast.push(NodeKind::Cast { target, operand }, pos));
            }
            self.bump();
            let inner = self.parse_expr()?;
            self.expect_symbol(")")?;
            return self.parse_postfix(inner);
        }

        let primary = match self.bump().kind {
            TokenKind::IntegerLiteral(v) => self.ast.push(NodeKind::IntLiteral(v), pos.clone()),
            TokenKind::StringLiteral(s) => self.ast.push(NodeKind::StringLiteral(s), pos.clone()),
            TokenKind::CharLiteral(c) => self.ast.push(NodeKind::IntLiteral(c as i64), pos.clone()),
            TokenKind::Identifier(name) => self.ast.push(NodeKind::Identifier(name), pos.clone()),
            other => {
                return Err(CompileError::parse(
                    format!("unexpected token {other:?} in expression"),
                    pos,
                ));
            }
        };
        self.parse_postfix(primary)
    }

    /// Handles `()`, `[]`, `.`, `->` chained onto a primary — the
    /// postfix precedence group, highest priority in the engine's table.
    fn parse_postfix(&mut self, mut node: NodeId) -> Result<NodeId, CompileError> {
        loop {
            let pos = self.peek().pos.clone();
            if self.is_symbol("(") {
                self.bump();
                let mut args = Vec::new();
                while !self.is_symbol(")") {
                    args.push(self.parse_expr()?);
                    if self.is_symbol(",") {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect_symbol(")")?;
                node = self.ast.push(NodeKind::FunctionCall { callee: node, args }, pos);
            } else if self.is_symbol("[") {
                self.bump();
                let index = self.parse_expr()?;
                self.expect_symbol("]")?;
                node = self.ast.push(NodeKind::ArrayAccess { target: node, index }, pos);
            } else if self.is_symbol(".") {
                self.bump();
                let field = self.expect_identifier()?;
                node = self.ast.push(NodeKind::FieldAccess { target: node, field, arrow: false }, pos);
            } else if self.is_symbol("->") {
                self.bump();
                let field = self.expect_identifier()?;
                node = self.ast.push(NodeKind::FieldAccess { target: node, field, arrow: true }, pos);
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn binary_op_for(sym: &str) -> Option<BinaryOp> {
        Some(match sym {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "&&" => BinaryOp::LogicalAnd,
            "||" => BinaryOp::LogicalOr,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "=" => BinaryOp::Assign,
            "," => BinaryOp::Comma,
            _ => return None,
        })
    }
}

struct ParserExprClient<'p, 'a> {
    parser: &'p mut Parser<'a>,
}

const BINARY_OPERATOR_SYMBOLS: &[&str] = &[
    "+", "-", "*", "/", "%", "<", ">", "<=", ">=", "==", "!=", "&&", "||", "&", "|", "^", "<<",
    ">>", "=", ",",
];

impl<'p, 'a> ExpressionClient<NodeId> for ParserExprClient<'p, 'a> {
    fn parse_single(&mut self) -> Result<NodeId, CompileError> {
        self.parser.parse_unary_or_primary()
    }

    fn make_binary(&mut self, op: &str, left: NodeId, right: NodeId) -> Result<NodeId, CompileError> {
        let binop = Parser::binary_op_for(op)
            .ok_or_else(|| CompileError::parse(format!("unknown operator '{op}'"), Position::default()))?;
        let pos = self.parser.ast.get(left).pos.clone();
        Ok(self.parser.ast.push(NodeKind::Binary { op: binop, left, right }, pos))
    }

    fn peek_operator(&mut self) -> Option<String> {
        match &self.parser.peek().kind {
            TokenKind::Symbol(s) if BINARY_OPERATOR_SYMBOLS.contains(&s.as_str()) => Some(s.clone()),
            _ => None,
        }
    }

    fn consume_operator(&mut self) -> Result<String, CompileError> {
        match self.parser.bump().kind {
            TokenKind::Symbol(s) => Ok(s),
            other => Err(CompileError::parse(format!("expected operator, found {other:?}"), Position::default())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> Parser<'static> {
        let tokens: Vec<Token> = Lexer::new(src, "t.c").tokenize_all().unwrap();
        let leaked: &'static [Token] = Box::leak(tokens.into_boxed_slice());
        let mut parser = Parser::new(leaked);
        parser.parse_program().unwrap();
        parser
    }

    #[test]
    fn parses_simple_function() {
        let parser = parse("int main() { return 0; }");
        assert_eq!(parser.ast.top_level.len(), 1);
        match &parser.ast.get(parser.ast.top_level[0]).kind {
            NodeKind::FunctionDef { name, .. } => assert_eq!(name, "main"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_pointer_field_access_precedence() {
        let parser = parse("int main() { return a->b[i].c; }");
        let func = &parser.ast.top_level[0];
        match &parser.ast.get(*func).kind {
            NodeKind::FunctionDef { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_struct_with_fields() {
        let parser = parse("struct point { int x; int y; };");
        match &parser.ast.get(parser.ast.top_level[0]).kind {
            NodeKind::StructDef { fields, .. } => assert_eq!(fields.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition_in_parser() {
        let parser = parse("int main() { return 2 + 3 * 4; }");
        let func_id = parser.ast.top_level[0];
        let NodeKind::FunctionDef { body, .. } = &parser.ast.get(func_id).kind else { panic!() };
        let NodeKind::Block { statements } = &parser.ast.get(*body).kind else { panic!() };
        let NodeKind::Return { value } = &parser.ast.get(statements[0]).kind else { panic!() };
        let NodeKind::Binary { op, .. } = &parser.ast.get(*value).kind else { panic!() };
        assert_eq!(*op, BinaryOp::Add);
    }

    #[test]
    fn varargs_function_parses_ellipsis() {
        let parser = parse("int sum(int count, ...) { return 0; }");
        match &parser.ast.get(parser.ast.top_level[0]).kind {
            NodeKind::FunctionDef { is_variadic, .. } => assert!(*is_variadic),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn top_level_declaration_without_parens_is_a_var_decl() {
        let parser = parse("int counter;");
        match &parser.ast.get(parser.ast.top_level[0]).kind {
            NodeKind::VarDecl { name, initializer, .. } => {
                assert_eq!(name, "counter");
                assert!(initializer.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ternary_expression_parses_into_ternary_node() {
        let parser = parse("int main() { return a ? b : c; }");
        let func_id = parser.ast.top_level[0];
        let NodeKind::FunctionDef { body, .. } = &parser.ast.get(func_id).kind else { panic!() };
        let NodeKind::Block { statements } = &parser.ast.get(*body).kind else { panic!() };
        let NodeKind::Return { value } = &parser.ast.get(statements[0]).kind else { panic!() };
        match &parser.ast.get(*value).kind {
            NodeKind::Ternary { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn switch_with_case_and_default_parses() {
        let parser = parse("int main() { switch (a) { case 1: break; default: break; } return 0; }");
        let func_id = parser.ast.top_level[0];
        let NodeKind::FunctionDef { body, .. } = &parser.ast.get(func_id).kind else { panic!() };
        let NodeKind::Block { statements } = &parser.ast.get(*body).kind else { panic!() };
        let NodeKind::Switch { body, .. } = &parser.ast.get(statements[0]).kind else {
            panic!("expected switch statement")
        };
        let NodeKind::Block { statements: inner } = &parser.ast.get(*body).kind else { panic!() };
        assert!(matches!(parser.ast.get(inner[0]).kind, NodeKind::Case { .. }));
        assert!(matches!(parser.ast.get(inner[2]).kind, NodeKind::Default));
    }

    #[test]
    fn array_declarator_brackets_attach_to_datatype() {
        let parser = parse("int main() { int values[4]; return 0; }");
        let func_id = parser.ast.top_level[0];
        let NodeKind::FunctionDef { body, .. } = &parser.ast.get(func_id).kind else { panic!() };
        let NodeKind::Block { statements } = &parser.ast.get(*body).kind else { panic!() };
        let NodeKind::VarDecl { datatype, .. } = &parser.ast.get(statements[0]).kind else { panic!() };
        assert_eq!(datatype.brackets.len(), 1);
    }
}
