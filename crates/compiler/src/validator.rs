//! Semantic validation (C9, grounded on `validator.c`).
//!
//! `validate_symbol_unique` → duplicate-symbol checks at each scope
//! level; `validate_function_node` → register the function, open a
//! new scope, validate args then body, close the scope;
//! `validate_tree`/`validate` → the driver over every top-level node.
//! Structs/unions with `is_forward_declaration` register no symbol
//! until their body is seen (spec §4 supplemented feature).

use crate::ast::{Ast, NodeId, NodeKind};
use rcc_core::{CompileError, Datatype, Diagnostics, SymbolKind, SymbolTableStack};

pub struct Validator<'a> {
    ast: &'a Ast,
    symbols: SymbolTableStack,
    pub diagnostics: Diagnostics,
}

impl<'a> Validator<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        let mut symbols = SymbolTableStack::new();
        symbols.push_table();
        symbols.register_native_functions();
        Validator {
            ast,
            symbols,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn validate(&mut self) -> Result<(), CompileError> {
        for &node_id in &self.ast.top_level.clone() {
            self.validate_top_level(node_id)?;
        }
        Ok(())
    }

    fn validate_top_level(&mut self, node_id: NodeId) -> Result<(), CompileError> {
        let node = self.ast.get(node_id);
        let pos = node.pos.clone();
        match &node.kind {
            NodeKind::FunctionDef {
                name,
                return_type,
                args,
                body,
                is_forward_declaration,
                ..
            } => {
                self.validate_symbol_unique(name, &pos)?;
                self.symbols.register(rcc_core::Symbol {
                    name: name.clone(),
                    kind: SymbolKind::AstNode {
                        node_id: node_id.0,
                        datatype: return_type.clone(),
                    },
                })?;

                if *is_forward_declaration {
                    return Ok(());
                }

                self.symbols.push_table();
                for arg in args {
                    self.symbols
                        .register(rcc_core::Symbol {
                            name: arg.name.clone(),
                            kind: SymbolKind::AstNode {
                                node_id: node_id.0,
                                datatype: arg.datatype.clone(),
                            },
                        })
                        .map_err(|e| CompileError::validation(format!("duplicate parameter '{}'", e.0), Some(pos.clone())))?;
                }
                self.validate_statement(*body)?;
                self.symbols.pop_table();
                Ok(())
            }
            NodeKind::StructDef {
                name,
                is_forward_declaration,
                ..
            } => {
                if *is_forward_declaration {
                    return Ok(());
                }
                if let Some(name) = name {
                    self.validate_symbol_unique(name, &pos)?;
                    self.symbols.register(rcc_core::Symbol {
                        name: name.clone(),
                        kind: SymbolKind::AstNode {
                            node_id: node_id.0,
                            datatype: Datatype::new(rcc_core::PrimitiveKind::Struct),
                        },
                    })?;
                }
                Ok(())
            }
            NodeKind::TypedefDef { alias, underlying } => {
                self.validate_symbol_unique(alias, &pos)?;
                self.symbols.register(rcc_core::Symbol {
                    name: alias.clone(),
                    kind: SymbolKind::AstNode {
                        node_id: node_id.0,
                        datatype: underlying.clone(),
                    },
                })?;
                Ok(())
            }
            NodeKind::VarDecl { name, datatype, .. } => {
                self.validate_symbol_unique(name, &pos)?;
                self.symbols.register(rcc_core::Symbol {
                    name: name.clone(),
                    kind: SymbolKind::AstNode {
                        node_id: node_id.0,
                        datatype: datatype.clone(),
                    },
                })?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn validate_symbol_unique(&self, name: &str, pos: &rcc_core::Position) -> Result<(), CompileError> {
        if self.symbols.is_global_scope() && self.symbols.lookup(name).is_some() {
            return Err(CompileError::validation(
                format!("redefinition of '{name}'"),
                Some(pos.clone()),
            ));
        }
        Ok(())
    }

    fn validate_statement(&mut self, node_id: NodeId) -> Result<(), CompileError> {
        if node_id.is_none() {
            return Ok(());
        }
        let node = self.ast.get(node_id);
        let pos = node.pos.clone();
        match &node.kind {
            NodeKind::Block { statements } => {
                self.symbols.push_table();
                for &stmt in statements {
                    self.validate_statement(stmt)?;
                }
                self.symbols.pop_table();
                Ok(())
            }
            NodeKind::VarDecl { name, datatype, .. } => {
                self.symbols
                    .register(rcc_core::Symbol {
                        name: name.clone(),
                        kind: SymbolKind::AstNode {
                            node_id: node_id.0,
                            datatype: datatype.clone(),
                        },
                    })
                    .map_err(|e| CompileError::validation(format!("redeclaration of '{}'", e.0), Some(pos)))?;
                Ok(())
            }
            NodeKind::If { then_branch, else_branch, .. } => {
                self.validate_statement(*then_branch)?;
                self.validate_statement(*else_branch)?;
                Ok(())
            }
            NodeKind::While { body, .. } | NodeKind::DoWhile { body, .. } => self.validate_statement(*body),
            NodeKind::For { init, body, .. } => {
                self.symbols.push_table();
                self.validate_statement(*init)?;
                self.validate_statement(*body)?;
                self.symbols.pop_table();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, Token};
    use crate::parser::Parser;

    fn validate_source(src: &str) -> Result<(), CompileError> {
        let tokens: Vec<Token> = Lexer::new(src, "t.c").tokenize_all().unwrap();
        let mut parser = Parser::new(&tokens);
        parser.parse_program().unwrap();
        Validator::new(&parser.ast).validate()
    }

    #[test]
    fn duplicate_top_level_function_is_rejected() {
        let err = validate_source("int f() { return 0; } int f() { return 1; }");
        assert!(err.is_err());
    }

    #[test]
    fn forward_declared_struct_allows_later_pointer_use() {
        validate_source("struct node; struct node { struct node *next; };").unwrap();
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let err = validate_source("int f(int a, int a) { return 0; }");
        assert!(err.is_err());
    }

    #[test]
    fn block_scoped_redeclaration_is_rejected() {
        let err = validate_source("int f() { int x; int x; return 0; }");
        assert!(err.is_err());
    }

    #[test]
    fn nested_scope_shadowing_is_allowed() {
        validate_source("int f() { int x; { int x; } return 0; }").unwrap();
    }
}
