//! Macro table: `#define`/`#undef` object-like and function-like macros.
//!
//! Grounded on `preprocessor/` in the original (object vs. function
//! macros, parameter substitution) and spec §4 supplemented features
//! (`#undef` is tolerant of an undefined name).

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum MacroDef {
    Object { replacement: Vec<String> },
    Function { params: Vec<String>, replacement: Vec<String> },
}

#[derive(Debug, Default, Clone)]
pub struct MacroTable {
    macros: HashMap<String, MacroDef>,
}

impl MacroTable {
    pub fn new() -> Self {
        MacroTable::default()
    }

    pub fn define(&mut self, name: impl Into<String>, def: MacroDef) {
        self.macros.insert(name.into(), def);
    }

    /// `#undef NAME`: removes if present, silently no-ops otherwise.
    pub fn undef(&mut self, name: &str) {
        self.macros.remove(name);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.macros.get(name)
    }

    /// Expands a function-like macro call's argument tokens into the
    /// replacement list textually, substituting each parameter
    /// occurrence with its corresponding argument's token text.
    pub fn expand_function(
        params: &[String],
        replacement: &[String],
        args: &[Vec<String>],
    ) -> Vec<String> {
        let mut out = Vec::new();
        for tok in replacement {
            if let Some(idx) = params.iter().position(|p| p == tok) {
                if let Some(arg_tokens) = args.get(idx) {
                    out.extend(arg_tokens.iter().cloned());
                    continue;
                }
            }
            out.push(tok.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_macro_round_trips() {
        let mut table = MacroTable::new();
        table.define(
            "MAX_LEN",
            MacroDef::Object {
                replacement: vec!["256".to_string()],
            },
        );
        assert!(table.is_defined("MAX_LEN"));
        table.undef("MAX_LEN");
        assert!(!table.is_defined("MAX_LEN"));
    }

    #[test]
    fn undef_of_unknown_name_is_not_an_error() {
        let mut table = MacroTable::new();
        table.undef("NEVER_DEFINED");
    }

    #[test]
    fn function_macro_substitutes_parameter_tokens() {
        // SQ(x) ((x) * (x)) expanded for SQ(3 + 1)
        let params = vec!["x".to_string()];
        let replacement: Vec<String> = "( ( x ) * ( x ) )".split(' ').map(String::from).collect();
        let args = vec!["3".to_string(), "+".to_string(), "1".to_string()];
        let expanded = MacroTable::expand_function(&params, &replacement, &[args]);
        assert_eq!(
            expanded,
            vec!["(", "(", "3", "+", "1", ")", "*", "(", "3", "+", "1", ")", ")"]
        );
    }
}
