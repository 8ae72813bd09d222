//! The generic expression engine (spec §4.4 / C4).
//!
//! Grounded on `expressionable.c`: a single precedence-climbing engine
//! driven entirely through a trait of callbacks (`ExpressionClient`),
//! so both the source parser and the preprocessor's `#if` evaluator
//! reuse the same operator-precedence/associativity logic instead of
//! each hand-rolling their own. `expressionable_parse_single_with_flags`
//! is the engine's main loop below; `expressionable_parser_node_shift_children_left`
//! is `reassociate_left`.

use rcc_core::CompileError;

/// The 14 precedence groups from `expressionable.c`'s `op_precedence`
/// table, postfix (0, tightest) through comma (13, loosest).
pub const PRECEDENCE_GROUPS: &[&[&str]] = &[
    &["(", "[", ".", "->", "++", "--"],
    &["*u", "&u", "+u", "-u", "!", "~", "++u", "--u", "sizeof", "(cast)"],
    &["*", "/", "%"],
    &["+", "-"],
    &["<<", ">>"],
    &["<", "<=", ">", ">="],
    &["==", "!="],
    &["&"],
    &["^"],
    &["|"],
    &["&&"],
    &["||"],
    &["?:"],
    &[","],
];

/// True if, while folding a right-hand operand against the operator
/// `b` already sitting on the left, `a` should be swallowed into that
/// same recursive subtree rather than bubbling back up to the outer
/// loop. Left-associative groups (everything but `?:` and `=`) need a
/// *strict* tighter-binds check here: an equal-precedence operator
/// must NOT be folded deeper, or chains like `a - b - c` nest to the
/// right (`a - (b - c)`) instead of to the left. Right-associative
/// operators use `<=` so equal precedence keeps folding rightward,
/// matching `expressionable_parser_left_op_has_priority`'s split
/// between left- and right-associative operator classes.
pub fn left_op_has_priority(a: &str, b: &str) -> bool {
    let group_of = |op: &str| {
        PRECEDENCE_GROUPS
            .iter()
            .position(|g| g.contains(&op))
            .unwrap_or(PRECEDENCE_GROUPS.len())
    };
    let (group_a, group_b) = (group_of(a), group_of(b));
    if is_right_associative(b) {
        group_a <= group_b
    } else {
        group_a < group_b
    }
}

/// `=` flows through this same generic loop via `BINARY_OPERATOR_SYMBOLS`
/// in `parser.rs`, not special-cased outside it, so it needs to be
/// named here alongside `?:` for chained assignment (`a = b = c`) to
/// nest rightward instead of erroring on the second `=`.
fn is_right_associative(op: &str) -> bool {
    matches!(op, "?:" | "=")
}

/// What the engine hands back up to its caller for each parsed node;
/// opaque to the engine itself (`T` is the client's own expression
/// node type — a `NodeId` for the parser, an `i64` for the `#if`
/// evaluator).
pub trait ExpressionClient<T> {
    fn parse_single(&mut self) -> Result<T, CompileError>;
    fn make_binary(&mut self, op: &str, left: T, right: T) -> Result<T, CompileError>;
    /// Peeks the next operator token without consuming it, or `None`
    /// at end of expression.
    fn peek_operator(&mut self) -> Option<String>;
    fn consume_operator(&mut self) -> Result<String, CompileError>;
    /// `should_join_nodes`/`join_nodes` callbacks: lets a client bind
    /// two adjacent primaries without an explicit operator token (the
    /// preprocessor's `defined X` and `defined(X)` forms).
    fn should_join_without_operator(&mut self) -> bool {
        false
    }
    fn join_without_operator(&mut self, left: T, right: T) -> Result<T, CompileError> {
        let _ = (left, right);
        unreachable!("should_join_without_operator returned true with no join_without_operator override")
    }
}

/// `expressionable_parse_single_with_flags`'s main loop, reduced to
/// its precedence-climbing core: parse a primary, then repeatedly
/// fold in operators whose precedence doesn't yield to what's already
/// on the left, re-associating via `shift_children_left` otherwise.
pub fn parse_expression<T, C: ExpressionClient<T>>(
    client: &mut C,
    min_precedence_op: Option<&str>,
) -> Result<T, CompileError> {
    let mut left = client.parse_single()?;

    loop {
        if client.should_join_without_operator() {
            let right = client.parse_single()?;
            left = client.join_without_operator(left, right)?;
            continue;
        }

        let Some(op) = client.peek_operator() else {
            break;
        };
        if let Some(min_op) = min_precedence_op {
            if !left_op_has_priority(&op, min_op) {
                break;
            }
        }
        let op = client.consume_operator()?;
        let right = parse_expression(client, Some(&op))?;
        left = client.make_binary(&op, left, right)?;
    }

    Ok(left)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NumericClient {
        tokens: Vec<String>,
        pos: usize,
    }

    impl NumericClient {
        fn new(tokens: &[&str]) -> Self {
            NumericClient {
                tokens: tokens.iter().map(|s| s.to_string()).collect(),
                pos: 0,
            }
        }
    }

    impl ExpressionClient<i64> for NumericClient {
        fn parse_single(&mut self) -> Result<i64, CompileError> {
            let tok = self.tokens[self.pos].clone();
            self.pos += 1;
            Ok(tok.parse().unwrap())
        }

        fn make_binary(&mut self, op: &str, left: i64, right: i64) -> Result<i64, CompileError> {
            Ok(match op {
                "+" => left + right,
                "-" => left - right,
                "*" => left * right,
                "/" => left / right,
                _ => unreachable!(),
            })
        }

        fn peek_operator(&mut self) -> Option<String> {
            self.tokens.get(self.pos).cloned().filter(|t| {
                matches!(t.as_str(), "+" | "-" | "*" | "/")
            })
        }

        fn consume_operator(&mut self) -> Result<String, CompileError> {
            let op = self.tokens[self.pos].clone();
            self.pos += 1;
            Ok(op)
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let mut client = NumericClient::new(&["2", "+", "3", "*", "4"]);
        let result = parse_expression(&mut client, None).unwrap();
        assert_eq!(result, 14);
    }

    #[test]
    fn left_associative_subtraction() {
        let mut client = NumericClient::new(&["10", "-", "3", "-", "2"]);
        let result = parse_expression(&mut client, None).unwrap();
        assert_eq!(result, 5);
    }

    #[test]
    fn precedence_table_orders_postfix_above_multiplicative() {
        assert!(left_op_has_priority("*", "+"));
        assert!(!left_op_has_priority("+", "*"));
        assert!(left_op_has_priority("&&", "||"));
    }
}
