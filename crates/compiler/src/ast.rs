//! The AST model (spec §4.2 / C2).
//!
//! Grounded on `compiler.h`'s `struct node` tagged union and its
//! `NODE_TYPE_*` enum. Nodes are arena-allocated in a `bumpalo::Bump`
//! owned by the compile process, and referenced elsewhere by index
//! into a flat `Vec<Node>` rather than by raw pointer, so the resolver
//! and code generator never juggle lifetimes tied to the arena.

use rcc_core::Datatype;

/// An index into the owning `Ast`'s node vector. `NONE` is reserved
/// for "no node" in optional fields, matching the original's `NULL`
/// node pointers without introducing `Option` noise at every call
/// site in the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const NONE: NodeId = NodeId(usize::MAX);

    pub fn is_none(self) -> bool {
        self == NodeId::NONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    LogicalAnd,
    LogicalOr,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Assign,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    BitNot,
    Indirection,
    AddressOf,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub name: String,
    pub datatype: Datatype,
}

#[derive(Debug, Clone)]
pub struct FunctionArg {
    pub name: String,
    pub datatype: Datatype,
}

/// The node kinds named across spec.md's C2/C5 descriptions plus the
/// `goto`/label pair required by the fixup system (C8).
#[derive(Debug, Clone)]
pub enum NodeKind {
    IntLiteral(i64),
    StringLiteral(String),
    Identifier(String),

    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Cast {
        target: Datatype,
        operand: NodeId,
    },
    /// `a.b` / `a->b` field access. `arrow` distinguishes the two for
    /// the resolver's `DO_INDIRECTION` rule on the right operand.
    FieldAccess {
        target: NodeId,
        field: String,
        arrow: bool,
    },
    ArrayAccess {
        target: NodeId,
        index: NodeId,
    },
    FunctionCall {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    /// `cond ? then : else`. Parsed as a wrapper around `parse_expr`
    /// rather than through the binary operator engine, since `?:` is
    /// ternary, not a binary op; right-associative via recursion on
    /// the else-branch (`a ? b : c ? d : e` groups as `a ? b : (c ? d : e)`).
    Ternary {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },

    VarDecl {
        name: String,
        datatype: Datatype,
        initializer: NodeId,
    },
    FunctionDef {
        name: String,
        return_type: Datatype,
        args: Vec<FunctionArg>,
        is_variadic: bool,
        body: NodeId,
        is_forward_declaration: bool,
    },
    StructDef {
        name: Option<String>,
        is_union: bool,
        fields: Vec<StructField>,
        is_forward_declaration: bool,
    },
    TypedefDef {
        alias: String,
        underlying: Datatype,
    },

    Block {
        statements: Vec<NodeId>,
    },
    Return {
        value: NodeId,
    },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    DoWhile {
        condition: NodeId,
        body: NodeId,
    },
    For {
        init: NodeId,
        condition: NodeId,
        step: NodeId,
        body: NodeId,
    },
    Break,
    Continue,
    Goto {
        label: String,
    },
    Label {
        name: String,
    },
    /// `switch (discriminant) body`. `body` is typically a `Block`;
    /// its direct statements are scanned for `Case`/`Default` markers
    /// to build the dispatch chain, the same flat-label treatment C
    /// itself gives a switch body.
    Switch {
        discriminant: NodeId,
        body: NodeId,
    },
    /// `case value:` — a label-like statement, only meaningful as a
    /// direct statement inside a `Switch`'s body.
    Case {
        value: NodeId,
    },
    /// `default:` — ditto, the no-match fallback label.
    Default,
    ExpressionStatement {
        expr: NodeId,
    },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub pos: rcc_core::Position,
    /// Set by the resolver once an expression node's type is known;
    /// `None` until then (statements and declarations never need this).
    pub resolved_type: Option<Datatype>,
}

/// The whole translation unit's AST, flat-indexed by `NodeId` rather
/// than built from owned `Box` children, so the resolver can hold
/// `NodeId` references across passes without borrow-checker fights.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    pub top_level: Vec<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub fn push(&mut self, kind: NodeKind, pos: rcc_core::Position) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            pos,
            resolved_type: None,
        });
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
