//! Expression nodes.
//!
//! Every construct of the language is an expression; declarations live in
//! [`crate::item`] because they are only accepted at the top level and
//! inside class bodies.

use quartz_common::Location;

use crate::NodeId;

/// An expression node with its identity and source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub loc: Location,
    pub kind: ExprKind,
}

impl Expr {
    /// Wrap a kind into a node with no position yet.
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            id: NodeId::UNASSIGNED,
            loc: Location::unknown(),
            kind,
        }
    }

    /// Place this node at a 1-based line and column of the enclosing file.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = Location::new("", line, column);
        self
    }

    /// Whether this node is a plain variable reference that can be written
    /// back to (a local or an instance variable).
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, ExprKind::Ident(_) | ExprKind::Ivar(_))
    }
}

/// The shape of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    Char(char),
    Str(String),
    /// A bare identifier: either a local variable read or a zero-argument
    /// call, decided during name resolution.
    Ident(String),
    /// An instance-variable read, `@name` (stored without the sigil).
    Ivar(String),
    Assign {
        target: Target,
        value: Box<Expr>,
    },
    /// Compound assignment `target op= value`.
    OpAssign {
        target: Target,
        op: String,
        value: Box<Expr>,
    },
    Call(Call),
    /// A constant reference such as `Foo` or `Pointer(Int)`.
    Path(TypeRef),
    /// An `out` argument marker, only meaningful for external calls.
    Out(Target),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    If {
        cond: Box<Expr>,
        then_body: Vec<Expr>,
        else_body: Vec<Expr>,
    },
    While {
        cond: Box<Expr>,
        body: Vec<Expr>,
    },
    Break,
    Next,
}

/// A method call, `receiver.name(args) { block }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// `None` means an implicit self (or top-level) receiver.
    pub receiver: Option<Box<Expr>>,
    pub name: String,
    pub args: Vec<Expr>,
    pub block: Option<Block>,
    /// Written with parentheses, `foo()`, as opposed to a bare `foo`.
    pub parens: bool,
}

/// A literal block attached to a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub params: Vec<String>,
    pub body: Vec<Expr>,
}

/// Something that can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local(String),
    Ivar(String),
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Local(name) | Target::Ivar(name) => name,
        }
    }
}

/// A written type: a constant name with optional generic arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TypeRef>,
    pub loc: Location,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef {
            name: name.into(),
            args: Vec::new(),
            loc: Location::unknown(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef {
            name: name.into(),
            args,
            loc: Location::unknown(),
        }
    }
}
