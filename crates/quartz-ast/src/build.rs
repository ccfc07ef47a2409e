//! Constructor helpers for program trees.
//!
//! The parser and the macro expander build nodes through these functions,
//! and so do the checker's tests. Positions are attached afterwards with the
//! `at(line, column)` methods; [`crate::Program::new`] fills in the rest.

use quartz_common::Location;

use crate::expr::{Block, Call, Expr, ExprKind, Target, TypeRef};
use crate::item::{ClassDef, Def, FunDef, FunParam, Item, LibDef, Param};
use crate::Program;

// ── Programs ───────────────────────────────────────────────────────────

/// A program in a file named `test.qz`.
pub fn program(items: Vec<Item>) -> Program {
    Program::new("test.qz", items)
}

// ── Literals ───────────────────────────────────────────────────────────

pub fn nil() -> Expr {
    Expr::new(ExprKind::Nil)
}

pub fn boolean(value: bool) -> Expr {
    Expr::new(ExprKind::Bool(value))
}

pub fn int(value: i64) -> Expr {
    Expr::new(ExprKind::Int(value))
}

pub fn double(value: f64) -> Expr {
    Expr::new(ExprKind::Double(value))
}

pub fn char(value: char) -> Expr {
    Expr::new(ExprKind::Char(value))
}

pub fn string(value: &str) -> Expr {
    Expr::new(ExprKind::Str(value.to_string()))
}

// ── Names and assignment ───────────────────────────────────────────────

pub fn ident(name: &str) -> Expr {
    Expr::new(ExprKind::Ident(name.to_string()))
}

pub fn ivar(name: &str) -> Expr {
    Expr::new(ExprKind::Ivar(name.to_string()))
}

pub fn assign(name: &str, value: Expr) -> Expr {
    Expr::new(ExprKind::Assign {
        target: Target::Local(name.to_string()),
        value: Box::new(value),
    })
}

pub fn assign_ivar(name: &str, value: Expr) -> Expr {
    Expr::new(ExprKind::Assign {
        target: Target::Ivar(name.to_string()),
        value: Box::new(value),
    })
}

/// `name op= value`, e.g. `op_assign("a", "+", int(1))` for `a += 1`.
pub fn op_assign(name: &str, op: &str, value: Expr) -> Expr {
    Expr::new(ExprKind::OpAssign {
        target: Target::Local(name.to_string()),
        op: op.to_string(),
        value: Box::new(value),
    })
}

pub fn out(name: &str) -> Expr {
    Expr::new(ExprKind::Out(Target::Local(name.to_string())))
}

pub fn out_ivar(name: &str) -> Expr {
    Expr::new(ExprKind::Out(Target::Ivar(name.to_string())))
}

// ── Calls ──────────────────────────────────────────────────────────────

/// `name(args)` with an implicit receiver.
pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call(Call {
        receiver: None,
        name: name.to_string(),
        args,
        block: None,
        parens: true,
    }))
}

/// `receiver.name(args)`.
pub fn call_on(receiver: Expr, name: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call(Call {
        receiver: Some(Box::new(receiver)),
        name: name.to_string(),
        args,
        block: None,
        parens: true,
    }))
}

/// `lhs op rhs`: an operator call on `lhs`.
pub fn binop(lhs: Expr, op: &str, rhs: Expr) -> Expr {
    let mut expr = call_on(lhs, op, vec![rhs]);
    if let ExprKind::Call(call) = &mut expr.kind {
        call.parens = false;
    }
    expr
}

/// `receiver.name = value`: a setter call.
pub fn set_on(receiver: Expr, name: &str, value: Expr) -> Expr {
    call_on(receiver, &format!("{name}="), vec![value])
}

/// Attach a literal block to a call expression.
///
/// Non-call expressions are returned unchanged.
pub fn with_block(mut expr: Expr, params: &[&str], body: Vec<Expr>) -> Expr {
    if let ExprKind::Call(call) = &mut expr.kind {
        call.block = Some(Block {
            params: params.iter().map(|p| p.to_string()).collect(),
            body,
        });
    }
    expr
}

// ── Constants and types ────────────────────────────────────────────────

pub fn ty(name: &str) -> TypeRef {
    TypeRef::new(name)
}

pub fn generic_ty(name: &str, args: Vec<TypeRef>) -> TypeRef {
    TypeRef::generic(name, args)
}

/// A constant reference, `Foo`.
pub fn path(name: &str) -> Expr {
    Expr::new(ExprKind::Path(TypeRef::new(name)))
}

/// A generic constant reference, `Pointer(Int)`.
pub fn generic_path(name: &str, args: Vec<TypeRef>) -> Expr {
    Expr::new(ExprKind::Path(TypeRef::generic(name, args)))
}

// ── Control flow ───────────────────────────────────────────────────────

pub fn or(lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Or(Box::new(lhs), Box::new(rhs)))
}

pub fn and(lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::And(Box::new(lhs), Box::new(rhs)))
}

pub fn if_else(cond: Expr, then_body: Vec<Expr>, else_body: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::If {
        cond: Box::new(cond),
        then_body,
        else_body,
    })
}

pub fn while_loop(cond: Expr, body: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::While {
        cond: Box::new(cond),
        body,
    })
}

pub fn break_() -> Expr {
    Expr::new(ExprKind::Break)
}

pub fn next_() -> Expr {
    Expr::new(ExprKind::Next)
}

// ── Declarations ───────────────────────────────────────────────────────

pub fn def(name: &str, params: Vec<Param>, body: Vec<Expr>) -> Def {
    Def {
        name: name.to_string(),
        params,
        body,
        loc: Location::unknown(),
    }
}

pub fn param(name: &str) -> Param {
    Param {
        name: name.to_string(),
        restriction: None,
        default: None,
    }
}

/// `name : Type`.
pub fn param_typed(name: &str, restriction: TypeRef) -> Param {
    Param {
        name: name.to_string(),
        restriction: Some(restriction),
        default: None,
    }
}

/// `name = default`.
pub fn param_default(name: &str, default: Expr) -> Param {
    Param {
        name: name.to_string(),
        restriction: None,
        default: Some(default),
    }
}

pub fn class(name: &str, superclass: Option<&str>, body: Vec<Def>) -> ClassDef {
    ClassDef {
        name: name.to_string(),
        superclass: superclass.map(TypeRef::new),
        is_struct: false,
        body,
        loc: Location::unknown(),
    }
}

pub fn struct_(name: &str, body: Vec<Def>) -> ClassDef {
    ClassDef {
        name: name.to_string(),
        superclass: None,
        is_struct: true,
        body,
        loc: Location::unknown(),
    }
}

/// Expand a read-write property into its getter and setter:
///
/// ```text
/// def value; @value; end
/// def value=(value); @value = value; end
/// ```
pub fn property(name: &str) -> Vec<Def> {
    vec![
        def(name, vec![], vec![ivar(name)]),
        def(
            &format!("{name}="),
            vec![param(name)],
            vec![assign_ivar(name, ident(name))],
        ),
    ]
}

pub fn lib(name: &str, funs: Vec<FunDef>) -> LibDef {
    LibDef {
        name: name.to_string(),
        funs,
        loc: Location::unknown(),
    }
}

pub fn fun(name: &str, params: Vec<FunParam>, ret: Option<TypeRef>) -> FunDef {
    FunDef {
        name: name.to_string(),
        params,
        ret,
        loc: Location::unknown(),
    }
}

/// A by-value native parameter, `name : Type`.
pub fn fun_param(name: &str, ty: TypeRef) -> FunParam {
    FunParam {
        name: name.to_string(),
        ty,
        out: false,
    }
}

/// An `out` native parameter, `name : out Type`.
pub fn fun_out(name: &str, ty: TypeRef) -> FunParam {
    FunParam {
        name: name.to_string(),
        ty,
        out: true,
    }
}
