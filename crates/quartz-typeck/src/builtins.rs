//! Built-in classes and primitive methods.
//!
//! Registers the builtin class tree into the symbol table and answers
//! which primitive overloads a concrete receiver type has. Primitives take
//! part in overload resolution exactly like user definitions, but their
//! return types are fixed instead of inferred from a body.

use crate::classes::{ClassId, ClassKind, SymbolTable};
use crate::error::DiagnosticKind;
use crate::overload::Signature;
use crate::ty::{Ty, TyCon};

/// The builtin root classes every program starts with.
pub struct Roots {
    pub object: ClassId,
    pub value: ClassId,
}

/// Register all builtin classes, parents first.
///
/// After this call the table contains:
/// - `Object`, the reference root, and `Value < Object`, the value root
/// - `Int`, `Double`, `Char`, `Bool`, `Nil` (all `< Value`)
/// - `String` and `Class` (both `< Object`)
/// - the generic `Pointer(T) < Value`
pub fn register_builtins(table: &mut SymbolTable) -> Roots {
    let object = table.add_builtin("Object", None, ClassKind::Reference, &[]);
    let value = table.add_builtin("Value", Some("Object"), ClassKind::Value, &[]);

    for name in ["Int", "Double", "Char", "Bool", "Nil"] {
        table.add_builtin(name, Some("Value"), ClassKind::Value, &[]);
    }
    table.add_builtin("String", Some("Object"), ClassKind::Reference, &[]);
    table.add_builtin("Class", Some("Object"), ClassKind::Reference, &[]);
    table.add_builtin("Pointer", Some("Value"), ClassKind::Value, &["T"]);

    Roots { object, value }
}

/// One primitive overload: fixed parameter types and return type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Primitive {
    pub params: Vec<Ty>,
    pub ret: Ty,
}

impl Primitive {
    fn new(params: Vec<Ty>, ret: Ty) -> Self {
        Primitive { params, ret }
    }

    pub fn signature(&self) -> Signature {
        Signature::exact(self.params.iter().cloned().map(Some).collect())
    }
}

// ── Instance primitives ────────────────────────────────────────────────

/// Primitive overloads of `name` on instances of `receiver`.
pub fn primitives(receiver: &TyCon, name: &str) -> Vec<Primitive> {
    match receiver.name.as_str() {
        "Int" => int_primitive(name),
        "Double" => double_primitive(name),
        "Char" => match name {
            "ord" => vec![Primitive::new(vec![], Ty::int())],
            "==" => vec![Primitive::new(vec![Ty::char()], Ty::bool())],
            _ => Vec::new(),
        },
        "Bool" => match name {
            "==" => vec![Primitive::new(vec![Ty::bool()], Ty::bool())],
            _ => Vec::new(),
        },
        "Pointer" => pointer_primitive(receiver, name),
        _ => Vec::new(),
    }
}

fn is_arithmetic(name: &str) -> bool {
    matches!(name, "+" | "-" | "*" | "/")
}

fn is_comparison(name: &str) -> bool {
    matches!(name, "<" | "<=" | ">" | ">=" | "==")
}

fn int_primitive(name: &str) -> Vec<Primitive> {
    match name {
        n if is_arithmetic(n) => vec![
            Primitive::new(vec![Ty::int()], Ty::int()),
            Primitive::new(vec![Ty::double()], Ty::double()),
        ],
        n if is_comparison(n) => vec![
            Primitive::new(vec![Ty::int()], Ty::bool()),
            Primitive::new(vec![Ty::double()], Ty::bool()),
        ],
        "to_i" => vec![Primitive::new(vec![], Ty::int())],
        "to_d" => vec![Primitive::new(vec![], Ty::double())],
        "chr" => vec![Primitive::new(vec![], Ty::char())],
        _ => Vec::new(),
    }
}

fn double_primitive(name: &str) -> Vec<Primitive> {
    match name {
        n if is_arithmetic(n) => vec![
            Primitive::new(vec![Ty::int()], Ty::double()),
            Primitive::new(vec![Ty::double()], Ty::double()),
        ],
        n if is_comparison(n) => vec![
            Primitive::new(vec![Ty::int()], Ty::bool()),
            Primitive::new(vec![Ty::double()], Ty::bool()),
        ],
        "to_i" => vec![Primitive::new(vec![], Ty::int())],
        "to_d" => vec![Primitive::new(vec![], Ty::double())],
        _ => Vec::new(),
    }
}

fn pointer_primitive(receiver: &TyCon, name: &str) -> Vec<Primitive> {
    let Some(element) = receiver.args.first().cloned() else {
        return Vec::new();
    };
    let this = Ty::Con(receiver.clone());
    match name {
        "value" => vec![Primitive::new(vec![], element)],
        "value=" => vec![Primitive::new(vec![element.clone()], element)],
        "+" | "realloc" => vec![Primitive::new(vec![Ty::int()], this)],
        _ => Vec::new(),
    }
}

// ── Class primitives ───────────────────────────────────────────────────

/// `Pointer(T).malloc(size)`: allocate `size` elements of `T`.
///
/// The element type must be bound; a bare `Pointer.malloc` is rejected.
pub fn pointer_malloc(class: &TyCon) -> Result<Primitive, DiagnosticKind> {
    match class.args.first() {
        Some(element) => Ok(Primitive::new(
            vec![Ty::int()],
            Ty::pointer(element.clone()),
        )),
        None => Err(DiagnosticKind::GenericArgumentRequired {
            class: class.name.clone(),
            method: "malloc".to_string(),
        }),
    }
}
