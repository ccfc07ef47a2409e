//! Declaration nodes: methods, classes and external libraries.

use quartz_common::Location;

use crate::expr::{Expr, TypeRef};

/// A top-level entry of a program.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Def(Def),
    Class(ClassDef),
    Lib(LibDef),
    Expr(Expr),
}

impl Item {
    pub fn loc(&self) -> &Location {
        match self {
            Item::Def(def) => &def.loc,
            Item::Class(class) => &class.loc,
            Item::Lib(lib) => &lib.loc,
            Item::Expr(expr) => &expr.loc,
        }
    }
}

impl From<Expr> for Item {
    fn from(expr: Expr) -> Self {
        Item::Expr(expr)
    }
}

impl From<Def> for Item {
    fn from(def: Def) -> Self {
        Item::Def(def)
    }
}

impl From<ClassDef> for Item {
    fn from(class: ClassDef) -> Self {
        Item::Class(class)
    }
}

impl From<LibDef> for Item {
    fn from(lib: LibDef) -> Self {
        Item::Lib(lib)
    }
}

/// A method definition, `def name(params) body end`.
#[derive(Debug, Clone, PartialEq)]
pub struct Def {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Expr>,
    pub loc: Location,
}

impl Def {
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = Location::new("", line, column);
        self
    }

    /// Number of parameters without a default value.
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }
}

/// A formal parameter with an optional type restriction and default.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub restriction: Option<TypeRef>,
    pub default: Option<Expr>,
}

/// `class Name < Super ... end` or `struct Name ... end`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub superclass: Option<TypeRef>,
    /// Declared with `struct`: instances are values, not references.
    pub is_struct: bool,
    pub body: Vec<Def>,
    pub loc: Location,
}

impl ClassDef {
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = Location::new("", line, column);
        self
    }
}

/// `lib Name ... end`: a block of natively implemented functions.
#[derive(Debug, Clone, PartialEq)]
pub struct LibDef {
    pub name: String,
    pub funs: Vec<FunDef>,
    pub loc: Location,
}

impl LibDef {
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = Location::new("", line, column);
        self
    }
}

/// `fun name(param : Type, ...) : Return`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunDef {
    pub name: String,
    pub params: Vec<FunParam>,
    pub ret: Option<TypeRef>,
    pub loc: Location,
}

/// A native function parameter. `out` parameters are written by the callee.
#[derive(Debug, Clone, PartialEq)]
pub struct FunParam {
    pub name: String,
    pub ty: TypeRef,
    pub out: bool,
}
