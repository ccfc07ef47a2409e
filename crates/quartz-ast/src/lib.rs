//! The parsed Quartz program tree.
//!
//! This crate is the boundary between the parser and the type checker. The
//! checker never sees source text: it consumes a [`Program`] whose nodes all
//! carry a [`Location`] and a [`NodeId`] that keys the checker's output
//! tables.
//!
//! - [`expr`]: expressions, calls, assignment targets and written types
//! - [`item`]: method, class and lib declarations
//! - [`build`]: constructor helpers (used by tests and macro expansion)

pub mod build;
pub mod expr;
pub mod item;

use std::sync::Arc;

use quartz_common::Location;

pub use expr::{Block, Call, Expr, ExprKind, Target, TypeRef};
pub use item::{ClassDef, Def, FunDef, FunParam, Item, LibDef, Param};

/// Identity of an expression node, unique within one [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id carried by nodes that have not been numbered by [`Program::new`].
    pub const UNASSIGNED: NodeId = NodeId(u32::MAX);
}

/// A whole source file: its name and top-level items in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub file: Arc<str>,
    pub items: Vec<Item>,
}

impl Program {
    /// Build a program, numbering every expression in pre-order and
    /// completing locations.
    ///
    /// Nodes placed with `at(line, column)` get `file` attached. Unplaced
    /// top-level items land on line `index + 1`, column 1; unplaced nested
    /// nodes inherit the position of their parent.
    pub fn new(file: impl Into<Arc<str>>, items: Vec<Item>) -> Self {
        let file = file.into();
        let mut numberer = Numberer {
            file: file.clone(),
            next: 0,
        };
        let mut items = items;
        for (index, item) in items.iter_mut().enumerate() {
            let fallback = Location::new(file.clone(), index as u32 + 1, 1);
            numberer.item(item, &fallback);
        }
        Program { file, items }
    }

    /// Number of expression nodes in the program.
    pub fn node_count(&self) -> u32 {
        let mut count = 0;
        for item in &self.items {
            match item {
                Item::Expr(expr) => count += count_expr(expr),
                Item::Def(def) => count += count_def(def),
                Item::Class(class) => count += class.body.iter().map(count_def).sum::<u32>(),
                Item::Lib(_) => {}
            }
        }
        count
    }
}

fn count_def(def: &Def) -> u32 {
    let defaults: u32 = def
        .params
        .iter()
        .filter_map(|p| p.default.as_ref())
        .map(count_expr)
        .sum();
    defaults + def.body.iter().map(count_expr).sum::<u32>()
}

fn count_expr(expr: &Expr) -> u32 {
    let mut count = 1;
    for_each_child(expr, &mut |child| count += count_expr(child));
    count
}

/// Visit the direct sub-expressions of `expr` in evaluation order.
pub fn for_each_child<'a>(expr: &'a Expr, f: &mut dyn FnMut(&'a Expr)) {
    match &expr.kind {
        ExprKind::Assign { value, .. } | ExprKind::OpAssign { value, .. } => f(value),
        ExprKind::Call(call) => {
            if let Some(receiver) = &call.receiver {
                f(receiver);
            }
            call.args.iter().for_each(&mut *f);
            if let Some(block) = &call.block {
                block.body.iter().for_each(&mut *f);
            }
        }
        ExprKind::Or(lhs, rhs) | ExprKind::And(lhs, rhs) => {
            f(lhs);
            f(rhs);
        }
        ExprKind::If {
            cond,
            then_body,
            else_body,
        } => {
            f(cond);
            then_body.iter().for_each(&mut *f);
            else_body.iter().for_each(&mut *f);
        }
        ExprKind::While { cond, body } => {
            f(cond);
            body.iter().for_each(&mut *f);
        }
        _ => {}
    }
}

struct Numberer {
    file: Arc<str>,
    next: u32,
}

impl Numberer {
    fn place(&self, loc: &mut Location, fallback: &Location) {
        if loc.is_known() {
            loc.file = self.file.clone();
        } else {
            *loc = fallback.clone();
        }
    }

    fn item(&mut self, item: &mut Item, fallback: &Location) {
        match item {
            Item::Expr(expr) => self.expr(expr, fallback),
            Item::Def(def) => self.def(def, fallback),
            Item::Class(class) => {
                self.place(&mut class.loc, fallback);
                if let Some(superclass) = &mut class.superclass {
                    self.type_ref(superclass, &class.loc);
                }
                let loc = class.loc.clone();
                for def in &mut class.body {
                    self.def(def, &loc);
                }
            }
            Item::Lib(lib) => {
                self.place(&mut lib.loc, fallback);
                let loc = lib.loc.clone();
                for fun in &mut lib.funs {
                    self.place(&mut fun.loc, &loc);
                    let fun_loc = fun.loc.clone();
                    for param in &mut fun.params {
                        self.type_ref(&mut param.ty, &fun_loc);
                    }
                    if let Some(ret) = &mut fun.ret {
                        self.type_ref(ret, &fun_loc);
                    }
                }
            }
        }
    }

    fn def(&mut self, def: &mut Def, fallback: &Location) {
        self.place(&mut def.loc, fallback);
        let loc = def.loc.clone();
        for param in &mut def.params {
            if let Some(restriction) = &mut param.restriction {
                self.type_ref(restriction, &loc);
            }
            if let Some(default) = &mut param.default {
                self.expr(default, &loc);
            }
        }
        for expr in &mut def.body {
            self.expr(expr, &loc);
        }
    }

    fn type_ref(&mut self, ty: &mut TypeRef, fallback: &Location) {
        self.place(&mut ty.loc, fallback);
        let loc = ty.loc.clone();
        for arg in &mut ty.args {
            self.type_ref(arg, &loc);
        }
    }

    fn exprs(&mut self, exprs: &mut [Expr], fallback: &Location) {
        for expr in exprs {
            self.expr(expr, fallback);
        }
    }

    fn expr(&mut self, expr: &mut Expr, fallback: &Location) {
        self.place(&mut expr.loc, fallback);
        expr.id = NodeId(self.next);
        self.next += 1;
        let loc = expr.loc.clone();
        match &mut expr.kind {
            ExprKind::Assign { value, .. } | ExprKind::OpAssign { value, .. } => {
                self.expr(value, &loc)
            }
            ExprKind::Call(call) => {
                if let Some(receiver) = &mut call.receiver {
                    self.expr(receiver, &loc);
                }
                self.exprs(&mut call.args, &loc);
                if let Some(block) = &mut call.block {
                    self.exprs(&mut block.body, &loc);
                }
            }
            ExprKind::Path(ty) => self.type_ref(ty, &loc),
            ExprKind::Or(lhs, rhs) | ExprKind::And(lhs, rhs) => {
                self.expr(lhs, &loc);
                self.expr(rhs, &loc);
            }
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.expr(cond, &loc);
                self.exprs(then_body, &loc);
                self.exprs(else_body, &loc);
            }
            ExprKind::While { cond, body } => {
                self.expr(cond, &loc);
                self.exprs(body, &loc);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn numbering_is_preorder_and_unique() {
        let program = Program::new(
            "t.qz",
            vec![
                assign("a", int(1)).into(),
                binop(ident("a"), "+", int(2)).into(),
            ],
        );
        let Item::Expr(first) = &program.items[0] else {
            panic!("expected expression item");
        };
        assert_eq!(first.id, NodeId(0));
        let ExprKind::Assign { value, .. } = &first.kind else {
            panic!("expected assignment");
        };
        assert_eq!(value.id, NodeId(1));
        assert_eq!(program.node_count(), 5);
    }

    #[test]
    fn unplaced_items_get_line_per_item() {
        let program = Program::new("t.qz", vec![int(1).into(), int(2).at(7, 3).into()]);
        assert_eq!(program.items[0].loc(), &Location::new("t.qz", 1, 1));
        assert_eq!(program.items[1].loc(), &Location::new("t.qz", 7, 3));
    }

    #[test]
    fn nested_nodes_inherit_parent_position() {
        let program = Program::new("t.qz", vec![call("foo", vec![int(1)]).at(4, 2).into()]);
        let Item::Expr(expr) = &program.items[0] else {
            panic!("expected expression item");
        };
        let ExprKind::Call(call) = &expr.kind else {
            panic!("expected call");
        };
        assert_eq!(call.args[0].loc, Location::new("t.qz", 4, 2));
    }
}
