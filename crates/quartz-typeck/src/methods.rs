//! The method registry.
//!
//! Every `def` is registered under its owner (a class or the top level)
//! and name, in declaration order. Overloads sharing a name are separate
//! entries distinguished by their [`Signature`]; redefining a method with
//! the same signature in the same owner replaces the earlier definition.
//!
//! Lookup through a class walks the ancestor chain from the class upward.
//! A definition in a subclass hides an ancestor's definition with the same
//! signature.

use quartz_ast::Def;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::classes::{ClassId, SymbolTable};
use crate::overload::Signature;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DefId(pub u32);

/// Where a method is defined.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    TopLevel,
    Class(ClassId),
}

/// A registered definition with its resolved parameter restrictions.
#[derive(Clone, Debug)]
pub struct MethodDef<'p> {
    pub name: String,
    pub signature: Signature,
    pub def: &'p Def,
}

#[derive(Default, Debug)]
pub struct MethodRegistry<'p> {
    defs: Vec<MethodDef<'p>>,
    overloads: FxHashMap<(Owner, String), Vec<DefId>>,
}

impl<'p> MethodRegistry<'p> {
    pub fn new() -> Self {
        MethodRegistry {
            defs: Vec::new(),
            overloads: FxHashMap::default(),
        }
    }

    /// Register `def` under `owner`.
    pub fn add(&mut self, owner: Owner, def: &'p Def, signature: Signature) -> DefId {
        let id = DefId(self.defs.len() as u32);
        self.defs.push(MethodDef {
            name: def.name.clone(),
            signature,
            def,
        });

        let list = self.overloads.entry((owner, def.name.clone())).or_default();
        let signature = &self.defs[id.0 as usize].signature;
        match list
            .iter_mut()
            .find(|existing| self.defs[existing.0 as usize].signature == *signature)
        {
            Some(slot) => *slot = id,
            None => list.push(id),
        }
        id
    }

    pub fn get(&self, id: DefId) -> &MethodDef<'p> {
        &self.defs[id.0 as usize]
    }

    /// Overloads declared directly in `owner`, in declaration order.
    pub fn declared(&self, owner: Owner, name: &str) -> &[DefId] {
        self.overloads
            .get(&(owner, name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Overloads visible on instances of `class`, nearest class first.
    pub fn lookup(&self, classes: &SymbolTable, class: ClassId, name: &str) -> Vec<DefId> {
        let mut found: Vec<DefId> = Vec::new();
        for ancestor in classes.ancestors(class) {
            for &id in self.declared(Owner::Class(ancestor), name) {
                let signature = &self.get(id).signature;
                if !found.iter().any(|f| self.get(*f).signature == *signature) {
                    found.push(id);
                }
            }
        }
        found
    }

    pub fn top_level(&self, name: &str) -> Vec<DefId> {
        self.declared(Owner::TopLevel, name).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::ClassKind;
    use crate::ty::Ty;
    use quartz_ast::build::{def, param};

    fn classes() -> (SymbolTable, ClassId, ClassId) {
        let mut table = SymbolTable::new();
        let object = table.add_builtin("Object", None, ClassKind::Reference, &[]);
        let foo = table.declare_class("Foo", None, object).unwrap();
        let bar = table.declare_class("Bar", Some(foo), object).unwrap();
        (table, foo, bar)
    }

    #[test]
    fn same_signature_replaces() {
        let first = def("foo", vec![], vec![]);
        let second = def("foo", vec![], vec![]);
        let mut registry = MethodRegistry::new();
        registry.add(Owner::TopLevel, &first, Signature::exact(vec![]));
        let id = registry.add(Owner::TopLevel, &second, Signature::exact(vec![]));
        assert_eq!(registry.top_level("foo"), vec![id]);
    }

    #[test]
    fn different_signatures_are_overloads() {
        let a = def("foo", vec![param("x")], vec![]);
        let b = def("foo", vec![param("x")], vec![]);
        let mut registry = MethodRegistry::new();
        let int = registry.add(Owner::TopLevel, &a, Signature::exact(vec![Some(Ty::int())]));
        let dbl = registry.add(Owner::TopLevel, &b, Signature::exact(vec![Some(Ty::double())]));
        assert_eq!(registry.top_level("foo"), vec![int, dbl]);
        assert!(registry.top_level("bar").is_empty());
    }

    #[test]
    fn lookup_walks_ancestors_and_skips_overridden() {
        let (classes, foo, bar) = classes();
        let base = def("name", vec![], vec![]);
        let over = def("name", vec![], vec![]);
        let extra = def("name", vec![param("x")], vec![]);
        let mut registry = MethodRegistry::new();
        registry.add(Owner::Class(foo), &base, Signature::exact(vec![]));
        let extra_id = registry.add(Owner::Class(foo), &extra, Signature::exact(vec![None]));
        let over_id = registry.add(Owner::Class(bar), &over, Signature::exact(vec![]));

        assert_eq!(registry.lookup(&classes, bar, "name"), vec![over_id, extra_id]);
        assert_eq!(registry.lookup(&classes, foo, "name").len(), 2);
        assert!(registry.lookup(&classes, foo, "other").is_empty());
    }
}
