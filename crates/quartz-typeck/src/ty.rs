//! Type representation for the Quartz type system.
//!
//! A type is either a concrete class instantiation (`Int`, `Pointer(Char)`),
//! a union of concrete members (`Int | Char`), or the `Unresolved` sentinel
//! used while inference has not seen any value for an expression yet.
//!
//! Unions are sets: equality and hashing ignore member order, but the
//! members are kept in insertion order so diagnostics read naturally.
//! Union values are always built through [`crate::unify::unify`] or
//! [`Ty::union_of`], which flatten nested unions and collapse one-member
//! unions to that member.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::Serialize;

/// A class reference with its bound type arguments, e.g. `Pointer(Int)`.
///
/// A generic class written without arguments (`Pointer`) has an empty
/// `args` list; as a parameter restriction it matches any instantiation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TyCon {
    pub name: String,
    pub args: Vec<Ty>,
}

impl TyCon {
    pub fn new(name: impl Into<String>) -> Self {
        TyCon {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<Ty>) -> Self {
        TyCon {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A Quartz type.
#[derive(Clone, Debug, Serialize)]
pub enum Ty {
    /// No value has been observed yet. Behaves as the empty union.
    Unresolved,
    /// A concrete class instantiation.
    Con(TyCon),
    /// Two or more distinct concrete members.
    Union(Vec<Ty>),
}

impl Ty {
    pub fn con(name: &str) -> Ty {
        Ty::Con(TyCon::new(name))
    }

    pub fn int() -> Ty {
        Ty::con("Int")
    }

    pub fn double() -> Ty {
        Ty::con("Double")
    }

    pub fn char() -> Ty {
        Ty::con("Char")
    }

    pub fn bool() -> Ty {
        Ty::con("Bool")
    }

    pub fn nil() -> Ty {
        Ty::con("Nil")
    }

    pub fn string() -> Ty {
        Ty::con("String")
    }

    /// The type of a class used as a value.
    pub fn class() -> Ty {
        Ty::con("Class")
    }

    /// `Pointer(element)`.
    pub fn pointer(element: Ty) -> Ty {
        Ty::Con(TyCon::with_args("Pointer", vec![element]))
    }

    /// Build a type from any number of members, flattening and
    /// de-duplicating them.
    pub fn union_of(members: impl IntoIterator<Item = Ty>) -> Ty {
        members
            .into_iter()
            .fold(Ty::Unresolved, |acc, ty| crate::unify::unify(&acc, &ty))
    }

    /// The concrete members of this type: itself for a concrete type, the
    /// member list for a union, and nothing for `Unresolved`.
    pub fn members(&self) -> &[Ty] {
        match self {
            Ty::Unresolved => &[],
            Ty::Con(_) => std::slice::from_ref(self),
            Ty::Union(members) => members,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Ty::Unresolved)
    }

    /// The class reference of a concrete type.
    pub fn as_con(&self) -> Option<&TyCon> {
        match self {
            Ty::Con(con) => Some(con),
            _ => None,
        }
    }

    /// Replace `Unresolved` (at any depth) with `Nil` for final output.
    pub fn finalized(&self) -> Ty {
        match self {
            Ty::Unresolved => Ty::nil(),
            Ty::Con(con) => Ty::Con(TyCon::with_args(
                con.name.clone(),
                con.args.iter().map(Ty::finalized).collect(),
            )),
            Ty::Union(members) => Ty::union_of(members.iter().map(Ty::finalized)),
        }
    }
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ty::Unresolved, Ty::Unresolved) => true,
            (Ty::Con(a), Ty::Con(b)) => a == b,
            (Ty::Union(a), Ty::Union(b)) => {
                a.len() == b.len() && a.iter().all(|member| b.contains(member))
            }
            _ => false,
        }
    }
}

impl Eq for Ty {}

impl Hash for Ty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Ty::Unresolved => 0u8.hash(state),
            Ty::Con(con) => {
                1u8.hash(state);
                con.hash(state);
            }
            Ty::Union(members) => {
                // Order-independent: combine member hashes commutatively.
                2u8.hash(state);
                let mut combined = 0u64;
                for member in members {
                    let mut hasher = FxHasher::default();
                    member.hash(&mut hasher);
                    combined = combined.wrapping_add(hasher.finish());
                }
                combined.hash(state);
                members.len().hash(state);
            }
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unresolved => write!(f, "?"),
            Ty::Con(con) => write!(f, "{}", con),
            Ty::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn display_generic_and_union() {
        assert_eq!(Ty::pointer(Ty::int()).to_string(), "Pointer(Int)");
        let union = Ty::union_of([Ty::char(), Ty::int()]);
        assert_eq!(union.to_string(), "Char | Int");
    }

    #[test]
    fn union_equality_ignores_order() {
        let a = Ty::union_of([Ty::int(), Ty::double(), Ty::char()]);
        let b = Ty::union_of([Ty::char(), Ty::int(), Ty::double()]);
        assert_eq!(a, b);

        let mut set = FxHashSet::default();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn members_of_each_shape() {
        assert!(Ty::Unresolved.members().is_empty());
        assert_eq!(Ty::int().members(), &[Ty::int()]);
        assert_eq!(Ty::union_of([Ty::int(), Ty::char()]).members().len(), 2);
    }

    #[test]
    fn finalized_replaces_unresolved() {
        assert_eq!(Ty::Unresolved.finalized(), Ty::nil());
        assert_eq!(
            Ty::pointer(Ty::Unresolved).finalized(),
            Ty::pointer(Ty::nil())
        );
    }
}
