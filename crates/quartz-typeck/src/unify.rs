//! Pure operations over types: union construction, assignability and
//! narrowing.
//!
//! None of these functions mutate their inputs; unions are rebuilt rather
//! than edited in place. Assignability needs the class hierarchy, which is
//! reached through the [`Hierarchy`] trait so the operations stay
//! independent of how classes are stored.

use crate::ty::{Ty, TyCon};

/// Read access to single-inheritance class relationships.
pub trait Hierarchy {
    /// The name of `class`'s direct superclass, or `None` at the root or
    /// for unknown classes.
    fn superclass_of(&self, class: &str) -> Option<&str>;

    /// Whether `sub` is `sup` or one of its descendants.
    fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        let mut current = Some(sub);
        while let Some(name) = current {
            if name == sup {
                return true;
            }
            current = self.superclass_of(name);
        }
        false
    }
}

/// The union of `a` and `b`.
///
/// Nested unions are flattened, duplicate members dropped (keeping first
/// occurrence order), a single remaining member is returned on its own and
/// `Unresolved` acts as the identity.
pub fn unify(a: &Ty, b: &Ty) -> Ty {
    let mut members: Vec<Ty> = Vec::with_capacity(a.members().len() + b.members().len());
    for member in a.members().iter().chain(b.members()) {
        if !members.contains(member) {
            members.push(member.clone());
        }
    }
    match members.len() {
        0 => Ty::Unresolved,
        1 => members.pop().unwrap_or(Ty::Unresolved),
        _ => Ty::Union(members),
    }
}

/// Whether a value of type `from` may be used where `to` is expected.
///
/// - a union `from` is assignable when every member is;
/// - a concrete `from` is assignable to a union when it is assignable to
///   some member;
/// - a concrete `from` is assignable to a concrete `to` when its class is
///   `to`'s class or a descendant, and the type arguments agree (a `to`
///   written without arguments accepts any).
///
/// `Unresolved` has no members, so it is vacuously assignable to anything.
pub fn is_assignable(from: &Ty, to: &Ty, hierarchy: &impl Hierarchy) -> bool {
    match (from, to) {
        (Ty::Unresolved, _) => true,
        (Ty::Union(members), _) => members.iter().all(|m| is_assignable(m, to, hierarchy)),
        (Ty::Con(_), Ty::Union(targets)) => {
            targets.iter().any(|t| is_assignable(from, t, hierarchy))
        }
        (Ty::Con(f), Ty::Con(t)) => con_assignable(f, t, hierarchy),
        (Ty::Con(_), Ty::Unresolved) => false,
    }
}

fn con_assignable(from: &TyCon, to: &TyCon, hierarchy: &impl Hierarchy) -> bool {
    (to.args.is_empty() || from.args == to.args) && hierarchy.is_subclass(&from.name, &to.name)
}

/// Keep only the members of `ty` that satisfy `keep`.
///
/// Used for narrowing after a guard; the result may be `Unresolved` when
/// no member survives.
pub fn restrict_to(ty: &Ty, keep: impl Fn(&Ty) -> bool) -> Ty {
    Ty::union_of(ty.members().iter().filter(|m| keep(m)).cloned())
}
