//! Overload resolution over union-distributed arguments.
//!
//! Resolution is a pure function from an overload set and the argument
//! types to either the matched overloads or a structured failure:
//!
//! 1. arity is checked against the whole set first; if no overload takes
//!    that many arguments the call fails with a wrong-arity error;
//! 2. every union argument is distributed over its members, giving the
//!    cartesian product of concrete argument combinations;
//! 3. each combination must be accepted by some overload, otherwise the
//!    whole call fails (no partial dispatch);
//! 4. within a combination the most specific accepting overload wins: one
//!    is more specific than another when each of its restrictions is
//!    assignable to the other's. Overloads that are equally specific or
//!    not comparable fall back to the number of restricted parameters,
//!    then declaration order.

use std::fmt;

use serde::Serialize;

use crate::ty::Ty;
use crate::unify::{is_assignable, Hierarchy};

/// The parameter shape of one overload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// Declared restriction per parameter; `None` accepts anything.
    pub params: Vec<Option<Ty>>,
    /// Parameters without a default value.
    pub required: usize,
}

impl Signature {
    /// A signature whose parameters all are required.
    pub fn exact(params: Vec<Option<Ty>>) -> Self {
        let required = params.len();
        Signature { params, required }
    }

    pub fn arity(&self) -> Arity {
        Arity {
            min: self.required,
            max: self.params.len(),
        }
    }

    pub fn accepts_arity(&self, given: usize) -> bool {
        given >= self.required && given <= self.params.len()
    }

    fn restricted_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_some()).count()
    }

    /// Whether every parameter is at least as narrow as `other`'s.
    fn at_least_as_specific(&self, other: &Signature, hierarchy: &impl Hierarchy) -> bool {
        self.params
            .iter()
            .zip(&other.params)
            .all(|(mine, theirs)| match (mine, theirs) {
                (_, None) => true,
                (Some(mine), Some(theirs)) => is_assignable(mine, theirs, hierarchy),
                (None, Some(_)) => false,
            })
    }

    fn more_specific(&self, other: &Signature, hierarchy: &impl Hierarchy) -> bool {
        self.at_least_as_specific(other, hierarchy) && !other.at_least_as_specific(self, hierarchy)
    }

    fn accepts(&self, args: &[Ty], hierarchy: &impl Hierarchy) -> bool {
        self.params.iter().zip(args).all(|(restriction, arg)| match restriction {
            Some(restriction) => is_assignable(arg, restriction, hierarchy),
            None => true,
        })
    }
}

/// An accepted argument count range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..{}", self.min, self.max)
        }
    }
}

/// One overload selected for one concrete argument combination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    /// Index into the signature slice given to [`resolve`].
    pub candidate: usize,
    /// The concrete argument types of this combination.
    pub args: Vec<Ty>,
}

/// Why resolution failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// No overload accepts `given` arguments. `expected` is the arity of
    /// the first overload.
    WrongArity { given: usize, expected: Arity },
    /// The combination `args` is accepted by no overload.
    NoMatch { args: Vec<Ty> },
}

/// Check only the argument count against an overload set.
pub fn check_arity(signatures: &[Signature], given: usize) -> Result<(), ResolveError> {
    if signatures.iter().any(|s| s.accepts_arity(given)) {
        return Ok(());
    }
    let expected = signatures
        .first()
        .map(Signature::arity)
        .unwrap_or(Arity { min: 0, max: 0 });
    Err(ResolveError::WrongArity { given, expected })
}

/// Resolve a call with argument types `args` against `signatures`.
///
/// Arguments must not be `Unresolved`; callers defer such calls. The
/// result holds one [`Match`] per distinct (overload, combination) pair in
/// combination order.
pub fn resolve(
    signatures: &[Signature],
    args: &[Ty],
    hierarchy: &impl Hierarchy,
) -> Result<Vec<Match>, ResolveError> {
    check_arity(signatures, args.len())?;

    let mut order: Vec<usize> = (0..signatures.len())
        .filter(|&i| signatures[i].accepts_arity(args.len()))
        .collect();
    // Stable: declaration order among equally restricted overloads.
    order.sort_by_key(|&i| std::cmp::Reverse(signatures[i].restricted_count()));

    let mut matches = Vec::new();
    for combination in combinations(args) {
        let accepting: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&i| signatures[i].accepts(&combination, hierarchy))
            .collect();
        let chosen = accepting
            .iter()
            .copied()
            .find(|&i| {
                !accepting
                    .iter()
                    .any(|&j| signatures[j].more_specific(&signatures[i], hierarchy))
            })
            .or_else(|| accepting.first().copied());
        match chosen {
            Some(candidate) => {
                let found = Match {
                    candidate,
                    args: combination,
                };
                if !matches.contains(&found) {
                    matches.push(found);
                }
            }
            None => return Err(ResolveError::NoMatch { args: combination }),
        }
    }
    Ok(matches)
}

/// The cartesian product of the members of each argument type.
///
/// With no arguments there is exactly one (empty) combination; an
/// `Unresolved` argument contributes no members and empties the product.
pub fn combinations(args: &[Ty]) -> Vec<Vec<Ty>> {
    let mut product: Vec<Vec<Ty>> = vec![Vec::with_capacity(args.len())];
    for arg in args {
        let mut next = Vec::with_capacity(product.len() * arg.members().len());
        for prefix in &product {
            for member in arg.members() {
                let mut combination = prefix.clone();
                combination.push(member.clone());
                next.push(combination);
            }
        }
        product = next;
    }
    product
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat;

    impl Hierarchy for Flat {
        fn superclass_of(&self, class: &str) -> Option<&str> {
            match class {
                "Object" => None,
                _ => Some("Object"),
            }
        }
    }

    fn int_or(other: Ty) -> Ty {
        Ty::union_of([Ty::int(), other])
    }

    #[test]
    fn combinations_cover_product() {
        let combos = combinations(&[int_or(Ty::char()), int_or(Ty::double())]);
        assert_eq!(combos.len(), 4);
        assert_eq!(combos[0], vec![Ty::int(), Ty::int()]);
        assert_eq!(combos[3], vec![Ty::char(), Ty::double()]);
        assert_eq!(combinations(&[]), vec![Vec::<Ty>::new()]);
        assert!(combinations(&[Ty::Unresolved]).is_empty());
    }

    #[test]
    fn arity_is_checked_before_types() {
        let sigs = vec![Signature::exact(vec![Some(Ty::int())])];
        let err = resolve(&sigs, &[], &Flat).unwrap_err();
        assert_eq!(
            err,
            ResolveError::WrongArity {
                given: 0,
                expected: Arity { min: 1, max: 1 }
            }
        );
    }

    #[test]
    fn union_argument_must_match_every_member() {
        let sigs = vec![Signature::exact(vec![Some(Ty::int())])];
        let err = resolve(&sigs, &[int_or(Ty::double())], &Flat).unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoMatch {
                args: vec![Ty::double()]
            }
        );
    }

    #[test]
    fn union_argument_spreads_over_overloads() {
        let sigs = vec![
            Signature::exact(vec![Some(Ty::int())]),
            Signature::exact(vec![Some(Ty::double())]),
        ];
        let matches = resolve(&sigs, &[int_or(Ty::double())], &Flat).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].candidate, 0);
        assert_eq!(matches[1].candidate, 1);
    }

    #[test]
    fn restricted_overload_beats_unrestricted() {
        let sigs = vec![
            Signature::exact(vec![None]),
            Signature::exact(vec![Some(Ty::int())]),
        ];
        let matches = resolve(&sigs, &[Ty::int()], &Flat).unwrap();
        assert_eq!(matches[0].candidate, 1);
        let matches = resolve(&sigs, &[Ty::char()], &Flat).unwrap();
        assert_eq!(matches[0].candidate, 0);
    }

    #[test]
    fn subclass_restriction_beats_superclass_in_any_order() {
        let object = Signature::exact(vec![Some(Ty::con("Object"))]);
        let int = Signature::exact(vec![Some(Ty::int())]);
        let forward = vec![object.clone(), int.clone()];
        let backward = vec![int, object];
        assert_eq!(resolve(&forward, &[Ty::int()], &Flat).unwrap()[0].candidate, 1);
        assert_eq!(resolve(&backward, &[Ty::int()], &Flat).unwrap()[0].candidate, 0);
        assert_eq!(resolve(&forward, &[Ty::char()], &Flat).unwrap()[0].candidate, 0);
    }

    #[test]
    fn incomparable_overloads_fall_back_to_declaration_order() {
        let sigs = vec![
            Signature::exact(vec![Some(Ty::int()), None]),
            Signature::exact(vec![None, Some(Ty::int())]),
        ];
        let matches = resolve(&sigs, &[Ty::int(), Ty::int()], &Flat).unwrap();
        assert_eq!(matches[0].candidate, 0);
    }

    #[test]
    fn defaults_widen_accepted_arity() {
        let sig = Signature {
            params: vec![None, None],
            required: 1,
        };
        assert!(sig.accepts_arity(1));
        assert!(sig.accepts_arity(2));
        assert!(!sig.accepts_arity(3));
        assert_eq!(sig.arity().to_string(), "1..2");
    }
}
