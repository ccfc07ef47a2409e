//! Checking calls into natively declared functions.
//!
//! External functions are never overloaded, so matching is exact: the
//! argument count must equal the parameter count, `out` parameters must
//! receive an `out` argument, and every by-value argument type (every
//! member, for a union) must be assignable to the declared type.

use crate::classes::{ExternalFn, PassingMode};
use crate::error::DiagnosticKind;
use crate::overload::Arity;
use crate::ty::Ty;
use crate::unify::{is_assignable, Hierarchy};

/// One argument at an external call site.
#[derive(Clone, Debug)]
pub struct ExternalArg {
    /// Current type of the argument (for `out` arguments, of the target).
    pub ty: Ty,
    /// Written as `out var`.
    pub is_out: bool,
}

/// A call that passed every check that could be decided.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExternalCheck {
    Accepted,
    /// Some by-value argument has no type yet; the type check waits for a
    /// re-check once it does.
    Deferred,
}

/// Check a call to `lib.fun` with `args`.
///
/// Arity is checked first, then each argument in order: its passing mode,
/// then (for by-value parameters) its type.
pub fn check_call(
    lib: &str,
    fun: &ExternalFn,
    args: &[ExternalArg],
    hierarchy: &impl Hierarchy,
) -> Result<ExternalCheck, DiagnosticKind> {
    if args.len() != fun.params.len() {
        let arity = fun.params.len();
        return Err(DiagnosticKind::WrongNumberOfArguments {
            name: fun.name.clone(),
            given: args.len(),
            expected: Arity {
                min: arity,
                max: arity,
            },
        });
    }

    let mut outcome = ExternalCheck::Accepted;
    for (i, (param, arg)) in fun.params.iter().zip(args).enumerate() {
        match param.mode {
            PassingMode::Out if !arg.is_out => {
                return Err(DiagnosticKind::ExternalArgModeMismatch {
                    lib: lib.to_string(),
                    fun: fun.name.clone(),
                    index: i + 1,
                });
            }
            PassingMode::Out => {}
            PassingMode::ByValue if arg.ty.is_unresolved() => {
                outcome = ExternalCheck::Deferred;
            }
            PassingMode::ByValue => {
                if !is_assignable(&arg.ty, &param.ty, hierarchy) {
                    return Err(DiagnosticKind::ExternalArgTypeMismatch {
                        lib: lib.to_string(),
                        fun: fun.name.clone(),
                        index: i + 1,
                        expected: param.ty.clone(),
                        actual: arg.ty.clone(),
                    });
                }
            }
        }
    }
    Ok(outcome)
}
