//! Diagnostic kinds and the analysis error type.
//!
//! Each [`DiagnosticKind`] renders to one fixed message template; those
//! strings are the contract with the reporting layer and must not change.
//! A [`Diagnostic`] pairs a kind with the location of the failing
//! expression and, for failures discovered after a variable widened, the
//! location of the assignment that widened it.

use quartz_common::Location;
use serde::Serialize;
use thiserror::Error;

use crate::overload::Arity;
use crate::ty::Ty;

/// What went wrong. The `Display` impl is the user-visible message.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum DiagnosticKind {
    /// A bare identifier is neither a visible local nor a method.
    #[error("undefined local variable or method '{name}'")]
    UndefinedLocalOrMethod { name: String },

    /// No method of that name exists for the receiver (or, with no
    /// receiver, anywhere in scope).
    #[error("undefined method '{name}'{}", for_owner(.owner))]
    UndefinedMethod { name: String, owner: Option<String> },

    /// The call arity matches none of the overloads.
    #[error("wrong number of arguments for '{name}' ({given} for {expected})")]
    WrongNumberOfArguments {
        name: String,
        given: usize,
        expected: Arity,
    },

    /// The arity matches, but some combination of argument types is
    /// accepted by no overload. `args` is the first rejected combination.
    #[error("no overload matches")]
    NoOverloadMatches { name: String, args: Vec<Ty> },

    /// A native function argument has the wrong type.
    #[error("argument #{index} to {lib}.{fun} must be {expected}, not {actual}")]
    ExternalArgTypeMismatch {
        lib: String,
        fun: String,
        index: usize,
        expected: Ty,
        actual: Ty,
    },

    /// A native `out` parameter received something other than `out var`.
    #[error("argument #{index} to {lib}.{fun} must be passed as 'out'")]
    ExternalArgModeMismatch {
        lib: String,
        fun: String,
        index: usize,
    },

    #[error("uninitialized constant {name}")]
    UninitializedConstant { name: String },

    /// A class was reopened with a different superclass.
    #[error("superclass mismatch for class {class} ({given} for {existing})")]
    SuperclassMismatch {
        class: String,
        given: String,
        existing: String,
    },

    #[error("can't use instance variables at the top level")]
    InstanceVarOutsideClass,

    #[error("can't use instance variables inside {class}")]
    InstanceVarInValueType { class: String },

    /// `break` or `next` outside of a loop.
    #[error("Invalid {keyword}")]
    InvalidControlFlow { keyword: String },

    /// A generic class primitive needs a bound type argument.
    #[error(
        "can't {method} {} without type, use {class}(Type).{method}(size)",
        .class.to_lowercase()
    )]
    GenericArgumentRequired { class: String, method: String },

    #[error("wrong number of type vars for {name} (given {given}, expected {expected})")]
    WrongTypeArgumentCount {
        name: String,
        given: usize,
        expected: usize,
    },

    #[error("can only get 'ptr' of variable or instance variable")]
    PointerOfNonVariable,

    #[error("'{name}' can't receive a block")]
    BlockNotAccepted { name: String },

    /// Compound assignment to a local that has no binding yet.
    #[error("'{op}' before definition of '{name}'")]
    OpAssignBeforeDefinition { op: String, name: String },
}

fn for_owner(owner: &Option<String>) -> String {
    match owner {
        Some(owner) => format!(" for {owner}"),
        None => String::new(),
    }
}

/// A located diagnostic. `Display` is exactly the kind's message.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[error("{kind}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Location,
    /// Where the widening that exposed this failure was assigned, if the
    /// failure only appeared after a re-check.
    pub related: Option<Location>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: Location) -> Self {
        Diagnostic {
            kind,
            location,
            related: None,
        }
    }

    pub fn with_related(mut self, related: Option<Location>) -> Self {
        self.related = related;
        self
    }

    /// The message string, identical to `to_string()`.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Why an analysis run failed.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The program is ill-typed.
    #[error(transparent)]
    Diagnostic(#[from] Diagnostic),

    /// Internal: the fixpoint loop hit the configured safety bound.
    #[error("internal error: inference did not reach a fixpoint within {limit} checks")]
    IterationLimit { limit: u32 },
}

impl AnalysisError {
    /// The user-facing diagnostic, if this is one.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            AnalysisError::Diagnostic(diagnostic) => Some(diagnostic),
            AnalysisError::IterationLimit { .. } => None,
        }
    }
}
