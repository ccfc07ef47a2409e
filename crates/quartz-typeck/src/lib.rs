//! Quartz type checker: inference for an overloaded language with unions.
//!
//! This crate takes a parsed [`Program`] and assigns a type to every
//! expression, resolves every call to the overloads it can reach, and
//! rejects programs that cannot be typed with a single diagnostic whose
//! message is stable. It supports:
//!
//! - Local variables typed by assignment, widening to unions as more
//!   assignments are discovered
//! - Overload resolution distributed over every member of union arguments
//! - Method instantiation per receiver and argument types
//! - Instance variables scoped to reference classes
//! - Calls into natively declared `lib` functions, including `out` passing
//!
//! # Architecture
//!
//! - [`ty`]: Core type representation (Ty, TyCon)
//! - [`unify`]: Union construction, assignability and narrowing
//! - [`classes`]: Class hierarchy, libs and written-type resolution
//! - [`builtins`]: Built-in classes and primitive methods
//! - [`methods`]: Method registry and hierarchy lookup
//! - [`overload`]: Overload resolution over union-distributed arguments
//! - [`external`]: Exact checking of external function calls
//! - [`env`]: Lexical scope stack
//! - [`tracker`]: Per-binding type histories and re-check scheduling
//! - [`infer`]: The declaration pass and fixpoint engine
//! - [`error`]: Diagnostics with their exact messages
//! - [`diagnostics`]: Ariadne rendering of diagnostics
//! - [`config`]: Run limits, loadable from TOML

pub mod builtins;
pub mod classes;
pub mod config;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod external;
pub mod infer;
pub mod methods;
pub mod overload;
pub mod tracker;
pub mod ty;
pub mod unify;

use quartz_ast::{NodeId, Program};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::CheckConfig;
use crate::error::AnalysisError;
use crate::methods::DefId;
use crate::tracker::UnitId;
use crate::ty::Ty;

/// What a resolved call invokes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CallTarget {
    /// A user definition, through one of its instances.
    Method { def: DefId, instance: UnitId },
    /// A builtin primitive of the receiver's class.
    Primitive { name: String },
    /// A natively declared `lib` function.
    External { lib: String, fun: String },
    /// `Class.new`.
    Allocate { class: String },
    /// `var.ptr`.
    Pointer,
}

/// One resolution of a call site for one combination of argument types.
/// A call with union arguments or a union receiver has several.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedCall {
    pub receiver: Option<Ty>,
    pub target: CallTarget,
    pub args: Vec<Ty>,
    pub ret: Ty,
}

/// A method definition instantiated for concrete types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodInstance {
    pub unit: UnitId,
    pub def: DefId,
    pub name: String,
    pub self_ty: Option<Ty>,
    pub args: Vec<Ty>,
    pub ret: Ty,
}

/// The result of type checking a Quartz program.
#[derive(Debug, PartialEq)]
pub struct TypeckResult {
    /// Final type of every checked expression. Expressions checked in
    /// several instances have the union of their types.
    pub types: FxHashMap<NodeId, Ty>,
    /// Resolutions of every call site, keyed by the call expression.
    pub calls: FxHashMap<NodeId, Vec<ResolvedCall>>,
    /// Method instances in creation order.
    pub instances: Vec<MethodInstance>,
    /// Type of the last top-level expression; `None` when the program has
    /// no top-level expressions.
    pub result_type: Option<Ty>,
}

impl TypeckResult {
    pub fn type_of(&self, node: NodeId) -> Option<&Ty> {
        self.types.get(&node)
    }

    pub fn calls_at(&self, node: NodeId) -> &[ResolvedCall] {
        self.calls.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Instances of the method called `name`.
    pub fn instances_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodInstance> + 'a {
        self.instances.iter().filter(move |instance| instance.name == name)
    }
}

/// Type-check a program with the default configuration.
///
/// Returns the first diagnostic in source order if the program cannot be
/// typed.
pub fn check(program: &Program) -> Result<TypeckResult, AnalysisError> {
    check_with_config(program, &CheckConfig::default())
}

/// Type-check a program with explicit limits.
#[tracing::instrument(skip_all, fields(file = %program.file, items = program.items.len()))]
pub fn check_with_config(program: &Program, config: &CheckConfig) -> Result<TypeckResult, AnalysisError> {
    infer::infer(program, config)
}
