//! The inference engine.
//!
//! Checking proceeds in two phases:
//!
//! 1. **Declarations.** Classes are declared in source order, then every
//!    `def` and `lib` is registered with its parameter types resolved. Any
//!    failure here is reported immediately.
//! 2. **Fixpoint.** The top-level statements form the first checking unit.
//!    Each call that resolves to a user definition instantiates it for the
//!    concrete receiver and argument types; a new instance is a unit of its
//!    own, checked on the spot. Reads of variables, instance variables and
//!    instance return values register the reading unit with the
//!    [`Tracker`]; when a later assignment widens one of them, the readers
//!    are queued and re-checked from scratch against the wider type. When
//!    the queue drains, bindings that were read but never assigned are
//!    sealed to `Nil` and their readers queued again; the loop ends when
//!    nothing is left to seal.
//!
//! A unit keeps only the diagnostics of its last check. Once the fixpoint
//! is reached the diagnostic with the smallest source location wins.
//!
//! An expression that failed types as `Unresolved`, and so does anything
//! not known yet (a recursive call, a block parameter). Calls whose
//! receiver or arguments are `Unresolved` check what they can (method
//! existence, arity) and defer the rest until a re-check supplies types.

use quartz_ast::{Block, Call, Def, Expr, ExprKind, Item, LibDef, NodeId, Program, Target, TypeRef};
use quartz_common::Location;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::builtins::{self, Primitive, Roots};
use crate::classes::{ClassKind, ExternalFn, ExternalParam, LibId, PassingMode, SymbolTable};
use crate::config::CheckConfig;
use crate::env::{ScopeOwner, ScopeStack};
use crate::error::{AnalysisError, Diagnostic, DiagnosticKind};
use crate::external::{self, ExternalArg, ExternalCheck};
use crate::methods::{DefId, MethodRegistry, Owner};
use crate::overload::{self, Arity, ResolveError, Signature};
use crate::tracker::{BindingId, BindingKey, Tracker, UnitId};
use crate::ty::Ty;
use crate::unify::unify;
use crate::{CallTarget, MethodInstance, ResolvedCall, TypeckResult};

type Check<T = Ty> = Result<T, AnalysisError>;

/// Run declaration collection and the fixpoint over `program`.
pub(crate) fn infer(program: &Program, config: &CheckConfig) -> Result<TypeckResult, AnalysisError> {
    let mut engine = Engine::new(program, config);
    engine.declare(program)?;

    engine.units.push(Unit::new(None));
    engine.check_unit(UnitId::TOP_LEVEL, None, false)?;
    loop {
        while let Some(invalidation) = engine.tracker.pop() {
            engine.check_unit(invalidation.unit, invalidation.cause, true)?;
        }
        // Bindings nothing ever assigned hold nil; calls deferred on them
        // are decided against it. Skipped once an error is known so it
        // cannot cascade into earlier sites.
        if engine.has_diagnostics() || !engine.tracker.seal_unassigned(&Ty::nil()) {
            break;
        }
    }
    debug!(
        checks = engine.checks,
        units = engine.units.len(),
        "reached fixpoint"
    );

    engine.finish()
}

// ── Units ──────────────────────────────────────────────────────────────

/// A method instantiated for one receiver type and one combination of
/// concrete argument types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct InstanceKey {
    def: DefId,
    self_ty: Option<Ty>,
    args: Vec<Ty>,
}

/// The stored outcome of a unit's last check.
struct Unit {
    /// `None` for the top-level program.
    instance: Option<InstanceKey>,
    diagnostics: Vec<Diagnostic>,
    types: FxHashMap<NodeId, Ty>,
    calls: FxHashMap<NodeId, Vec<ResolvedCall>>,
    result: Ty,
}

impl Unit {
    fn new(instance: Option<InstanceKey>) -> Self {
        Unit {
            instance,
            diagnostics: Vec::new(),
            types: FxHashMap::default(),
            calls: FxHashMap::default(),
            result: Ty::Unresolved,
        }
    }
}

/// State of one check of one unit.
struct UnitCx {
    unit: UnitId,
    self_ty: Option<Ty>,
    scopes: ScopeStack,
    loop_depth: u32,
    /// The widening this check descends from, if any. Assignments made
    /// while checking are attributed to it.
    cause: Option<Location>,
    /// Whether this check was triggered by a widening.
    recheck: bool,
    diagnostics: Vec<Diagnostic>,
    types: FxHashMap<NodeId, Ty>,
    calls: FxHashMap<NodeId, Vec<ResolvedCall>>,
}

impl UnitCx {
    fn new(unit: UnitId, self_ty: Option<Ty>, cause: Option<Location>, recheck: bool) -> Self {
        UnitCx {
            unit,
            self_ty,
            scopes: ScopeStack::new(),
            loop_depth: 0,
            cause,
            recheck,
            diagnostics: Vec::new(),
            types: FxHashMap::default(),
            calls: FxHashMap::default(),
        }
    }

    /// Record a diagnostic at `loc`; the failed expression is `Unresolved`.
    /// A site reports each kind of failure once.
    fn fail(&mut self, kind: DiagnosticKind, loc: &Location) -> Ty {
        if self
            .diagnostics
            .iter()
            .any(|d| d.location == *loc && d.kind == kind)
        {
            return Ty::Unresolved;
        }
        let related = if self.recheck { self.cause.clone() } else { None };
        trace!(unit = self.unit.0, %kind, %loc, "diagnostic");
        self.diagnostics
            .push(Diagnostic::new(kind, loc.clone()).with_related(related));
        Ty::Unresolved
    }

    fn record_call(&mut self, node: NodeId, call: ResolvedCall) {
        let calls = self.calls.entry(node).or_default();
        if !calls.contains(&call) {
            calls.push(call);
        }
    }
}

/// A callable that takes part in overload resolution.
#[derive(Clone, Debug)]
enum Candidate {
    Def(DefId),
    Primitive(Primitive),
}

// ── Engine ─────────────────────────────────────────────────────────────

struct Engine<'p> {
    config: CheckConfig,
    classes: SymbolTable,
    roots: Roots,
    methods: MethodRegistry<'p>,
    tracker: Tracker,
    units: Vec<Unit>,
    instances: FxHashMap<InstanceKey, UnitId>,
    top_level: Vec<&'p Expr>,
    /// Unit checks performed so far.
    checks: u32,
    /// Depth of instances being checked inside their caller's check.
    nesting: u32,
}

impl<'p> Engine<'p> {
    fn new(program: &'p Program, config: &CheckConfig) -> Self {
        let mut classes = SymbolTable::new();
        let roots = builtins::register_builtins(&mut classes);
        let top_level = program
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Expr(expr) => Some(expr),
                _ => None,
            })
            .collect();
        Engine {
            config: config.clone(),
            classes,
            roots,
            methods: MethodRegistry::new(),
            tracker: Tracker::new(),
            units: Vec::new(),
            instances: FxHashMap::default(),
            top_level,
            checks: 0,
            nesting: 0,
        }
    }

    // ── Declarations ───────────────────────────────────────────────────

    fn declare(&mut self, program: &'p Program) -> Result<(), Diagnostic> {
        for item in &program.items {
            let Item::Class(class) = item else { continue };
            let superclass = match &class.superclass {
                Some(name) => Some(self.classes.lookup_class(&name.name).ok_or_else(|| {
                    Diagnostic::new(
                        DiagnosticKind::UninitializedConstant {
                            name: name.name.clone(),
                        },
                        name.loc.clone(),
                    )
                })?),
                None => None,
            };
            let default = if class.is_struct {
                self.roots.value
            } else {
                self.roots.object
            };
            self.classes
                .declare_class(&class.name, superclass, default)
                .map_err(|kind| Diagnostic::new(kind, class.loc.clone()))?;
        }

        for item in &program.items {
            match item {
                Item::Def(def) => self.declare_def(Owner::TopLevel, def)?,
                Item::Class(class) => {
                    let Some(id) = self.classes.lookup_class(&class.name) else {
                        continue;
                    };
                    for def in &class.body {
                        self.declare_def(Owner::Class(id), def)?;
                    }
                }
                Item::Lib(lib) => self.declare_lib(lib)?,
                Item::Expr(_) => {}
            }
        }
        Ok(())
    }

    fn resolve_type(&self, ty: &TypeRef) -> Result<Ty, Diagnostic> {
        self.classes
            .resolve_type(ty)
            .map_err(|(kind, loc)| Diagnostic::new(kind, loc))
    }

    fn declare_def(&mut self, owner: Owner, def: &'p Def) -> Result<(), Diagnostic> {
        let params = def
            .params
            .iter()
            .map(|param| param.restriction.as_ref().map(|r| self.resolve_type(r)).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        let signature = Signature {
            params,
            required: def.required_params(),
        };
        let id = self.methods.add(owner, def, signature);
        trace!(def = id.0, name = %def.name, ?owner, "declared method");
        Ok(())
    }

    fn declare_lib(&mut self, lib: &LibDef) -> Result<(), Diagnostic> {
        let id = self.classes.declare_lib(&lib.name);
        for fun in &lib.funs {
            let params = fun
                .params
                .iter()
                .map(|param| {
                    Ok(ExternalParam {
                        name: param.name.clone(),
                        ty: self.resolve_type(&param.ty)?,
                        mode: if param.out {
                            PassingMode::Out
                        } else {
                            PassingMode::ByValue
                        },
                    })
                })
                .collect::<Result<Vec<_>, Diagnostic>>()?;
            let ret = match &fun.ret {
                Some(ret) => self.resolve_type(ret)?,
                None => Ty::nil(),
            };
            self.classes.add_external_fn(
                id,
                ExternalFn {
                    name: fun.name.clone(),
                    params,
                    ret,
                },
            );
        }
        Ok(())
    }

    // ── Units ──────────────────────────────────────────────────────────

    /// Check `unit` from scratch and store its outcome.
    fn check_unit(&mut self, unit: UnitId, cause: Option<Location>, recheck: bool) -> Check<()> {
        self.checks += 1;
        if self.checks > self.config.max_iterations {
            return Err(AnalysisError::IterationLimit {
                limit: self.config.max_iterations,
            });
        }

        let instance = self.units[unit.0 as usize].instance.clone();
        debug!(unit = unit.0, recheck, cause = ?cause, "checking unit");
        let self_ty = instance.as_ref().and_then(|key| key.self_ty.clone());
        let mut cx = UnitCx::new(unit, self_ty, cause, recheck);

        let result = match &instance {
            None => {
                let mut ty = Ty::nil();
                for i in 0..self.top_level.len() {
                    let expr = self.top_level[i];
                    ty = self.check_expr(&mut cx, expr)?;
                }
                ty
            }
            Some(key) => self.check_method_body(&mut cx, key)?,
        };

        let slot = &mut self.units[unit.0 as usize];
        slot.diagnostics = cx.diagnostics;
        slot.types = cx.types;
        slot.calls = cx.calls;
        slot.result = result;
        Ok(())
    }

    fn check_method_body(&mut self, cx: &mut UnitCx, key: &InstanceKey) -> Check {
        let def = self.methods.get(key.def).def;
        for (i, param) in def.params.iter().enumerate() {
            let ty = match (key.args.get(i), &param.default) {
                (Some(arg), _) => arg.clone(),
                (None, Some(default)) => self.check_expr(cx, default)?,
                (None, None) => Ty::Unresolved,
            };
            let binding = self.declare_local(cx, &param.name);
            self.assign(cx, binding, &def.loc, &ty);
        }

        let body = self.check_body(cx, &def.body)?;
        let ret = self.tracker.binding(BindingKey::Return(cx.unit));
        self.assign(cx, ret, &def.loc, &body);
        Ok(body)
    }

    /// Instantiate `def` for a receiver and argument combination, checking
    /// the instance first if it is new. Returns the instance and its
    /// current return type.
    fn instantiate(
        &mut self,
        cx: &UnitCx,
        site: &Expr,
        def: DefId,
        self_ty: Option<Ty>,
        args: Vec<Ty>,
    ) -> Check<(UnitId, Ty)> {
        let key = InstanceKey { def, self_ty, args };
        let unit = match self.instances.get(&key) {
            Some(&unit) => unit,
            None => {
                let unit = UnitId(self.units.len() as u32);
                debug!(
                    unit = unit.0,
                    method = %self.methods.get(def).name,
                    args = ?key.args,
                    "new method instance"
                );
                self.units.push(Unit::new(Some(key.clone())));
                self.instances.insert(key, unit);

                let cause = cx.cause.clone().unwrap_or_else(|| site.loc.clone());
                if self.nesting < self.config.max_nesting {
                    self.nesting += 1;
                    let checked = self.check_unit(unit, Some(cause), cx.recheck);
                    self.nesting -= 1;
                    checked?;
                } else {
                    self.tracker.enqueue(unit, Some(cause));
                }
                unit
            }
        };
        let ret = self.tracker.binding(BindingKey::Return(unit));
        Ok((unit, self.tracker.read(ret, cx.unit)))
    }

    // ── Bindings ───────────────────────────────────────────────────────

    fn assign(&mut self, cx: &UnitCx, binding: BindingId, site: &Location, ty: &Ty) {
        let cause = cx.cause.clone().unwrap_or_else(|| site.clone());
        self.tracker.assign(binding, site, ty, &cause);
    }

    /// Bind `name` in the innermost scope.
    fn declare_local(&mut self, cx: &mut UnitCx, name: &str) -> BindingId {
        let binding = self.tracker.binding(BindingKey::Local {
            unit: cx.unit,
            scope: cx.scopes.owner(),
            name: name.to_string(),
        });
        cx.scopes.declare(name, binding);
        binding
    }

    /// The instance-variable binding `@name` of the current `self`.
    fn ivar_binding(&mut self, cx: &mut UnitCx, name: &str, loc: &Location) -> Option<BindingId> {
        let class = cx
            .self_ty
            .as_ref()
            .and_then(|self_ty| self.classes.class_of(self_ty));
        let Some(class) = class else {
            cx.fail(DiagnosticKind::InstanceVarOutsideClass, loc);
            return None;
        };
        if self.classes.kind(class) == ClassKind::Value {
            cx.fail(
                DiagnosticKind::InstanceVarInValueType {
                    class: self.classes.name(class).to_string(),
                },
                loc,
            );
            return None;
        }
        Some(self.tracker.binding(BindingKey::Ivar {
            class,
            name: name.to_string(),
        }))
    }

    /// The binding an assignment to `target` writes, declaring a new local
    /// if none is visible.
    fn write_target(&mut self, cx: &mut UnitCx, target: &Target, loc: &Location) -> Option<BindingId> {
        match target {
            Target::Local(name) => match cx.scopes.lookup(name) {
                Some(binding) => Some(binding),
                None => Some(self.declare_local(cx, name)),
            },
            Target::Ivar(name) => self.ivar_binding(cx, name, loc),
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn check_body(&mut self, cx: &mut UnitCx, body: &'p [Expr]) -> Check {
        let mut ty = Ty::nil();
        for expr in body {
            ty = self.check_expr(cx, expr)?;
        }
        Ok(ty)
    }

    fn check_expr(&mut self, cx: &mut UnitCx, expr: &'p Expr) -> Check {
        let ty = self.infer_expr(cx, expr)?;
        cx.types.insert(expr.id, ty.clone());
        Ok(ty)
    }

    fn infer_expr(&mut self, cx: &mut UnitCx, expr: &'p Expr) -> Check {
        let ty = match &expr.kind {
            ExprKind::Nil => Ty::nil(),
            ExprKind::Bool(_) => Ty::bool(),
            ExprKind::Int(_) => Ty::int(),
            ExprKind::Double(_) => Ty::double(),
            ExprKind::Char(_) => Ty::char(),
            ExprKind::Str(_) => Ty::string(),

            ExprKind::Ident(name) => match cx.scopes.lookup(name) {
                Some(binding) => self.tracker.read(binding, cx.unit),
                None => self.call_implicit(cx, expr, name, &[], true)?,
            },

            ExprKind::Ivar(name) => match self.ivar_binding(cx, name, &expr.loc) {
                Some(binding) => self.tracker.read(binding, cx.unit),
                None => Ty::Unresolved,
            },

            ExprKind::Out(target) => self.read_target(cx, target, &expr.loc),

            ExprKind::Assign { target, value } => {
                let ty = self.check_expr(cx, value)?;
                match self.write_target(cx, target, &expr.loc) {
                    Some(binding) => {
                        self.assign(cx, binding, &expr.loc, &ty);
                        ty
                    }
                    None => Ty::Unresolved,
                }
            }

            ExprKind::OpAssign { target, op, value } => {
                self.check_op_assign(cx, expr, target, op, value)?
            }

            ExprKind::Call(call) => self.check_call(cx, expr, call)?,

            ExprKind::Path(path) => match self.classes.resolve_type(path) {
                Ok(_) => Ty::class(),
                Err((kind, loc)) => cx.fail(kind, &loc),
            },

            ExprKind::Or(lhs, rhs) | ExprKind::And(lhs, rhs) => {
                let lhs = self.check_expr(cx, lhs)?;
                let rhs = self.check_expr(cx, rhs)?;
                unify(&lhs, &rhs)
            }

            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.check_expr(cx, cond)?;
                let then_ty = self.check_body(cx, then_body)?;
                let else_ty = self.check_body(cx, else_body)?;
                unify(&then_ty, &else_ty)
            }

            ExprKind::While { cond, body } => {
                self.check_expr(cx, cond)?;
                cx.loop_depth += 1;
                let body = self.check_body(cx, body);
                cx.loop_depth -= 1;
                body?;
                Ty::nil()
            }

            ExprKind::Break => self.check_loop_keyword(cx, "break", &expr.loc),
            ExprKind::Next => self.check_loop_keyword(cx, "next", &expr.loc),
        };
        Ok(ty)
    }

    /// Read a variable named by an `out` marker outside an external call.
    fn read_target(&mut self, cx: &mut UnitCx, target: &Target, loc: &Location) -> Ty {
        match target {
            Target::Local(name) => match cx.scopes.lookup(name) {
                Some(binding) => self.tracker.read(binding, cx.unit),
                None => cx.fail(
                    DiagnosticKind::UndefinedLocalOrMethod { name: name.clone() },
                    loc,
                ),
            },
            Target::Ivar(name) => match self.ivar_binding(cx, name, loc) {
                Some(binding) => self.tracker.read(binding, cx.unit),
                None => Ty::Unresolved,
            },
        }
    }

    fn check_loop_keyword(&self, cx: &mut UnitCx, keyword: &str, loc: &Location) -> Ty {
        if cx.loop_depth == 0 {
            return cx.fail(
                DiagnosticKind::InvalidControlFlow {
                    keyword: keyword.to_string(),
                },
                loc,
            );
        }
        Ty::nil()
    }

    /// `target op= value`: dispatch `op` on the current type, then assign.
    fn check_op_assign(
        &mut self,
        cx: &mut UnitCx,
        expr: &'p Expr,
        target: &Target,
        op: &str,
        value: &'p Expr,
    ) -> Check {
        let binding = match target {
            Target::Local(name) => match cx.scopes.lookup(name) {
                Some(binding) => binding,
                None => {
                    return Ok(cx.fail(
                        DiagnosticKind::OpAssignBeforeDefinition {
                            op: format!("{op}="),
                            name: name.clone(),
                        },
                        &expr.loc,
                    ))
                }
            },
            Target::Ivar(name) => match self.ivar_binding(cx, name, &expr.loc) {
                Some(binding) => binding,
                None => return Ok(Ty::Unresolved),
            },
        };
        let current = self.tracker.read(binding, cx.unit);
        let rhs = self.check_expr(cx, value)?;
        let ty = self.dispatch(cx, expr, &current, op, &[rhs])?;
        self.assign(cx, binding, &expr.loc, &ty);
        Ok(ty)
    }

    // ── Calls ──────────────────────────────────────────────────────────

    fn check_call(&mut self, cx: &mut UnitCx, expr: &'p Expr, call: &'p Call) -> Check {
        let Some(receiver) = call.receiver.as_deref() else {
            let args = self.check_args(cx, &call.args)?;
            self.check_block(cx, expr, call.block.as_ref())?;
            let bare = !call.parens && call.args.is_empty();
            return self.call_implicit(cx, expr, &call.name, &args, bare);
        };

        if call.name == "ptr" {
            return self.check_ptr(cx, expr, receiver, call);
        }
        if let ExprKind::Path(path) = &receiver.kind {
            if self.classes.lookup_class(&path.name).is_some() {
                return self.check_class_call(cx, expr, receiver, path, call);
            }
            if let Some(lib) = self.classes.lookup_lib(&path.name) {
                return self.check_external_call(cx, expr, receiver, lib, call);
            }
        }

        let receiver_ty = self.check_expr(cx, receiver)?;
        let args = self.check_args(cx, &call.args)?;
        self.check_block(cx, expr, call.block.as_ref())?;
        self.dispatch(cx, expr, &receiver_ty, &call.name, &args)
    }

    fn check_args(&mut self, cx: &mut UnitCx, args: &'p [Expr]) -> Check<Vec<Ty>> {
        args.iter().map(|arg| self.check_expr(cx, arg)).collect()
    }

    /// Check a literal block in a scope of its own. Block parameters have
    /// no type until something assigns them.
    fn check_block(&mut self, cx: &mut UnitCx, call: &Expr, block: Option<&'p Block>) -> Check<()> {
        let Some(block) = block else { return Ok(()) };
        cx.scopes.push(ScopeOwner::Block(call.id));
        for param in &block.params {
            self.declare_local(cx, param);
        }
        cx.loop_depth += 1;
        let body = self.check_body(cx, &block.body);
        cx.loop_depth -= 1;
        cx.scopes.pop();
        body.map(|_| ())
    }

    /// Call `name` on a receiver of type `receiver`, distributing over the
    /// members of a union receiver.
    fn dispatch(&mut self, cx: &mut UnitCx, expr: &Expr, receiver: &Ty, name: &str, args: &[Ty]) -> Check {
        let mut result = Ty::Unresolved;
        for member in receiver.members() {
            let candidates = self.candidates(member, name);
            if candidates.is_empty() {
                return Ok(cx.fail(
                    DiagnosticKind::UndefinedMethod {
                        name: name.to_string(),
                        owner: Some(member.to_string()),
                    },
                    &expr.loc,
                ));
            }
            match self.resolve(cx, expr, Some(member), name, &candidates, args)? {
                Some(ty) => result = unify(&result, &ty),
                None => return Ok(Ty::Unresolved),
            }
        }
        Ok(result)
    }

    /// Call `name` without a receiver: methods of `self` first, then
    /// top-level definitions.
    fn call_implicit(&mut self, cx: &mut UnitCx, expr: &Expr, name: &str, args: &[Ty], bare: bool) -> Check {
        if let Some(self_ty) = cx.self_ty.clone() {
            let candidates = self.candidates(&self_ty, name);
            if !candidates.is_empty() {
                let ty = self.resolve(cx, expr, Some(&self_ty), name, &candidates, args)?;
                return Ok(ty.unwrap_or(Ty::Unresolved));
            }
        }

        let candidates: Vec<Candidate> = self
            .methods
            .top_level(name)
            .into_iter()
            .map(Candidate::Def)
            .collect();
        if candidates.is_empty() {
            let kind = if bare {
                DiagnosticKind::UndefinedLocalOrMethod {
                    name: name.to_string(),
                }
            } else {
                DiagnosticKind::UndefinedMethod {
                    name: name.to_string(),
                    owner: None,
                }
            };
            return Ok(cx.fail(kind, &expr.loc));
        }
        let ty = self.resolve(cx, expr, None, name, &candidates, args)?;
        Ok(ty.unwrap_or(Ty::Unresolved))
    }

    /// User definitions visible on `member` followed by its primitives.
    fn candidates(&self, member: &Ty, name: &str) -> Vec<Candidate> {
        let Some(con) = member.as_con() else {
            return Vec::new();
        };
        let mut candidates: Vec<Candidate> = match self.classes.lookup_class(&con.name) {
            Some(class) => self
                .methods
                .lookup(&self.classes, class, name)
                .into_iter()
                .map(Candidate::Def)
                .collect(),
            None => Vec::new(),
        };
        candidates.extend(
            builtins::primitives(con, name)
                .into_iter()
                .map(Candidate::Primitive),
        );
        candidates
    }

    fn signature(&self, candidate: &Candidate) -> Signature {
        match candidate {
            Candidate::Def(id) => self.methods.get(*id).signature.clone(),
            Candidate::Primitive(primitive) => primitive.signature(),
        }
    }

    /// Resolve one receiver's overload set and instantiate the matches.
    ///
    /// `Ok(None)` means a diagnostic was recorded. A call whose arity fits
    /// but whose argument types are not all known yet resolves to
    /// `Unresolved` and is decided on a later re-check.
    fn resolve(
        &mut self,
        cx: &mut UnitCx,
        expr: &Expr,
        self_ty: Option<&Ty>,
        name: &str,
        candidates: &[Candidate],
        args: &[Ty],
    ) -> Check<Option<Ty>> {
        let signatures: Vec<Signature> = candidates.iter().map(|c| self.signature(c)).collect();
        if let Err(err) = overload::check_arity(&signatures, args.len()) {
            self.report_resolve_error(cx, expr, name, err);
            return Ok(None);
        }
        if args.iter().any(Ty::is_unresolved) {
            trace!(name, "deferred until argument types are known");
            return Ok(Some(Ty::Unresolved));
        }

        let matches = match overload::resolve(&signatures, args, &self.classes) {
            Ok(matches) => matches,
            Err(err) => {
                self.report_resolve_error(cx, expr, name, err);
                return Ok(None);
            }
        };
        trace!(
            name,
            receiver = ?self_ty,
            args = ?args,
            matches = matches.len(),
            "resolved call"
        );

        let mut result = Ty::Unresolved;
        for found in matches {
            let (ty, target) = match &candidates[found.candidate] {
                Candidate::Def(def) => {
                    let (instance, ty) =
                        self.instantiate(cx, expr, *def, self_ty.cloned(), found.args.clone())?;
                    (ty, CallTarget::Method { def: *def, instance })
                }
                Candidate::Primitive(primitive) => (
                    primitive.ret.clone(),
                    CallTarget::Primitive {
                        name: name.to_string(),
                    },
                ),
            };
            cx.record_call(
                expr.id,
                ResolvedCall {
                    receiver: self_ty.cloned(),
                    target,
                    args: found.args,
                    ret: ty.clone(),
                },
            );
            result = unify(&result, &ty);
        }
        Ok(Some(result))
    }

    fn report_resolve_error(&self, cx: &mut UnitCx, expr: &Expr, name: &str, err: ResolveError) {
        let kind = match err {
            ResolveError::WrongArity { given, expected } => DiagnosticKind::WrongNumberOfArguments {
                name: name.to_string(),
                given,
                expected,
            },
            ResolveError::NoMatch { args } => DiagnosticKind::NoOverloadMatches {
                name: name.to_string(),
                args,
            },
        };
        cx.fail(kind, &expr.loc);
    }

    // ── Intrinsics and class methods ───────────────────────────────────

    /// `var.ptr`: a pointer to a local or instance variable.
    fn check_ptr(&mut self, cx: &mut UnitCx, expr: &Expr, receiver: &'p Expr, call: &'p Call) -> Check {
        let target = match &receiver.kind {
            ExprKind::Ident(name) => cx.scopes.lookup(name),
            ExprKind::Ivar(name) => match self.ivar_binding(cx, name, &receiver.loc) {
                Some(binding) => Some(binding),
                None => return Ok(Ty::Unresolved),
            },
            _ => None,
        };
        let Some(binding) = target else {
            return Ok(cx.fail(DiagnosticKind::PointerOfNonVariable, &expr.loc));
        };
        if !call.args.is_empty() {
            return Ok(cx.fail(
                DiagnosticKind::WrongNumberOfArguments {
                    name: "ptr".to_string(),
                    given: call.args.len(),
                    expected: Arity { min: 0, max: 0 },
                },
                &expr.loc,
            ));
        }
        if call.block.is_some() {
            return Ok(cx.fail(
                DiagnosticKind::BlockNotAccepted {
                    name: "ptr".to_string(),
                },
                &expr.loc,
            ));
        }

        let element = self.tracker.read(binding, cx.unit);
        cx.types.insert(receiver.id, element.clone());
        if element.is_unresolved() {
            return Ok(Ty::Unresolved);
        }
        let ty = Ty::pointer(element.clone());
        cx.record_call(
            expr.id,
            ResolvedCall {
                receiver: Some(element),
                target: CallTarget::Pointer,
                args: Vec::new(),
                ret: ty.clone(),
            },
        );
        Ok(ty)
    }

    /// `Class.name(args)`: allocation and class-level primitives.
    fn check_class_call(
        &mut self,
        cx: &mut UnitCx,
        expr: &'p Expr,
        receiver: &'p Expr,
        path: &TypeRef,
        call: &'p Call,
    ) -> Check {
        let class_ty = match self.classes.resolve_type(path) {
            Ok(ty) => ty,
            Err((kind, loc)) => return Ok(cx.fail(kind, &loc)),
        };
        cx.types.insert(receiver.id, Ty::class());
        let args = self.check_args(cx, &call.args)?;
        self.check_block(cx, expr, call.block.as_ref())?;

        match call.name.as_str() {
            "new" => self.check_new(cx, expr, class_ty, &args),
            "malloc" if path.name == "Pointer" => {
                let Some(con) = class_ty.as_con() else {
                    return Ok(Ty::Unresolved);
                };
                match builtins::pointer_malloc(con) {
                    Ok(primitive) => {
                        let candidates = [Candidate::Primitive(primitive)];
                        let ty = self.resolve(cx, expr, Some(&class_ty), "malloc", &candidates, &args)?;
                        Ok(ty.unwrap_or(Ty::Unresolved))
                    }
                    Err(kind) => Ok(cx.fail(kind, &expr.loc)),
                }
            }
            name => Ok(cx.fail(
                DiagnosticKind::UndefinedMethod {
                    name: name.to_string(),
                    owner: Some(format!("{}:Class", path.name)),
                },
                &expr.loc,
            )),
        }
    }

    /// `Class.new(args)`: runs a visible `initialize` on the new instance.
    fn check_new(&mut self, cx: &mut UnitCx, expr: &Expr, instance: Ty, args: &[Ty]) -> Check {
        let Some(class) = self.classes.class_of(&instance) else {
            return Ok(Ty::Unresolved);
        };
        let initializers: Vec<Candidate> = self
            .methods
            .lookup(&self.classes, class, "initialize")
            .into_iter()
            .map(Candidate::Def)
            .collect();

        if initializers.is_empty() {
            if !args.is_empty() {
                return Ok(cx.fail(
                    DiagnosticKind::WrongNumberOfArguments {
                        name: "new".to_string(),
                        given: args.len(),
                        expected: Arity { min: 0, max: 0 },
                    },
                    &expr.loc,
                ));
            }
        } else if self
            .resolve(cx, expr, Some(&instance), "initialize", &initializers, args)?
            .is_none()
        {
            return Ok(Ty::Unresolved);
        }

        cx.record_call(
            expr.id,
            ResolvedCall {
                receiver: None,
                target: CallTarget::Allocate {
                    class: self.classes.name(class).to_string(),
                },
                args: args.to_vec(),
                ret: instance.clone(),
            },
        );
        Ok(instance)
    }

    /// `Lib.fun(args)`: exact matching against a native declaration.
    fn check_external_call(
        &mut self,
        cx: &mut UnitCx,
        expr: &'p Expr,
        receiver: &'p Expr,
        lib: LibId,
        call: &'p Call,
    ) -> Check {
        cx.types.insert(receiver.id, Ty::class());
        let lib_name = self.classes.lib(lib).name.clone();
        let Some(fun) = self.classes.lib(lib).funs.get(&call.name).cloned() else {
            return Ok(cx.fail(
                DiagnosticKind::UndefinedMethod {
                    name: call.name.clone(),
                    owner: Some(lib_name),
                },
                &expr.loc,
            ));
        };

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let external = match &arg.kind {
                ExprKind::Out(target) => {
                    let ty = self.peek_target(cx, target, &arg.loc);
                    cx.types.insert(arg.id, ty.clone());
                    ExternalArg { ty, is_out: true }
                }
                _ => ExternalArg {
                    ty: self.check_expr(cx, arg)?,
                    is_out: false,
                },
            };
            args.push(external);
        }
        self.check_block(cx, expr, call.block.as_ref())?;

        match external::check_call(&lib_name, &fun, &args, &self.classes) {
            Ok(ExternalCheck::Accepted) => {}
            Ok(ExternalCheck::Deferred) => {
                trace!(lib = %lib_name, fun = %fun.name, "external call deferred");
            }
            Err(kind) => return Ok(cx.fail(kind, &expr.loc)),
        }

        for (arg, param) in call.args.iter().zip(&fun.params) {
            if let (ExprKind::Out(target), PassingMode::Out) = (&arg.kind, param.mode) {
                if let Some(binding) = self.write_target(cx, target, &arg.loc) {
                    self.assign(cx, binding, &arg.loc, &param.ty);
                }
                cx.types.insert(arg.id, param.ty.clone());
            }
        }

        cx.record_call(
            expr.id,
            ResolvedCall {
                receiver: None,
                target: CallTarget::External {
                    lib: lib_name,
                    fun: fun.name.clone(),
                },
                args: args.into_iter().map(|arg| arg.ty).collect(),
                ret: fun.ret.clone(),
            },
        );
        Ok(fun.ret)
    }

    /// Current type of an `out` target, or `Unresolved` when it is not
    /// defined yet.
    fn peek_target(&mut self, cx: &mut UnitCx, target: &Target, loc: &Location) -> Ty {
        match target {
            Target::Local(name) => match cx.scopes.lookup(name) {
                Some(binding) => self.tracker.read(binding, cx.unit),
                None => Ty::Unresolved,
            },
            Target::Ivar(name) => match self.ivar_binding(cx, name, loc) {
                Some(binding) => self.tracker.read(binding, cx.unit),
                None => Ty::Unresolved,
            },
        }
    }

    // ── Output ─────────────────────────────────────────────────────────

    fn has_diagnostics(&self) -> bool {
        self.units.iter().any(|unit| !unit.diagnostics.is_empty())
    }

    fn return_type(&self, unit: UnitId) -> Ty {
        self.tracker
            .find(&BindingKey::Return(unit))
            .map(|binding| self.tracker.peek(binding).clone())
            .unwrap_or(Ty::Unresolved)
    }

    fn finish(self) -> Result<TypeckResult, AnalysisError> {
        let first = self
            .units
            .iter()
            .enumerate()
            .flat_map(|(unit, u)| {
                u.diagnostics
                    .iter()
                    .enumerate()
                    .map(move |(order, d)| ((d.location.clone(), unit, order), d))
            })
            .min_by(|a, b| a.0.cmp(&b.0));
        if let Some((_, diagnostic)) = first {
            return Err(AnalysisError::Diagnostic(diagnostic.clone()));
        }

        let mut types: FxHashMap<NodeId, Ty> = FxHashMap::default();
        let mut calls: FxHashMap<NodeId, Vec<ResolvedCall>> = FxHashMap::default();
        for unit in &self.units {
            for (node, ty) in &unit.types {
                let entry = types.entry(*node).or_insert(Ty::Unresolved);
                *entry = unify(entry, ty);
            }
            for (node, resolved) in &unit.calls {
                let entry = calls.entry(*node).or_default();
                for call in resolved {
                    let mut call = call.clone();
                    if let CallTarget::Method { instance, .. } = &call.target {
                        call.ret = self.return_type(*instance);
                    }
                    call.ret = call.ret.finalized();
                    call.args = call.args.iter().map(Ty::finalized).collect();
                    if !entry.contains(&call) {
                        entry.push(call);
                    }
                }
            }
        }
        let types = types
            .into_iter()
            .map(|(node, ty)| (node, ty.finalized()))
            .collect();

        let instances = self
            .units
            .iter()
            .enumerate()
            .filter_map(|(index, unit)| {
                let key = unit.instance.as_ref()?;
                let id = UnitId(index as u32);
                Some(MethodInstance {
                    unit: id,
                    def: key.def,
                    name: self.methods.get(key.def).name.clone(),
                    self_ty: key.self_ty.clone(),
                    args: key.args.clone(),
                    ret: self.return_type(id).finalized(),
                })
            })
            .collect();

        let result_type = if self.top_level.is_empty() {
            None
        } else {
            self.units.first().map(|top| top.result.finalized())
        };

        Ok(TypeckResult {
            types,
            calls,
            instances,
            result_type,
        })
    }
}
