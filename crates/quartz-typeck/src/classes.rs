//! The global symbol table: classes and external libraries.
//!
//! Classes form a single-inheritance tree stored in an index-based arena;
//! each node keeps its parent's [`ClassId`]. A superclass is fixed at first
//! declaration, so the tree can never contain a cycle. Libraries live in
//! their own namespace and hold native function declarations.
//!
//! The table is written only during the declaration pass and is read-only
//! while bodies are checked.

use quartz_common::Location;
use rustc_hash::FxHashMap;

use crate::error::DiagnosticKind;
use crate::ty::{Ty, TyCon};
use crate::unify::Hierarchy;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LibId(pub u32);

/// Reference classes are shared by pointer; value classes are copied and
/// cannot hold instance variables.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClassKind {
    Reference,
    Value,
}

#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: String,
    pub superclass: Option<ClassId>,
    pub kind: ClassKind,
    /// Names of generic type parameters, e.g. `["T"]` for `Pointer(T)`.
    pub type_params: Vec<String>,
}

/// How a native parameter is passed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassingMode {
    ByValue,
    /// The callee writes the value back into the caller's variable.
    Out,
}

#[derive(Clone, Debug)]
pub struct ExternalParam {
    pub name: String,
    pub ty: Ty,
    pub mode: PassingMode,
}

/// A native function declared in a `lib` block. Never overloaded.
#[derive(Clone, Debug)]
pub struct ExternalFn {
    pub name: String,
    pub params: Vec<ExternalParam>,
    pub ret: Ty,
}

#[derive(Clone, Debug)]
pub struct LibInfo {
    pub name: String,
    pub funs: FxHashMap<String, ExternalFn>,
}

/// Classes and libraries by name.
#[derive(Default, Debug)]
pub struct SymbolTable {
    classes: Vec<ClassInfo>,
    class_names: FxHashMap<String, ClassId>,
    libs: Vec<LibInfo>,
    lib_names: FxHashMap<String, LibId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Classes ─────────────────────────────────────────────────────────

    /// Register a builtin class. Builtins are declared parents-first.
    pub fn add_builtin(
        &mut self,
        name: &str,
        superclass: Option<&str>,
        kind: ClassKind,
        type_params: &[&str],
    ) -> ClassId {
        let superclass = superclass.and_then(|s| self.class_names.get(s).copied());
        self.insert_class(ClassInfo {
            name: name.to_string(),
            superclass,
            kind,
            type_params: type_params.iter().map(|p| p.to_string()).collect(),
        })
    }

    fn insert_class(&mut self, info: ClassInfo) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.class_names.insert(info.name.clone(), id);
        self.classes.push(info);
        id
    }

    /// Declare or reopen a user class.
    ///
    /// A new class without an explicit superclass inherits from `default`.
    /// Reopening an existing class with an explicit superclass different
    /// from the established one is a `SuperclassMismatch`; reopening
    /// without one keeps the original.
    pub fn declare_class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        default: ClassId,
    ) -> Result<ClassId, DiagnosticKind> {
        if let Some(&existing) = self.class_names.get(name) {
            let established = self.classes[existing.0 as usize].superclass;
            if let Some(given) = superclass {
                if established != Some(given) {
                    return Err(DiagnosticKind::SuperclassMismatch {
                        class: name.to_string(),
                        given: self.name(given).to_string(),
                        existing: established
                            .map(|s| self.name(s).to_string())
                            .unwrap_or_else(|| "nothing".to_string()),
                    });
                }
            }
            return Ok(existing);
        }

        let parent = superclass.unwrap_or(default);
        let kind = self.kind(parent);
        Ok(self.insert_class(ClassInfo {
            name: name.to_string(),
            superclass: Some(parent),
            kind,
            type_params: Vec::new(),
        }))
    }

    pub fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_names.get(name).copied()
    }

    pub fn class(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.0 as usize]
    }

    pub fn name(&self, id: ClassId) -> &str {
        &self.class(id).name
    }

    pub fn kind(&self, id: ClassId) -> ClassKind {
        self.class(id).kind
    }

    /// The class of a concrete type.
    pub fn class_of(&self, ty: &Ty) -> Option<ClassId> {
        ty.as_con().and_then(|con| self.lookup_class(&con.name))
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn ancestors(&self, id: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(Some(id), move |&c| self.class(c).superclass)
    }

    /// Resolve a written type reference to a type.
    ///
    /// Generic classes may be written bare (`Pointer`), which leaves the
    /// type parameter unbound; otherwise the argument count must match.
    pub fn resolve_type(&self, ty: &quartz_ast::TypeRef) -> Result<Ty, (DiagnosticKind, Location)> {
        let id = self.lookup_class(&ty.name).ok_or_else(|| {
            (
                DiagnosticKind::UninitializedConstant {
                    name: ty.name.clone(),
                },
                ty.loc.clone(),
            )
        })?;
        let expected = self.class(id).type_params.len();
        if !ty.args.is_empty() && ty.args.len() != expected {
            return Err((
                DiagnosticKind::WrongTypeArgumentCount {
                    name: self.generic_display(id),
                    given: ty.args.len(),
                    expected,
                },
                ty.loc.clone(),
            ));
        }
        let args = ty
            .args
            .iter()
            .map(|arg| self.resolve_type(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Ty::Con(TyCon::with_args(ty.name.clone(), args)))
    }

    /// `Pointer(T)` style display of a class with its type parameters.
    fn generic_display(&self, id: ClassId) -> String {
        let info = self.class(id);
        if info.type_params.is_empty() {
            info.name.clone()
        } else {
            format!("{}({})", info.name, info.type_params.join(", "))
        }
    }

    // ── Libraries ───────────────────────────────────────────────────────

    /// Declare a lib, or return the existing one when reopened.
    pub fn declare_lib(&mut self, name: &str) -> LibId {
        if let Some(&id) = self.lib_names.get(name) {
            return id;
        }
        let id = LibId(self.libs.len() as u32);
        self.lib_names.insert(name.to_string(), id);
        self.libs.push(LibInfo {
            name: name.to_string(),
            funs: FxHashMap::default(),
        });
        id
    }

    pub fn add_external_fn(&mut self, lib: LibId, fun: ExternalFn) {
        self.libs[lib.0 as usize].funs.insert(fun.name.clone(), fun);
    }

    pub fn lookup_lib(&self, name: &str) -> Option<LibId> {
        self.lib_names.get(name).copied()
    }

    pub fn lib(&self, id: LibId) -> &LibInfo {
        &self.libs[id.0 as usize]
    }
}

impl Hierarchy for SymbolTable {
    fn superclass_of(&self, class: &str) -> Option<&str> {
        let id = self.lookup_class(class)?;
        self.class(id).superclass.map(|s| self.name(s))
    }
}
