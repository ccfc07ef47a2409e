//! Variable type tracking and re-check scheduling.
//!
//! Every variable-like binding (a local of one checking unit, an instance
//! variable of one class, the return value of one method instance) keeps
//! the ordered history of `(site, type)` pairs assigned to it. Its current
//! type is the union of that history and can only grow.
//!
//! Reading a binding records the reading unit as a dependent. When an
//! assignment widens the current type, every dependent is pushed onto a
//! FIFO invalidation queue together with the location that caused the
//! widening. Dependents are kept in ordered sets so the queue order, and
//! with it the whole analysis, is deterministic.
//!
//! A binding that is read but never assigned stays `Unresolved` until the
//! queue drains; [`Tracker::seal_unassigned`] then settles it to a fixed
//! type and re-queues its readers.

use std::collections::{BTreeSet, VecDeque};

use quartz_common::Location;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::classes::ClassId;
use crate::env::ScopeOwner;
use crate::ty::Ty;
use crate::unify::unify;

/// A checking unit: the top-level program or one method instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(pub u32);

impl UnitId {
    pub const TOP_LEVEL: UnitId = UnitId(0);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingId(pub u32);

/// What a binding belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindingKey {
    /// A local of `unit`, declared in the scope owned by `scope`.
    Local {
        unit: UnitId,
        scope: ScopeOwner,
        name: String,
    },
    /// An instance variable of every instance of `class`.
    Ivar { class: ClassId, name: String },
    /// The value returned by a method instance.
    Return(UnitId),
}

#[derive(Debug)]
struct Binding {
    key: BindingKey,
    history: Vec<(Location, Ty)>,
    current: Ty,
    dependents: BTreeSet<UnitId>,
}

/// A unit whose inputs widened since it was last checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invalidation {
    pub unit: UnitId,
    /// The assignment that caused the widening; `None` when the binding
    /// was sealed rather than assigned.
    pub cause: Option<Location>,
}

#[derive(Debug, Default)]
pub struct Tracker {
    bindings: Vec<Binding>,
    by_key: FxHashMap<BindingKey, BindingId>,
    queue: VecDeque<Invalidation>,
    queued: FxHashSet<UnitId>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The binding for `key`, created with an empty history on first use.
    pub fn binding(&mut self, key: BindingKey) -> BindingId {
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = BindingId(self.bindings.len() as u32);
        self.by_key.insert(key.clone(), id);
        self.bindings.push(Binding {
            key,
            history: Vec::new(),
            current: Ty::Unresolved,
            dependents: BTreeSet::new(),
        });
        id
    }

    /// The binding for `key` if it was ever created.
    pub fn find(&self, key: &BindingKey) -> Option<BindingId> {
        self.by_key.get(key).copied()
    }

    /// Current type of `id`, registering `reader` as a dependent.
    pub fn read(&mut self, id: BindingId, reader: UnitId) -> Ty {
        let binding = &mut self.bindings[id.0 as usize];
        binding.dependents.insert(reader);
        binding.current.clone()
    }

    /// Current type of `id` without registering a dependency.
    pub fn peek(&self, id: BindingId) -> &Ty {
        &self.bindings[id.0 as usize].current
    }

    /// Record that `ty` was assigned to `id` at `site`.
    ///
    /// Returns whether the current type widened; if so every dependent is
    /// queued for a re-check attributed to `cause`. Assigning `Unresolved`
    /// records nothing.
    pub fn assign(&mut self, id: BindingId, site: &Location, ty: &Ty, cause: &Location) -> bool {
        if ty.is_unresolved() {
            return false;
        }
        let binding = &mut self.bindings[id.0 as usize];
        if !binding
            .history
            .iter()
            .any(|(s, t)| s == site && t == ty)
        {
            binding.history.push((site.clone(), ty.clone()));
        }

        let widened = unify(&binding.current, ty);
        if widened == binding.current {
            return false;
        }
        tracing::debug!(
            binding = ?binding.key,
            from = %binding.current,
            to = %widened,
            %site,
            "binding widened"
        );
        binding.current = widened;

        let dependents: Vec<UnitId> = binding.dependents.iter().copied().collect();
        for unit in dependents {
            self.enqueue(unit, Some(cause.clone()));
        }
        true
    }

    /// Give every binding that was read but never assigned the type `ty`
    /// and queue its readers.
    ///
    /// Only meaningful once the queue has drained. Returns whether any
    /// binding was sealed.
    pub fn seal_unassigned(&mut self, ty: &Ty) -> bool {
        debug_assert!(self.is_settled());
        let mut readers = BTreeSet::new();
        for binding in &mut self.bindings {
            if !binding.current.is_unresolved() || binding.dependents.is_empty() {
                continue;
            }
            tracing::debug!(binding = ?binding.key, to = %ty, "binding sealed");
            binding.current = ty.clone();
            readers.extend(binding.dependents.iter().copied());
        }
        let sealed = !readers.is_empty();
        for unit in readers {
            self.enqueue(unit, None);
        }
        sealed
    }

    /// Queue `unit` for a re-check unless it is already waiting.
    pub fn enqueue(&mut self, unit: UnitId, cause: Option<Location>) {
        if self.queued.insert(unit) {
            self.queue.push_back(Invalidation { unit, cause });
        }
    }

    /// Next unit to re-check, in the order they were invalidated.
    pub fn pop(&mut self) -> Option<Invalidation> {
        let next = self.queue.pop_front()?;
        self.queued.remove(&next.unit);
        Some(next)
    }

    pub fn is_settled(&self) -> bool {
        self.queue.is_empty()
    }
}
