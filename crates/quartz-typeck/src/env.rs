//! Lexical scope stack for local variables.
//!
//! A unit check starts with one frame for the method (or program) body;
//! each literal block pushes a frame owned by its call node. Lookups search
//! from the innermost frame outward. A popped frame's names are discarded,
//! never merged into the enclosing frame.
//!
//! Frames only record which names are visible at the current point of the
//! walk. The types live in the [`crate::tracker::Tracker`], keyed by the
//! frame owner, so a later re-check of the same unit reaches the same
//! bindings.

use quartz_ast::NodeId;
use rustc_hash::FxHashMap;

use crate::tracker::BindingId;

/// The construct that opened a scope frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeOwner {
    /// The method or program body.
    Body,
    /// The block attached to the call with this node id.
    Block(NodeId),
}

struct Frame {
    owner: ScopeOwner,
    names: FxHashMap<String, BindingId>,
}

pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    /// A stack holding only the body frame.
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![Frame {
                owner: ScopeOwner::Body,
                names: FxHashMap::default(),
            }],
        }
    }

    pub fn push(&mut self, owner: ScopeOwner) {
        self.frames.push(Frame {
            owner,
            names: FxHashMap::default(),
        });
    }

    /// Pop the innermost block frame. The body frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Owner of the innermost frame.
    pub fn owner(&self) -> ScopeOwner {
        self.frames
            .last()
            .map(|frame| frame.owner)
            .unwrap_or(ScopeOwner::Body)
    }

    /// Make `name` visible in the innermost frame.
    pub fn declare(&mut self, name: &str, binding: BindingId) {
        if let Some(frame) = self.frames.last_mut() {
            frame.names.insert(name.to_string(), binding);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<BindingId> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.names.get(name).copied())
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_in_current_frame() {
        let mut scopes = ScopeStack::new();
        scopes.declare("x", BindingId(0));
        assert_eq!(scopes.lookup("x"), Some(BindingId(0)));
        assert_eq!(scopes.lookup("y"), None);
    }

    #[test]
    fn block_sees_outer_names() {
        let mut scopes = ScopeStack::new();
        scopes.declare("x", BindingId(0));
        scopes.push(ScopeOwner::Block(NodeId(3)));
        assert_eq!(scopes.owner(), ScopeOwner::Block(NodeId(3)));
        assert_eq!(scopes.lookup("x"), Some(BindingId(0)));
    }

    #[test]
    fn popped_frame_is_discarded() {
        let mut scopes = ScopeStack::new();
        scopes.push(ScopeOwner::Block(NodeId(1)));
        scopes.declare("y", BindingId(1));
        scopes.pop();
        assert_eq!(scopes.lookup("y"), None);
        assert_eq!(scopes.owner(), ScopeOwner::Body);
    }

    #[test]
    fn shadowing() {
        let mut scopes = ScopeStack::new();
        scopes.declare("x", BindingId(0));
        scopes.push(ScopeOwner::Block(NodeId(1)));
        scopes.declare("x", BindingId(1));
        assert_eq!(scopes.lookup("x"), Some(BindingId(1)));
        scopes.pop();
        assert_eq!(scopes.lookup("x"), Some(BindingId(0)));
    }

    #[test]
    fn body_frame_is_never_popped() {
        let mut scopes = ScopeStack::new();
        scopes.pop();
        assert_eq!(scopes.owner(), ScopeOwner::Body);
        scopes.declare("x", BindingId(0));
        assert_eq!(scopes.lookup("x"), Some(BindingId(0)));
    }
}
