//! Transition resolution front-end
//!
//! When machine definitions are derived from a labeled graph, states yield
//! condition labels instead of concrete state names. A `TransitionResolver`
//! supplied to the engine rewrites each in-frame `transition` target before
//! validation; it never sees `parent_transition` targets. This is a resolution
//! strategy plugged in at the engine boundary, not a change to the protocol.

use std::collections::HashMap;

use crate::machine::END_STATE;

/// Maps a requested transition target (or condition label) to a concrete state.
pub trait TransitionResolver {
    /// Resolve `requested` for a transition leaving `current_state`. Returning
    /// `None` lets the requested value stand as-is.
    fn resolve(&self, current_state: &str, requested: &str) -> Option<String>;
}

/// One outgoing edge of a labeled graph.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledEdge {
    pub target: String,
    pub label: String,
}

impl LabeledEdge {
    pub fn new(target: impl Into<String>, label: impl Into<String>) -> Self {
        LabeledEdge {
            target: target.into(),
            label: label.into(),
        }
    }
}

/// Resolver backed by labeled edges and per-state overrides.
///
/// Resolution order for a transition leaving state `s` with condition `c`:
/// 1. the override declared for `s`, if any (authoritative);
/// 2. the first declared outgoing edge of `s` whose label equals `c`;
/// 3. `__end__`.
///
/// Edges are kept in declaration order so the first match among identical labels
/// is stable.
#[derive(Debug, Clone, Default)]
pub struct LabeledGraphResolver {
    edges: HashMap<String, Vec<LabeledEdge>>,
    overrides: HashMap<String, String>,
}

impl LabeledGraphResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an outgoing edge `source --label--> target`.
    pub fn edge(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.edges
            .entry(source.into())
            .or_default()
            .push(LabeledEdge::new(target, label));
        self
    }

    /// Declare an override: every transition leaving `source` goes to `target`,
    /// regardless of condition.
    pub fn override_state(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.overrides.insert(source.into(), target.into());
        self
    }
}

impl TransitionResolver for LabeledGraphResolver {
    fn resolve(&self, current_state: &str, requested: &str) -> Option<String> {
        if let Some(target) = self.overrides.get(current_state) {
            return Some(target.clone());
        }
        if let Some(edges) = self.edges.get(current_state) {
            if let Some(edge) = edges.iter().find(|e| e.label == requested) {
                return Some(edge.target.clone());
            }
        }
        Some(END_STATE.to_string())
    }
}
