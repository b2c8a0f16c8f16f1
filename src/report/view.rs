use crate::report::classify::{classify, DisplayState};
use crate::result::{NodeId, ResultTree};
use std::collections::HashSet;

/// UI-local state of a rendered tree, keyed by node handle.
///
/// Handles survive merges, so this state does too.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    expanded: HashSet<NodeId>,
    stack_traces: HashSet<NodeId>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        if expanded {
            self.expanded.insert(id);
        } else {
            self.expanded.remove(&id);
        }
    }

    /// Flip a node open or closed, returning the new state.
    pub fn toggle_expanded(&mut self, id: NodeId) -> bool {
        let expanded = !self.is_expanded(id);
        self.set_expanded(id, expanded);
        expanded
    }

    pub fn expand_all(&mut self, tree: &ResultTree) {
        self.expanded
            .extend(tree.depth_first().map(|entry| entry.id));
    }

    /// Open every ancestor of a failing node so the failure is visible.
    pub fn expand_errors(&mut self, tree: &ResultTree) {
        let failing: Vec<NodeId> = tree
            .depth_first()
            .filter(|entry| classify(entry.node) == DisplayState::Error)
            .map(|entry| entry.id)
            .collect();
        for id in failing {
            let mut cursor = tree[id].parent();
            while let Some(parent) = cursor {
                self.expanded.insert(parent);
                cursor = tree[parent].parent();
            }
        }
    }

    pub fn shows_stack_trace(&self, id: NodeId) -> bool {
        self.stack_traces.contains(&id)
    }

    pub fn toggle_stack_trace(&mut self, id: NodeId) -> bool {
        if self.stack_traces.remove(&id) {
            false
        } else {
            self.stack_traces.insert(id);
            true
        }
    }
}
