use super::types::{NodeId, NodeKind, ResultNode};
use crate::report::classify::{classify, DisplayState};
use crate::report::types::TreeSummary;
use chrono::{DateTime, Utc};
use std::ops::Index;

/// Result tree of one run.
///
/// Nodes live in an arena and are never removed or moved, so a [`NodeId`]
/// handed out by the tree stays valid for the tree's whole life. Mutation
/// happens only through [`ResultTree::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTree {
    nodes: Vec<ResultNode>,
}

impl ResultTree {
    /// Create the tree for a run that just started: a RUNNING suite, no children.
    pub fn new(suite: &str) -> Self {
        Self {
            nodes: vec![ResultNode::new(suite, NodeKind::Suite, None)],
        }
    }

    pub fn started(suite: &str, start_date: DateTime<Utc>) -> Self {
        let mut tree = Self::new(suite);
        tree.nodes[0].start_date = Some(start_date);
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_node(&self) -> &ResultNode {
        &self.nodes[0]
    }

    pub fn suite_name(&self) -> &str {
        &self.nodes[0].name
    }

    pub fn get(&self, id: NodeId) -> Option<&ResultNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its suite, so this is never true.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The run is closed once the suite reached a terminal state.
    pub fn is_closed(&self) -> bool {
        self.nodes[0].state.is_terminal()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &ResultNode)> + '_ {
        self[id]
            .children
            .iter()
            .map(move |child| (*child, &self.nodes[child.0]))
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self[parent]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].name == name)
    }

    /// Resolve a path of names starting with the suite name.
    pub fn find_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        let (first, rest) = path.split_first()?;
        if first.as_ref() != self.suite_name() {
            return None;
        }
        rest.iter()
            .try_fold(self.root(), |node, name| self.find_child(node, name.as_ref()))
    }

    /// Names from the suite down to `id`.
    pub fn path_of(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self[current];
            path.push(node.name.clone());
            cursor = node.parent;
        }
        path.reverse();
        path
    }

    /// Pre-order walk of the whole tree.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        self.descendants(self.root())
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![(id, 0)],
        }
    }

    pub fn summary(&self) -> TreeSummary {
        let mut summary = TreeSummary::default();
        for entry in self.depth_first() {
            summary.total_nodes += 1;
            match entry.node.kind {
                NodeKind::Suite => {}
                NodeKind::Case => summary.cases += 1,
                NodeKind::Step => summary.steps += 1,
                NodeKind::Action => summary.actions += 1,
            }
            match classify(entry.node) {
                DisplayState::Ok => summary.ok += 1,
                DisplayState::Running => summary.running += 1,
                DisplayState::Warning => summary.warning += 1,
                DisplayState::Error => summary.error += 1,
            }
        }
        summary.finished = self.is_closed();
        summary.total_duration_secs = self.root_node().elapsed_secs();
        summary
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut ResultNode {
        &mut self.nodes[id.0]
    }

    /// Append a RUNNING placeholder under `parent`.
    pub(crate) fn push_child(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ResultNode::new(name, kind, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }
}

impl Index<NodeId> for ResultTree {
    type Output = ResultNode;

    fn index(&self, id: NodeId) -> &ResultNode {
        &self.nodes[id.0]
    }
}

/// Visited node with its depth below the walk's starting point
#[derive(Debug, Clone, Copy)]
pub struct TreeEntry<'a> {
    pub id: NodeId,
    pub depth: usize,
    pub node: &'a ResultNode,
}

/// Lazy pre-order iterator over a [`ResultTree`]
pub struct DepthFirst<'a> {
    tree: &'a ResultTree,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = TreeEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        let node = self.tree.get(id)?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (*child, depth + 1)));
        Some(TreeEntry { id, depth, node })
    }
}
