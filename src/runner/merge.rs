use super::payload::{NodeUpdate, ResultPayload};
use crate::error::MergeError;
use crate::result::{NodeId, NodeKind, ResultState, ResultTree};
use std::collections::HashSet;

/// What a successful merge did to the tree
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Node the payload was addressed to
    pub target: NodeId,
    /// Nodes appended by this merge, in creation order
    pub created: Vec<NodeId>,
    /// Whether any node field or the tree shape changed
    pub changed: bool,
    /// The suite reached a terminal state with this merge
    pub finished: bool,
}

impl MergeOutcome {
    pub fn is_structural(&self) -> bool {
        !self.created.is_empty()
    }
}

impl ResultTree {
    /// Merge one payload into the tree in place.
    ///
    /// The payload is validated in full before anything is touched, so a
    /// rejected payload leaves the tree exactly as it was. Existing nodes keep
    /// their handles; new nodes are appended after their existing siblings.
    pub fn merge(&mut self, payload: &ResultPayload) -> Result<MergeOutcome, MergeError> {
        self.check_path(&payload.path)?;

        let stale = || MergeError::StaleUpdate {
            path: payload.path.clone(),
        };
        if self.is_closed() {
            return Err(stale());
        }

        let mut target = Some(self.root());
        for name in &payload.path[1..] {
            let Some(ancestor) = target else { break };
            if self[ancestor].state.is_terminal() {
                return Err(stale());
            }
            target = self.find_child(ancestor, name);
        }

        self.check_update(target, &payload.update, &payload.path)?;

        let mut created = Vec::new();
        let mut node = self.root();
        for (depth, name) in payload.path.iter().enumerate().skip(1) {
            node = match self.find_child(node, name) {
                Some(existing) => existing,
                None => {
                    let kind = NodeKind::from_depth(depth).unwrap_or(NodeKind::Action);
                    let placeholder = self.push_child(node, name, kind);
                    created.push(placeholder);
                    placeholder
                }
            };
        }

        let changed = self.apply_update(node, &payload.update, &mut created);
        let finished = self.is_closed();
        if finished {
            log::info!("Run for suite '{}' finished", self.suite_name());
        }
        log::debug!(
            "Merged update for {} ({} new nodes)",
            payload.path.join("/"),
            created.len()
        );

        Ok(MergeOutcome {
            target: node,
            changed: changed || !created.is_empty(),
            created,
            finished,
        })
    }

    fn check_path(&self, path: &[String]) -> Result<(), MergeError> {
        let Some(suite) = path.first() else {
            return Err(MergeError::malformed("payload path is empty"));
        };
        if path.len() > NodeKind::MAX_DEPTH + 1 {
            return Err(MergeError::malformed(format!(
                "path {} is deeper than an action",
                path.join("/")
            )));
        }
        if path.iter().any(|name| name.trim().is_empty()) {
            return Err(MergeError::malformed(format!(
                "path {:?} contains an empty name",
                path
            )));
        }
        if suite != self.suite_name() {
            return Err(MergeError::malformed(format!(
                "payload is addressed to suite '{}' but the run tracks '{}'",
                suite,
                self.suite_name()
            )));
        }
        Ok(())
    }

    /// Validate `update` against the node at `path`, if that exists yet.
    ///
    /// Nothing may be created under a node that already finished, however
    /// deep in the subtree it is addressed.
    fn check_update(
        &self,
        existing: Option<NodeId>,
        update: &NodeUpdate,
        path: &[String],
    ) -> Result<(), MergeError> {
        let depth = path.len() - 1;
        let current = existing.map(|id| &self[id]);
        let previous_stop = current.and_then(|node| node.stop_date);

        if let (Some(previous), Some(next)) = (previous_stop, update.stop_date) {
            if previous != next {
                return Err(MergeError::malformed(format!(
                    "stop date of a finished node cannot change ({} -> {})",
                    previous.to_rfc3339(),
                    next.to_rfc3339()
                )));
            }
        }

        let start = update
            .start_date
            .or_else(|| current.and_then(|node| node.start_date));
        let stop = update.stop_date.or(previous_stop);
        if let (Some(start), Some(stop)) = (start, stop) {
            if stop < start {
                return Err(MergeError::malformed(format!(
                    "stop date {} is before start date {}",
                    stop.to_rfc3339(),
                    start.to_rfc3339()
                )));
            }
        }

        if update.state == Some(ResultState::Running) && stop.is_some() {
            return Err(MergeError::malformed(
                "a finished node cannot go back to RUNNING",
            ));
        }

        if let Some(limit) = update.warning_time {
            if !limit.is_finite() || limit < 0.0 {
                return Err(MergeError::malformed(format!(
                    "invalid warning time {}",
                    limit
                )));
            }
        }

        if update.children.is_empty() {
            return Ok(());
        }
        if NodeKind::from_depth(depth + 1).is_none() {
            return Err(MergeError::malformed("actions cannot have children"));
        }

        let mut seen = HashSet::new();
        for child in &update.children {
            if child.name.trim().is_empty() {
                return Err(MergeError::malformed("child with an empty name"));
            }
            if !seen.insert(child.name.as_str()) {
                return Err(MergeError::malformed(format!(
                    "duplicate child '{}'",
                    child.name
                )));
            }
            let mut child_path = path.to_vec();
            child_path.push(child.name.clone());

            let existing_child = existing.and_then(|id| self.find_child(id, &child.name));
            let closed_parent = existing.is_some_and(|id| self[id].state.is_terminal());
            if existing_child.is_none() && closed_parent {
                return Err(MergeError::StaleUpdate { path: child_path });
            }
            self.check_update(existing_child, &child.update, &child_path)?;
        }
        Ok(())
    }

    /// Overwrite the fields present in `update`, recursing into children.
    fn apply_update(&mut self, id: NodeId, update: &NodeUpdate, created: &mut Vec<NodeId>) -> bool {
        let node = self.node_mut(id);
        let mut changed = false;
        if let Some(state) = update.state {
            changed |= overwrite(&mut node.state, state);
        }
        if let Some(start) = update.start_date {
            changed |= overwrite(&mut node.start_date, Some(start));
        }
        if let Some(stop) = update.stop_date {
            changed |= overwrite(&mut node.stop_date, Some(stop));
        }
        if let Some(exception) = &update.exception {
            changed |= overwrite(&mut node.exception, Some(exception.clone()));
        }
        if let Some(limit) = update.warning_time {
            changed |= overwrite(&mut node.warning_time, Some(limit));
        }

        let Some(child_kind) = node.kind.child() else {
            return changed;
        };
        for child in &update.children {
            let child_id = match self.find_child(id, &child.name) {
                Some(existing) => existing,
                None => {
                    let new_child = self.push_child(id, &child.name, child_kind);
                    created.push(new_child);
                    new_child
                }
            };
            changed |= self.apply_update(child_id, &child.update, created);
        }
        changed
    }
}

fn overwrite<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
