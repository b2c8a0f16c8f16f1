pub mod classify;
pub mod console;
pub mod json;
pub mod timeline;
pub mod types;
pub mod view;

pub use classify::{classify, DisplayState};
pub use timeline::Segment;
pub use types::{AnnotatedNode, RunReport, TreeSummary};
pub use view::ViewState;

use crate::result::{NodeId, ResultTree};
use chrono::{DateTime, Utc};

/// Annotate the whole tree. Nothing is stored back on the nodes.
pub fn annotate(tree: &ResultTree, view: &ViewState, now: DateTime<Utc>) -> AnnotatedNode {
    annotate_node(tree, tree.root(), Segment::FULL, view, now)
}

fn annotate_node(
    tree: &ResultTree,
    id: NodeId,
    segment: Segment,
    view: &ViewState,
    now: DateTime<Utc>,
) -> AnnotatedNode {
    let node = &tree[id];
    let children = timeline::segments(tree, id, now)
        .into_iter()
        .map(|(child, segment)| annotate_node(tree, child, segment, view, now))
        .collect();

    AnnotatedNode {
        id,
        name: node.name.clone(),
        kind: node.kind,
        state: node.state,
        display_state: classify(node),
        start_date: node.start_date,
        stop_date: node.stop_date,
        duration_secs: node.elapsed_secs(),
        warning_time: node.warning_time,
        warning_exceeded: classify::warning_exceeded(node),
        segment,
        exception: node.exception.clone(),
        screenshot_url: node
            .exception
            .as_ref()
            .and_then(|exception| exception.screenshot.as_ref())
            .map(|shot| shot.retrieval_path()),
        expanded: view.is_expanded(id),
        show_stack_trace: view.shows_stack_trace(id),
        children,
    }
}

pub fn build_report(
    run_id: &str,
    tree: &ResultTree,
    view: &ViewState,
    now: DateTime<Utc>,
) -> RunReport {
    RunReport {
        run_id: run_id.to_string(),
        summary: tree.summary(),
        root: annotate(tree, view, now),
        generated_at: now.to_rfc3339(),
    }
}
