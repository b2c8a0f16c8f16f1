use super::classify::DisplayState;
use super::timeline::Segment;
use crate::result::{ExceptionInfo, NodeId, NodeKind, ResultState};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Presentation-ready view of one node, derived on demand from the tree
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub state: ResultState,
    pub display_state: DisplayState,
    pub start_date: Option<DateTime<Utc>>,
    pub stop_date: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub warning_time: Option<f64>,
    pub warning_exceeded: bool,
    pub segment: Segment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    pub expanded: bool,
    pub show_stack_trace: bool,
    pub children: Vec<AnnotatedNode>,
}

/// Counts over a whole result tree
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    pub total_nodes: u32,
    pub cases: u32,
    pub steps: u32,
    pub actions: u32,
    pub ok: u32,
    pub running: u32,
    pub warning: u32,
    pub error: u32,
    pub finished: bool,
    pub total_duration_secs: Option<f64>,
}

/// Report of one run for export
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub summary: TreeSummary,
    pub root: AnnotatedNode,
    pub generated_at: String,
}
