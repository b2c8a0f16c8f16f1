use crate::result::{ResultNode, ResultState};
use serde::Serialize;

/// User-facing severity of a node.
///
/// Variants are declared in ascending severity so `Ord` picks the worse of two.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum DisplayState {
    Ok,
    Running,
    Warning,
    Error,
}

impl DisplayState {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayState::Ok => "OK",
            DisplayState::Running => "RUNNING",
            DisplayState::Warning => "WARNING",
            DisplayState::Error => "ERROR",
        }
    }
}

impl From<ResultState> for DisplayState {
    fn from(state: ResultState) -> Self {
        match state {
            ResultState::Ok | ResultState::Unknown => DisplayState::Ok,
            ResultState::Running => DisplayState::Running,
            ResultState::Warning => DisplayState::Warning,
            ResultState::Error => DisplayState::Error,
        }
    }
}

/// Derive the display state of a node.
///
/// Never cache the result: a later merge may attach an exception or a
/// warning time to the same node.
pub fn classify(node: &ResultNode) -> DisplayState {
    if node.exception.is_some() {
        return DisplayState::Error;
    }
    if node.state == ResultState::Running {
        return DisplayState::Running;
    }

    let reported = DisplayState::from(node.state);
    if warning_exceeded(node) {
        reported.max(DisplayState::Warning)
    } else {
        reported
    }
}

/// True when a finished node ran longer than its warning time.
pub fn warning_exceeded(node: &ResultNode) -> bool {
    match (node.elapsed_secs(), node.warning_time) {
        (Some(elapsed), Some(limit)) => elapsed > limit,
        _ => false,
    }
}
