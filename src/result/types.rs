use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status reported by the test runner for a single node
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultState {
    Ok,
    Warning,
    Error,
    Running,
    Unknown,
}

impl ResultState {
    /// OK, WARNING and ERROR close a node: no further updates are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResultState::Ok | ResultState::Warning | ResultState::Error
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResultState::Ok => "OK",
            ResultState::Warning => "WARNING",
            ResultState::Error => "ERROR",
            ResultState::Running => "RUNNING",
            ResultState::Unknown => "UNKNOWN",
        }
    }
}

/// Level of a node in the result hierarchy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Suite,
    Case,
    Step,
    Action,
}

impl NodeKind {
    /// Depth of an action, the deepest level.
    pub const MAX_DEPTH: usize = 3;

    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            0 => Some(NodeKind::Suite),
            1 => Some(NodeKind::Case),
            2 => Some(NodeKind::Step),
            3 => Some(NodeKind::Action),
            _ => None,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            NodeKind::Suite => 0,
            NodeKind::Case => 1,
            NodeKind::Step => 2,
            NodeKind::Action => 3,
        }
    }

    /// Kind of this node's children, `None` for actions.
    pub fn child(&self) -> Option<Self> {
        NodeKind::from_depth(self.depth() + 1)
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Suite => "suite",
            NodeKind::Case => "case",
            NodeKind::Step => "step",
            NodeKind::Action => "action",
        }
    }
}

/// Opaque pointer to a stored screenshot.
///
/// The engine never reads the bytes; it only hands out the path the file
/// service resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenshotRef(String);

impl ScreenshotRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative URL of the screenshot on the file service.
    pub fn retrieval_path(&self) -> String {
        format!("api/files?path={}", self.0.trim_start_matches('/'))
    }
}

/// Exception attached to a failed node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    pub detail_message: String,
    #[serde(default)]
    pub stack_trace: String,
    #[serde(default, alias = "screenshotRef", skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<ScreenshotRef>,
}

impl ExceptionInfo {
    pub fn new(detail_message: impl Into<String>) -> Self {
        Self {
            detail_message: detail_message.into(),
            stack_trace: String::new(),
            screenshot: None,
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = stack_trace.into();
        self
    }

    pub fn with_screenshot(mut self, path: impl Into<String>) -> Self {
        self.screenshot = Some(ScreenshotRef::new(path));
        self
    }
}

/// Stable handle to a node inside a [`ResultTree`](super::ResultTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One node of a run's result tree: suite, case, step or action
#[derive(Debug, Clone, PartialEq)]
pub struct ResultNode {
    pub name: String,
    pub kind: NodeKind,
    pub state: ResultState,
    pub start_date: Option<DateTime<Utc>>,
    pub stop_date: Option<DateTime<Utc>>,
    pub exception: Option<ExceptionInfo>,
    /// Seconds after which a finished node is flagged as WARNING
    pub warning_time: Option<f64>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl ResultNode {
    pub(crate) fn new(name: &str, kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            state: ResultState::Running,
            start_date: None,
            stop_date: None,
            exception: None,
            warning_time: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_finished(&self) -> bool {
        self.stop_date.is_some()
    }

    /// `stopDate - startDate`, only known once the node has both.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        match (self.start_date, self.stop_date) {
            (Some(start), Some(stop)) => Some(stop - start),
            _ => None,
        }
    }

    pub fn elapsed_secs(&self) -> Option<f64> {
        self.elapsed()
            .map(|elapsed| elapsed.num_milliseconds() as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_terminal_states() {
        assert!(ResultState::Ok.is_terminal());
        assert!(ResultState::Warning.is_terminal());
        assert!(ResultState::Error.is_terminal());
        assert!(!ResultState::Running.is_terminal());
        assert!(!ResultState::Unknown.is_terminal());
    }

    #[test]
    fn test_kind_depths() {
        assert_eq!(NodeKind::from_depth(2), Some(NodeKind::Step));
        assert_eq!(NodeKind::Step.child(), Some(NodeKind::Action));
        assert_eq!(NodeKind::Action.child(), None);
        assert_eq!(NodeKind::from_depth(4), None);
    }

    #[test]
    fn test_screenshot_retrieval_path() {
        let shot = ScreenshotRef::new("/suite/_logs/_screenshots/error.png");
        assert_eq!(
            shot.retrieval_path(),
            "api/files?path=suite/_logs/_screenshots/error.png"
        );
    }

    #[test]
    fn test_exception_wire_format() {
        let json = r#"{"detailMessage":"element not found","stackTrace":"at step1","screenshot":"/shots/a.png"}"#;
        let exception: ExceptionInfo = serde_json::from_str(json).unwrap();
        assert_eq!(exception.detail_message, "element not found");
        assert_eq!(exception.screenshot, Some(ScreenshotRef::new("/shots/a.png")));

        let minimal: ExceptionInfo = serde_json::from_str(r#"{"detailMessage":"X"}"#).unwrap();
        assert!(minimal.stack_trace.is_empty());
        assert!(minimal.screenshot.is_none());
    }

    #[test]
    fn test_elapsed() {
        let mut node = ResultNode::new("step", NodeKind::Step, None);
        assert_eq!(node.elapsed_secs(), None);

        node.start_date = Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        node.stop_date = Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 12).unwrap());
        assert_eq!(node.elapsed_secs(), Some(12.0));
    }
}
