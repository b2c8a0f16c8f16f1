use crate::result::{ExceptionInfo, ResultState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields of one node carried by an update.
///
/// Every field is optional: absent fields leave the node untouched, so
/// separate "started" and "finished" messages can target the same node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ResultState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildUpdate>,
}

impl NodeUpdate {
    pub fn with_state(mut self, state: ResultState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn started_at(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn stopped_at(mut self, stop_date: DateTime<Utc>) -> Self {
        self.stop_date = Some(stop_date);
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_warning_time(mut self, seconds: f64) -> Self {
        self.warning_time = Some(seconds);
        self
    }

    pub fn with_child(mut self, name: &str, update: NodeUpdate) -> Self {
        self.children.push(ChildUpdate {
            name: name.to_string(),
            update,
        });
        self
    }
}

/// Named child inside a subtree update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildUpdate {
    pub name: String,
    #[serde(flatten)]
    pub update: NodeUpdate,
}

/// One ingested message: a (partial) node or subtree addressed by the
/// names from the suite down to the node it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub path: Vec<String>,
    #[serde(flatten)]
    pub update: NodeUpdate,
}

impl ResultPayload {
    pub fn new<S: AsRef<str>>(path: &[S], update: NodeUpdate) -> Self {
        Self {
            path: path.iter().map(|name| name.as_ref().to_string()).collect(),
            update,
        }
    }

    /// Payload describing a complete record, addressed to its own name.
    pub fn from_record(record: ChildUpdate) -> Self {
        Self {
            path: vec![record.name],
            update: record.update,
        }
    }

    pub fn suite(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }
}
