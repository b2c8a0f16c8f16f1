use thiserror::Error;

/// Why a result payload was not merged into a run's tree.
///
/// Both variants leave the tree untouched. Neither is fatal: the caller
/// reports the condition and keeps consuming the stream.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Stale update for {}: run already finished", .path.join("/"))]
    StaleUpdate { path: Vec<String> },
}

impl MergeError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        MergeError::MalformedPayload(reason.into())
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, MergeError::StaleUpdate { .. })
    }
}

/// Failures talking to the run-configuration store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Run configuration store unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Run configuration store answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Run configuration store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
