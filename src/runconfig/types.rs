use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a run is executed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionType {
    Local,
    Dockerfile,
    DockerCompose,
    #[default]
    SakuliContainer,
}

impl ExecutionType {
    /// Whether `container` names an image the run is started in.
    pub fn uses_container_image(&self) -> bool {
        matches!(self, ExecutionType::SakuliContainer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionType::Local => "local",
            ExecutionType::Dockerfile => "dockerfile",
            ExecutionType::DockerCompose => "docker-compose",
            ExecutionType::SakuliContainer => "sakuli-container",
        }
    }
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(ExecutionType::Local),
            "dockerfile" => Ok(ExecutionType::Dockerfile),
            "docker-compose" => Ok(ExecutionType::DockerCompose),
            "sakuli-container" => Ok(ExecutionType::SakuliContainer),
            other => Err(format!("Unknown execution type: {}", other)),
        }
    }
}

/// Parameters of a run, stored under the path of its test suite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub path: String,
    #[serde(default, rename = "type")]
    pub execution_type: ExecutionType,
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RunConfiguration {
    pub fn new(path: &str, container: &str, tags: &[&str]) -> Self {
        Self {
            path: path.to_string(),
            execution_type: ExecutionType::default(),
            container: container.to_string(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}

/// Result of a run-configuration operation.
///
/// `Failed` only reaches callers that asked for store errors to be surfaced;
/// otherwise failures are folded into `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOutcome<T> {
    Ok(T),
    Empty,
    Failed(String),
}

impl<T> ConfigOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ConfigOutcome::Ok(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ConfigOutcome::Empty)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConfigOutcome::Failed(_))
    }

    /// Collapse "nothing there" and "could not tell" into `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            ConfigOutcome::Ok(value) => Some(value),
            ConfigOutcome::Empty | ConfigOutcome::Failed(_) => None,
        }
    }
}
