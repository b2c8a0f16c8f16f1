use super::store::RunConfigStore;
use super::types::{ConfigOutcome, RunConfiguration};
use crate::error::StoreError;
use serde::Serialize;
use tokio::sync::broadcast;

/// A store failure that was reported instead of returned
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDiagnostic {
    pub operation: &'static str,
    pub key: Option<String>,
    pub reason: String,
}

/// Loads and saves run configurations on top of a [`RunConfigStore`].
///
/// Store failures never escape as errors. They are logged, broadcast to
/// diagnostics subscribers, and turned into `Empty` unless
/// [`surface_errors`](Self::surface_errors) is set.
pub struct RunConfigResolver<S: RunConfigStore> {
    store: S,
    surface_errors: bool,
    diagnostics: broadcast::Sender<ConfigDiagnostic>,
}

impl<S: RunConfigStore> RunConfigResolver<S> {
    pub fn new(store: S) -> Self {
        let (diagnostics, _) = broadcast::channel(32);
        Self {
            store,
            surface_errors: false,
            diagnostics,
        }
    }

    pub fn surface_errors(mut self, surface: bool) -> Self {
        self.surface_errors = surface;
        self
    }

    pub fn diagnostics(&self) -> broadcast::Receiver<ConfigDiagnostic> {
        self.diagnostics.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn load(&self, path: &str) -> ConfigOutcome<RunConfiguration> {
        match self.store.fetch(path).await {
            Ok(Some(config)) => ConfigOutcome::Ok(config),
            Ok(None) => ConfigOutcome::Empty,
            Err(e) => self.failed("load", Some(path), e),
        }
    }

    /// Replace the configuration stored under `path`. The stored record's
    /// `path` is always the key it is saved under.
    pub async fn save(&self, path: &str, config: RunConfiguration) -> ConfigOutcome<()> {
        let config = RunConfiguration {
            path: path.to_string(),
            ..config
        };
        match self.store.store(path, &config).await {
            Ok(()) => ConfigOutcome::Ok(()),
            Err(e) => self.failed("save", Some(path), e),
        }
    }

    pub async fn list_containers(&self) -> Vec<String> {
        match self.store.containers().await {
            Ok(containers) => containers,
            Err(e) => {
                self.report("listContainers", None, &e);
                Vec::new()
            }
        }
    }

    pub async fn list_tags(&self, container: &str) -> Vec<String> {
        match self.store.tags(container).await {
            Ok(tags) => tags,
            Err(e) => {
                self.report("listTags", Some(container), &e);
                Vec::new()
            }
        }
    }

    fn failed<T>(&self, operation: &'static str, key: Option<&str>, e: StoreError) -> ConfigOutcome<T> {
        self.report(operation, key, &e);
        if self.surface_errors {
            ConfigOutcome::Failed(e.to_string())
        } else {
            ConfigOutcome::Empty
        }
    }

    fn report(&self, operation: &'static str, key: Option<&str>, e: &StoreError) {
        log::warn!(
            "Run configuration {} failed{}: {}",
            operation,
            key.map(|k| format!(" for '{}'", k)).unwrap_or_default(),
            e
        );
        // No subscribers is fine
        let _ = self.diagnostics.send(ConfigDiagnostic {
            operation,
            key: key.map(str::to_string),
            reason: e.to_string(),
        });
    }
}
