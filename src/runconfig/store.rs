use super::types::RunConfiguration;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Backing store of run configurations, keyed by suite path
#[async_trait]
pub trait RunConfigStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `path`.
    async fn fetch(&self, path: &str) -> Result<Option<RunConfiguration>, StoreError>;

    /// Create or replace the configuration stored under `path`.
    async fn store(&self, path: &str, config: &RunConfiguration) -> Result<(), StoreError>;

    async fn containers(&self) -> Result<Vec<String>, StoreError>;

    async fn tags(&self, container: &str) -> Result<Vec<String>, StoreError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    configs: RwLock<HashMap<String, RunConfiguration>>,
    containers: HashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, container: &str, tags: &[&str]) -> Self {
        self.containers.insert(
            container.to_string(),
            tags.iter().map(|tag| tag.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl RunConfigStore for MemoryStore {
    async fn fetch(&self, path: &str) -> Result<Option<RunConfiguration>, StoreError> {
        Ok(self.configs.read().await.get(path).cloned())
    }

    async fn store(&self, path: &str, config: &RunConfiguration) -> Result<(), StoreError> {
        self.configs
            .write()
            .await
            .insert(path.to_string(), config.clone());
        Ok(())
    }

    async fn containers(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.containers.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn tags(&self, container: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.containers.get(container).cloned().unwrap_or_default())
    }
}
