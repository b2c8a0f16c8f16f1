use super::store::RunConfigStore;
use super::types::RunConfiguration;
use crate::error::StoreError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};

const RUN_CONFIG_ENDPOINT: &str = "/api/run-configuration";
const CONTAINER_ENDPOINT: &str = "/api/run-configuration/sakuli-container";

/// Run-configuration store behind the platform's REST API
pub struct HttpRunConfigStore {
    client: Client,
    base_url: String,
}

impl HttpRunConfigStore {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Container names may contain `/`, so they are pushed as one encoded segment.
    fn tags_url(&self, container: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.url(CONTAINER_ENDPOINT))
            .map_err(|e| StoreError::Unavailable(format!("invalid store url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable(format!("invalid store url: {}", self.base_url)))?
            .push(container)
            .push("tags");
        Ok(url)
    }
}

fn check_status(response: Response, url: &str) -> Result<Response, StoreError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(StoreError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RunConfigStore for HttpRunConfigStore {
    async fn fetch(&self, path: &str) -> Result<Option<RunConfiguration>, StoreError> {
        let url = self.url(RUN_CONFIG_ENDPOINT);
        let response = self
            .client
            .get(&url)
            .query(&[("path", path)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = check_status(response, &url)?.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| StoreError::Unavailable(format!("invalid run configuration: {}", e)))
    }

    async fn store(&self, path: &str, config: &RunConfiguration) -> Result<(), StoreError> {
        let url = self.url(RUN_CONFIG_ENDPOINT);
        let response = self
            .client
            .post(&url)
            .query(&[("path", path)])
            .json(config)
            .send()
            .await?;
        check_status(response, &url)?;
        Ok(())
    }

    async fn containers(&self) -> Result<Vec<String>, StoreError> {
        let url = self.url(CONTAINER_ENDPOINT);
        let response = self.client.get(&url).send().await?;
        Ok(check_status(response, &url)?.json().await?)
    }

    async fn tags(&self, container: &str) -> Result<Vec<String>, StoreError> {
        let url = self.tags_url(container)?;
        let response = self.client.get(url.clone()).send().await?;
        Ok(check_status(response, url.as_str())?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let store = HttpRunConfigStore::new("http://localhost:8080/");
        assert_eq!(store.base_url(), "http://localhost:8080");
        assert_eq!(
            store.url(CONTAINER_ENDPOINT),
            "http://localhost:8080/api/run-configuration/sakuli-container"
        );
    }

    #[test]
    fn test_tags_url_encodes_container() {
        let store = HttpRunConfigStore::new("http://localhost:8080");
        let url = store.tags_url("taconsol/sakuli").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/run-configuration/sakuli-container/taconsol%2Fsakuli/tags"
        );
    }
}
