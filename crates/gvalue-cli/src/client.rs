//! API client for communicating with the g-value service

use anyhow::{Context, Result};
use gvalue_core::FeatureBundle;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the g-value service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Endpoint URL under the base path. Each segment is percent-encoded,
    /// so identifiers containing `/`, `?` or `#` stay a single segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        Self::send(self.client.get(self.url(segments)?)).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, segments: &[&str], body: &B) -> Result<T> {
        Self::send(self.client.post(self.url(segments)?).json(body)).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        Self::send(self.client.delete(self.url(segments)?)).await
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub worker_id: String,
    pub order_id: String,
    pub features: FeatureBundle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    pub service: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_appends_to_base_path() {
        let client = ApiClient::new("http://gvalue:5001/api/").unwrap();
        assert_eq!(
            client.url(&["predict"]).unwrap().as_str(),
            "http://gvalue:5001/api/predict"
        );

        let client = ApiClient::new("http://gvalue:5001").unwrap();
        assert_eq!(client.url(&["healthz"]).unwrap().path(), "/healthz");
    }

    #[test]
    fn test_url_percent_encodes_identifiers() {
        let client = ApiClient::new("http://localhost:5001").unwrap();
        let url = client.url(&["predict", "w/1", "o?#"]).unwrap();

        assert_eq!(url.path(), "/predict/w%2F1/o%3F%23");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_url_rejects_non_hierarchical_base() {
        let client = ApiClient::new("mailto:ops@example.com").unwrap();
        assert!(client.url(&["health"]).is_err());
    }
}
