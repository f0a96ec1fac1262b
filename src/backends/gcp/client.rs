//! HTTP client for the Cloud Asset Inventory v1 API.

use crate::backends::gcp::{AssetInventoryApi, SearchAllResourcesPage};
use crate::core::ScanError;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

const PROVIDER: &str = "gcp";
const OPERATION: &str = "SearchAllResources";

/// Cloud Asset client configuration.
#[derive(Debug, Clone)]
pub struct CloudAssetSettings {
    /// OAuth2 access token (kept secret).
    pub access_token: SecretString,

    /// Base URL for the API.
    pub base_url: String,

    /// Results requested per page (the API caps this at 500).
    pub page_size: u32,

    /// Request timeout.
    pub timeout: Duration,
}

impl CloudAssetSettings {
    /// Creates a configuration with the given access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into().into()),
            base_url: "https://cloudasset.googleapis.com".to_string(),
            page_size: 500,
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Cloud Asset Inventory client.
///
/// # Example
///
/// ```rust,ignore
/// use tagwarden::backends::gcp::{AssetInventoryScanner, CloudAssetClient, CloudAssetSettings};
///
/// let client = CloudAssetClient::new(CloudAssetSettings::new(token))?;
/// let scanner = AssetInventoryScanner::new(client, policy);
/// ```
#[derive(Debug)]
pub struct CloudAssetClient {
    settings: CloudAssetSettings,
    http: reqwest::Client,
}

impl CloudAssetClient {
    /// Creates a new client.
    pub fn new(settings: CloudAssetSettings) -> Result<Self, ScanError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ScanError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, http })
    }

    fn search_url(&self, scope: &str) -> String {
        format!(
            "{}/v1/{}:searchAllResources",
            self.settings.base_url.trim_end_matches('/'),
            scope
        )
    }
}

#[async_trait]
impl AssetInventoryApi for CloudAssetClient {
    async fn search_all_resources(
        &self,
        scope: &str,
        page_token: Option<&str>,
    ) -> Result<SearchAllResourcesPage, ScanError> {
        let mut query = vec![("pageSize", self.settings.page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .http
            .get(self.search_url(scope))
            .bearer_auth(self.settings.access_token.expose_secret())
            .query(&query)
            .send()
            .await
            .map_err(|e| ScanError::transient(PROVIDER, OPERATION, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status, body);
            return Err(
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    ScanError::transient(PROVIDER, OPERATION, message)
                } else {
                    ScanError::fatal(PROVIDER, OPERATION, message)
                },
            );
        }

        response
            .json::<SearchAllResourcesPage>()
            .await
            .map_err(|e| ScanError::fatal(PROVIDER, OPERATION, format!("invalid response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let client = CloudAssetClient::new(
            CloudAssetSettings::new("token").with_base_url("http://localhost:8080/"),
        )
        .unwrap();

        assert_eq!(
            client.search_url("projects/my-project"),
            "http://localhost:8080/v1/projects/my-project:searchAllResources"
        );
    }

    #[test]
    fn test_settings_defaults() {
        let settings = CloudAssetSettings::new("token").with_page_size(100);
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.base_url, "https://cloudasset.googleapis.com");
        assert_eq!(settings.access_token.expose_secret(), "token");
    }
}
