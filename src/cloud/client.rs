//! HTTP client for the remote document API.

use reqwest::blocking::Client;
use serde::Deserialize;

use super::{CloudError, RemoteDocument, RemoteStore, DEFAULT_CLOUD_URL};

/// Cloud API client.
pub struct CloudClient {
    /// HTTP client instance.
    client: Client,
    /// Base URL of the cloud service.
    base_url: String,
    /// Bearer token (if logged in).
    token: Option<String>,
}

impl CloudClient {
    /// Creates a new cloud client with the default URL.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_CLOUD_URL)
    }

    /// Creates a new cloud client with a custom URL.
    pub fn with_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Sets the access token.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for CloudClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for CloudClient {
    fn list_documents(&self) -> Result<Vec<RemoteDocument>, CloudError> {
        let token = self.token.as_ref().ok_or(CloudError::NotLoggedIn)?;

        let url = format!("{}/api/documents", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {token}"))
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CloudError::ServerError { status, message });
        }

        let body: ApiResponse<Vec<RemoteDocument>> = response.json()?;
        tracing::debug!("Remote store listed {} documents", body.data.len());
        Ok(body.data)
    }
}

/// Generic API response wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// The response data.
    pub data: T,
}
