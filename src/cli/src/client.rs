//! HTTP client for the Taskforge API server.
//!
//! Wraps the server's `ApiResponse` envelope and attaches the stored
//! session's bearer token to every request.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::session::Session;

/// API response wrapper matching the server's ApiResponse format.
#[derive(Debug, serde::Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[allow(dead_code)]
    pub error_code: Option<String>,
}

/// Paginated collection shape returned by list endpoints. Serialize is
/// kept so `--output json|yaml` can emit the page metadata alongside the
/// rows.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PageMetadata,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PageMetadata {
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Error response shape returned by the server on failures.
#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// HTTP client for the Taskforge API.
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    /// Create a new API client pointing at the given base URL.
    pub fn new(base_url: &str, session: Option<Session>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The stored session, if logged in.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => builder.bearer_auth(&session.access_token),
            None => builder,
        }
    }

    async fn handle<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
                if let Some(error) = envelope.error {
                    anyhow::bail!(
                        "API error ({}): {} [{}]",
                        status,
                        error.message.unwrap_or_else(|| "unknown".into()),
                        error.code.unwrap_or_else(|| "UNKNOWN".into()),
                    );
                }
            }
            anyhow::bail!("API error ({}): {}", status, body);
        }

        let api_resp: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))?;

        if api_resp.success {
            api_resp
                .data
                .ok_or_else(|| anyhow::anyhow!("API returned success but no data"))
        } else {
            Err(anyhow::anyhow!(
                "API error: {}",
                api_resp.error.unwrap_or_else(|| "Unknown error".into())
            ))
        }
    }

    /// Perform a GET request and deserialize the response data.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        Self::handle(resp, &url).await
    }

    /// Perform a POST request with a JSON body and deserialize the response.
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        Self::handle(resp, &url).await
    }

    /// Perform a PATCH request with a JSON body and deserialize the response.
    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .authorize(self.client.patch(&url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("PATCH {} failed", url))?;
        Self::handle(resp, &url).await
    }

    /// Perform a DELETE request and deserialize the response.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .authorize(self.client.delete(&url))
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;
        Self::handle(resp, &url).await
    }

    /// Upload a file as a multipart POST and deserialize the response.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file: &std::path::Path,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .context("file has no usable name")?
            .to_string();
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        Self::handle(resp, &url).await
    }

    /// Perform a raw GET request and return the full JSON value (for the
    /// health endpoint, which does not use the envelope).
    pub async fn get_raw(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}
