//! GitHub-backed content store.
//!
//! Talks to the repository contents API:
//!
//! ```text
//! GET    /repos/{owner}/{repo}/contents/{path}   list a directory / read a file entry
//! PUT    /repos/{owner}/{repo}/contents/{path}   create a file (base64 content)
//! DELETE /repos/{owner}/{repo}/contents/{path}   delete a file (requires its sha)
//! ```

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::error::ContentError;

use super::path::encode_segments;
use super::{ContentEntry, ContentStore};

/// Public GitHub REST API endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("imghost/", env!("CARGO_PKG_VERSION"));

/// GitHub error body (`{"message": "...", "documentation_url": "..."}`).
#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

/// [`ContentStore`] backed by a GitHub repository.
#[derive(Clone)]
pub struct GitHubContentStore {
    client: reqwest::Client,
    api_url: String,
    repository: String,
    token: String,
}

impl GitHubContentStore {
    /// Create a store for `repository` (`"owner/repo"`).
    ///
    /// # Arguments
    /// * `client` - HTTP client, shared with other adapters for connection pooling
    /// * `api_url` - API base URL, e.g. [`DEFAULT_GITHUB_API_URL`]
    /// * `repository` - Repository in `owner/repo` form
    /// * `token` - Access token with contents read/write permission
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        repository: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
            token: token.into(),
        }
    }

    /// Get the repository identifier.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_url,
            self.repository,
            encode_segments(path)
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.contents_url(path))
            .header(reqwest::header::AUTHORIZATION, format!("token {}", self.token))
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    /// Turn a non-2xx response into a [`ContentError`], keeping GitHub's message.
    async fn ensure_success(
        response: reqwest::Response,
        path: &str,
    ) -> Result<reqwest::Response, ContentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ContentError::NotFound(path.to_string()));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let message = serde_json::from_str::<GitHubErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        Err(ContentError::Api {
            status: status.as_u16(),
            message: format!("{} (path: {})", message, path),
        })
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ContentError> {
        debug!(path = path, "GitHub contents GET");
        let response = self.request(reqwest::Method::GET, path).send().await?;
        let response = Self::ensure_success(response, path).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContentStore for GitHubContentStore {
    async fn list_directory(&self, path: &str) -> Result<Vec<ContentEntry>, ContentError> {
        match self.get_json(path).await? {
            value @ serde_json::Value::Array(_) => serde_json::from_value(value)
                .map_err(|e| ContentError::UnexpectedResponse(e.to_string())),
            _ => Err(ContentError::UnexpectedResponse(format!(
                "{} is not a directory",
                path
            ))),
        }
    }

    async fn get_entry(&self, path: &str) -> Result<ContentEntry, ContentError> {
        match self.get_json(path).await? {
            value @ serde_json::Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| ContentError::UnexpectedResponse(e.to_string())),
            _ => Err(ContentError::UnexpectedResponse(format!(
                "{} is a directory, not a file",
                path
            ))),
        }
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<(), ContentError> {
        debug!(path = path, bytes = content.len(), "GitHub contents PUT");
        let body = serde_json::json!({
            "message": message,
            "content": base64::engine::general_purpose::STANDARD.encode(content),
        });

        let response = self
            .request(reqwest::Method::PUT, path)
            .json(&body)
            .send()
            .await?;
        Self::ensure_success(response, path).await?;
        Ok(())
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<(), ContentError> {
        debug!(path = path, sha = sha, "GitHub contents DELETE");
        let body = serde_json::json!({
            "message": message,
            "sha": sha,
        });

        let response = self
            .request(reqwest::Method::DELETE, path)
            .json(&body)
            .send()
            .await?;
        Self::ensure_success(response, path).await?;
        Ok(())
    }
}
