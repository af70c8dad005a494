//! HTTP client for the admin API.
//!
//! [`AdminApi`] is the seam the view-models are written against;
//! [`AdminClient`] implements it over `reqwest` and owns the session.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::content::path::encode_segments;
use crate::content::{ImagePage, ImageQuery, UploadedImage};
use crate::error::ClientError;
use crate::server::{
    DeployResponse, DeployStatusResponse, ErrorResponse, FoldersResponse, ImagesResponse,
    LoginRequest, LoginResponse, MessageResponse, SuccessResponse, UploadResponse,
    IMAGE_DOMAIN_HEADER,
};

// =============================================================================
// API Trait
// =============================================================================

/// Authenticated admin operations.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn list_folders(&self) -> Result<Vec<String>, ClientError>;

    async fn list_images(&self, query: &ImageQuery) -> Result<ImagePage, ClientError>;

    async fn upload_image(
        &self,
        folder: &str,
        file_name: &str,
        content: Vec<u8>,
        create_folder: bool,
    ) -> Result<UploadedImage, ClientError>;

    /// Delete an image by logical path (e.g. `"cats/a.png"`).
    async fn delete_image(&self, path: &str) -> Result<(), ClientError>;

    /// Purge the CDN cache, returning the server's message.
    async fn purge_cache(&self) -> Result<String, ClientError>;

    async fn trigger_deploy(&self) -> Result<DeployResponse, ClientError>;

    /// Fetch a deployment status. A `success: false` body is an error.
    async fn deploy_status(&self, deployment_id: &str) -> Result<DeployStatusResponse, ClientError>;
}

// =============================================================================
// Session
// =============================================================================

/// The admin session: the token returned by `/login`, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
}

impl Session {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Session persisted as JSON in a file between CLI invocations.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session; a missing file is an empty session.
    pub async fn load(&self) -> Result<Session, ClientError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ClientError::InvalidInput(format!(
                    "Corrupt session file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Session::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, session: &Session) -> Result<(), ClientError> {
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| ClientError::InvalidInput(e.to_string()))?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Remove the session file; a missing file is fine.
    pub async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// HTTP Client
// =============================================================================

/// [`AdminApi`] over HTTP.
pub struct AdminClient {
    client: reqwest::Client,
    api_url: String,
    image_domain: String,
    session: Session,
}

impl AdminClient {
    /// Create a client for the API at `api_url` (e.g. `http://127.0.0.1:8787`).
    ///
    /// `image_domain` is the public image base URL sent as `X-Image-Domain`.
    pub fn new(
        client: reqwest::Client,
        api_url: &str,
        image_domain: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let parsed = url::Url::parse(api_url)
            .map_err(|e| ClientError::InvalidInput(format!("Invalid API URL {}: {}", api_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidInput(format!(
                "Invalid API URL {}: expected http or https",
                api_url
            )));
        }

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            image_domain: image_domain.into(),
            session: Session::default(),
        })
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, route: &str) -> String {
        format!("{}/api/{}", self.api_url, route)
    }

    fn token(&self) -> Result<&str, ClientError> {
        self.session
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ClientError::NotAuthenticated)
    }

    /// Exchange the admin password for a token and keep it in the session.
    pub async fn login(&mut self, password: &str) -> Result<(), ClientError> {
        let body = LoginRequest {
            password: Some(password.to_string()),
        };
        let response = self.client.post(self.url("login")).json(&body).send().await?;
        let login: LoginResponse = Self::parse_response(response).await?;

        if !login.success || login.token.is_empty() {
            return Err(ClientError::Api {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: "Invalid password".to_string(),
            });
        }

        self.session = Session::with_token(login.token);
        Ok(())
    }

    /// Forget the token.
    pub fn logout(&mut self) {
        self.session = Session::default();
    }

    /// Whether the server still accepts the session.
    ///
    /// Transport failures count as an invalid session.
    pub async fn verify(&self) -> bool {
        let Ok(token) = self.token() else {
            return false;
        };

        let result = self
            .client
            .get(self.url("verify"))
            .bearer_auth(token)
            .send()
            .await;

        match result {
            Ok(response) => Self::parse_response::<SuccessResponse>(response)
                .await
                .map(|r| r.success)
                .unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "Session verification failed");
                false
            }
        }
    }

    /// Decode a JSON body, turning non-2xx statuses into [`ClientError::Api`].
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AdminApi for AdminClient {
    async fn list_folders(&self) -> Result<Vec<String>, ClientError> {
        let response = self
            .client
            .get(self.url("folders"))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        let folders: FoldersResponse = Self::parse_response(response).await?;
        Ok(folders.data.folders)
    }

    async fn list_images(&self, query: &ImageQuery) -> Result<ImagePage, ClientError> {
        let mut params = vec![
            ("path", query.path.clone()),
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let response = self
            .client
            .get(self.url("images"))
            .query(&params)
            .bearer_auth(self.token()?)
            .header(IMAGE_DOMAIN_HEADER, &self.image_domain)
            .send()
            .await?;
        let images: ImagesResponse = Self::parse_response(response).await?;
        Ok(images.data)
    }

    async fn upload_image(
        &self,
        folder: &str,
        file_name: &str,
        content: Vec<u8>,
        create_folder: bool,
    ) -> Result<UploadedImage, ClientError> {
        debug!(folder, file_name, bytes = content.len(), "Uploading");
        let form = Form::new()
            .part("file", Part::bytes(content).file_name(file_name.to_string()))
            .text("path", folder.to_string())
            .text("create_folder", create_folder.to_string());

        let response = self
            .client
            .post(self.url("upload"))
            .bearer_auth(self.token()?)
            .header(IMAGE_DOMAIN_HEADER, &self.image_domain)
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::parse_response(response).await?;
        Ok(uploaded.data)
    }

    async fn delete_image(&self, path: &str) -> Result<(), ClientError> {
        let url = format!("{}/{}", self.url("images"), encode_segments(path));
        let response = self
            .client
            .delete(url)
            .bearer_auth(self.token()?)
            .send()
            .await?;
        Self::parse_response::<SuccessResponse>(response).await?;
        Ok(())
    }

    async fn purge_cache(&self) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.url("purge-cache"))
            .bearer_auth(self.token()?)
            .header(IMAGE_DOMAIN_HEADER, &self.image_domain)
            .send()
            .await?;
        let purged: MessageResponse = Self::parse_response(response).await?;
        Ok(purged.message)
    }

    async fn trigger_deploy(&self) -> Result<DeployResponse, ClientError> {
        let response = self
            .client
            .post(self.url("deploy"))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn deploy_status(&self, deployment_id: &str) -> Result<DeployStatusResponse, ClientError> {
        let response = self
            .client
            .get(self.url("deploy-status"))
            .query(&[("deploymentId", deployment_id)])
            .bearer_auth(self.token()?)
            .send()
            .await?;

        // The status route reports provider failures with its own body shape
        let status = response.status();
        let body = response.text().await?;
        let parsed: DeployStatusResponse = serde_json::from_str(&body).map_err(|_| {
            ClientError::Api {
                status: status.as_u16(),
                message: serde_json::from_str::<ErrorResponse>(&body)
                    .map(|e| e.message)
                    .unwrap_or(body.clone()),
            }
        })?;

        if !parsed.success {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: parsed.message,
            });
        }
        Ok(parsed)
    }
}
