//! Cloudflare-backed CDN provider.
//!
//! Uses the v4 API:
//!
//! ```text
//! POST /zones/{zone_id}/purge_cache                                        {prefixes: [...]}
//! POST /accounts/{account_id}/pages/projects/{project}/deployments
//! GET  /accounts/{account_id}/pages/projects/{project}/deployments/{id}
//! ```
//!
//! Every response is wrapped in the `{success, errors, result}` envelope,
//! including failures, so the envelope is decoded regardless of HTTP status.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::CdnError;

use super::{CdnProvider, DeploymentStage};

/// Public Cloudflare API v4 endpoint.
pub const DEFAULT_CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Pages project serving the images.
pub const DEFAULT_PAGES_PROJECT: &str = "img-host";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,

    #[serde(default)]
    errors: serde_json::Value,

    #[serde(default = "Option::default")]
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Deployment {
    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    latest_stage: Option<Stage>,
}

#[derive(Debug, Deserialize)]
struct Stage {
    #[serde(default)]
    status: Option<String>,
}

/// [`CdnProvider`] backed by a Cloudflare zone and Pages project.
#[derive(Clone)]
pub struct CloudflareCdn {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    zone_id: String,
    account_id: String,
    project: String,
}

impl CloudflareCdn {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            zone_id: zone_id.into(),
            account_id: account_id.into(),
            project: DEFAULT_PAGES_PROJECT.to_string(),
        }
    }

    /// Use a different Pages project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn project_url(&self) -> String {
        format!(
            "{}/accounts/{}/pages/projects/{}",
            self.api_url, self.account_id, self.project
        )
    }

    fn deployments_url(&self) -> String {
        format!("{}/deployments", self.project_url())
    }

    /// Look up the Pages project, failing if it does not exist or the token
    /// cannot read it.
    pub async fn check_project(&self) -> Result<(), CdnError> {
        self.call::<serde_json::Value>(self.client.get(self.project_url()))
            .await?;
        Ok(())
    }

    /// Send a request and unwrap the Cloudflare envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, CdnError> {
        let response = request.bearer_auth(&self.api_token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            CdnError::UnexpectedResponse(format!("HTTP {}: {} ({})", status.as_u16(), body, e))
        })?;

        if !envelope.success {
            return Err(CdnError::Api {
                errors: envelope.errors.to_string(),
            });
        }
        Ok(envelope.result)
    }
}

#[async_trait]
impl CdnProvider for CloudflareCdn {
    async fn purge_prefixes(&self, prefixes: &[String]) -> Result<(), CdnError> {
        debug!(prefixes = ?prefixes, "Cloudflare purge_cache");
        let url = format!("{}/zones/{}/purge_cache", self.api_url, self.zone_id);
        let body = serde_json::json!({ "prefixes": prefixes });

        self.call::<serde_json::Value>(self.client.post(url).json(&body))
            .await?;
        Ok(())
    }

    async fn trigger_deployment(&self) -> Result<Option<String>, CdnError> {
        debug!(project = %self.project, "Cloudflare Pages deployment trigger");
        let deployment = self
            .call::<Deployment>(self.client.post(self.deployments_url()))
            .await?;
        Ok(deployment.and_then(|d| d.id))
    }

    async fn deployment_status(&self, deployment_id: &str) -> Result<DeploymentStage, CdnError> {
        let url = format!(
            "{}/{}",
            self.deployments_url(),
            urlencoding::encode(deployment_id)
        );
        let deployment = self.call::<Deployment>(self.client.get(url)).await?;

        let raw = deployment
            .and_then(|d| d.latest_stage)
            .and_then(|s| s.status)
            .unwrap_or_else(|| "unknown".to_string());
        Ok(DeploymentStage::parse(&raw))
    }
}
