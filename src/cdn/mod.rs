//! CDN cache and deployment layer.
//!
//! The public image site is a static deployment on the CDN provider. After
//! images change, the operator either triggers a redeploy of the site or
//! purges the cached copies under the image domain. [`CdnProvider`] covers
//! both; [`CloudflareCdn`] is the production implementation.

mod cloudflare;

use std::fmt;

use async_trait::async_trait;

use crate::error::CdnError;

pub use cloudflare::{CloudflareCdn, DEFAULT_CLOUDFLARE_API_URL, DEFAULT_PAGES_PROJECT};

/// Stage status of a deployment as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentStage {
    Queued,
    Initializing,
    Active,
    Success,
    Failed,
    Error,
    Canceled,
    /// Anything else the provider reports, kept verbatim
    Unknown(String),
}

impl DeploymentStage {
    /// Parse a raw provider status string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "queued" => DeploymentStage::Queued,
            "initializing" => DeploymentStage::Initializing,
            "active" => DeploymentStage::Active,
            "success" => DeploymentStage::Success,
            "failed" => DeploymentStage::Failed,
            "error" => DeploymentStage::Error,
            "canceled" => DeploymentStage::Canceled,
            other => DeploymentStage::Unknown(other.to_string()),
        }
    }

    /// The raw status string.
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentStage::Queued => "queued",
            DeploymentStage::Initializing => "initializing",
            DeploymentStage::Active => "active",
            DeploymentStage::Success => "success",
            DeploymentStage::Failed => "failed",
            DeploymentStage::Error => "error",
            DeploymentStage::Canceled => "canceled",
            DeploymentStage::Unknown(raw) => raw,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, DeploymentStage::Success)
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            DeploymentStage::Failed | DeploymentStage::Error | DeploymentStage::Canceled
        )
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            DeploymentStage::Initializing | DeploymentStage::Queued | DeploymentStage::Active
        )
    }
}

impl fmt::Display for DeploymentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the purge prefix for a public image domain.
///
/// The provider expects host-relative prefixes without a scheme:
/// `https://img.example.com` becomes `img.example.com/`.
pub fn purge_prefix(domain: &str) -> String {
    let host = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    format!("{}/", host.trim_end_matches('/'))
}

/// CDN cache and static-deployment operations.
#[async_trait]
pub trait CdnProvider: Send + Sync {
    /// Purge every cached URL starting with one of the prefixes.
    async fn purge_prefixes(&self, prefixes: &[String]) -> Result<(), CdnError>;

    /// Trigger a new deployment of the static site.
    ///
    /// Returns the deployment id, or `None` if the provider accepted the
    /// request without reporting one.
    async fn trigger_deployment(&self) -> Result<Option<String>, CdnError>;

    /// Look up the latest stage status of a deployment.
    async fn deployment_status(&self, deployment_id: &str) -> Result<DeploymentStage, CdnError>;
}
