//! Configuration management for imghost.
//!
//! All configuration comes from command-line arguments via clap, with
//! environment variable fallbacks. Provider credentials use the providers'
//! conventional names (`GITHUB_TOKEN`, `CF_API_TOKEN`, ...); everything else
//! uses the `IMGHOST_` prefix.
//!
//! # Environment Variables
//!
//! - `GITHUB_REPO` - Repository holding the images, `owner/repo` (required)
//! - `GITHUB_TOKEN` - GitHub access token (required)
//! - `CF_API_TOKEN` - Cloudflare API token (required)
//! - `CF_ZONE_ID` - Cloudflare zone of the image domain (required)
//! - `CF_ACCOUNT_ID` - Cloudflare account owning the Pages project (required)
//! - `ADMIN_PASSWORD` - Admin password (required for `serve`)
//! - `IMGHOST_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMGHOST_PORT` - Server port (default: 8787)
//! - `IMGHOST_CONTENT_ROOT` - Repository directory holding images (default: frontend)
//! - `IMGHOST_PAGES_PROJECT` - Cloudflare Pages project (default: img-host)
//! - `IMGHOST_TOKEN_POLICY` - `any-bearer` (default) or `issued`
//! - `IMGHOST_MAX_UPLOAD_BYTES` - Request body limit for uploads (default: 25 MiB)
//! - `IMGHOST_API_URL` - API base URL used by `imghost admin`
//! - `IMGHOST_IMAGE_DOMAIN` - Public image base URL used by `imghost admin`
//! - `IMGHOST_SESSION_FILE` - Where `imghost admin` keeps its session token

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::cdn::{DEFAULT_CLOUDFLARE_API_URL, DEFAULT_PAGES_PROJECT};
use crate::content::{DEFAULT_CONTENT_ROOT, DEFAULT_GITHUB_API_URL};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8787;

/// Default upload body limit (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Default API base URL for the admin client.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8787";

/// Default session file for the admin client.
pub const DEFAULT_SESSION_FILE: &str = ".imghost-session";

// =============================================================================
// CLI Arguments
// =============================================================================

/// imghost - personal image hosting admin.
///
/// Manages images stored in a GitHub repository and published through
/// Cloudflare Pages.
#[derive(Parser, Debug, Clone)]
#[command(name = "imghost")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the admin HTTP API.
    Serve(ServeConfig),

    /// Check provider configuration and connectivity.
    Check(CheckConfig),

    /// Drive a running API from the terminal.
    Admin(AdminConfig),
}

/// How bearer tokens are checked on protected routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum TokenPolicy {
    /// Any nonempty bearer token is accepted.
    #[default]
    AnyBearer,

    /// Only tokens issued by this process since it started are accepted.
    Issued,
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// Credentials and endpoints for the content and CDN providers.
#[derive(Args, Debug, Clone)]
pub struct ProviderConfig {
    /// GitHub repository holding the images (`owner/repo`).
    #[arg(long, env = "GITHUB_REPO")]
    pub github_repo: String,

    /// GitHub access token with contents read/write permission.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// GitHub REST API base URL.
    #[arg(long, default_value = DEFAULT_GITHUB_API_URL, env = "IMGHOST_GITHUB_API_URL")]
    pub github_api_url: String,

    /// Repository directory all image folders live under.
    #[arg(long, default_value = DEFAULT_CONTENT_ROOT, env = "IMGHOST_CONTENT_ROOT")]
    pub content_root: String,

    /// Cloudflare API token (cache purge and Pages deployments).
    #[arg(long, env = "CF_API_TOKEN", hide_env_values = true)]
    pub cf_api_token: String,

    /// Cloudflare zone id of the image domain.
    #[arg(long, env = "CF_ZONE_ID")]
    pub cf_zone_id: String,

    /// Cloudflare account id owning the Pages project.
    #[arg(long, env = "CF_ACCOUNT_ID")]
    pub cf_account_id: String,

    /// Cloudflare API base URL.
    #[arg(long, default_value = DEFAULT_CLOUDFLARE_API_URL, env = "IMGHOST_CF_API_URL")]
    pub cf_api_url: String,

    /// Cloudflare Pages project serving the images.
    #[arg(long, default_value = DEFAULT_PAGES_PROJECT, env = "IMGHOST_PAGES_PROJECT")]
    pub pages_project: String,
}

impl ProviderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match self.github_repo.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {}
            _ => {
                return Err(format!(
                    "GitHub repository must be in owner/repo form, got '{}'. Set --github-repo or GITHUB_REPO",
                    self.github_repo
                ))
            }
        }

        let required = [
            (&self.github_token, "GitHub token is required. Set --github-token or GITHUB_TOKEN"),
            (&self.cf_api_token, "Cloudflare API token is required. Set --cf-api-token or CF_API_TOKEN"),
            (&self.cf_zone_id, "Cloudflare zone id is required. Set --cf-zone-id or CF_ZONE_ID"),
            (&self.cf_account_id, "Cloudflare account id is required. Set --cf-account-id or CF_ACCOUNT_ID"),
            (&self.pages_project, "Pages project name must not be empty"),
        ];
        for (value, message) in required {
            if value.trim().is_empty() {
                return Err(message.to_string());
            }
        }

        let root = self.content_root.trim_matches('/');
        if root.is_empty() || root.contains('/') {
            return Err(format!(
                "content_root must be a single directory name, got '{}'",
                self.content_root
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Serve Configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMGHOST_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMGHOST_PORT")]
    pub port: u16,

    #[command(flatten)]
    pub providers: ProviderConfig,

    /// Password accepted by `POST /login`.
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,

    /// How bearer tokens are checked on protected routes.
    #[arg(long, value_enum, default_value_t = TokenPolicy::AnyBearer, env = "IMGHOST_TOKEN_POLICY")]
    pub token_policy: TokenPolicy,

    /// Maximum request body size for uploads, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "IMGHOST_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.providers.validate()?;

        if self.admin_password.is_empty() {
            return Err(
                "Admin password is required. Set --admin-password or ADMIN_PASSWORD".to_string(),
            );
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Check Configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub providers: ProviderConfig,

    /// Also list the folders found under the content root.
    #[arg(long, default_value_t = false)]
    pub list_folders: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Admin Client Configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct AdminConfig {
    /// Base URL of the imghost API.
    #[arg(long, default_value = DEFAULT_API_URL, env = "IMGHOST_API_URL")]
    pub api_url: String,

    /// Public base URL images are served from (sent as X-Image-Domain).
    #[arg(long, env = "IMGHOST_IMAGE_DOMAIN", default_value = "")]
    pub image_domain: String,

    /// File holding the session token between invocations.
    #[arg(long, default_value = DEFAULT_SESSION_FILE, env = "IMGHOST_SESSION_FILE")]
    pub session_file: PathBuf,

    #[command(subcommand)]
    pub action: AdminAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminAction {
    /// Log in and store the session token.
    Login {
        /// Admin password.
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session token.
    Logout,

    /// Check that the stored session is accepted.
    Verify,

    /// List image folders.
    Folders,

    /// List images in a folder.
    Images {
        /// Folder to list (default: the content root).
        #[arg(long, default_value = "")]
        path: String,

        /// Page number.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Case-insensitive name filter.
        #[arg(long)]
        search: Option<String>,
    },

    /// Upload image files.
    Upload {
        /// Files to upload.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Existing folder to upload into.
        #[arg(long, default_value = "", conflicts_with = "new_folder")]
        path: String,

        /// Create a new folder and upload into it.
        #[arg(long)]
        new_folder: Option<String>,
    },

    /// Delete images from a folder.
    Delete {
        /// File names to delete.
        #[arg(required = true)]
        names: Vec<String>,

        /// Folder holding the files.
        #[arg(long, default_value = "")]
        path: String,
    },

    /// Purge the CDN cache for the image domain.
    Purge,

    /// Trigger a site deployment and wait for it to finish.
    Deploy,
}

// =============================================================================
// Tests
// =============================================================================
