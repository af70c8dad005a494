//! # imghost
//!
//! A personal image-hosting admin service. Images are plain files in a GitHub
//! repository, published through a Cloudflare Pages site; this crate provides
//! the HTTP API that manages them and an admin client that drives it.
//!
//! ## Features
//!
//! - **Folders and images**: list, search, paginate, upload and delete images
//!   stored under one content root of the repository
//! - **CDN control**: purge the cache under the image domain, trigger a Pages
//!   deployment and follow its status
//! - **Password login**: opaque bearer tokens, optionally restricted to tokens
//!   issued by the running server
//! - **Admin client**: gallery, upload and deploy view-models emitting events
//!   for any front-end, plus a terminal front-end in the binary
//!
//! ## Architecture
//!
//! - [`content`] - Repository contents, path normalization and image operations
//! - [`cdn`] - Cache purge and deployments
//! - [`server`] - Axum-based HTTP server and routes
//! - [`client`] - Admin API client and view-models
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use imghost::{
//!     create_router, CloudflareCdn, ContentRoot, GitHubContentStore, ImageLibrary, RouterConfig,
//!     SessionAuth, TokenPolicy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let http = reqwest::Client::new();
//!     let store = GitHubContentStore::new(
//!         http.clone(),
//!         "https://api.github.com",
//!         "owner/images",
//!         "ghp_token",
//!     );
//!     let cdn = CloudflareCdn::new(
//!         http,
//!         "https://api.cloudflare.com/client/v4",
//!         "cf_token",
//!         "zone_id",
//!         "account_id",
//!     );
//!
//!     let library = ImageLibrary::with_root(store, ContentRoot::new("frontend"));
//!     let auth = SessionAuth::new("admin-password", TokenPolicy::AnyBearer);
//!     let router = create_router(library, cdn, auth, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8787").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod cdn;
pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod server;

// Re-export commonly used types
pub use cdn::{purge_prefix, CdnProvider, CloudflareCdn, DeploymentStage};
pub use client::{
    AdminApi, AdminClient, DeployPoller, GalleryModel, PollOutcome, Session, SessionFile,
    UiEvent, Uploader,
};
pub use config::{AdminAction, AdminConfig, CheckConfig, Cli, Command, ServeConfig, TokenPolicy};
pub use content::{
    ContentEntry, ContentRoot, ContentStore, EntryKind, GitHubContentStore, ImageLibrary,
    ImagePage, ImageQuery, ImageRecord, Pagination,
};
pub use error::{ApiError, CdnError, ClientError, ContentError, InputError, LibraryError};
pub use server::{create_router, AppState, RouterConfig, SessionAuth};
