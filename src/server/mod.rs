//! HTTP server layer for the image hosting admin API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │         /folders  /images  /upload  /purge-cache  /deploy       │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (requests)  │  │  (bearer)   │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                │                                  │
//!                ▼                                  ▼
//!        ImageLibrary (content)              CdnProvider (cdn)
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{auth_middleware, bearer_token, generate_token, AuthError, SessionAuth};
pub use handlers::{
    image_domain, AppState, DeployResponse, DeployStatusResponse, ErrorResponse, FolderList,
    FoldersResponse, ImagesResponse, LoginRequest, LoginResponse, MessageResponse,
    SuccessResponse, UploadResponse, BANNER, IMAGE_DOMAIN_HEADER,
};
pub use routes::{create_router, RouterConfig};
