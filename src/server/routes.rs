//! Router configuration for the image hosting API.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, CORS, panic recovery and tracing.
//!
//! # Route Structure
//!
//! Every route except `/` is registered twice, as `/<name>` and `/api/<name>`.
//!
//! ```text
//! /                      GET     - Banner (public)
//! /login                 POST    - Password login (public)
//! /verify                GET     - Session check (public)
//! /folders               GET     - List folders (bearer)
//! /images                GET     - List images (bearer)
//! /images/{*path}        DELETE  - Delete image (bearer)
//! /upload                POST    - Upload image (bearer)
//! /purge-cache           POST    - Purge CDN cache (bearer)
//! /deploy                POST    - Trigger deployment (bearer)
//! /deploy-status         GET     - Deployment status (bearer)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use imghost::server::{create_router, RouterConfig, SessionAuth};
//!
//! let library = ImageLibrary::new(store);
//! let auth = SessionAuth::new("hunter2", TokenPolicy::AnyBearer);
//! let router = create_router(library, cdn, auth, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8787").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, Method};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{auth_middleware, SessionAuth};
use super::handlers::{
    delete_image_handler, deploy_handler, deploy_status_handler, folders_handler, images_handler,
    login_handler, method_not_allowed_handler, not_found_handler, panic_response,
    purge_cache_handler, root_handler, upload_handler, verify_handler, AppState,
};
use crate::cdn::CdnProvider;
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::content::{ContentStore, ImageLibrary};

/// Prefixes every route is served under.
const ROUTE_PREFIXES: [&str; 2] = ["", "/api"];

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Maximum request body size in bytes
    pub max_upload_bytes: usize,
}

impl RouterConfig {
    /// Create a router configuration with tracing on and a 25 MiB body limit.
    pub fn new() -> Self {
        Self {
            enable_tracing: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the maximum request body size.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Public routes (banner, login, verify)
/// - Bearer-protected routes (folders, images, upload, delete, purge, deploy)
/// - JSON 404/405 fallbacks
/// - CORS, panic recovery and optional request tracing
pub fn create_router<S, C>(
    library: ImageLibrary<S>,
    cdn: C,
    auth: SessionAuth,
    config: RouterConfig,
) -> Router
where
    S: ContentStore + 'static,
    C: CdnProvider + 'static,
{
    let app_state = AppState::new(library, cdn, auth.clone());

    let mut public_routes = Router::new().route("/", get(root_handler));
    let mut protected_routes = Router::new();

    for prefix in ROUTE_PREFIXES {
        public_routes = public_routes
            .route(&format!("{prefix}/login"), post(login_handler::<S, C>))
            .route(&format!("{prefix}/verify"), get(verify_handler::<S, C>));

        protected_routes = protected_routes
            .route(&format!("{prefix}/folders"), get(folders_handler::<S, C>))
            .route(&format!("{prefix}/images"), get(images_handler::<S, C>))
            .route(
                &format!("{prefix}/images/{{*path}}"),
                delete(delete_image_handler::<S, C>),
            )
            .route(&format!("{prefix}/upload"), post(upload_handler::<S, C>))
            .route(
                &format!("{prefix}/purge-cache"),
                post(purge_cache_handler::<S, C>),
            )
            .route(&format!("{prefix}/deploy"), post(deploy_handler::<S, C>))
            .route(
                &format!("{prefix}/deploy-status"),
                get(deploy_status_handler::<S, C>),
            );
    }

    // route_layer so unmatched paths reach the 404 fallback without a token
    let protected_routes =
        protected_routes.route_layer(middleware::from_fn_with_state(auth, auth_middleware));

    let router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        // CORS outside panic recovery so the panic envelope is readable too
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(build_cors_layer());

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer: any origin, the admin API's methods and headers.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-image-domain"),
        ])
        .max_age(Duration::from_secs(86400)) // 24 hours
}

// =============================================================================
// Tests
// =============================================================================
