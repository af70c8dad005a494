//! Password login and bearer-token gate.
//!
//! # Session Scheme
//!
//! `POST /login` compares the submitted password against the configured admin
//! password and, on a match, returns an opaque token: 16 random bytes,
//! hex-encoded. Tokens carry no claims, no expiry and no signature.
//!
//! Protected routes then require `Authorization: Bearer <token>`. What counts
//! as a valid token depends on the [`TokenPolicy`]:
//!
//! - [`TokenPolicy::AnyBearer`] (default): any nonempty token is accepted.
//!   Nothing is stored server-side, so this gate only authenticates the login
//!   call itself.
//! - [`TokenPolicy::Issued`]: only tokens handed out by this process are
//!   accepted. They are held in memory and lost on restart.
//!
//! # Example
//!
//! ```rust
//! use imghost::config::TokenPolicy;
//! use imghost::server::auth::SessionAuth;
//!
//! # tokio_test_block_on(async {
//! let auth = SessionAuth::new("hunter2", TokenPolicy::Issued);
//! assert!(auth.check_password("hunter2"));
//!
//! let token = auth.issue_token().await;
//! assert_eq!(token.len(), 32);
//! assert!(auth.accepts(&token).await);
//! assert!(!auth.accepts("someone-elses-token").await);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::TokenPolicy;

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header, or an empty token
    MissingToken,

    /// Token was not issued by this process (issued-token policy only)
    UnknownToken,

    /// Login password missing or wrong
    InvalidPassword,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Unauthorized"),
            AuthError::UnknownToken => write!(f, "Unauthorized: session is not valid"),
            AuthError::InvalidPassword => write!(f, "Invalid password"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        let message = self.to_string();

        // Wrong passwords are worth seeing; missing tokens are routine
        match &self {
            AuthError::InvalidPassword | AuthError::UnknownToken => {
                warn!(status = status.as_u16(), "Authentication failed: {}", message);
            }
            AuthError::MissingToken => {
                debug!(status = status.as_u16(), "Authentication failed: {}", message);
            }
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// =============================================================================
// Session Authentication
// =============================================================================

/// Generate an opaque session token: 16 random bytes, hex-encoded.
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` when the header is absent, uses another scheme, or carries
/// an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let rest = value.strip_prefix("Bearer ")?;
    let token = rest.split(' ').next().unwrap_or("");
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Password check and token bookkeeping shared by the login route and the
/// auth middleware.
#[derive(Clone)]
pub struct SessionAuth {
    password: Arc<[u8]>,
    policy: TokenPolicy,
    issued: Arc<RwLock<HashSet<String>>>,
}

impl SessionAuth {
    pub fn new(password: impl AsRef<[u8]>, policy: TokenPolicy) -> Self {
        Self {
            password: Arc::from(password.as_ref()),
            policy,
            issued: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Compare a candidate password in constant time.
    ///
    /// An empty candidate never matches.
    pub fn check_password(&self, candidate: &str) -> bool {
        !candidate.is_empty() && bool::from(candidate.as_bytes().ct_eq(&self.password))
    }

    /// Issue a fresh token, remembering it under the issued-token policy.
    pub async fn issue_token(&self) -> String {
        let token = generate_token();
        if self.policy == TokenPolicy::Issued {
            self.issued.write().await.insert(token.clone());
        }
        token
    }

    /// Whether a (nonempty) bearer token grants access.
    pub async fn accepts(&self, token: &str) -> bool {
        match self.policy {
            TokenPolicy::AnyBearer => !token.is_empty(),
            TokenPolicy::Issued => self.issued.read().await.contains(token),
        }
    }

    /// Check the request headers, returning the rejection if access is denied.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        if self.accepts(token).await {
            Ok(())
        } else {
            Err(AuthError::UnknownToken)
        }
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware rejecting requests without an accepted bearer token.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware, routing::get};
/// use imghost::server::auth::{SessionAuth, auth_middleware};
///
/// let auth = SessionAuth::new("hunter2", TokenPolicy::AnyBearer);
/// let app = Router::new()
///     .route("/folders", get(folders_handler))
///     .route_layer(middleware::from_fn_with_state(auth, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(auth): State<SessionAuth>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    auth.authorize(request.headers()).await?;
    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
