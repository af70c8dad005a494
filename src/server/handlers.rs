//! HTTP request handlers for the image hosting admin API.
//!
//! Every route is served both as `/<name>` and `/api/<name>`.
//!
//! # Endpoints
//!
//! - `GET /` - Banner
//! - `POST /login` - Exchange the admin password for a token
//! - `GET /verify` - Session check
//! - `GET /folders` - List image folders
//! - `GET /images` - List one page of images in a folder
//! - `POST /upload` - Upload an image (multipart)
//! - `DELETE /images/{path}` - Delete an image
//! - `POST /purge-cache` - Purge the CDN cache for the image domain
//! - `POST /deploy` - Trigger a static-site deployment
//! - `GET /deploy-status` - Look up a deployment's status
//!
//! Successful responses carry `success: true`; every failure is rendered as
//! `{"success": false, "message": "..."}`.

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, OriginalUri, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cdn::{purge_prefix, CdnProvider};
use crate::config::TokenPolicy;
use crate::content::path::decode_segments;
use crate::content::{
    ContentStore, ImageLibrary, ImagePage, ImageQuery, UploadedImage, DEFAULT_PAGE_LIMIT,
};
use crate::error::{ApiError, InputError};

use super::auth::{AuthError, SessionAuth};

/// Header carrying the public image base URL (e.g. `https://img.example.com`).
pub const IMAGE_DOMAIN_HEADER: &str = "x-image-domain";

/// Plain-text answer of `GET /`.
pub const BANNER: &str = "Image Hosting API is running";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: ContentStore, C: CdnProvider> {
    /// Image operations on the content repository
    pub library: Arc<ImageLibrary<S>>,

    /// Cache purge and deployments
    pub cdn: Arc<C>,

    /// Password check and token policy
    pub auth: SessionAuth,
}

impl<S: ContentStore, C: CdnProvider> AppState<S, C> {
    pub fn new(library: ImageLibrary<S>, cdn: C, auth: SessionAuth) -> Self {
        Self {
            library: Arc::new(library),
            cdn: Arc::new(cdn),
            auth,
        }
    }
}

impl<S: ContentStore, C: CdnProvider> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            library: Arc::clone(&self.library),
            cdn: Arc::clone(&self.cdn),
            auth: self.auth.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Body of `POST /login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// Query parameters of `GET /images`.
///
/// Kept as strings so that non-numeric values fall back to the defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ImagesQueryParams {
    /// Logical folder (default: the content root)
    #[serde(default)]
    pub path: Option<String>,

    /// 1-based page number (default: 1)
    #[serde(default)]
    pub page: Option<String>,

    /// Page size (default: 20)
    #[serde(default)]
    pub limit: Option<String>,

    /// Case-insensitive substring filter on file names
    #[serde(default)]
    pub search: Option<String>,
}

/// Query parameters of `GET /deploy-status`.
#[derive(Debug, Default, Deserialize)]
pub struct DeployStatusQueryParams {
    #[serde(default, rename = "deploymentId")]
    pub deployment_id: Option<String>,
}

/// Parse a positive integer parameter, falling back on absent, non-numeric or
/// zero values.
fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// The `X-Image-Domain` header, if present and nonempty.
pub fn image_domain(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(IMAGE_DOMAIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,

    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderList {
    pub folders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldersResponse {
    pub success: bool,
    pub data: FolderList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesResponse {
    pub success: bool,
    pub data: ImagePage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub data: UploadedImage,
}

/// Success response carrying only a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub success: bool,
    pub message: String,

    /// Missing when the provider accepted the deployment without an id
    #[serde(rename = "deploymentId")]
    pub deployment_id: Option<String>,
}

/// Response of `GET /deploy-status`.
///
/// On provider failure `success` is `false`, `status` is `"error"` and all
/// three flags are `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployStatusResponse {
    pub success: bool,

    /// Raw provider stage status (`queued`, `active`, `success`, ...)
    pub status: String,

    #[serde(default, rename = "isCompleted")]
    pub is_completed: bool,

    #[serde(default, rename = "isFailed")]
    pub is_failed: bool,

    #[serde(default, rename = "isInProgress")]
    pub is_in_progress: bool,

    pub message: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ApiError to HTTP response.
///
/// Logged by severity: 5xx at ERROR, 404 at DEBUG, other 4xx at WARN.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), "Server error: {}", message);
        } else if status == StatusCode::NOT_FOUND {
            debug!(status = status.as_u16(), "Client error: {}", message);
        } else {
            warn!(status = status.as_u16(), "Client error: {}", message);
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

/// Render a caught handler panic as a 500 envelope.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::Upstream(format!("Server error: {}", detail)).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle `GET /`.
pub async fn root_handler() -> &'static str {
    BANNER
}

/// Exchange the admin password for a session token.
///
/// # Endpoint
///
/// `POST /login` with JSON body `{"password": "..."}`
///
/// # Response
///
/// `200 OK` with `{"success": true, "token": "<32 hex chars>"}`
///
/// # Errors
///
/// - `400 Bad Request`: Body is not valid JSON
/// - `401 Unauthorized`: Password missing or wrong
pub async fn login_handler<S: ContentStore, C: CdnProvider>(
    State(state): State<AppState<S, C>>,
    body: Bytes,
) -> Result<Json<LoginResponse>, ApiError> {
    let request: LoginRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    let password = request.password.unwrap_or_default();
    if !state.auth.check_password(&password) {
        return Err(AuthError::InvalidPassword.into());
    }

    let token = state.auth.issue_token().await;
    info!("Admin login succeeded");

    Ok(Json(LoginResponse {
        success: true,
        token,
    }))
}

/// Session check used by the admin client on startup.
///
/// Under the default token policy this always succeeds. Under the
/// issued-token policy the bearer token must be one this process issued.
pub async fn verify_handler<S: ContentStore, C: CdnProvider>(
    State(state): State<AppState<S, C>>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AuthError> {
    if state.auth.policy() == TokenPolicy::Issued {
        state.auth.authorize(&headers).await?;
    }
    Ok(Json(SuccessResponse::ok()))
}

/// List image folders.
///
/// # Endpoint
///
/// `GET /folders`
///
/// # Response
///
/// ```json
/// { "success": true, "data": { "folders": ["cats", "dogs"] } }
/// ```
pub async fn folders_handler<S: ContentStore, C: CdnProvider>(
    State(state): State<AppState<S, C>>,
) -> Result<Json<FoldersResponse>, ApiError> {
    let folders = state
        .library
        .list_folders()
        .await
        .map_err(|e| ApiError::upstream("Failed to list folders", e))?;

    Ok(Json(FoldersResponse {
        success: true,
        data: FolderList { folders },
    }))
}

/// List one page of images.
///
/// # Endpoint
///
/// `GET /images?path=cats&page=1&limit=20&search=tabby`
///
/// # Headers
///
/// - `X-Image-Domain`: Public image base URL (required)
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "images": [
///       { "name": "a.png", "url": "https://img.example.com/cats/a.png",
///         "size": 1024, "created_at": "2024-01-01T00:00:00Z" }
///     ],
///     "pagination": { "current": 1, "total": 1, "hasNext": false }
///   }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing `X-Image-Domain`
/// - `500 Internal Server Error`: Provider error
pub async fn images_handler<S: ContentStore, C: CdnProvider>(
    State(state): State<AppState<S, C>>,
    headers: HeaderMap,
    Query(params): Query<ImagesQueryParams>,
) -> Result<Json<ImagesResponse>, ApiError> {
    let path = params
        .path
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| state.library.root().name().to_string());

    let query = ImageQuery::new(
        path,
        positive_or(params.page.as_deref(), 1),
        positive_or(params.limit.as_deref(), DEFAULT_PAGE_LIMIT),
    )
    .with_search(params.search.unwrap_or_default());

    let page = state
        .library
        .list_images(&query, image_domain(&headers))
        .await
        .map_err(|e| ApiError::from_library("Failed to list images", e))?;

    Ok(Json(ImagesResponse {
        success: true,
        data: page,
    }))
}

/// Upload an image.
///
/// # Endpoint
///
/// `POST /upload` as `multipart/form-data`
///
/// # Fields
///
/// - `file`: The image (required)
/// - `path`: Target folder (default: the content root)
/// - `create_folder`: `"true"` when the folder is new; the provider creates
///   intermediate directories on write, so this is only logged
///
/// # Errors
///
/// - `400 Bad Request`: Not multipart, no file, unsupported extension, or
///   missing `X-Image-Domain`
/// - `500 Internal Server Error`: Provider error
pub async fn upload_handler<S: ContentStore, C: CdnProvider>(
    State(state): State<AppState<S, C>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut file: Option<(String, Bytes)> = None;
    let mut folder: Option<String> = None;
    let mut create_folder = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                // Browsers may send a full path on some platforms
                let name = field
                    .file_name()
                    .and_then(|n| n.rsplit(['/', '\\']).next())
                    .unwrap_or_default()
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?;
                file = Some((name, data));
            }
            "path" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?;
                folder = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            "create_folder" => {
                create_folder = field.text().await.map(|t| t == "true").unwrap_or(false);
            }
            _ => {}
        }
    }

    let (file_name, data) = file
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    let folder = folder.unwrap_or_else(|| state.library.root().name().to_string());

    debug!(folder = %folder, file = %file_name, create_folder, "Upload request");

    let uploaded = state
        .library
        .upload_image(&folder, &file_name, &data, image_domain(&headers))
        .await
        .map_err(|e| ApiError::from_library("Failed to upload image", e))?;

    Ok(Json(UploadResponse {
        success: true,
        data: uploaded,
    }))
}

/// Delete an image.
///
/// # Endpoint
///
/// `DELETE /images/{path}`, where every segment of `path` is percent-encoded
/// on its own, e.g. `/images/my%20cats/a%231.png`.
///
/// The raw request URI is used rather than a path extractor so that an
/// encoded `/` inside a segment survives until the segments are split.
///
/// # Errors
///
/// - `400 Bad Request`: Empty or undecodable path
/// - `500 Internal Server Error`: Provider error, including a missing file
pub async fn delete_image_handler<S: ContentStore, C: CdnProvider>(
    State(state): State<AppState<S, C>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<SuccessResponse>, ApiError> {
    let raw = uri.path();
    let encoded = raw
        .strip_prefix("/api/images/")
        .or_else(|| raw.strip_prefix("/images/"))
        .unwrap_or_default();

    let logical = decode_segments(encoded)?;
    if logical.trim_matches('/').is_empty() {
        return Err(InputError::InvalidPath(raw.to_string()).into());
    }

    state
        .library
        .delete_image(&logical)
        .await
        .map_err(|e| ApiError::upstream("Failed to delete image", e))?;

    Ok(Json(SuccessResponse::ok()))
}

/// Purge every cached URL under the image domain.
///
/// # Endpoint
///
/// `POST /purge-cache` with `X-Image-Domain`
///
/// # Response
///
/// `{"success": true, "message": "Cache purged"}`
pub async fn purge_cache_handler<S: ContentStore, C: CdnProvider>(
    State(state): State<AppState<S, C>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let domain = image_domain(&headers).ok_or(InputError::MissingImageDomain)?;
    let prefix = purge_prefix(domain);

    state
        .cdn
        .purge_prefixes(std::slice::from_ref(&prefix))
        .await
        .map_err(|e| ApiError::upstream("Failed to purge cache", e))?;

    info!(prefix = %prefix, "Cache purged");
    Ok(Json(MessageResponse {
        success: true,
        message: "Cache purged".to_string(),
    }))
}

/// Trigger a deployment of the static site.
///
/// # Endpoint
///
/// `POST /deploy`
///
/// # Response
///
/// `{"success": true, "message": "Deployment triggered", "deploymentId": "..."}`
pub async fn deploy_handler<S: ContentStore, C: CdnProvider>(
    State(state): State<AppState<S, C>>,
) -> Result<Json<DeployResponse>, ApiError> {
    let deployment_id = state
        .cdn
        .trigger_deployment()
        .await
        .map_err(|e| ApiError::upstream("Failed to trigger deployment", e))?;

    info!(deployment_id = ?deployment_id, "Deployment triggered");
    Ok(Json(DeployResponse {
        success: true,
        message: "Deployment triggered".to_string(),
        deployment_id,
    }))
}

/// Look up a deployment's stage status.
///
/// # Endpoint
///
/// `GET /deploy-status?deploymentId=...`
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "status": "active",
///   "isCompleted": false,
///   "isFailed": false,
///   "isInProgress": true,
///   "message": "Deployment status: active"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing `deploymentId`
/// - `500 Internal Server Error`: Provider error, with `status: "error"`
pub async fn deploy_status_handler<S: ContentStore, C: CdnProvider>(
    State(state): State<AppState<S, C>>,
    Query(params): Query<DeployStatusQueryParams>,
) -> Result<Response, ApiError> {
    let deployment_id = params
        .deployment_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing deploymentId".to_string()))?;

    match state.cdn.deployment_status(&deployment_id).await {
        Ok(stage) => Ok(Json(DeployStatusResponse {
            success: true,
            status: stage.to_string(),
            is_completed: stage.is_completed(),
            is_failed: stage.is_failed(),
            is_in_progress: stage.is_in_progress(),
            message: format!("Deployment status: {}", stage),
        })
        .into_response()),
        Err(e) => {
            let message = format!("Failed to get deployment status: {}", e);
            error!(deployment_id = %deployment_id, "Server error: {}", message);
            let body = DeployStatusResponse {
                success: false,
                status: "error".to_string(),
                is_completed: false,
                is_failed: false,
                is_in_progress: false,
                message,
            };
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
    }
}

/// Fallback for unmatched paths.
pub async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}

/// Fallback for known paths requested with an unsupported method.
pub async fn method_not_allowed_handler() -> ApiError {
    ApiError::MethodNotAllowed
}

// =============================================================================
// Tests
// =============================================================================
