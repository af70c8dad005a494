use thiserror::Error;

/// Errors returned by the content provider (GitHub contents API).
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    /// Network or transport failure talking to the provider
    #[error("Connection error: {0}")]
    Request(String),

    /// Provider answered with a non-2xx status
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Path does not exist in the repository
    #[error("GitHub API error: 404 - not found: {0}")]
    NotFound(String),

    /// Provider answered 2xx but the body was not what the contents API returns
    #[error("Unexpected GitHub response: {0}")]
    UnexpectedResponse(String),
}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ContentError::UnexpectedResponse(err.to_string())
        } else {
            ContentError::Request(err.to_string())
        }
    }
}

/// Errors returned by the CDN provider (Cloudflare API).
#[derive(Debug, Clone, Error)]
pub enum CdnError {
    /// Network or transport failure talking to the provider
    #[error("Connection error: {0}")]
    Request(String),

    /// Provider reported `success: false`; `errors` is the serialized error list
    #[error("Cloudflare API error: {errors}")]
    Api { errors: String },

    /// Body could not be decoded as a Cloudflare envelope
    #[error("Unexpected Cloudflare response: {0}")]
    UnexpectedResponse(String),
}

impl From<reqwest::Error> for CdnError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CdnError::UnexpectedResponse(err.to_string())
        } else {
            CdnError::Request(err.to_string())
        }
    }
}

/// Client-side input rejected before any provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The `X-Image-Domain` header was absent or empty
    #[error("Missing image domain: send the public image base URL in the X-Image-Domain header")]
    MissingImageDomain,

    /// File name does not carry one of the supported image extensions
    #[error("Unsupported file format: {0} (supported: JPEG, PNG, GIF, WebP and AVIF)")]
    UnsupportedFormat(String),

    /// A path segment could not be percent-decoded
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Errors from the image library, the layer between HTTP handlers and the provider.
#[derive(Debug, Clone, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Errors surfaced by the admin client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure reaching the API
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API answered with the `{success:false, message}` envelope
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// An operation that needs a session token was attempted without one
    #[error("Not logged in: run `imghost admin login` first")]
    NotAuthenticated,

    /// A deploy poll is already running
    #[error("A deployment is already being monitored")]
    DeployInProgress,

    /// Reading or writing the session file failed
    #[error("Session storage error: {0}")]
    Session(#[from] std::io::Error),

    /// Local validation of operator input failed
    #[error("{0}")]
    InvalidInput(String),
}

/// Errors returned by the HTTP layer, rendered as `{success:false, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed or incomplete client input (400)
    #[error("{0}")]
    BadRequest(String),

    /// Authentication failed (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Known route, wrong method (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// No such route (404)
    #[error("API route not found")]
    NotFound,

    /// A provider call failed (500); the message embeds the provider's
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    /// Wrap a provider failure with the operation that failed.
    pub fn upstream(context: &str, err: impl std::fmt::Display) -> Self {
        ApiError::Upstream(format!("{}: {}", context, err))
    }

    /// Map a library failure: input errors are the caller's, the rest upstream.
    pub fn from_library(context: &str, err: LibraryError) -> Self {
        match err {
            LibraryError::Input(input) => input.into(),
            LibraryError::Content(content) => ApiError::upstream(context, content),
        }
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
