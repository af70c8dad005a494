//! Logical path handling for the content root.
//!
//! Every image and folder lives under a single repository directory (the
//! content root, `frontend` by default). Callers speak in logical
//! paths (`"cats"`, `"frontend"`, `"frontend/cats"`), the provider speaks in
//! repository paths (`"frontend/cats"`), and public URLs drop the root
//! entirely (`"https://img.example.com/cats/a.png"`).
//!
//! [`ContentRoot`] owns the conversions so the root prefix is applied exactly
//! once no matter which form the caller starts from.

use crate::error::InputError;

/// Default repository directory holding the images.
pub const DEFAULT_CONTENT_ROOT: &str = "frontend";

/// Lowercase extensions accepted for listing and upload.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".avif"];

/// Top-level directories that hold site assets rather than image folders.
pub const RESERVED_FOLDERS: &[&str] = &["css", "js"];

/// Check whether a file name carries a supported image extension.
pub fn is_supported_image(name: &str) -> bool {
    let lower = name.to_lowercase();
    SUPPORTED_IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// Check whether a top-level directory name is reserved.
pub fn is_reserved_folder(name: &str) -> bool {
    RESERVED_FOLDERS.contains(&name)
}

/// Percent-encode every segment of a path, keeping `/` separators.
pub fn encode_segments(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-decode every segment of a path, keeping `/` separators.
pub fn decode_segments(path: &str) -> Result<String, InputError> {
    path.split('/')
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .map_err(|_| InputError::InvalidPath(path.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|segments| segments.join("/"))
}

/// The repository directory all logical paths are rooted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRoot {
    name: String,
}

impl ContentRoot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim_matches('/').to_string(),
        }
    }

    /// The root directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Convert a logical path to the repository path, prefixing the root once.
    ///
    /// An empty path means the root itself.
    pub fn provider_path(&self, logical: &str) -> String {
        let trimmed = logical.trim_matches('/');
        if trimmed.is_empty() {
            self.name.clone()
        } else if self.is_rooted(trimmed) {
            trimmed.to_string()
        } else {
            format!("{}/{}", self.name, trimmed)
        }
    }

    /// Prefix used between the public domain and the file name.
    ///
    /// Empty for the root, `"<folder>/"` for anything below it.
    pub fn url_prefix(&self, logical: &str) -> String {
        let provider = self.provider_path(logical);
        match provider.strip_prefix(&self.name) {
            Some("") | None => String::new(),
            Some(rest) => format!("{}/", rest.trim_start_matches('/')),
        }
    }

    /// Build the public URL for a file stored under a logical folder.
    pub fn public_url(&self, domain: &str, logical_folder: &str, file_name: &str) -> String {
        format!(
            "{}/{}{}",
            domain.trim_end_matches('/'),
            self.url_prefix(logical_folder),
            file_name
        )
    }

    fn is_rooted(&self, path: &str) -> bool {
        path == self.name
            || path
                .strip_prefix(&self.name)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl Default for ContentRoot {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_ROOT)
    }
}
