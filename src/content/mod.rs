//! Content provider layer.
//!
//! Images live as plain files in a source-hosting repository. This module
//! abstracts the repository behind [`ContentStore`] and builds the image
//! operations of the admin API on top of it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              ImageLibrary               │
//! │  (root normalization, filtering,        │
//! │   search, pagination, public URLs)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           ContentStore Trait            │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │         GitHubContentStore              │
//! │      (GitHub repository contents)       │
//! └─────────────────────────────────────────┘
//! ```

mod github;
mod library;
pub mod path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ContentError;

pub use github::{GitHubContentStore, DEFAULT_GITHUB_API_URL};
pub use library::{
    ImageLibrary, ImagePage, ImageQuery, ImageRecord, Pagination, UploadedImage, DEFAULT_PAGE_LIMIT,
};
pub use path::{ContentRoot, DEFAULT_CONTENT_ROOT, SUPPORTED_IMAGE_EXTENSIONS};

/// Kind of a repository entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// A single file or directory as reported by the content provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// Entry name (last path segment)
    pub name: String,

    /// Repository-relative path
    #[serde(default)]
    pub path: String,

    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Size in bytes (0 for directories)
    #[serde(default)]
    pub size: u64,

    /// Content hash; required by the provider to delete the entry
    #[serde(default)]
    pub sha: String,
}

impl ContentEntry {
    pub fn file(path: impl Into<String>, size: u64, sha: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            path,
            kind: EntryKind::File,
            size,
            sha: sha.into(),
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            path,
            kind: EntryKind::Dir,
            size: 0,
            sha: String::new(),
        }
    }
}

/// Repository-backed file storage.
///
/// All paths are repository-relative and unencoded; implementations take
/// care of any URL encoding their transport needs.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// List the entries of a directory.
    async fn list_directory(&self, path: &str) -> Result<Vec<ContentEntry>, ContentError>;

    /// Fetch a single file entry, including its content hash.
    async fn get_entry(&self, path: &str) -> Result<ContentEntry, ContentError>;

    /// Create a file with the given content. Missing parent directories are
    /// created implicitly.
    async fn put_file(&self, path: &str, content: &[u8], message: &str)
        -> Result<(), ContentError>;

    /// Delete a file, authorized by its current content hash.
    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<(), ContentError>;
}
