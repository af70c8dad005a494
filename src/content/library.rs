//! Image operations on top of a [`ContentStore`].
//!
//! The library is the only place that converts between logical folders and
//! repository paths, so handlers and the admin client never build provider
//! paths themselves.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ContentError, InputError, LibraryError};

use super::path::{is_reserved_folder, is_supported_image, ContentRoot};
use super::{ContentStore, EntryKind};

/// Default page size for image listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

// =============================================================================
// Types
// =============================================================================

/// Parameters of an image listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    /// Logical folder (with or without the root prefix)
    pub path: String,

    /// 1-based page number
    pub page: u32,

    /// Page size
    pub limit: u32,

    /// Case-insensitive substring filter on file names
    pub search: Option<String>,
}

impl ImageQuery {
    pub fn new(path: impl Into<String>, page: u32, limit: u32) -> Self {
        Self {
            path: path.into(),
            page: page.max(1),
            limit: limit.max(1),
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.is_empty() { None } else { Some(search) };
        self
    }
}

/// A listed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub name: String,

    /// Public URL under the image domain
    pub url: String,

    /// Size in bytes
    pub size: u64,

    /// Listing time. The provider does not expose creation times.
    pub created_at: DateTime<Utc>,
}

/// Pagination block of an image listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Requested page
    pub current: u32,

    /// Number of pages, `ceil(count / limit)`
    pub total: u32,

    #[serde(rename = "hasNext")]
    pub has_next: bool,
}

impl Pagination {
    pub fn compute(page: u32, limit: u32, count: usize) -> Self {
        let limit = limit.max(1) as usize;
        let page = page.max(1);
        Self {
            current: page,
            total: count.div_ceil(limit) as u32,
            has_next: (page as usize).saturating_mul(limit) < count,
        }
    }
}

/// One page of images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePage {
    pub images: Vec<ImageRecord>,
    pub pagination: Pagination,
}

/// Result of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub name: String,
    pub url: String,
}

// =============================================================================
// Image Library
// =============================================================================

/// Image and folder operations rooted at a single repository directory.
///
/// # Type Parameters
///
/// * `S` - The content store (e.g. [`GitHubContentStore`](super::GitHubContentStore))
pub struct ImageLibrary<S: ContentStore> {
    store: Arc<S>,
    root: ContentRoot,
}

impl<S: ContentStore> ImageLibrary<S> {
    /// Create a library rooted at the default content root.
    pub fn new(store: S) -> Self {
        Self::with_root(store, ContentRoot::default())
    }

    pub fn with_root(store: S, root: ContentRoot) -> Self {
        Self {
            store: Arc::new(store),
            root,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn root(&self) -> &ContentRoot {
        &self.root
    }

    /// List the image folders directly under the root, skipping reserved names.
    pub async fn list_folders(&self) -> Result<Vec<String>, ContentError> {
        let entries = self.store.list_directory(self.root.name()).await?;

        Ok(entries
            .into_iter()
            .filter(|e| e.kind == EntryKind::Dir && !is_reserved_folder(&e.name))
            .map(|e| e.name)
            .collect())
    }

    /// List one page of images in a folder.
    ///
    /// Filtering (image extension, then search) happens before pagination, so
    /// `pagination.total` counts matching images only.
    pub async fn list_images(
        &self,
        query: &ImageQuery,
        domain: Option<&str>,
    ) -> Result<ImagePage, LibraryError> {
        let domain = require_domain(domain)?;
        let provider_path = self.root.provider_path(&query.path);
        debug!(path = %provider_path, page = query.page, limit = query.limit, "Listing images");

        let entries = self.store.list_directory(&provider_path).await?;

        let search = query.search.as_ref().map(|s| s.to_lowercase());
        let matching: Vec<_> = entries
            .into_iter()
            .filter(|e| e.kind == EntryKind::File && is_supported_image(&e.name))
            .filter(|e| match &search {
                Some(needle) => e.name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .collect();

        let pagination = Pagination::compute(query.page, query.limit, matching.len());
        let start = (pagination.current as usize - 1).saturating_mul(query.limit as usize);
        let listed_at = Utc::now();

        let images = matching
            .into_iter()
            .skip(start)
            .take(query.limit as usize)
            .map(|e| ImageRecord {
                url: self.root.public_url(domain, &query.path, &e.name),
                name: e.name,
                size: e.size,
                created_at: listed_at,
            })
            .collect();

        Ok(ImagePage { images, pagination })
    }

    /// Upload an image into a folder and return its public URL.
    ///
    /// The extension and the domain are checked before the provider is called.
    pub async fn upload_image(
        &self,
        folder: &str,
        file_name: &str,
        content: &[u8],
        domain: Option<&str>,
    ) -> Result<UploadedImage, LibraryError> {
        if !is_supported_image(file_name) {
            return Err(InputError::UnsupportedFormat(file_name.to_string()).into());
        }
        let domain = require_domain(domain)?;

        let target = format!("{}/{}", self.root.provider_path(folder), file_name);
        self.store
            .put_file(&target, content, &format!("Upload {}", file_name))
            .await?;

        info!(path = %target, bytes = content.len(), "Uploaded image");

        Ok(UploadedImage {
            name: file_name.to_string(),
            url: self.root.public_url(domain, folder, file_name),
        })
    }

    /// Delete an image by logical file path (e.g. `"cats/a.png"`).
    pub async fn delete_image(&self, logical_path: &str) -> Result<(), ContentError> {
        let target = self.root.provider_path(logical_path);
        let entry = self.store.get_entry(&target).await?;
        self.store
            .delete_file(&target, &entry.sha, &format!("Delete {}", target))
            .await?;

        info!(path = %target, "Deleted image");
        Ok(())
    }
}

fn require_domain(domain: Option<&str>) -> Result<&str, InputError> {
    match domain.map(str::trim) {
        Some(d) if !d.is_empty() => Ok(d),
        _ => Err(InputError::MissingImageDomain),
    }
}
