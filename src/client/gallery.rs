//! Gallery view-model: folders, the current image page, search, pagination
//! and delete mode.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::content::{ImageQuery, ImageRecord, DEFAULT_PAGE_LIMIT};
use crate::error::ClientError;

use super::api::AdminApi;
use super::events::{emit, BatchReport, EventSender, UiEvent};

/// Page numbers shown around the current page.
const PAGE_WINDOW: u32 = 5;

/// State behind the gallery screen.
///
/// Folders are logical paths below the server's content root; the empty
/// path is the root itself. The server applies the root prefix.
pub struct GalleryModel<A: AdminApi> {
    api: Arc<A>,
    events: EventSender,
    current_path: String,
    current_page: u32,
    total_pages: u32,
    per_page: u32,
    search_query: String,
    folders: Vec<String>,
    images: Vec<ImageRecord>,
    delete_mode: bool,
    /// Selected images, keyed by URL
    selected: Vec<ImageRecord>,
}

impl<A: AdminApi> GalleryModel<A> {
    pub fn new(api: Arc<A>, events: EventSender) -> Self {
        Self {
            api,
            events,
            current_path: String::new(),
            current_page: 1,
            total_pages: 1,
            per_page: DEFAULT_PAGE_LIMIT,
            search_query: String::new(),
            folders: Vec::new(),
            images: Vec::new(),
            delete_mode: false,
            selected: Vec::new(),
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn is_delete_mode(&self) -> bool {
        self.delete_mode
    }

    pub fn selected(&self) -> &[ImageRecord] {
        &self.selected
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load folders, then the first image page.
    pub async fn init(&mut self) -> Result<(), ClientError> {
        self.load_folders().await?;
        self.load_images().await
    }

    pub async fn load_folders(&mut self) -> Result<(), ClientError> {
        match self.api.list_folders().await {
            Ok(folders) => {
                self.folders = folders;
                emit(
                    &self.events,
                    UiEvent::FoldersLoaded {
                        folders: self.folders.clone(),
                    },
                );
                Ok(())
            }
            Err(e) => {
                emit(
                    &self.events,
                    UiEvent::LoadFailed {
                        message: format!("Failed to load folders: {}", e),
                    },
                );
                Err(e)
            }
        }
    }

    /// Reload the current page of the current folder.
    pub async fn load_images(&mut self) -> Result<(), ClientError> {
        let query = ImageQuery::new(&self.current_path, self.current_page, self.per_page)
            .with_search(self.search_query.clone());

        match self.api.list_images(&query).await {
            Ok(page) => {
                self.images = page.images;
                self.total_pages = page.pagination.total;
                emit(
                    &self.events,
                    UiEvent::ImagesLoaded {
                        folder: self.current_path.clone(),
                        page: self.current_page,
                        total_pages: self.total_pages,
                        count: self.images.len(),
                    },
                );
                Ok(())
            }
            Err(e) => {
                emit(
                    &self.events,
                    UiEvent::LoadFailed {
                        message: format!("Failed to load images: {}", e),
                    },
                );
                Err(e)
            }
        }
    }

    /// Switch folder: back to page 1, search cleared.
    pub async fn change_folder(&mut self, path: impl Into<String>) -> Result<(), ClientError> {
        self.set_location(path, 1, "");
        self.load_images().await
    }

    /// Apply a search: back to page 1.
    pub async fn search(&mut self, query: &str) -> Result<(), ClientError> {
        self.search_query = query.trim().to_string();
        self.current_page = 1;
        self.load_images().await
    }

    /// Go to a page. Returns `false` without loading if the page is the
    /// current one or out of range.
    pub async fn go_to_page(&mut self, page: u32) -> Result<bool, ClientError> {
        if page == self.current_page || page < 1 || page > self.total_pages {
            return Ok(false);
        }
        self.current_page = page;
        self.load_images().await?;
        Ok(true)
    }

    /// Set folder, page and search without loading.
    pub fn set_location(&mut self, path: impl Into<String>, page: u32, search: &str) {
        self.current_path = path.into().trim_matches('/').to_string();
        self.current_page = page.max(1);
        self.search_query = search.trim().to_string();
    }

    /// Page numbers to offer: at most five, starting two before the current
    /// page. Empty when everything fits on one page.
    pub fn page_window(&self) -> Vec<u32> {
        if self.total_pages <= 1 {
            return Vec::new();
        }
        let start = self.current_page.saturating_sub(2).max(1);
        let end = self.total_pages.min(start + PAGE_WINDOW - 1);
        (start..=end).collect()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    // =========================================================================
    // Delete Mode
    // =========================================================================

    pub fn toggle_delete_mode(&mut self) {
        if self.delete_mode {
            self.exit_delete_mode();
        } else {
            self.delete_mode = true;
            self.selected.clear();
            emit(&self.events, UiEvent::DeleteModeChanged { active: true });
            self.emit_selection();
        }
    }

    pub fn exit_delete_mode(&mut self) {
        self.delete_mode = false;
        self.selected.clear();
        emit(&self.events, UiEvent::DeleteModeChanged { active: false });
    }

    /// Toggle selection of a listed image by URL. Only works in delete mode.
    ///
    /// Returns whether the image is selected afterwards.
    pub fn toggle_selection(&mut self, url: &str) -> bool {
        if !self.delete_mode {
            return false;
        }

        let now_selected = if let Some(index) = self.selected.iter().position(|i| i.url == url) {
            self.selected.remove(index);
            false
        } else if let Some(image) = self.images.iter().find(|i| i.url == url) {
            self.selected.push(image.clone());
            true
        } else {
            return false;
        };

        self.emit_selection();
        now_selected
    }

    fn emit_selection(&self) {
        emit(
            &self.events,
            UiEvent::SelectionChanged {
                selected: self.selected.len(),
            },
        );
    }

    /// Logical path of a file in the current folder.
    pub fn delete_target(&self, file_name: &str) -> String {
        if self.current_path.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.current_path, file_name)
        }
    }

    /// Logical paths of the selected images.
    pub fn delete_targets(&self) -> Vec<String> {
        self.selected
            .iter()
            .map(|image| self.delete_target(&image.name))
            .collect()
    }

    /// Delete the selected images, leave delete mode and reload.
    pub async fn delete_selected(&mut self) -> BatchReport {
        let targets = self.delete_targets();
        self.delete_paths(targets).await
    }

    /// Delete files of the current folder by name, leave delete mode and reload.
    pub async fn delete_files(&mut self, names: &[String]) -> BatchReport {
        let targets = names.iter().map(|n| self.delete_target(n)).collect();
        self.delete_paths(targets).await
    }

    async fn delete_paths(&mut self, targets: Vec<String>) -> BatchReport {
        let mut report = BatchReport::default();
        if targets.is_empty() {
            return report;
        }

        for target in targets {
            debug!(path = %target, "Deleting image");
            match self.api.delete_image(&target).await {
                Ok(()) => report.succeeded.push(target),
                Err(e) => {
                    warn!(path = %target, error = %e, "Delete failed");
                    report.failed.push((target, e.to_string()));
                }
            }
        }

        self.exit_delete_mode();
        emit(&self.events, UiEvent::DeleteFinished(report.clone()));

        // Failure is already reported through LoadFailed
        let _ = self.load_images().await;
        report
    }

    // =========================================================================
    // Cache
    // =========================================================================

    pub async fn purge_cache(&self) -> Result<String, ClientError> {
        let message = self.api.purge_cache().await?;
        emit(
            &self.events,
            UiEvent::CachePurged {
                message: message.clone(),
            },
        );
        Ok(message)
    }
}
