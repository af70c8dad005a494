//! Sequential multi-file upload with progress events.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::content::UploadedImage;
use crate::error::ClientError;

use super::api::AdminApi;
use super::events::{emit, BatchReport, EventSender, UiEvent};

/// Where a batch is uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    /// An existing folder (or the root)
    Existing(String),

    /// A folder created by the upload
    NewFolder(String),
}

impl UploadTarget {
    /// The folder name and the `create_folder` flag to send.
    pub fn resolve(&self) -> Result<(String, bool), ClientError> {
        match self {
            UploadTarget::Existing(folder) => Ok((folder.clone(), false)),
            UploadTarget::NewFolder(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ClientError::InvalidInput(
                        "Enter a name for the new folder".to_string(),
                    ));
                }
                Ok((name.to_string(), true))
            }
        }
    }
}

/// A file queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Read a file from disk, named after its final path component.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ClientError::InvalidInput(format!("Not a file name: {}", path.display()))
            })?
            .to_string();
        let content = tokio::fs::read(path).await?;
        Ok(Self { name, content })
    }
}

/// Result of an upload batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Folder the batch went to
    pub folder: String,

    pub uploaded: Vec<UploadedImage>,

    pub batch: BatchReport,
}

/// Uploads files one at a time, emitting progress before each file.
pub struct Uploader<A: AdminApi> {
    api: Arc<A>,
    events: EventSender,
}

impl<A: AdminApi> Uploader<A> {
    pub fn new(api: Arc<A>, events: EventSender) -> Self {
        Self { api, events }
    }

    /// Upload a batch. A failed file is recorded and the batch continues.
    pub async fn upload(
        &self,
        files: Vec<UploadFile>,
        target: &UploadTarget,
    ) -> Result<UploadReport, ClientError> {
        if files.is_empty() {
            return Err(ClientError::InvalidInput(
                "Select at least one image to upload".to_string(),
            ));
        }
        let (folder, create_folder) = target.resolve()?;

        let total = files.len();
        let mut report = UploadReport {
            folder: folder.clone(),
            ..UploadReport::default()
        };

        for (index, file) in files.into_iter().enumerate() {
            emit(
                &self.events,
                UiEvent::UploadProgress {
                    percent: progress_percent(index, total),
                    file: file.name.clone(),
                },
            );

            match self
                .api
                .upload_image(&folder, &file.name, file.content, create_folder)
                .await
            {
                Ok(uploaded) => {
                    report.batch.succeeded.push(file.name);
                    report.uploaded.push(uploaded);
                }
                Err(e) => {
                    warn!(file = %file.name, error = %e, "Upload failed");
                    report.batch.failed.push((file.name, e.to_string()));
                }
            }
        }

        emit(
            &self.events,
            UiEvent::UploadProgress {
                percent: 100,
                file: String::new(),
            },
        );
        emit(&self.events, UiEvent::UploadFinished(report.batch.clone()));
        Ok(report)
    }
}

/// Share of the batch done before file `index` starts, rounded.
fn progress_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((index as f64 / total as f64) * 100.0).round() as u8
}
