//! Events emitted by the admin view-models.
//!
//! The view-models never render anything themselves. Every visible change
//! (a list loaded, a progress step, a deployment settling) is sent as a
//! [`UiEvent`] and the front-end decides how to show it.

use std::fmt;

use tokio::sync::mpsc;

use super::deploy::PollOutcome;

/// Sending half of the event channel.
pub type EventSender = mpsc::UnboundedSender<UiEvent>;

/// Receiving half of the event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Create an event channel.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event, ignoring a front-end that has gone away.
pub(crate) fn emit(events: &EventSender, event: UiEvent) {
    let _ = events.send(event);
}

/// Outcome of a sequential batch (uploads or deletes).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items that went through
    pub succeeded: Vec<String>,

    /// Items that failed, with the error message
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A state change the front-end should show.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    FoldersLoaded {
        folders: Vec<String>,
    },

    ImagesLoaded {
        folder: String,
        page: u32,
        total_pages: u32,
        count: usize,
    },

    /// A listing request failed; the previous listing stays on screen
    LoadFailed {
        message: String,
    },

    DeleteModeChanged {
        active: bool,
    },

    SelectionChanged {
        selected: usize,
    },

    DeleteFinished(BatchReport),

    /// Percentage of the batch done before the named file is sent
    UploadProgress {
        percent: u8,
        file: String,
    },

    UploadFinished(BatchReport),

    CachePurged {
        message: String,
    },

    /// The deploy control should be enabled or disabled
    DeployControl {
        enabled: bool,
    },

    DeployTriggered {
        deployment_id: String,
    },

    DeployStatus {
        attempt: u32,
        status: String,
    },

    /// Exactly one per poll run
    DeploySettled(PollOutcome),

    /// Free-form message for the operator
    Notice {
        message: String,
    },
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiEvent::FoldersLoaded { folders } => {
                write!(f, "Folders: {}", folders.join(", "))
            }
            UiEvent::ImagesLoaded {
                folder,
                page,
                total_pages,
                count,
            } => write!(
                f,
                "{}: page {} of {} ({} image(s))",
                if folder.is_empty() { "/" } else { folder.as_str() },
                page,
                total_pages,
                count
            ),
            UiEvent::LoadFailed { message } => write!(f, "Load failed: {}", message),
            UiEvent::DeleteModeChanged { active } => {
                write!(f, "Delete mode {}", if *active { "on" } else { "off" })
            }
            UiEvent::SelectionChanged { selected } => write!(f, "{} image(s) selected", selected),
            UiEvent::DeleteFinished(report) => write!(
                f,
                "Delete finished: {} succeeded, {} failed",
                report.success_count(),
                report.failure_count()
            ),
            UiEvent::UploadProgress { percent, file } => {
                write!(f, "[{:>3}%] uploading {}", percent, file)
            }
            UiEvent::UploadFinished(report) => write!(
                f,
                "Upload finished: {} succeeded, {} failed",
                report.success_count(),
                report.failure_count()
            ),
            UiEvent::CachePurged { message } => write!(f, "{}", message),
            UiEvent::DeployControl { enabled } => {
                write!(f, "Deploy {}", if *enabled { "ready" } else { "busy" })
            }
            UiEvent::DeployTriggered { deployment_id } => {
                write!(f, "Deployment {} triggered", deployment_id)
            }
            UiEvent::DeployStatus { attempt, status } => {
                write!(f, "Deployment status ({}): {}", attempt, status)
            }
            UiEvent::DeploySettled(outcome) => write!(f, "{}", outcome),
            UiEvent::Notice { message } => write!(f, "{}", message),
        }
    }
}
