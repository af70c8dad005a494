//! Admin client: session handling and the view-models behind the admin UI.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                 Front-end (terminal, browser)              │
//! └───────────────▲───────────────────────────┬────────────────┘
//!                 │ UiEvent                   │ calls
//!                 │                           ▼
//! ┌───────────────┴────────────────────────────────────────────┐
//! │   GalleryModel      Uploader        DeployPoller           │
//! └───────────────────────────┬────────────────────────────────┘
//!                             │ AdminApi
//!                             ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │        AdminClient (reqwest, bearer session token)         │
//! └────────────────────────────────────────────────────────────┘
//! ```

mod api;
pub mod deploy;
pub mod events;
mod gallery;
mod upload;

pub use api::{AdminApi, AdminClient, Session, SessionFile};
pub use deploy::{
    poll_deployment, DeployPoller, PollOutcome, PollState, MAX_POLL_ATTEMPTS, POLL_INTERVAL,
};
pub use events::{BatchReport, EventReceiver, EventSender, UiEvent};
pub use gallery::GalleryModel;
pub use upload::{UploadFile, UploadReport, UploadTarget, Uploader};
