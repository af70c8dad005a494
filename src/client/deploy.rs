//! Deployment trigger and status polling.
//!
//! A deployment is checked once immediately after it is triggered, then every
//! [`POLL_INTERVAL`], for at most [`MAX_POLL_ATTEMPTS`] checks. A failed check
//! (transport error or a `success: false` body) uses up an attempt but does not
//! end the poll.
//!
//! ```text
//!   Idle ──start──▶ Triggering ──id──▶ Polling ──┬─ completed ─┐
//!    ▲                  │                        ├─ failed ────┤
//!    └── trigger error ─┘                        ├─ timed out ─┼──▶ Settled
//!        or missing id                           └─ cancelled ─┘
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ClientError;

use super::api::AdminApi;
use super::events::{emit, EventSender, UiEvent};

/// Delay between status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Upper bound on status checks per deployment, the first one included.
pub const MAX_POLL_ATTEMPTS: u32 = 30;

/// How a poll run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { attempts: u32 },

    Failed { attempts: u32, message: String },

    /// Attempts exhausted; `last_error` is set if the final check failed
    TimedOut { last_error: Option<String> },

    Cancelled,
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::Completed { .. } => write!(
                f,
                "Deployment completed. Images on a custom domain with edge caching may need a cache purge."
            ),
            PollOutcome::Failed { message, .. } => write!(f, "Deployment failed: {}", message),
            PollOutcome::TimedOut { last_error: None } => write!(
                f,
                "Timed out waiting for the deployment; it may still be running, check again later."
            ),
            PollOutcome::TimedOut {
                last_error: Some(err),
            } => write!(
                f,
                "Could not check the deployment status ({}); check again later.",
                err
            ),
            PollOutcome::Cancelled => write!(f, "Stopped monitoring the deployment."),
        }
    }
}

/// Where the deploy control is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Idle,
    Triggering,
    Polling {
        deployment_id: String,
    },
    Settled(PollOutcome),
}

impl PollState {
    pub fn is_busy(&self) -> bool {
        matches!(self, PollState::Triggering | PollState::Polling { .. })
    }
}

/// Poll a deployment until it completes, fails, times out or is cancelled.
///
/// The first check runs immediately. Emits [`UiEvent::DeployStatus`] for each
/// successful check.
pub async fn poll_deployment<A: AdminApi + ?Sized>(
    api: &A,
    deployment_id: &str,
    events: &EventSender,
    cancel: &CancellationToken,
) -> PollOutcome {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts = 0u32;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = ticker.tick() => {}
        }
        attempts += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            result = api.deploy_status(deployment_id) => result,
        };

        let last_error = match result {
            Ok(status) => {
                debug!(deployment_id, attempts, status = %status.status, "Deployment status");
                emit(
                    events,
                    UiEvent::DeployStatus {
                        attempt: attempts,
                        status: status.status.clone(),
                    },
                );

                if status.is_completed {
                    return PollOutcome::Completed { attempts };
                }
                if status.is_failed {
                    return PollOutcome::Failed {
                        attempts,
                        message: status.message,
                    };
                }
                None
            }
            Err(e) => {
                warn!(deployment_id, attempts, error = %e, "Deployment status check failed");
                Some(e.to_string())
            }
        };

        if attempts >= MAX_POLL_ATTEMPTS {
            return PollOutcome::TimedOut { last_error };
        }
    }
}

struct PollerInner {
    state: PollState,
    cancel: Option<CancellationToken>,
}

/// Deploy control: triggers a deployment and monitors it in a background task.
///
/// Only one deployment is monitored at a time; [`DeployPoller::start`] fails
/// with [`ClientError::DeployInProgress`] while one is running.
pub struct DeployPoller<A: AdminApi + 'static> {
    api: Arc<A>,
    events: EventSender,
    inner: Arc<Mutex<PollerInner>>,
}

impl<A: AdminApi + 'static> DeployPoller<A> {
    pub fn new(api: Arc<A>, events: EventSender) -> Self {
        Self {
            api,
            events,
            inner: Arc::new(Mutex::new(PollerInner {
                state: PollState::Idle,
                cancel: None,
            })),
        }
    }

    pub async fn state(&self) -> PollState {
        self.inner.lock().await.state.clone()
    }

    /// Trigger a deployment and start monitoring it.
    ///
    /// Returns the monitoring task, or `None` if the provider accepted the
    /// deployment without an id (nothing to monitor).
    pub async fn start(&self) -> Result<Option<JoinHandle<PollOutcome>>, ClientError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state.is_busy() {
                return Err(ClientError::DeployInProgress);
            }
            inner.state = PollState::Triggering;
        }
        emit(&self.events, UiEvent::DeployControl { enabled: false });

        let deployment_id = match self.api.trigger_deploy().await {
            Ok(response) => response.deployment_id.filter(|id| !id.is_empty()),
            Err(e) => {
                self.reset(format!("Deployment failed: {}", e)).await;
                return Err(e);
            }
        };

        let Some(deployment_id) = deployment_id else {
            self.reset(
                "Deployment triggered, but no deployment id was returned; check its status later"
                    .to_string(),
            )
            .await;
            return Ok(None);
        };

        info!(deployment_id = %deployment_id, "Deployment triggered");
        emit(
            &self.events,
            UiEvent::DeployTriggered {
                deployment_id: deployment_id.clone(),
            },
        );

        let cancel = CancellationToken::new();
        {
            let mut inner = self.inner.lock().await;
            inner.state = PollState::Polling {
                deployment_id: deployment_id.clone(),
            };
            inner.cancel = Some(cancel.clone());
        }

        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        let inner = Arc::clone(&self.inner);

        Ok(Some(tokio::spawn(async move {
            let outcome = poll_deployment(api.as_ref(), &deployment_id, &events, &cancel).await;
            info!(deployment_id = %deployment_id, outcome = ?outcome, "Deployment poll settled");

            {
                let mut inner = inner.lock().await;
                inner.state = PollState::Settled(outcome.clone());
                inner.cancel = None;
            }
            emit(&events, UiEvent::DeployControl { enabled: true });
            emit(&events, UiEvent::DeploySettled(outcome.clone()));
            outcome
        })))
    }

    /// Stop monitoring the running deployment, if any.
    ///
    /// The deployment itself keeps running on the provider.
    pub async fn cancel(&self) -> bool {
        match &self.inner.lock().await.cancel {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn reset(&self, message: String) {
        self.inner.lock().await.state = PollState::Idle;
        emit(&self.events, UiEvent::DeployControl { enabled: true });
        emit(&self.events, UiEvent::Notice { message });
    }
}
