//! Flow state - what a form shows while a submission is processed
//!
//! A submission moves `Idle -> Processing -> Succeeded`, or ends in `Failed`
//! when a check rejects it. Front-ends subscribe to the state; the artificial
//! processing delay only defers the `Succeeded` transition. A success can be
//! held for a while before the form goes back to `Idle`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Processing,
    Succeeded,
    Failed { message: String },
}

impl FlowState {
    pub fn is_finished(&self) -> bool {
        matches!(self, FlowState::Succeeded | FlowState::Failed { .. })
    }
}

/// Publishes the state of one form
///
/// Clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct FlowTracker {
    tx: Arc<watch::Sender<FlowState>>,
}

impl Default for FlowTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(FlowState::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> FlowState {
        self.tx.borrow().clone()
    }

    pub fn begin(&self) {
        self.tx.send_replace(FlowState::Processing);
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.tx.send_replace(FlowState::Failed {
            message: message.into(),
        });
    }

    pub fn succeed(&self) {
        self.tx.send_replace(FlowState::Succeeded);
    }

    /// Stay in the current state for `delay`, then report success
    ///
    /// The delay cannot be cancelled and never affects what was stored.
    pub async fn succeed_after(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.succeed();
    }

    /// Back to `Idle`, ready for the next submission
    pub fn reset(&self) {
        self.tx.send_replace(FlowState::Idle);
    }

    /// Go back to `Idle` once a success has been shown for `hold`
    ///
    /// Runs in the background on the current runtime. Nothing happens if the
    /// form has moved on from `Succeeded` by then.
    pub fn reset_after(&self, hold: Duration) -> tokio::task::JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            if !hold.is_zero() {
                tokio::time::sleep(hold).await;
            }
            tracker.tx.send_if_modified(|state| {
                if *state == FlowState::Succeeded {
                    *state = FlowState::Idle;
                    true
                } else {
                    false
                }
            });
        })
    }
}
