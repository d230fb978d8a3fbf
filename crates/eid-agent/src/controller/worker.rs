//! The run-worker.
//!
//! Blocking card work runs on a short-lived OS thread so the main thread
//! stays responsive to reader events and dialogs. The worker reports exactly
//! one completion message into the controller's mailbox and never touches
//! the UI.

use std::sync::mpsc::SyncSender;
use std::thread::JoinHandle;

use serde_json::Value;
use tracing::debug;

use eid_card::CardCertificateStatus;

use crate::handlers::HandlerError;

use super::events::ControllerEvent;

/// Tracing target for worker lifecycle events.
const WORKER_TARGET: &str = "eid_agent::worker";

/// What a worker produced.
#[derive(Debug)]
pub enum WorkerOutput {
    /// The certificate read finished.
    Certificate(Box<CardCertificateStatus>),
    /// The handler finished and produced the response payload.
    Response(Value),
}

/// Completion message of a run-worker.
pub type WorkerResult = Result<WorkerOutput, HandlerError>;

/// Handle to an in-flight run-worker.
pub struct RunWorker {
    handle: Option<JoinHandle<()>>,
}

impl RunWorker {
    /// Spawns a worker executing `job` and reporting into `mailbox`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Programming`] when the thread cannot be
    /// spawned.
    pub fn spawn<F>(mailbox: SyncSender<ControllerEvent>, job: F) -> Result<Self, HandlerError>
    where
        F: FnOnce() -> WorkerResult + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name(String::from("eid-run-worker"))
            .spawn(move || {
                let result = job();
                debug!(
                    target: WORKER_TARGET,
                    success = result.is_ok(),
                    "run-worker finished"
                );
                // The controller may already be gone on quit; the result is
                // then dropped with the channel.
                drop(mailbox.send(ControllerEvent::Worker(result)));
            })
            .map_err(|error| {
                HandlerError::Programming(format!("failed to spawn the run-worker: {error}"))
            })?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Joins the worker thread after its completion message was received.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

impl Drop for RunWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}
