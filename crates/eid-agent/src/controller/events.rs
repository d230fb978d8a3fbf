//! Controller mailbox events.
//!
//! Workers and the reader monitor communicate with the controller only
//! through these messages; the controller observes them at state-transition
//! points.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use eid_card::ReaderChange;

use super::worker::WorkerResult;

/// Capacity of the controller's bounded mailbox.
pub const MAILBOX_CAPACITY: usize = 16;

/// A message delivered to the controller's mailbox.
#[derive(Debug)]
pub enum ControllerEvent {
    /// The reader monitor observed a hardware change.
    Reader(ReaderChange),
    /// The run-worker finished, successfully or not.
    Worker(WorkerResult),
}

/// Creates the controller's bounded mailbox.
#[must_use]
pub fn mailbox() -> (SyncSender<ControllerEvent>, Receiver<ControllerEvent>) {
    sync_channel(MAILBOX_CAPACITY)
}
