//! Reader-event monitor.
//!
//! A persistent thread polls the card service and reports insertions,
//! removals and reader-set changes through a caller-supplied sink. The
//! controller uses the events to re-drive a command when the hardware
//! changes mid-operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cancel::CancelFlag;
use crate::reader::{CardService, ReaderInfo};

/// Tracing target for monitor operations.
const MONITOR_TARGET: &str = "eid_card::monitor";

/// A change in the reader set or card presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderChange {
    /// A reader was attached.
    ReaderAdded(ReaderInfo),
    /// The named reader was detached.
    ReaderRemoved(String),
    /// A card was inserted into the reader.
    CardInserted(ReaderInfo),
    /// The card was removed from the named reader.
    CardRemoved(String),
}

/// Handle to the monitor thread.
///
/// The sink returns `false` to stop the monitor; [`ReaderMonitor::shutdown`]
/// stops it from the owning side and joins the thread.
pub struct ReaderMonitor {
    handle: Option<JoinHandle<()>>,
    cancel: CancelFlag,
}

impl ReaderMonitor {
    /// Spawns the monitor thread.
    ///
    /// Service failures are logged and retried on the next poll; the monitor
    /// never terminates a command on its own.
    #[must_use]
    pub fn spawn<F>(service: Arc<dyn CardService>, interval: Duration, sink: F) -> Self
    where
        F: Fn(ReaderChange) -> bool + Send + 'static,
    {
        let cancel = CancelFlag::new();
        let monitor_cancel = cancel.clone();
        let handle = std::thread::Builder::new()
            .name(String::from("eid-card-monitor"))
            .spawn(move || run_monitor(&*service, interval, &sink, &monitor_cancel))
            .ok();
        if handle.is_none() {
            warn!(target: MONITOR_TARGET, "failed to spawn the reader monitor thread");
        }
        Self { handle, cancel }
    }

    /// Stops the monitor and joins its thread.
    pub fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

impl Drop for ReaderMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

fn run_monitor<F>(service: &dyn CardService, interval: Duration, sink: &F, cancel: &CancelFlag)
where
    F: Fn(ReaderChange) -> bool,
{
    let mut known: HashMap<String, bool> = HashMap::new();
    let mut first_poll = true;

    while !cancel.is_cancelled() {
        match service.list_readers() {
            Ok(readers) => {
                // The initial poll seeds the baseline without reporting the
                // pre-existing readers as changes.
                if first_poll {
                    known = readers
                        .into_iter()
                        .map(|reader| (reader.name, reader.card_present))
                        .collect();
                    first_poll = false;
                } else if !emit_changes(&mut known, readers, sink) {
                    return;
                }
            }
            Err(error) => {
                debug!(target: MONITOR_TARGET, %error, "reader poll failed");
            }
        }
        std::thread::sleep(interval);
    }
}

fn emit_changes<F>(
    known: &mut HashMap<String, bool>,
    readers: Vec<ReaderInfo>,
    sink: &F,
) -> bool
where
    F: Fn(ReaderChange) -> bool,
{
    let mut seen: HashMap<String, bool> = HashMap::new();
    for reader in readers {
        seen.insert(reader.name.clone(), reader.card_present);
        match known.get(&reader.name) {
            None => {
                let inserted = reader.card_present;
                if !sink(ReaderChange::ReaderAdded(reader.clone())) {
                    return false;
                }
                if inserted && !sink(ReaderChange::CardInserted(reader)) {
                    return false;
                }
            }
            Some(false) if reader.card_present => {
                if !sink(ReaderChange::CardInserted(reader)) {
                    return false;
                }
            }
            Some(true) if !reader.card_present => {
                if !sink(ReaderChange::CardRemoved(reader.name)) {
                    return false;
                }
            }
            Some(_) => {}
        }
    }

    for name in known.keys() {
        if !seen.contains_key(name) {
            if known[name] && !sink(ReaderChange::CardRemoved(name.clone())) {
                return false;
            }
            if !sink(ReaderChange::ReaderRemoved(name.clone())) {
                return false;
            }
        }
    }

    *known = seen;
    true
}
