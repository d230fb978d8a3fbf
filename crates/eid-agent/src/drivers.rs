//! Vendor card driver registry.
//!
//! The agent itself ships no APDU dialects; national eID drivers implement
//! [`CardDriver`](eid_card::CardDriver) in their own crates and packaging
//! links them in here. An empty registry makes every inserted card an
//! unknown card, which the UI reports as unsupported.

use eid_card::CardDriver;

/// The drivers compiled into this build.
#[must_use]
pub fn registry() -> Vec<Box<dyn CardDriver>> {
    Vec::new()
}
