//! Reader enumeration and candidate card selection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cancel::CancelFlag;
use crate::card::CardInfo;
use crate::error::CardError;

/// Tracing target for reader operations.
const READER_TARGET: &str = "eid_card::reader";

/// A smart card reader and whether it currently holds a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderInfo {
    /// Reader name as reported by the platform.
    pub name: String,
    /// Whether a card is present in the reader.
    pub card_present: bool,
}

/// Platform access to readers and cards.
///
/// The production implementation is
/// [`PcscService`](crate::pcsc_backend::PcscService). Test code implements
/// this trait to script reader and card timelines without hardware.
pub trait CardService: Send + Sync {
    /// Enumerates attached readers.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::ServiceUnavailable`] when the platform smart
    /// card service cannot be reached, and other [`CardError`] values for
    /// communication failures. An empty reader set is not an error.
    fn list_readers(&self) -> Result<Vec<ReaderInfo>, CardError>;

    /// Connects to the card in the given reader.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::NoCard`] when the reader is empty and
    /// [`CardError::UnknownCard`] when no registered driver recognises the
    /// card.
    fn connect(&self, reader: &ReaderInfo) -> Result<CardInfo, CardError>;
}

/// Candidate card selection over a [`CardService`].
#[derive(Clone)]
pub struct CardTerminal {
    service: Arc<dyn CardService>,
    poll_interval: Duration,
}

impl CardTerminal {
    /// Wraps a service with the given poll interval.
    #[must_use]
    pub fn new(service: Arc<dyn CardService>, poll_interval: Duration) -> Self {
        Self {
            service,
            poll_interval,
        }
    }

    /// Enumerates attached readers.
    ///
    /// # Errors
    ///
    /// Propagates [`CardService::list_readers`] failures.
    pub fn list_readers(&self) -> Result<Vec<ReaderInfo>, CardError> {
        self.service.list_readers()
    }

    /// Connects to every recognised card currently inserted.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::UnknownCard`] when cards are present but none is
    /// recognised, so the user learns the inserted card is unsupported
    /// instead of waiting out the timeout. An empty result means no card is
    /// present yet.
    pub fn candidate_cards(&self) -> Result<Vec<CardInfo>, CardError> {
        let readers = self.service.list_readers()?;
        let mut candidates = Vec::new();
        let mut unknown_seen = false;

        for reader in readers.iter().filter(|reader| reader.card_present) {
            match self.service.connect(reader) {
                Ok(card) => candidates.push(card),
                Err(CardError::UnknownCard) => unknown_seen = true,
                // The card left between the listing and the connect.
                Err(CardError::NoCard | CardError::CardRemoved) => {}
                Err(error) => return Err(error),
            }
        }

        if candidates.is_empty() && unknown_seen {
            return Err(CardError::UnknownCard);
        }
        debug!(
            target: READER_TARGET,
            readers = readers.len(),
            candidates = candidates.len(),
            "candidate scan"
        );
        Ok(candidates)
    }

    /// Waits for at least one recognised card, in two phases: first for a
    /// reader to appear, then for a card in one of the readers.
    ///
    /// `idle` is called between polls with the suggested pause; callers that
    /// multiplex an event mailbox drain it there, everyone else sleeps.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::NoReader`] or [`CardError::NoCard`] when the
    /// respective timeout elapses, [`CardError::Cancelled`] when the flag is
    /// raised, [`CardError::UnknownCard`] as soon as only unrecognised cards
    /// are present, and propagates service failures.
    pub fn wait_for_card<F>(
        &self,
        reader_timeout: Duration,
        card_timeout: Duration,
        cancel: &CancelFlag,
        mut idle: F,
    ) -> Result<Vec<CardInfo>, CardError>
    where
        F: FnMut(Duration),
    {
        let reader_deadline = Instant::now() + reader_timeout;
        loop {
            cancel.check()?;
            if !self.service.list_readers()?.is_empty() {
                break;
            }
            if Instant::now() >= reader_deadline {
                return Err(CardError::NoReader);
            }
            idle(self.poll_interval);
        }

        let card_deadline = Instant::now() + card_timeout;
        loop {
            cancel.check()?;
            let candidates = self.candidate_cards()?;
            if !candidates.is_empty() {
                return Ok(candidates);
            }
            if Instant::now() >= card_deadline {
                return Err(CardError::NoCard);
            }
            idle(self.poll_interval);
        }
    }
}
