//! PC/SC-backed card service.
//!
//! The backend owns the platform PC/SC context and the registry of vendor
//! card drivers. Recognition is ATR-based: on connect the backend reads the
//! answer-to-reset and asks each registered driver whether it supports the
//! card. The drivers themselves ship separately; the agent links in whatever
//! registry the packaging provides.

use std::ffi::CString;
use std::sync::{Arc, Mutex};

use pcsc::{Context, Protocols, Scope, ShareMode};
use tracing::debug;

use crate::card::{CardInfo, EidCard};
use crate::error::CardError;
use crate::reader::{CardService, ReaderInfo};

/// Tracing target for PC/SC operations.
const PCSC_TARGET: &str = "eid_card::pcsc";

/// Buffer for reader name enumeration.
const READER_LIST_BUFFER: usize = 2048;

/// Buffer for the answer-to-reset.
const ATR_BUFFER: usize = 64;

/// A vendor card driver.
///
/// Drivers recognise their cards by ATR and wrap the connected card in an
/// [`EidCard`] handle that speaks the vendor APDU dialect.
pub trait CardDriver: Send + Sync {
    /// Driver name for diagnostics.
    fn name(&self) -> &str;

    /// Whether this driver supports a card with the given ATR.
    fn matches(&self, atr: &[u8]) -> bool;

    /// Opens the connected card.
    ///
    /// # Errors
    ///
    /// Returns a [`CardError`] when the card cannot be initialised.
    fn open(&self, card: pcsc::Card) -> Result<Arc<dyn EidCard>, CardError>;
}

/// [`CardService`] implementation over the platform PC/SC stack.
pub struct PcscService {
    context: Mutex<Context>,
    drivers: Vec<Box<dyn CardDriver>>,
}

impl PcscService {
    /// Establishes a user-scope PC/SC context with the given driver
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::ServiceUnavailable`] when the platform smart
    /// card service is not running.
    pub fn new(drivers: Vec<Box<dyn CardDriver>>) -> Result<Self, CardError> {
        let context = Context::establish(Scope::User).map_err(map_service_error)?;
        Ok(Self {
            context: Mutex::new(context),
            drivers,
        })
    }

    fn recognise(&self, atr: &[u8], card: pcsc::Card) -> Result<Arc<dyn EidCard>, CardError> {
        for driver in &self.drivers {
            if driver.matches(atr) {
                debug!(
                    target: PCSC_TARGET,
                    driver = driver.name(),
                    "driver matched the inserted card"
                );
                return driver.open(card);
            }
        }
        Err(CardError::UnknownCard)
    }
}

impl CardService for PcscService {
    fn list_readers(&self) -> Result<Vec<ReaderInfo>, CardError> {
        let context = self.context.lock().map_err(|_| {
            CardError::ServiceUnavailable(String::from("PC/SC context lock poisoned"))
        })?;

        let mut buffer = [0u8; READER_LIST_BUFFER];
        let names = match context.list_readers(&mut buffer) {
            Ok(names) => names,
            Err(pcsc::Error::NoReadersAvailable) => return Ok(Vec::new()),
            Err(error) => return Err(map_pcsc_error(error)),
        };

        let mut readers = Vec::new();
        for name in names {
            // Presence probing via connect keeps the backend on the portable
            // subset of PC/SC.
            let card_present = match context.connect(name, ShareMode::Shared, Protocols::ANY) {
                Ok(_card) => true,
                Err(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard) => false,
                Err(pcsc::Error::SharingViolation) => true,
                Err(error) => return Err(map_pcsc_error(error)),
            };
            readers.push(ReaderInfo {
                name: name.to_string_lossy().into_owned(),
                card_present,
            });
        }
        Ok(readers)
    }

    fn connect(&self, reader: &ReaderInfo) -> Result<CardInfo, CardError> {
        let context = self.context.lock().map_err(|_| {
            CardError::ServiceUnavailable(String::from("PC/SC context lock poisoned"))
        })?;

        let name = CString::new(reader.name.as_str())
            .map_err(|_| CardError::Communication(String::from("reader name contains NUL")))?;
        let card = match context.connect(&name, ShareMode::Shared, Protocols::ANY) {
            Ok(card) => card,
            Err(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard) => {
                return Err(CardError::NoCard)
            }
            Err(error) => return Err(map_pcsc_error(error)),
        };

        let mut atr_buffer = [0u8; ATR_BUFFER];
        let atr = card
            .get_attribute(pcsc::Attribute::AtrString, &mut atr_buffer)
            .map_err(map_pcsc_error)?
            .to_vec();
        debug!(
            target: PCSC_TARGET,
            reader = %reader.name,
            atr_len = atr.len(),
            "connected to the inserted card"
        );

        let eid = self.recognise(&atr, card)?;
        Ok(CardInfo::new(reader.clone(), eid))
    }
}

fn map_service_error(error: pcsc::Error) -> CardError {
    CardError::ServiceUnavailable(error.to_string())
}

fn map_pcsc_error(error: pcsc::Error) -> CardError {
    match error {
        pcsc::Error::NoService | pcsc::Error::ServiceStopped => {
            CardError::ServiceUnavailable(error.to_string())
        }
        pcsc::Error::RemovedCard => CardError::CardRemoved,
        pcsc::Error::Cancelled => CardError::Cancelled,
        other => CardError::Communication(other.to_string()),
    }
}
