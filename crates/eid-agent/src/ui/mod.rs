//! The dialog surface seam.
//!
//! The controller talks to the user exclusively through [`UiSurface`], a
//! single-threaded facade over whatever dialog toolkit the build provides.
//! The production implementation is the console surface in
//! [`console::ConsoleUi`]; tests script the trait directly. Exactly one
//! surface is constructed per process, by the entrypoint.

use eid_card::PinBuffer;

use crate::errors::RetriableError;

mod console;

pub use console::ConsoleUi;

/// What the user is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    /// Command name, e.g. `authenticate`.
    pub command: &'static str,
    /// Serialised origin of the requesting web application.
    pub origin: String,
    /// Certificate holder shown to the user.
    pub subject: String,
    /// Reader holding the selected card.
    pub reader: String,
}

/// Parameters of a software PIN prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRequest {
    /// Certificate holder the PIN unlocks.
    pub subject: String,
    /// Minimum accepted PIN length.
    pub min_length: u8,
    /// Maximum accepted PIN length.
    pub max_length: u8,
    /// Remaining attempts before the PIN blocks.
    pub retries_left: u8,
}

/// One selectable card in the chooser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardChoice {
    /// Card model name.
    pub model: String,
    /// Reader holding the card.
    pub reader: String,
}

/// Outcome of the confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// The user approved the operation.
    Confirmed,
    /// The user declined or dismissed the dialog.
    Cancelled,
}

/// Outcome of the software PIN prompt.
#[derive(Debug)]
pub enum PinOutcome {
    /// The user entered a PIN; the buffer moves onward into the signing
    /// call.
    Entered(PinBuffer),
    /// The user dismissed the prompt.
    Cancelled,
}

/// Outcome of a retry dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Try the failed step again.
    Retry,
    /// Give up; the command fails as cancelled.
    Cancel,
}

/// The dialog surface the controller drives.
///
/// Implementations run on the main thread; workers never touch the surface.
pub trait UiSurface {
    /// Applies the language requested in the envelope.
    fn set_language(&mut self, lang: &str);

    /// Shows a non-blocking progress message.
    fn show_waiting(&mut self, message: &str);

    /// Asks the user to pick one of several candidate cards. `None` means
    /// the chooser was dismissed.
    fn select_card(&mut self, choices: &[CardChoice]) -> Option<usize>;

    /// Asks the user to approve the pending operation.
    fn ask_confirmation(&mut self, request: &ConfirmationRequest) -> ConfirmationOutcome;

    /// Collects the PIN for a software-entry reader.
    fn ask_pin(&mut self, request: &PinRequest) -> PinOutcome;

    /// Tells the user to enter the PIN on the reader's own pad.
    fn notify_pin_pad(&mut self, request: &PinRequest);

    /// Presents a recoverable failure with a retry affordance.
    fn show_retry(&mut self, error: &RetriableError) -> RetryOutcome;
}
