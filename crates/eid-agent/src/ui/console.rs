//! Console implementation of the dialog surface.
//!
//! Dialogs render on the controlling terminal through `dialoguer`, which
//! writes to stderr, keeping stdout free for the response frame. The PIN
//! prompt hands its digits straight into a fixed-capacity buffer and wipes
//! the intermediate string.

use dialoguer::{Confirm, Password, Select};
use tracing::debug;
use zeroize::Zeroize;

use eid_card::PinBuffer;

use crate::errors::RetriableError;

use super::{
    CardChoice, ConfirmationOutcome, ConfirmationRequest, PinOutcome, PinRequest, RetryOutcome,
    UiSurface,
};

/// Tracing target for dialog activity.
const UI_TARGET: &str = "eid_agent::ui";

/// Terminal-backed dialog surface.
#[derive(Debug, Default)]
pub struct ConsoleUi {
    language: Option<String>,
}

impl ConsoleUi {
    /// Creates the surface. The entrypoint constructs exactly one per
    /// process.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UiSurface for ConsoleUi {
    fn set_language(&mut self, lang: &str) {
        // Dialog text is English only; the language is recorded so a
        // translated surface can honour it.
        self.language = Some(lang.to_owned());
    }

    fn show_waiting(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn select_card(&mut self, choices: &[CardChoice]) -> Option<usize> {
        let labels: Vec<String> = choices
            .iter()
            .map(|choice| format!("{} in {}", choice.model, choice.reader))
            .collect();
        Select::new()
            .with_prompt("Several eID cards found, pick one")
            .items(&labels)
            .default(0)
            .interact_opt()
            .ok()
            .flatten()
    }

    fn ask_confirmation(&mut self, request: &ConfirmationRequest) -> ConfirmationOutcome {
        let prompt = format!(
            "Allow {} to {} as {}?",
            request.origin, request.command, request.subject
        );
        match Confirm::new().with_prompt(prompt).default(false).interact() {
            Ok(true) => ConfirmationOutcome::Confirmed,
            Ok(false) | Err(_) => ConfirmationOutcome::Cancelled,
        }
    }

    fn ask_pin(&mut self, request: &PinRequest) -> PinOutcome {
        loop {
            let prompt = format!(
                "PIN for {} ({} attempts left)",
                request.subject, request.retries_left
            );
            let mut entered = match Password::new().with_prompt(prompt).interact() {
                Ok(entered) => entered,
                Err(error) => {
                    debug!(target: UI_TARGET, %error, "PIN prompt dismissed");
                    return PinOutcome::Cancelled;
                }
            };

            let acceptable = entered.len() >= usize::from(request.min_length)
                && entered.len() <= usize::from(request.max_length)
                && entered.bytes().all(|byte| byte.is_ascii_digit());
            let buffer = if acceptable {
                PinBuffer::from_digits(&entered).ok()
            } else {
                None
            };
            entered.zeroize();

            match buffer {
                Some(buffer) => return PinOutcome::Entered(buffer),
                None => {
                    eprintln!(
                        "The PIN must be {}-{} digits.",
                        request.min_length, request.max_length
                    );
                }
            }
        }
    }

    fn notify_pin_pad(&mut self, request: &PinRequest) {
        eprintln!(
            "Enter the PIN for {} on the reader's pad.",
            request.subject
        );
    }

    fn show_retry(&mut self, error: &RetriableError) -> RetryOutcome {
        let prompt = format!("{error} Try again?");
        match Confirm::new().with_prompt(prompt).default(true).interact() {
            Ok(true) => RetryOutcome::Retry,
            Ok(false) | Err(_) => RetryOutcome::Cancel,
        }
    }
}
