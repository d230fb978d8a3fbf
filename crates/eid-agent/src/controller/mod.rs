//! The command controller.
//!
//! One controller drives one command session: it validates the command,
//! waits for a reader and a recognised card, reads the certificate, asks
//! the user for confirmation and PIN, runs the card operation on the
//! run-worker, and translates failures into retry affordances or terminal
//! errors. The reader monitor re-drives the session when hardware changes
//! mid-operation.
//!
//! Blocking card work always happens on the worker; the controller itself
//! only waits on its mailbox, so reader events and the cancellation path
//! stay live while a card operation is in flight.

use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, warn};

use eid_card::{
    read_certificate_status, CancelFlag, CardCertificateStatus, CardError, CardInfo, CardService,
    CardTerminal, PinInput, ReaderChange, ReaderMonitor,
};
use eid_config::Config;

use crate::errors::{CommandError, RetriableError};
use crate::handlers::{
    AuthenticateHandler, CommandHandler, GetSigningCertificateHandler, HandlerError, SignHandler,
};
use crate::protocol::{Command, RequestEnvelope};
use crate::ui::{
    CardChoice, ConfirmationOutcome, ConfirmationRequest, PinOutcome, PinRequest, RetryOutcome,
    UiSurface,
};

mod events;
mod worker;

pub use events::{mailbox, ControllerEvent, MAILBOX_CAPACITY};
pub use worker::{RunWorker, WorkerOutput, WorkerResult};

/// Tracing target for controller activity.
const CONTROLLER_TARGET: &str = "eid_agent::controller";

/// Lazily constructed card service, so commands that never touch a card do
/// not require a running smart card service.
pub type ServiceSource = Box<dyn FnOnce() -> Result<Arc<dyn CardService>, CardError>>;

/// Controller lifecycle states, for tracing and invariant checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    WaitingForReader,
    WaitingForCard,
    ReadingCertificate,
    ConfirmingWithUser,
    RunningHandler,
    Writing,
    FailingTerminal,
    Exited,
}

/// Outcome of a session step: either a value, or a restart from the card
/// wait after a recovered failure.
enum Step<T> {
    Value(T),
    Restart,
}

/// The per-command state machine.
pub struct Controller<'a> {
    config: &'a Config,
    ui: &'a mut dyn UiSurface,
    source: Option<ServiceSource>,
    service: Option<Arc<dyn CardService>>,
    mailbox_tx: SyncSender<ControllerEvent>,
    mailbox_rx: Receiver<ControllerEvent>,
    state: State,
    worker: Option<RunWorker>,
}

impl<'a> Controller<'a> {
    /// Creates a controller over the given configuration, card service
    /// source and dialog surface.
    #[must_use]
    pub fn new(config: &'a Config, source: ServiceSource, ui: &'a mut dyn UiSurface) -> Self {
        let (mailbox_tx, mailbox_rx) = events::mailbox();
        Self {
            config,
            ui,
            source: Some(source),
            service: None,
            mailbox_tx,
            mailbox_rx,
            state: State::Idle,
            worker: None,
        }
    }

    /// Executes one command and returns the response payload.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`CommandError`] that becomes the response's
    /// `error` object.
    pub fn execute(&mut self, envelope: &RequestEnvelope) -> Result<Value, CommandError> {
        if let Some(lang) = envelope.lang() {
            self.ui.set_language(lang);
        }

        let result = match envelope.command() {
            Command::Status { extension } => {
                debug!(target: CONTROLLER_TARGET, "status requested");
                Ok(status_payload(extension.as_deref()))
            }
            Command::Quit => {
                self.transition(State::Exited);
                return Ok(json!({}));
            }
            Command::Authenticate(arguments) => {
                self.run_card_command(Box::new(AuthenticateHandler::new(arguments.clone())))
            }
            Command::GetSigningCertificate(arguments) => self.run_card_command(Box::new(
                GetSigningCertificateHandler::new(arguments.clone()),
            )),
            Command::Sign(arguments) => {
                self.run_card_command(Box::new(SignHandler::new(arguments.clone())))
            }
        };

        if result.is_err() {
            self.transition(State::FailingTerminal);
        }
        self.transition(State::Writing);
        result
    }

    /// Marks the session finished once the response frame is on the wire.
    pub fn finish(&mut self) {
        if self.state != State::Exited {
            self.transition(State::Exited);
        }
    }

    fn run_card_command(
        &mut self,
        mut handler: Box<dyn CommandHandler>,
    ) -> Result<Value, CommandError> {
        handler.validate(self.config).map_err(terminal_error)?;
        let handler: Arc<dyn CommandHandler> = Arc::from(handler);

        let service = self.service()?;
        let terminal = CardTerminal::new(Arc::clone(&service), self.config.poll_interval());
        let mailbox = self.mailbox_tx.clone();
        let monitor = ReaderMonitor::spawn(service, self.config.poll_interval(), move |change| {
            match mailbox.try_send(ControllerEvent::Reader(change)) {
                // A full mailbox only means the controller is busy; the next
                // poll observes the same hardware state.
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            }
        });

        let result = self.drive(&handler, &terminal);
        monitor.shutdown();
        result
    }

    fn drive(
        &mut self,
        handler: &Arc<dyn CommandHandler>,
        terminal: &CardTerminal,
    ) -> Result<Value, CommandError> {
        loop {
            let cards = self.wait_for_candidates(terminal)?;
            let card = self.choose_card(cards)?;
            let status = match self.read_certificate(handler, &card)? {
                Step::Value(status) => status,
                Step::Restart => continue,
            };
            match self.confirm_and_run(handler, &status)? {
                Step::Value(value) => return Ok(value),
                Step::Restart => {}
            }
        }
    }

    fn wait_for_candidates(
        &mut self,
        terminal: &CardTerminal,
    ) -> Result<Vec<CardInfo>, CommandError> {
        self.transition(State::WaitingForReader);
        self.ui.show_waiting("Connect a smart card reader.");
        let reader_deadline = Instant::now() + self.config.reader_timeout();
        loop {
            let readers = terminal.list_readers().map_err(CommandError::from_card)?;
            if !readers.is_empty() {
                break;
            }
            if Instant::now() >= reader_deadline {
                return Err(CommandError::NoReaders);
            }
            self.pause();
        }

        self.transition(State::WaitingForCard);
        self.ui.show_waiting("Insert your eID card into the reader.");
        let mut card_deadline = Instant::now() + self.config.card_timeout();
        loop {
            match terminal.candidate_cards() {
                Ok(cards) if !cards.is_empty() => return Ok(cards),
                Ok(_) => {}
                Err(CardError::UnknownCard) => {
                    match self.ui.show_retry(&RetriableError::UnknownCard) {
                        RetryOutcome::Retry => {
                            card_deadline = Instant::now() + self.config.card_timeout();
                        }
                        RetryOutcome::Cancel => return Err(CommandError::UserCancelled),
                    }
                }
                Err(error) => return Err(CommandError::from_card(error)),
            }
            if Instant::now() >= card_deadline {
                return Err(CommandError::NoCard);
            }
            self.pause();
        }
    }

    fn choose_card(&mut self, mut cards: Vec<CardInfo>) -> Result<CardInfo, CommandError> {
        if cards.len() == 1 {
            return Ok(cards.remove(0));
        }
        let choices: Vec<CardChoice> = cards
            .iter()
            .map(|card| CardChoice {
                model: card.eid().model().to_owned(),
                reader: card.reader().name.clone(),
            })
            .collect();
        match self.ui.select_card(&choices) {
            Some(index) if index < cards.len() => Ok(cards.swap_remove(index)),
            _ => Err(CommandError::UserCancelled),
        }
    }

    fn read_certificate(
        &mut self,
        handler: &Arc<dyn CommandHandler>,
        card: &CardInfo,
    ) -> Result<Step<CardCertificateStatus>, CommandError> {
        self.transition(State::ReadingCertificate);
        let cancel = CancelFlag::new();
        let purpose = handler.key_purpose();
        let job_card = card.clone();
        self.spawn_worker(move || {
            read_certificate_status(&job_card, purpose)
                .map(|status| WorkerOutput::Certificate(Box::new(status)))
                .map_err(HandlerError::Card)
        })?;
        let (result, removed) = self.await_worker(&cancel, &card.reader().name);

        match result {
            Ok(WorkerOutput::Certificate(status)) => Ok(Step::Value(*status)),
            Ok(WorkerOutput::Response(_)) => Err(CommandError::Fatal(String::from(
                "the certificate read produced a response payload",
            ))),
            Err(error) => self.recover(error, removed).map(|()| Step::Restart),
        }
    }

    fn confirm_and_run(
        &mut self,
        handler: &Arc<dyn CommandHandler>,
        status: &CardCertificateStatus,
    ) -> Result<Step<Value>, CommandError> {
        let origin = handler
            .origin()
            .ok_or_else(|| {
                CommandError::Fatal(String::from("handler reached confirmation unvalidated"))
            })?
            .as_str()
            .to_owned();
        let confirmation = ConfirmationRequest {
            command: handler.command_name(),
            origin,
            subject: status.certificate().display_name(),
            reader: status.card().reader().name.clone(),
        };
        let mut retries_left = status.pin().retries_left();

        loop {
            self.transition(State::ConfirmingWithUser);
            match self.ui.ask_confirmation(&confirmation) {
                ConfirmationOutcome::Confirmed => {}
                ConfirmationOutcome::Cancelled => return Err(CommandError::UserCancelled),
            }

            let pin = if handler.requires_pin() {
                if retries_left == 0 {
                    return Err(CommandError::PinBlocked);
                }
                let request = PinRequest {
                    subject: confirmation.subject.clone(),
                    min_length: status.pin().min_length(),
                    max_length: status.pin().max_length(),
                    retries_left,
                };
                if status.pin().pin_pad() {
                    self.ui.notify_pin_pad(&request);
                    Some(PinInput::PinPad)
                } else {
                    match self.ui.ask_pin(&request) {
                        PinOutcome::Entered(buffer) => Some(PinInput::Buffer(buffer)),
                        PinOutcome::Cancelled => return Err(CommandError::UserCancelled),
                    }
                }
            } else {
                None
            };

            self.transition(State::RunningHandler);
            let cancel = CancelFlag::new();
            let job_handler = Arc::clone(handler);
            let job_status = status.clone();
            let job_cancel = cancel.clone();
            self.spawn_worker(move || {
                job_handler
                    .run(&job_status, pin, &job_cancel)
                    .map(WorkerOutput::Response)
            })?;
            let (result, removed) = self.await_worker(&cancel, &status.card().reader().name);

            match result {
                Ok(WorkerOutput::Response(value)) => return Ok(Step::Value(value)),
                Ok(WorkerOutput::Certificate(_)) => {
                    return Err(CommandError::Fatal(String::from(
                        "the handler run produced a certificate payload",
                    )))
                }
                Err(HandlerError::Card(
                    CardError::WrongPin { retries_left: 0 } | CardError::PinBlocked,
                )) => return Err(CommandError::PinBlocked),
                Err(HandlerError::Card(CardError::WrongPin {
                    retries_left: remaining,
                })) => {
                    retries_left = remaining;
                    let retriable = RetriableError::WrongPin {
                        retries_left: remaining,
                    };
                    match self.ui.show_retry(&retriable) {
                        RetryOutcome::Retry => {}
                        RetryOutcome::Cancel => return Err(CommandError::UserCancelled),
                    }
                }
                Err(HandlerError::Card(
                    error @ (CardError::PinVerifyDisabled | CardError::PinTimeout),
                )) => {
                    let retriable = RetriableError::from_card(&error).unwrap_or_else(|| {
                        // Both variants are retriable by construction.
                        RetriableError::PinTimeout
                    });
                    match self.ui.show_retry(&retriable) {
                        RetryOutcome::Retry => {}
                        RetryOutcome::Cancel => return Err(CommandError::UserCancelled),
                    }
                }
                Err(error) => {
                    self.recover(error, removed)?;
                    return Ok(Step::Restart);
                }
            }
        }
    }

    /// Offers a retry for recoverable failures; anything else becomes the
    /// terminal error.
    fn recover(&mut self, error: HandlerError, removed: bool) -> Result<(), CommandError> {
        let retriable = match &error {
            // Whatever the driver reported, the root cause was the removal.
            HandlerError::Card(_) if removed => Some(RetriableError::CardRemoved),
            HandlerError::Card(card_error) => RetriableError::from_card(card_error),
            HandlerError::InputData(_) | HandlerError::Programming(_) => None,
        };
        match retriable {
            Some(retriable) => {
                warn!(target: CONTROLLER_TARGET, %retriable, "recoverable failure");
                match self.ui.show_retry(&retriable) {
                    RetryOutcome::Retry => Ok(()),
                    RetryOutcome::Cancel => Err(CommandError::UserCancelled),
                }
            }
            None => Err(terminal_error(error)),
        }
    }

    fn spawn_worker<F>(&mut self, job: F) -> Result<(), CommandError>
    where
        F: FnOnce() -> WorkerResult + Send + 'static,
    {
        if self.worker.is_some() {
            return Err(CommandError::Fatal(String::from(
                "a run-worker is already in flight",
            )));
        }
        let worker = RunWorker::spawn(self.mailbox_tx.clone(), job)
            .map_err(|error| CommandError::Fatal(error.to_string()))?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Blocks on the mailbox until the worker reports. A removal of the
    /// card's reader raises the cancellation flag; the worker then drains
    /// its in-flight APDU work and reports.
    fn await_worker(&mut self, cancel: &CancelFlag, reader_name: &str) -> (WorkerResult, bool) {
        let mut removed = false;
        loop {
            match self.mailbox_rx.recv() {
                Ok(ControllerEvent::Worker(result)) => {
                    if let Some(worker) = self.worker.take() {
                        worker.join();
                    }
                    return (result, removed);
                }
                Ok(ControllerEvent::Reader(change)) => {
                    let lost = match &change {
                        ReaderChange::CardRemoved(name) | ReaderChange::ReaderRemoved(name) => {
                            name == reader_name
                        }
                        ReaderChange::ReaderAdded(_) | ReaderChange::CardInserted(_) => false,
                    };
                    if lost && !removed {
                        debug!(
                            target: CONTROLLER_TARGET,
                            reader = reader_name,
                            "card lost mid-operation, cancelling the worker"
                        );
                        removed = true;
                        cancel.cancel();
                    }
                }
                Err(_) => {
                    return (
                        Err(HandlerError::Programming(String::from(
                            "controller mailbox closed with a worker in flight",
                        ))),
                        removed,
                    );
                }
            }
        }
    }

    fn service(&mut self) -> Result<Arc<dyn CardService>, CommandError> {
        if let Some(service) = &self.service {
            return Ok(Arc::clone(service));
        }
        let source = self.source.take().ok_or_else(|| {
            CommandError::Fatal(String::from("the card service source was already consumed"))
        })?;
        let service = source().map_err(CommandError::from_card)?;
        self.service = Some(Arc::clone(&service));
        Ok(service)
    }

    /// Event-aware pause between polls: drains at most one mailbox event or
    /// sleeps out the poll interval.
    fn pause(&self) {
        drop(self.mailbox_rx.recv_timeout(self.config.poll_interval()));
    }

    fn transition(&mut self, next: State) {
        debug!(
            target: CONTROLLER_TARGET,
            from = ?self.state,
            to = ?next,
            "state transition"
        );
        self.state = next;
    }
}

fn terminal_error(error: HandlerError) -> CommandError {
    match error {
        HandlerError::InputData(message) => CommandError::InvalidArgument(message),
        HandlerError::Programming(message) => CommandError::Fatal(message),
        HandlerError::Card(error) => CommandError::from_card(error),
    }
}

/// Payload of the `status` command: application version information, no
/// card access.
#[must_use]
pub fn status_payload(extension: Option<&str>) -> Value {
    let mut payload = json!({
        "version": env!("CARGO_PKG_VERSION"),
        "nativeApp": format!("eid-agent/{}", env!("CARGO_PKG_VERSION")),
    });
    if let Some(extension) = extension {
        payload["extension"] = json!(extension);
    }
    payload
}
