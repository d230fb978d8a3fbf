//! Scripted card and dialog doubles for the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eid_agent::errors::RetriableError;
use eid_agent::ui::{
    CardChoice, ConfirmationOutcome, ConfirmationRequest, PinOutcome, PinRequest, RetryOutcome,
    UiSurface,
};
use eid_card::{
    CancelFlag, CardError, CardInfo, CardService, EidCard, JwsAlgorithm, KeyPurpose, PinBuffer,
    PinInput, PinPolicy, ReaderInfo, SignatureAlgorithm,
};

pub const EC_CERT_DER: &[u8] = include_bytes!("../../testdata/ec-cert.der");
pub const RSA_CERT_DER: &[u8] = include_bytes!("../../testdata/rsa-cert.der");

// ---------------------------------------------------------------------------
// Card doubles
// ---------------------------------------------------------------------------

type SignHook = Box<dyn Fn() + Send + Sync>;

/// A scripted card driver handle.
pub struct FakeEid {
    model: String,
    algorithm: JwsAlgorithm,
    certificate: Vec<u8>,
    policy: Mutex<PinPolicy>,
    sign_results: Mutex<VecDeque<Result<Vec<u8>, CardError>>>,
    signed_digests: Mutex<Vec<Vec<u8>>>,
    received_pins: Mutex<Vec<Vec<u8>>>,
    on_sign: Mutex<Option<SignHook>>,
    block_until_cancelled: Mutex<bool>,
}

impl FakeEid {
    pub fn new(model: &str, algorithm: JwsAlgorithm, certificate: &[u8]) -> Self {
        Self {
            model: model.to_owned(),
            algorithm,
            certificate: certificate.to_vec(),
            policy: Mutex::new(PinPolicy::new(4, 12, 3, false).expect("policy within limits")),
            sign_results: Mutex::new(VecDeque::new()),
            signed_digests: Mutex::new(Vec::new()),
            received_pins: Mutex::new(Vec::new()),
            on_sign: Mutex::new(None),
            block_until_cancelled: Mutex::new(false),
        }
    }

    pub fn set_policy(&self, policy: PinPolicy) {
        *self.policy.lock().expect("policy lock") = policy;
    }

    pub fn push_sign_result(&self, result: Result<Vec<u8>, CardError>) {
        self.sign_results
            .lock()
            .expect("sign results lock")
            .push_back(result);
    }

    /// Runs `hook` at the next `sign` entry and then blocks until the
    /// cancellation flag is raised.
    pub fn block_next_sign_until_cancelled<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_sign.lock().expect("hook lock") = Some(Box::new(hook));
        *self.block_until_cancelled.lock().expect("block lock") = true;
    }

    pub fn signed_digests(&self) -> Vec<Vec<u8>> {
        self.signed_digests
            .lock()
            .expect("signed digests lock")
            .clone()
    }

    pub fn received_pins(&self) -> Vec<Vec<u8>> {
        self.received_pins
            .lock()
            .expect("received pins lock")
            .clone()
    }
}

impl EidCard for FakeEid {
    fn model(&self) -> &str {
        &self.model
    }

    fn auth_algorithm(&self) -> JwsAlgorithm {
        self.algorithm
    }

    fn signing_algorithms(&self) -> Vec<SignatureAlgorithm> {
        vec![self.algorithm.signature_algorithm()]
    }

    fn certificate(&self, _purpose: KeyPurpose) -> Result<Vec<u8>, CardError> {
        Ok(self.certificate.clone())
    }

    fn pin_policy(&self, _purpose: KeyPurpose) -> Result<PinPolicy, CardError> {
        Ok(*self.policy.lock().expect("policy lock"))
    }

    fn sign(
        &self,
        _purpose: KeyPurpose,
        pin: PinInput,
        digest: &[u8],
        cancel: &CancelFlag,
    ) -> Result<Vec<u8>, CardError> {
        if let Some(hook) = self.on_sign.lock().expect("hook lock").take() {
            hook();
        }
        if *self.block_until_cancelled.lock().expect("block lock") {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            return Err(CardError::Cancelled);
        }
        cancel.check()?;

        if let PinInput::Buffer(buffer) = &pin {
            self.received_pins
                .lock()
                .expect("received pins lock")
                .push(buffer.as_bytes().to_vec());
        }
        self.signed_digests
            .lock()
            .expect("signed digests lock")
            .push(digest.to_vec());
        self.sign_results
            .lock()
            .expect("sign results lock")
            .pop_front()
            .unwrap_or_else(|| Ok(b"fake-signature".to_vec()))
    }
}

/// What a scripted reader currently holds.
#[derive(Clone)]
pub enum Slot {
    Empty,
    Unknown,
    Card(Arc<FakeEid>),
}

/// A scripted card service with a mutable reader timeline and call
/// counters.
#[derive(Default)]
pub struct FakeService {
    readers: Mutex<Vec<(String, Slot)>>,
    list_calls: AtomicUsize,
    connect_calls: AtomicUsize,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_card(reader: &str, card: &Arc<FakeEid>) -> Arc<Self> {
        let service = Arc::new(Self::new());
        service.set_reader(reader, Slot::Card(Arc::clone(card)));
        service
    }

    pub fn set_reader(&self, name: &str, slot: Slot) {
        let mut readers = self.readers.lock().expect("readers lock");
        if let Some(entry) = readers.iter_mut().find(|(reader, _)| reader == name) {
            entry.1 = slot;
        } else {
            readers.push((name.to_owned(), slot));
        }
    }

    pub fn remove_reader(&self, name: &str) {
        self.readers
            .lock()
            .expect("readers lock")
            .retain(|(reader, _)| reader != name);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

impl CardService for FakeService {
    fn list_readers(&self) -> Result<Vec<ReaderInfo>, CardError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .readers
            .lock()
            .expect("readers lock")
            .iter()
            .map(|(name, slot)| ReaderInfo {
                name: name.clone(),
                card_present: !matches!(slot, Slot::Empty),
            })
            .collect())
    }

    fn connect(&self, reader: &ReaderInfo) -> Result<CardInfo, CardError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let readers = self.readers.lock().expect("readers lock");
        let Some((name, slot)) = readers.iter().find(|(name, _)| *name == reader.name) else {
            return Err(CardError::NoCard);
        };
        match slot {
            Slot::Empty => Err(CardError::NoCard),
            Slot::Unknown => Err(CardError::UnknownCard),
            Slot::Card(eid) => Ok(CardInfo::new(
                ReaderInfo {
                    name: name.clone(),
                    card_present: true,
                },
                Arc::clone(eid) as Arc<dyn EidCard>,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Dialog double
// ---------------------------------------------------------------------------

/// One scripted answer to the PIN prompt.
pub enum PinScript {
    Entered(&'static str),
    Cancelled,
}

/// A scripted dialog surface that records what was shown.
#[derive(Default)]
pub struct ScriptedUi {
    pub confirmations: VecDeque<ConfirmationOutcome>,
    pub pins: VecDeque<PinScript>,
    pub retries: VecDeque<RetryOutcome>,
    pub selections: VecDeque<Option<usize>>,

    pub language: Option<String>,
    pub confirm_prompts: Vec<ConfirmationRequest>,
    pub pin_prompts: Vec<PinRequest>,
    pub pad_notices: Vec<PinRequest>,
    pub retry_prompts: Vec<RetriableError>,
    pub chooser_prompts: Vec<Vec<CardChoice>>,
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirm(mut self, outcome: ConfirmationOutcome) -> Self {
        self.confirmations.push_back(outcome);
        self
    }

    pub fn pin(mut self, script: PinScript) -> Self {
        self.pins.push_back(script);
        self
    }

    pub fn retry(mut self, outcome: RetryOutcome) -> Self {
        self.retries.push_back(outcome);
        self
    }

    pub fn select(mut self, choice: Option<usize>) -> Self {
        self.selections.push_back(choice);
        self
    }
}

impl UiSurface for ScriptedUi {
    fn set_language(&mut self, lang: &str) {
        self.language = Some(lang.to_owned());
    }

    fn show_waiting(&mut self, _message: &str) {}

    fn select_card(&mut self, choices: &[CardChoice]) -> Option<usize> {
        self.chooser_prompts.push(choices.to_vec());
        self.selections.pop_front().unwrap_or(Some(0))
    }

    fn ask_confirmation(&mut self, request: &ConfirmationRequest) -> ConfirmationOutcome {
        self.confirm_prompts.push(request.clone());
        self.confirmations
            .pop_front()
            .unwrap_or(ConfirmationOutcome::Confirmed)
    }

    fn ask_pin(&mut self, request: &PinRequest) -> PinOutcome {
        self.pin_prompts.push(request.clone());
        match self.pins.pop_front() {
            Some(PinScript::Entered(digits)) => PinOutcome::Entered(
                PinBuffer::from_digits(digits).expect("scripted PIN within limits"),
            ),
            Some(PinScript::Cancelled) => PinOutcome::Cancelled,
            None => PinOutcome::Entered(
                PinBuffer::from_digits("1234").expect("default PIN within limits"),
            ),
        }
    }

    fn notify_pin_pad(&mut self, request: &PinRequest) {
        self.pad_notices.push(request.clone());
    }

    fn show_retry(&mut self, error: &RetriableError) -> RetryOutcome {
        self.retry_prompts.push(*error);
        self.retries.pop_front().unwrap_or(RetryOutcome::Cancel)
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// A configuration with short timeouts and a fast poll, so timeout paths
/// complete in test time.
pub fn fast_config() -> eid_config::Config {
    let mut config = eid_config::Config::default();
    config.set_timeouts(Duration::from_millis(80), Duration::from_millis(80));
    config.set_poll_interval(Duration::from_millis(5));
    config
}

/// A 44-character challenge nonce.
pub fn valid_nonce() -> String {
    "0123456789abcdef0123456789abcdef0123456789ab".to_owned()
}
