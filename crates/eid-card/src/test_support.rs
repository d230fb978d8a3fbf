//! Scripted doubles shared by the crate's unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::algorithm::{JwsAlgorithm, SignatureAlgorithm};
use crate::cancel::CancelFlag;
use crate::card::{CardInfo, EidCard, KeyPurpose};
use crate::error::CardError;
use crate::pin::{PinInput, PinPolicy};
use crate::reader::{CardService, ReaderInfo};

/// A scripted card driver handle.
pub struct FakeEid {
    model: String,
    algorithm: JwsAlgorithm,
    certificate: Vec<u8>,
    policy: PinPolicy,
    sign_results: Mutex<VecDeque<Result<Vec<u8>, CardError>>>,
    signed_digests: Mutex<Vec<Vec<u8>>>,
}

impl FakeEid {
    pub fn new(model: &str, algorithm: JwsAlgorithm, certificate: Vec<u8>) -> Self {
        Self {
            model: model.to_owned(),
            algorithm,
            certificate,
            policy: PinPolicy::new(4, 12, 3, false).expect("policy within limits"),
            sign_results: Mutex::new(VecDeque::new()),
            signed_digests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_sign_result(&self, result: Result<Vec<u8>, CardError>) {
        self.sign_results
            .lock()
            .expect("sign results lock")
            .push_back(result);
    }

    pub fn signed_digests(&self) -> Vec<Vec<u8>> {
        self.signed_digests
            .lock()
            .expect("signed digests lock")
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
        Ok(self.policy)
    }

    fn sign(
        &self,
        _purpose: KeyPurpose,
        _pin: PinInput,
        digest: &[u8],
        cancel: &CancelFlag,
    ) -> Result<Vec<u8>, CardError> {
        cancel.check()?;
        self.signed_digests
            .lock()
            .expect("signed digests lock")
            .push(digest.to_vec());
        self.sign_results
            .lock()
            .expect("sign results lock")
            .pop_front()
            .unwrap_or_else(|| Ok(b"signature".to_vec()))
    }
}

/// What a scripted reader currently holds.
#[derive(Clone)]
pub enum Slot {
    Empty,
    Unknown,
    Card(Arc<FakeEid>),
}

/// A scripted [`CardService`] with a mutable reader timeline.
#[derive(Default)]
pub struct FakeService {
    readers: Mutex<Vec<(String, Slot)>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
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
}

impl CardService for FakeService {
    fn list_readers(&self) -> Result<Vec<ReaderInfo>, CardError> {
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
