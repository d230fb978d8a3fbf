//! Cooperative cancellation flag shared between the controller and workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::CardError;

/// A clonable cancellation flag.
///
/// The controller raises the flag on user cancellation or card removal;
/// blocking card operations check it between APDU exchanges and bail out with
/// [`CardError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    raised: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Idempotent.
    pub fn cancel(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Returns whether the flag has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Returns [`CardError::Cancelled`] when the flag has been raised.
    ///
    /// # Errors
    ///
    /// Fails exactly when the flag is raised; intended for `check()?` use at
    /// suspension points.
    pub fn check(&self) -> Result<(), CardError> {
        if self.is_cancelled() {
            Err(CardError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_flag_is_visible_through_clones() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());

        flag.cancel();
        assert!(observer.is_cancelled());
        assert_eq!(observer.check(), Err(CardError::Cancelled));
    }

    #[test]
    fn lowered_flag_passes_check() {
        assert_eq!(CancelFlag::new().check(), Ok(()));
    }
}
