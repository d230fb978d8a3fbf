//! PIN containers and policy.
//!
//! The PIN travels through the process in a [`PinBuffer`]: a fixed-capacity
//! container that never reallocates, moves into the signing call, and wipes
//! its backing storage on drop. Pad readers bypass the buffer entirely; the
//! PIN never exists in process memory.

use zeroize::Zeroize;

use crate::error::CardError;

/// APDU header bytes preceding the PIN block in a VERIFY command.
pub const APDU_OVERHEAD: usize = 5;

/// Padding bytes a driver may append to the PIN block.
pub const MAX_PIN_PADDING: usize = 16;

/// Longest PIN accepted across supported card implementations.
pub const MAX_PIN_LENGTH: usize = 12;

/// Total backing storage of a [`PinBuffer`].
pub const PIN_BUFFER_CAPACITY: usize = APDU_OVERHEAD + MAX_PIN_PADDING;

/// Fixed-capacity PIN container.
///
/// The storage is an inline array sized for the PIN plus APDU overhead and
/// padding, so drivers can assemble the VERIFY block in place and no
/// reallocation can leak PIN fragments. The container is move-only into the
/// signing call; `Drop` zeroes the full storage regardless of outcome.
#[derive(Default)]
pub struct PinBuffer {
    storage: [u8; PIN_BUFFER_CAPACITY],
    length: usize,
}

impl PinBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one PIN byte.
    ///
    /// # Errors
    ///
    /// Fails with [`CardError::UnsupportedPinLength`] when the PIN would
    /// exceed [`MAX_PIN_LENGTH`].
    pub fn push(&mut self, byte: u8) -> Result<(), CardError> {
        if self.length == MAX_PIN_LENGTH {
            return Err(CardError::UnsupportedPinLength {
                max_length: MAX_PIN_LENGTH as u8,
            });
        }
        self.storage[self.length] = byte;
        self.length += 1;
        Ok(())
    }

    /// Copies PIN digits out of a prompt result.
    ///
    /// The source should be wiped by the caller once the buffer is built;
    /// dialog widgets hand out `String`s the buffer cannot take ownership of.
    ///
    /// # Errors
    ///
    /// Fails when the PIN is longer than [`MAX_PIN_LENGTH`].
    pub fn from_digits(digits: &str) -> Result<Self, CardError> {
        let mut buffer = Self::new();
        for byte in digits.bytes() {
            buffer.push(byte)?;
        }
        Ok(buffer)
    }

    /// Number of PIN bytes currently held.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Whether the buffer holds no PIN bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The PIN bytes. Drivers consume this slice when assembling the VERIFY
    /// block.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage[..self.length]
    }

    /// Zeroes the full backing storage and empties the buffer.
    pub fn wipe(&mut self) {
        self.storage.zeroize();
        self.length = 0;
    }

    /// The entire backing storage, including bytes beyond the PIN length.
    /// Lets tests verify that a wipe cleared every byte.
    #[must_use]
    pub const fn backing_storage(&self) -> &[u8; PIN_BUFFER_CAPACITY] {
        &self.storage
    }
}

impl Drop for PinBuffer {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl std::fmt::Debug for PinBuffer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PinBuffer")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// How the PIN reaches the card.
#[derive(Debug)]
pub enum PinInput {
    /// Software PIN entry; the buffer moves into the signing call.
    Buffer(PinBuffer),
    /// The reader's own pad collects the PIN in hardware.
    PinPad,
}

/// PIN constraints and state declared by the card for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinPolicy {
    min_length: u8,
    max_length: u8,
    retries_left: u8,
    pin_pad: bool,
}

impl PinPolicy {
    /// Builds a policy from driver-declared constraints.
    ///
    /// # Errors
    ///
    /// Fails with [`CardError::UnsupportedPinLength`] when the declared
    /// maximum exceeds [`MAX_PIN_LENGTH`]; the fixed buffer cannot hold such
    /// a PIN and the limit must be revisited before supporting the card.
    pub fn new(
        min_length: u8,
        max_length: u8,
        retries_left: u8,
        pin_pad: bool,
    ) -> Result<Self, CardError> {
        if usize::from(max_length) > MAX_PIN_LENGTH {
            return Err(CardError::UnsupportedPinLength { max_length });
        }
        Ok(Self {
            min_length,
            max_length,
            retries_left,
            pin_pad,
        })
    }

    /// Minimum PIN length accepted by the card.
    #[must_use]
    pub const fn min_length(&self) -> u8 {
        self.min_length
    }

    /// Maximum PIN length accepted by the card.
    #[must_use]
    pub const fn max_length(&self) -> u8 {
        self.max_length
    }

    /// Remaining PIN attempts before the card blocks the key.
    #[must_use]
    pub const fn retries_left(&self) -> u8 {
        self.retries_left
    }

    /// Whether the reader collects the PIN on its own pad.
    #[must_use]
    pub const fn pin_pad(&self) -> bool {
        self.pin_pad
    }
}

#[cfg(test)]
mod tests;
