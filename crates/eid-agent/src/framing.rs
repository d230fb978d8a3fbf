//! Native-messaging frame I/O.
//!
//! A frame is a 4-byte little-endian length header followed by that many
//! bytes of UTF-8 JSON. The endpoint reads request frames from the input
//! stream and writes response frames to the output stream; both directions
//! are synchronous and never interleave with controller work on the same
//! frame.

use std::io::{self, Read, Write};

use serde_json::Value;
use thiserror::Error;

/// Largest request frame the endpoint accepts.
pub const MAX_REQUEST_BYTES: usize = 8 * 1024;

/// Largest response frame the endpoint emits.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Wire-format violations. These end the session: a response is written when
/// the output stream still works, and the process exits with code 2.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The request header declares more than [`MAX_REQUEST_BYTES`] bytes.
    #[error("request frame of {length} bytes exceeds the {MAX_REQUEST_BYTES}-byte limit")]
    RequestTooLarge {
        /// Length declared in the header.
        length: usize,
    },

    /// The serialised response exceeds [`MAX_RESPONSE_BYTES`] bytes.
    #[error("response frame of {length} bytes exceeds the {MAX_RESPONSE_BYTES}-byte limit")]
    ResponseTooLarge {
        /// Length of the serialised response.
        length: usize,
    },

    /// The input stream closed in the middle of a frame.
    #[error("input stream closed before a complete frame was read")]
    TruncatedFrame,

    /// The frame body is not valid UTF-8.
    #[error("frame body is not valid UTF-8")]
    InvalidUtf8,

    /// The frame body is not valid JSON.
    #[error("frame body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The response could not be serialised.
    #[error("failed to serialise the response: {0}")]
    Serialise(#[source] serde_json::Error),

    /// Reading the request failed.
    #[error("failed to read the request frame: {0}")]
    Read(#[source] io::Error),

    /// Writing the response failed.
    #[error("failed to write the response frame: {0}")]
    Write(#[source] io::Error),
}

/// Synchronous frame endpoint over a pair of byte streams.
pub struct FramedEndpoint<R, W> {
    input: R,
    output: W,
}

impl<R: Read, W: Write> FramedEndpoint<R, W> {
    /// Wraps the given streams.
    #[must_use]
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads one request frame.
    ///
    /// Returns `Ok(None)` when the stream closes cleanly before a header
    /// byte arrives; the browser has disconnected the port and no response
    /// is owed.
    ///
    /// # Errors
    ///
    /// Returns a [`FramingError`] for oversized, truncated or malformed
    /// frames.
    pub fn read_request(&mut self) -> Result<Option<Value>, FramingError> {
        let Some(length) = self.read_header()? else {
            return Ok(None);
        };
        let length = length as usize;
        if length > MAX_REQUEST_BYTES {
            return Err(FramingError::RequestTooLarge { length });
        }

        let mut body = vec![0u8; length];
        self.input.read_exact(&mut body).map_err(|error| {
            if error.kind() == io::ErrorKind::UnexpectedEof {
                FramingError::TruncatedFrame
            } else {
                FramingError::Read(error)
            }
        })?;

        let text = std::str::from_utf8(&body).map_err(|_| FramingError::InvalidUtf8)?;
        serde_json::from_str(text).map(Some).map_err(FramingError::InvalidJson)
    }

    /// Writes one response frame and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns a [`FramingError`] when the response does not serialise, is
    /// oversized, or the stream write fails.
    pub fn write_response(&mut self, response: &Value) -> Result<(), FramingError> {
        let body = serde_json::to_vec(response).map_err(FramingError::Serialise)?;
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(FramingError::ResponseTooLarge { length: body.len() });
        }

        let header = u32::try_from(body.len())
            .map_err(|_| FramingError::ResponseTooLarge { length: body.len() })?
            .to_le_bytes();
        self.output.write_all(&header).map_err(FramingError::Write)?;
        self.output.write_all(&body).map_err(FramingError::Write)?;
        self.output.flush().map_err(FramingError::Write)
    }

    fn read_header(&mut self) -> Result<Option<u32>, FramingError> {
        let mut header = [0u8; 4];
        let mut filled = 0;
        while filled < header.len() {
            match self.input.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(FramingError::TruncatedFrame),
                Ok(read) => filled += read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(FramingError::Read(error)),
            }
        }
        Ok(Some(u32::from_le_bytes(header)))
    }
}

/// Encodes a value as a standalone frame. Test and tooling helper.
///
/// # Errors
///
/// Returns [`FramingError::Serialise`] when the value cannot be serialised.
pub fn encode_frame(value: &Value) -> Result<Vec<u8>, FramingError> {
    let body = serde_json::to_vec(value).map_err(FramingError::Serialise)?;
    let header = u32::try_from(body.len())
        .map_err(|_| FramingError::ResponseTooLarge { length: body.len() })?
        .to_le_bytes();
    let mut frame = Vec::with_capacity(header.len() + body.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&body);
    Ok(frame)
}
