//! Wire format encoding and decoding.
//!
//! Implements the 8-byte frame header:
//! ```text
//! ┌────────────────┬──────────┐
//! │ Payload Length │ Opcode   │
//! │ 4 bytes        │ 4 bytes  │
//! │ uint32 BE      │ int32 BE │
//! └────────────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian. The header's `payload_length` is
//! the single authoritative length of the payload that follows; receivers
//! must read exactly that many bytes before decoding.

use crate::error::{FramecastError, Result};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Default maximum payload size (16 MB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Exact byte length of the payload that follows (header excluded).
    pub payload_length: u32,
    /// Operation code identifying how the payload is interpreted.
    pub opcode: i32,
}

impl Header {
    /// Create a new header.
    pub fn new(opcode: i32, payload_length: u32) -> Self {
        Self {
            payload_length,
            opcode,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use framecast::protocol::Header;
    ///
    /// let header = Header::new(7, 100);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 8);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (8 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.payload_length.to_be_bytes());
        buf[4..8].copy_from_slice(&self.opcode.to_be_bytes());
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            payload_length: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            opcode: i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Validate the header against the configured payload limit.
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.payload_length > max_payload_size {
            return Err(FramecastError::Protocol(format!(
                "payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }
        Ok(())
    }
}
