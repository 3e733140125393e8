//! Packet: the application-level unit of communication.
//!
//! A [`Packet`] is an opcode plus a byte payload with two cursors: the write
//! cursor (the payload length, advanced by append operations) and the read
//! cursor (advanced by extraction). `read_pos <= write_pos` always holds;
//! extracting past the write cursor yields [`DecodeError::Underflow`], which
//! is recoverable — the caller discards the packet and the connection stays
//! open.
//!
//! All multi-byte values are Big Endian, matching the frame header. Strings
//! and blobs are `u32` length-prefixed.
//!
//! # Example
//!
//! ```
//! use framecast::protocol::{opcode, Packet};
//!
//! let mut packet = Packet::new(opcode::ENTITY_UPDATE);
//! packet.write_u32(42);
//! packet.write_string("hello");
//!
//! let (header, payload) = packet.encode();
//! let mut decoded = Packet::decode(header, payload).unwrap();
//! assert_eq!(decoded.read_u32().unwrap(), 42);
//! assert_eq!(decoded.read_string().unwrap(), "hello");
//! ```

use bytes::Bytes;
use thiserror::Error;

use super::wire_format::Header;

/// Error produced while extracting values from a packet payload.
///
/// Decode errors are local to the offending packet; they never tear down
/// the connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Extraction would read past the write cursor.
    #[error("payload underflow: wanted {wanted} bytes, {available} available")]
    Underflow { wanted: usize, available: usize },

    /// The payload byte count does not match the header's length field.
    #[error("payload length mismatch: header says {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A length-prefixed string was not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
}

/// An opcode-tagged payload with append/extract cursors.
///
/// Equality compares opcode and payload bytes only; the read cursor is
/// transient state.
#[derive(Debug, Clone)]
pub struct Packet {
    opcode: i32,
    buf: Vec<u8>,
    read_pos: usize,
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.opcode == other.opcode && self.buf == other.buf
    }
}

impl Eq for Packet {}

impl Packet {
    /// Create an empty packet for the given opcode.
    pub fn new(opcode: i32) -> Self {
        Self {
            opcode,
            buf: Vec::new(),
            read_pos: 0,
        }
    }

    /// Decode a packet from a header and its payload bytes.
    ///
    /// Consumes exactly `header.payload_length` bytes; anything else is a
    /// [`DecodeError::LengthMismatch`], never a partial packet.
    pub fn decode(header: Header, payload: Bytes) -> Result<Self, DecodeError> {
        if payload.len() != header.payload_length as usize {
            return Err(DecodeError::LengthMismatch {
                expected: header.payload_length as usize,
                actual: payload.len(),
            });
        }
        Ok(Self {
            opcode: header.opcode,
            buf: payload.to_vec(),
            read_pos: 0,
        })
    }

    /// Encode into a frame: header plus payload bytes.
    ///
    /// Deterministic; `header.payload_length` always equals the payload byte
    /// count — the header is the one authoritative length on the wire.
    pub fn encode(&self) -> (Header, Bytes) {
        (
            Header::new(self.opcode, self.buf.len() as u32),
            Bytes::copy_from_slice(&self.buf),
        )
    }

    /// The packet's opcode.
    #[inline]
    pub fn opcode(&self) -> i32 {
        self.opcode
    }

    /// Position of the write cursor (the payload length).
    #[inline]
    pub fn write_pos(&self) -> usize {
        self.buf.len()
    }

    /// Position of the read cursor.
    #[inline]
    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Bytes left between the read and write cursors.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.read_pos
    }

    /// The raw payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.buf
    }

    /// Drop the payload and reset both cursors.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.read_pos = 0;
    }

    /// Rewind the read cursor to the start of the payload.
    pub fn reset_read(&mut self) {
        self.read_pos = 0;
    }

    fn take(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        let available = self.buf.len() - self.read_pos;
        if available < n {
            return Err(DecodeError::Underflow {
                wanted: n,
                available,
            });
        }
        let start = self.read_pos;
        self.read_pos += n;
        Ok(&self.buf[start..start + n])
    }

    // Append primitives. Each advances the write cursor.

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Append a `u32` length-prefixed UTF-8 string.
    pub fn write_string(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Append a `u32` length-prefixed byte blob.
    pub fn write_blob(&mut self, data: &[u8]) {
        self.write_u32(data.len() as u32);
        self.buf.extend_from_slice(data);
    }

    /// Append raw bytes with no length prefix.
    pub fn write_raw(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    // Extract primitives. Each advances the read cursor; reading past the
    // write cursor is an `Underflow`.

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let b = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(u64::from_be_bytes(a))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let b = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(i64::from_be_bytes(a))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let b = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(f64::from_be_bytes(a))
    }

    /// Extract a `u32` length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?.to_vec();
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Extract a `u32` length-prefixed byte blob.
    pub fn read_blob(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Extract `n` raw bytes.
    pub fn read_raw(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.take(n)?.to_vec())
    }
}
