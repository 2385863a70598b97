//! Compact-u16, the variable length prefix for every array in the wire format.
//!
//! A value is written little-endian, 7 payload bits per byte, with the high bit
//! set on every byte except the last. Values `0..=u16::MAX` need one to three
//! bytes:
//!
//! ```text
//!     0 -> [0x00]
//!   127 -> [0x7f]
//!   128 -> [0x80, 0x01]
//! 16383 -> [0xff, 0x7f]
//! 16384 -> [0x80, 0x80, 0x01]
//! 65535 -> [0xff, 0xff, 0x03]
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use thiserror::Error;

/// Maximum encoded size of a compact-u16.
pub const MAX_ENCODING_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShortVecError {
    /// Ran out of input before the final byte.
    #[error("buffer ended inside a compact-u16")]
    Truncated,
    /// A trailing zero byte, i.e. more bytes than the value needs.
    #[error("compact-u16 is not minimally encoded")]
    NonCanonical,
    /// Value does not fit in 16 bits.
    #[error("compact-u16 overflows u16")]
    Overflow,
}

/// Number of bytes needed to encode `len`.
pub const fn encoded_len(len: u16) -> usize {
    if len < 0x80 {
        1
    } else if len < 0x4000 {
        2
    } else {
        3
    }
}

/// Append the compact-u16 encoding of `len` to `out`.
#[allow(clippy::arithmetic_side_effects)]
pub fn encode_len(out: &mut Vec<u8>, len: u16) {
    let mut rem_len = len;
    loop {
        let mut elem = (rem_len & 0x7f) as u8;
        rem_len >>= 7;
        if rem_len == 0 {
            out.push(elem);
            break;
        } else {
            elem |= 0x80;
            out.push(elem);
        }
    }
}

/// Read a compact-u16 from `bytes` starting at `offset`.
///
/// On success `offset` points to the byte after the encoding. On failure
/// `offset` is left untouched.
#[allow(clippy::arithmetic_side_effects)]
pub fn decode_len(bytes: &[u8], offset: &mut usize) -> Result<u16, ShortVecError> {
    let mut result = 0u16;
    let mut shift = 0u32;

    for i in 0..MAX_ENCODING_LENGTH {
        let byte = *bytes
            .get(offset.saturating_add(i))
            .ok_or(ShortVecError::Truncated)?;
        // a zero continuation byte adds nothing
        if i > 0 && byte == 0 {
            return Err(ShortVecError::NonCanonical);
        }
        // only two payload bits remain for the third byte
        if i == 2 && byte > 0x03 {
            return Err(ShortVecError::Overflow);
        }
        result |= u16::from(byte & 0x7f) << shift;
        shift = shift.saturating_add(7);
        if byte & 0x80 == 0 {
            *offset = offset.saturating_add(i).saturating_add(1);
            return Ok(result);
        }
    }

    // unreachable in practice: the third byte is at most 0x03 and so never
    // carries a continuation bit
    Err(ShortVecError::Overflow)
}
