//! Helpers for reading and writing bytes.
//!
//! Readers take the buffer and a cursor offset; on success the offset is
//! advanced past what was read, on failure it is left where it was.

use {
    ledger_address::{Address, ADDRESS_BYTES},
    ledger_short_vec::{decode_len, encode_len, ShortVecError},
    thiserror::Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("need {needed} bytes at offset {offset}, buffer has {len}")]
    BufferTooSmall {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error(transparent)]
    ShortVec(#[from] ShortVecError),
}

pub fn read_u8(current: &mut usize, data: &[u8]) -> Result<u8, ReadError> {
    let byte = *data.get(*current).ok_or(ReadError::BufferTooSmall {
        offset: *current,
        needed: 1,
        len: data.len(),
    })?;
    *current = current.saturating_add(1);
    Ok(byte)
}

pub fn read_slice<'a>(
    current: &mut usize,
    data: &'a [u8],
    data_len: usize,
) -> Result<&'a [u8], ReadError> {
    let too_small = ReadError::BufferTooSmall {
        offset: *current,
        needed: data_len,
        len: data.len(),
    };
    let end = current.checked_add(data_len).ok_or(too_small)?;
    let slice = data.get(*current..end).ok_or(too_small)?;
    *current = end;
    Ok(slice)
}

pub fn read_array<const N: usize>(current: &mut usize, data: &[u8]) -> Result<[u8; N], ReadError> {
    let mut out = [0u8; N];
    out.copy_from_slice(read_slice(current, data, N)?);
    Ok(out)
}

pub fn read_address(current: &mut usize, data: &[u8]) -> Result<Address, ReadError> {
    read_array::<ADDRESS_BYTES>(current, data).map(Address::from)
}

/// Read a compact-u16 length prefix.
pub fn read_short_len(current: &mut usize, data: &[u8]) -> Result<usize, ReadError> {
    decode_len(data, current)
        .map(usize::from)
        .map_err(ReadError::from)
}

/// Read a compact-u16 prefixed byte vector.
pub fn read_short_vec_bytes(current: &mut usize, data: &[u8]) -> Result<Vec<u8>, ReadError> {
    let start = *current;
    let len = read_short_len(current, data)?;
    match read_slice(current, data, len) {
        Ok(bytes) => Ok(bytes.to_vec()),
        Err(err) => {
            *current = start;
            Err(err)
        }
    }
}

pub fn append_u8(buf: &mut Vec<u8>, data: u8) {
    buf.push(data);
}

pub fn append_slice(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(data);
}

/// Append a compact-u16 length prefix.
pub fn append_short_len(buf: &mut Vec<u8>, len: u16) {
    encode_len(buf, len);
}
