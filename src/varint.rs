//! Self-describing variable-length integer encoding.
//!
//! A single leading byte in `0..=247` is the value itself, the fast path for
//! run lengths and small deltas. Leading bytes `248..=255` announce that the
//! value occupies `N = 255 - lead + 1` following big-endian bytes (1..=8),
//! with `N` always minimal for the value. Every `u64` round-trips exactly.

use crate::error::SequenceError;
use std::io::{Read, Write};

/// Largest value that fits in the leading byte alone.
pub const MAX_INLINE: u64 = 247;

/// Number of bytes `value` occupies when encoded.
pub fn encoded_len(value: u64) -> usize {
    if value <= MAX_INLINE {
        1
    } else {
        1 + payload_len(value)
    }
}

/// Minimal big-endian byte count for a value above `MAX_INLINE`.
fn payload_len(value: u64) -> usize {
    (8 - value.leading_zeros() as usize / 8).max(1)
}

/// Writes `value` to `w` in varint form.
pub fn write_u64<W: Write + ?Sized>(w: &mut W, value: u64) -> std::io::Result<()> {
    if value <= MAX_INLINE {
        return w.write_all(&[value as u8]);
    }
    let n = payload_len(value);
    let mut buf = [0u8; 9];
    buf[0] = 255 - (n as u8 - 1);
    buf[1..=n].copy_from_slice(&value.to_be_bytes()[8 - n..]);
    w.write_all(&buf[..=n])
}

/// Reads one varint-encoded value from `r`.
///
/// A stream that ends inside the encoding fails with
/// [`SequenceError::UnexpectedEndOfData`].
pub fn read_u64<R: Read + ?Sized>(r: &mut R) -> Result<u64, SequenceError> {
    let lead = read_byte(r)?;
    if u64::from(lead) <= MAX_INLINE {
        return Ok(u64::from(lead));
    }
    let n = (255 - lead) as usize + 1;
    let mut buf = [0u8; 8];
    read_exact(r, &mut buf[8 - n..])?;
    Ok(u64::from_be_bytes(buf))
}

pub(crate) fn read_byte<R: Read + ?Sized>(r: &mut R) -> Result<u8, SequenceError> {
    let mut b = [0u8; 1];
    read_exact(r, &mut b)?;
    Ok(b[0])
}

fn read_exact<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<(), SequenceError> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SequenceError::UnexpectedEndOfData
        } else {
            SequenceError::Io(e)
        }
    })
}
