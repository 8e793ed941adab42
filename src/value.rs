//! Stored value types a sequence can carry.
//!
//! Trace writers emit either 32-bit or 64-bit events ("int" and "long"
//! streams); the per-sequence trailer records which via a single width bit.
//! Signed types are zigzag-mapped onto the unsigned varint space so that
//! callers are free to feed raw or delta-subtracted (possibly negative)
//! values without the codec caring.

use crate::error::SequenceError;
use crate::varint;
use std::fmt::Debug;
use std::hash::Hash;
use std::io::{Read, Write};

/// A value type storable in a compressed sequence.
pub trait TraceValue: Copy + Eq + Hash + Debug {
    /// True for 64-bit ("long") streams, false for 32-bit ("int") streams.
    /// Recorded in the sequence trailer and checked on read.
    const WIDE: bool;

    fn write_to<W: Write + ?Sized>(self, w: &mut W) -> std::io::Result<()>;

    fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, SequenceError>;
}

impl TraceValue for u64 {
    const WIDE: bool = true;

    fn write_to<W: Write + ?Sized>(self, w: &mut W) -> std::io::Result<()> {
        varint::write_u64(w, self)
    }

    fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, SequenceError> {
        varint::read_u64(r)
    }
}

impl TraceValue for u32 {
    const WIDE: bool = false;

    fn write_to<W: Write + ?Sized>(self, w: &mut W) -> std::io::Result<()> {
        varint::write_u64(w, u64::from(self))
    }

    fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, SequenceError> {
        let raw = varint::read_u64(r)?;
        u32::try_from(raw).map_err(|_| SequenceError::ValueOutOfRange(raw))
    }
}

impl TraceValue for i64 {
    const WIDE: bool = true;

    fn write_to<W: Write + ?Sized>(self, w: &mut W) -> std::io::Result<()> {
        varint::write_u64(w, zigzag64(self))
    }

    fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, SequenceError> {
        Ok(unzigzag64(varint::read_u64(r)?))
    }
}

impl TraceValue for i32 {
    const WIDE: bool = false;

    fn write_to<W: Write + ?Sized>(self, w: &mut W) -> std::io::Result<()> {
        varint::write_u64(w, u64::from(zigzag32(self)))
    }

    fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, SequenceError> {
        let raw = varint::read_u64(r)?;
        let narrow = u32::try_from(raw).map_err(|_| SequenceError::ValueOutOfRange(raw))?;
        Ok(unzigzag32(narrow))
    }
}

fn zigzag64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn unzigzag64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn zigzag32(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

fn unzigzag32(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}
