//! Bounded view over untrusted packet bytes.
//!
//! Every read the dissector performs goes through [`PacketView`], which
//! validates offsets against a *logical* packet length that may be shorter
//! than the backing storage (a short capture). A failed read never panics;
//! callers turn the [`Truncated`] error into an inline marker and stop.

use std::mem;

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, KnownLayout, Ref, Unaligned};

/// A read that would cross the declared end of the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read of {len} bytes at offset {offset} exceeds packet length {logical_len}")]
pub struct Truncated {
    pub offset: usize,
    pub len: usize,
    pub logical_len: usize,
}

/// Read-only packet buffer with an explicit logical length.
#[derive(Debug, Clone, Copy)]
pub struct PacketView<'a> {
    bytes: &'a [u8],
    logical_len: usize,
}

impl<'a> PacketView<'a> {
    /// View over a fully captured packet.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            logical_len: bytes.len(),
        }
    }

    /// View whose logical length is below the storage length. Reads past
    /// `logical_len` fail even though the bytes exist.
    pub fn truncated(bytes: &'a [u8], logical_len: usize) -> Self {
        Self {
            bytes,
            logical_len: logical_len.min(bytes.len()),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.logical_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.logical_len == 0
    }

    /// Bytes left between `offset` and the logical end, zero if past it.
    #[inline]
    pub fn remaining_from(&self, offset: usize) -> usize {
        self.logical_len.saturating_sub(offset)
    }

    /// Validated slice access. The only place raw indexing happens.
    pub fn read(&self, offset: usize, len: usize) -> Result<&'a [u8], Truncated> {
        let err = Truncated {
            offset,
            len,
            logical_len: self.logical_len,
        };
        let end = offset.checked_add(len).ok_or(err)?;
        if end > self.logical_len {
            return Err(err);
        }
        self.bytes.get(offset..end).ok_or(err)
    }

    /// Typed read of a fixed-size wire header at `offset`.
    pub fn read_header<T>(&self, offset: usize) -> Result<&'a T, Truncated>
    where
        T: FromBytes + KnownLayout + Immutable + Unaligned,
    {
        let len = mem::size_of::<T>();
        let bytes = self.read(offset, len)?;
        let r = Ref::<_, T>::from_bytes(bytes).map_err(|_| Truncated {
            offset,
            len,
            logical_len: self.logical_len,
        })?;
        Ok(Ref::into_ref(r))
    }
}
