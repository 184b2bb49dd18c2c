//! A bounded, forward-only reader over an immutable byte buffer.

use bytes::Bytes;

use crate::error::DecodeError;
use crate::leb128::LebCodec;
use crate::util::unlikely;

/// Stateful reader over an immutable buffer.
///
/// The cursor exclusively owns its position. Every read advances it
/// monotonically and fails instead of reading past the current limit. Limits
/// nest: [`ByteCursor::push_limit`] narrows the readable region to an
/// embedded message and [`ByteCursor::pop_limit`] restores the outer one.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    pos: usize,
    limit: usize,
}

/// A region entered with [`ByteCursor::push_limit`].
///
/// Must be handed back to [`ByteCursor::pop_limit`] once the region has been
/// decoded.
#[derive(Debug)]
#[must_use = "a pushed limit must be popped"]
pub struct Region {
    start: usize,
    end: usize,
    outer_limit: usize,
}

impl Region {
    /// Declared length of the region in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the region is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl ByteCursor {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let limit = data.len();
        ByteCursor {
            data,
            pos: 0,
            limit,
        }
    }

    /// Offset of the next byte to read, relative to the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left in the current bound region.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    /// Returns `true` if any bytes are left in the current bound region.
    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.pos < self.limit
    }

    /// The unread bytes of the current bound region.
    #[inline]
    pub(crate) fn chunk(&self) -> &[u8] {
        &self.data[self.pos..self.limit]
    }

    #[inline]
    fn ensure(&self, n: usize) -> Result<(), DecodeError> {
        if unlikely(n > self.remaining()) {
            return Err(DecodeError::out_of_bounds(n, self.remaining()));
        }
        Ok(())
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Read the next `n` bytes without copying them.
    #[inline]
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes, DecodeError> {
        self.ensure(n)?;
        let bytes = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }

    /// Read exactly `N` bytes into an array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Read a LEB128 varint of width `T`.
    ///
    /// A varint never straddles the current limit, running out of bytes
    /// before the terminating byte is a [`DecodeError::MalformedVarint`].
    #[inline]
    pub fn read_varint<T: LebCodec>(&mut self) -> Result<T, DecodeError> {
        let (value, bytes_read) = T::decode_leb128(self.chunk())?;
        self.pos += bytes_read;
        Ok(value)
    }

    /// Restrict all reads to the next `len` bytes.
    pub fn push_limit(&mut self, len: usize) -> Result<Region, DecodeError> {
        self.ensure(len)?;
        let region = Region {
            start: self.pos,
            end: self.pos + len,
            outer_limit: self.limit,
        };
        self.limit = region.end;
        Ok(region)
    }

    /// Leave `region`, checking it was consumed exactly.
    pub fn pop_limit(&mut self, region: Region) -> Result<(), DecodeError> {
        if unlikely(self.pos != region.end) {
            return Err(DecodeError::SubMessageBoundsViolation {
                expected: region.len(),
                consumed: self.pos - region.start,
            });
        }
        self.limit = region.outer_limit;
        Ok(())
    }
}
