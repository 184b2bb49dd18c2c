//! LEB128 variable-length integer decoding.

use crate::error::DecodeError;
use crate::util::likely;

/// Types that can be decoded from a LEB128 encoded integer.
pub trait LebCodec: Sized + Copy {
    /// Maximum number of bytes an encoding of `Self` may occupy.
    ///
    /// Bounds the work an attacker-controlled buffer can force on us.
    const MAX_LEB_BYTES: usize;

    /// Decode a LEB128 variable length integer from the front of `data`.
    ///
    /// Returns a tuple of the decoded value and the number of bytes read to
    /// decode said value. Fails with [`DecodeError::MalformedVarint`] if
    /// `data` ends before a terminating byte, or if no terminating byte
    /// appears within [`LebCodec::MAX_LEB_BYTES`].
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeError>;
}

impl LebCodec for u64 {
    const MAX_LEB_BYTES: usize = 10;

    #[inline]
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeError> {
        // Fast path, single byte values are by far the most common.
        if let Some(&b) = data.first() {
            if likely(b < 0x80) {
                return Ok((u64::from(b), 1));
            }
        }

        let mut value = 0u64;
        for (i, &b) in data.iter().take(Self::MAX_LEB_BYTES).enumerate() {
            if i == Self::MAX_LEB_BYTES - 1 {
                // The 10th byte only has room for the single remaining bit,
                // anything more overflows u64::MAX.
                if b > 0x01 {
                    return Err(DecodeError::malformed_varint());
                }
                return Ok((value | (u64::from(b) << 63), Self::MAX_LEB_BYTES));
            }

            value |= u64::from(b & 0x7f) << (i * 7);
            if b < 0x80 {
                return Ok((value, i + 1));
            }
        }

        // Either we ran out of input or the varint is too long.
        Err(DecodeError::malformed_varint())
    }
}

impl LebCodec for u32 {
    const MAX_LEB_BYTES: usize = 5;

    #[inline]
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeError> {
        if let Some(&b) = data.first() {
            if likely(b < 0x80) {
                return Ok((u32::from(b), 1));
            }
        }

        let mut value = 0u32;
        for (i, &b) in data.iter().take(Self::MAX_LEB_BYTES).enumerate() {
            // N.B. Bits of the 5th byte beyond the 32nd are discarded, 32-bit
            // integers wrap rather than fail.
            value |= u32::from(b & 0x7f) << (i * 7);
            if b < 0x80 {
                return Ok((value, i + 1));
            }
        }

        Err(DecodeError::malformed_varint())
    }
}
