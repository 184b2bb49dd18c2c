//! Small helpers shared by the decode hot path.

#[cold]
#[inline(always)]
fn cold() {}

/// Hint that `b` is usually `true`.
#[inline(always)]
pub(crate) fn likely(b: bool) -> bool {
    if !b {
        cold();
    }
    b
}

/// Hint that `b` is usually `false`, e.g. on error checks.
#[inline(always)]
pub(crate) fn unlikely(b: bool) -> bool {
    if b {
        cold();
    }
    b
}

/// Widen a count to `u64`.
#[inline]
pub(crate) fn saturating_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
