//! # Zero Fill
//!
//! Clears raw arena memory at create, reset and destroy boundaries.

/// Overwrites every byte of `region` with zero.
#[inline]
pub fn zero_fill(region: &mut [u8]) {
    bytemuck::fill_zeroes(region);
}

/// Returns true if every byte of `region` is zero.
#[must_use]
pub fn is_zeroed(region: &[u8]) -> bool {
    region.iter().all(|&byte| byte == 0)
}
