//! xor

use core::hint::black_box;

/// Xors `src` into `dst`, the building block of one-time-pad masking.
///
/// # Panics
/// If source and destination are of different sizes.
///
/// # Leaks
/// The execution time is linear in the input length and independent of the content.
///
/// # Examples
///
/// ```
/// use qtunnel_constant_time::xor;
/// let mut msg = b"hello".to_vec();
/// xor(&mut msg, b"world");
/// assert_eq!(msg, b"\x1f\n\x1e\x00\x0b");
/// ```
#[inline]
pub fn xor(dst: &mut [u8], src: &[u8]) {
    assert!(black_box(src.len()) == black_box(dst.len()));
    for (dv, sv) in dst.iter_mut().zip(src.iter()) {
        *black_box(dv) ^= black_box(*sv);
    }
}
