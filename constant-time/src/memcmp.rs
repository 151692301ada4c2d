//! memcmp

/// Checks two authentication tags (or any other byte strings) for equality without
/// short-circuiting on the first differing byte.
///
/// ## Leaks
/// Slices of different length are rejected right away, so the length of the tags is
/// not kept secret. Tag lengths are fixed by the algorithm in use and public anyway.
///
/// ## Examples
///
/// ```rust
/// use qtunnel_constant_time::memcmp;
/// let tag = [0x43, 0xab, 0x55, 0x73];
/// assert!(memcmp(&tag, &[0x43, 0xab, 0x55, 0x73]));
/// assert!(!memcmp(&tag, &[0x43, 0xab, 0x55, 0x72]));
/// assert!(!memcmp(&tag, &[0x43, 0xab, 0x55]));
/// assert!(memcmp(&[], &[]));
/// ```
#[inline]
pub fn memcmp(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && unsafe { memsec::memeq(a.as_ptr(), b.as_ptr(), a.len()) }
}
