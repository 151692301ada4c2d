use std::fmt;

use zeroize::Zeroize;

/// Number of bits in one word of a [`Blob`]
pub const WORD_BITS: usize = u32::BITS as usize;

/// A polynomial over GF(2) of degree below `32 * W`, stored most-significant word first.
///
/// Bit `i` of the blob is the coefficient of `x^i`. The byte representation is the
/// big-endian encoding of the whole blob, i.e. network order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blob<const W: usize>(pub [u32; W]);

impl<const W: usize> Blob<W> {
    pub const BITS: usize = W * WORD_BITS;
    pub const BYTES: usize = W * 4;

    pub const fn zero() -> Self {
        Self([0u32; W])
    }

    /// The constant polynomial `1`
    pub fn one() -> Self {
        Self::from_low_bits(1)
    }

    /// The polynomial whose coefficients are the bits of `v`
    pub fn from_low_bits(v: u32) -> Self {
        let mut r = Self::zero();
        r.0[W - 1] = v;
        r
    }

    /// Reads exactly [`Self::BYTES`] big-endian bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == Self::BYTES).then(|| Self::from_bytes_padded(bytes))
    }

    /// Reads at most [`Self::BYTES`] big-endian bytes; missing trailing bytes are zero.
    ///
    /// # Panics
    /// If `bytes` is longer than [`Self::BYTES`].
    pub fn from_bytes_padded(bytes: &[u8]) -> Self {
        assert!(bytes.len() <= Self::BYTES);
        let mut r = Self::zero();
        for (i, b) in bytes.iter().enumerate() {
            r.0[i / 4] |= (*b as u32) << (24 - 8 * (i % 4));
        }
        r
    }

    pub fn write_bytes(&self, out: &mut [u8]) {
        assert_eq!(out.len(), Self::BYTES);
        for (chunk, w) in out.chunks_exact_mut(4).zip(self.0.iter()) {
            chunk.copy_from_slice(&w.to_be_bytes());
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::BYTES];
        self.write_bytes(&mut out);
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    /// Coefficient of `x^i`
    pub fn bit(&self, i: usize) -> bool {
        let (word, bit) = (W - 1 - i / WORD_BITS, i % WORD_BITS);
        (self.0[word] >> bit) & 1 == 1
    }

    pub fn set_bit(&mut self, i: usize) {
        let (word, bit) = (W - 1 - i / WORD_BITS, i % WORD_BITS);
        self.0[word] |= 1 << bit;
    }

    /// Degree of the polynomial, `None` for zero
    pub fn degree(&self) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| (W - 1 - i) * WORD_BITS + (WORD_BITS - 1 - w.leading_zeros() as usize))
    }

    pub fn xor_assign(&mut self, other: &Self) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a ^= *b;
        }
    }
}

impl<const W: usize> Default for Blob<W> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const W: usize> Zeroize for Blob<W> {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl<const W: usize> fmt::Debug for Blob<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob<{}>(", Self::BITS)?;
        for w in self.0.iter() {
            write!(f, "{w:08x}")?;
        }
        write!(f, ")")
    }
}
