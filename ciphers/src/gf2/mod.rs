//! Arithmetic in GF(2^n) for the field widths used by the evaluation hash.
//!
//! A field is given by its width (a multiple of 32 bits, see [`Blob`]) and an irreducible
//! polynomial `f(x) = x^n + m(x)`. The modulus is passed as the integer whose bits are the
//! coefficients of `m(x)`; the leading `x^n` is implicit.
//!
//! All fields used by qtunnel are built once, on first use, and are immutable afterwards:
//!
//! ```
//! use qtunnel_ciphers::gf2::{Blob, GF2_96};
//!
//! let a = Blob::<3>::from_bytes(b"abcdabcdabcd").unwrap();
//! let b = Blob::<3>::from_bytes(b"123412341234").unwrap();
//! let p = GF2_96.multiply(&a, &b);
//! assert_eq!(p.to_bytes(), hex_literal::hex!("3127dfbdfff0756a312753ea"));
//! ```

mod blob;
mod fast_alpha;

pub use blob::{Blob, WORD_BITS};
pub use fast_alpha::{FastAlpha, Precalculation};

use lazy_static::lazy_static;

/// `x^32 + x^7 + x^3 + x^2 + 1`
pub const MODULUS_32: u32 = 0x8d;
/// `x^64 + x^4 + x^3 + x + 1`
pub const MODULUS_64: u32 = 0x1b;
/// `x^96 + x^10 + x^9 + x^6 + 1`
pub const MODULUS_96: u32 = 0x641;
/// `x^128 + x^7 + x^2 + x + 1`
pub const MODULUS_128: u32 = 0x87;
/// `x^256 + x^10 + x^5 + x^2 + 1`
pub const MODULUS_256: u32 = 0x425;

lazy_static! {
    pub static ref GF2_32: Gf2<1> = Gf2::new(MODULUS_32);
    pub static ref GF2_64: Gf2<2> = Gf2::new(MODULUS_64);
    pub static ref GF2_96: Gf2<3> = Gf2::new(MODULUS_96);
    pub static ref GF2_128: Gf2<4> = Gf2::new(MODULUS_128);
    pub static ref GF2_256: Gf2<8> = Gf2::new(MODULUS_256);
}

/// Carry-less product of two words
#[inline]
fn clmul32(a: u32, b: u32) -> u64 {
    let a = a as u64;
    let mut r = 0u64;
    for i in 0..WORD_BITS {
        let mask = 0u64.wrapping_sub(((b >> i) & 1) as u64);
        r ^= (a << i) & mask;
    }
    r
}

/// The field GF(2^(32 * W)).
#[derive(Debug, Clone)]
pub struct Gf2<const W: usize> {
    modulus: u32,
    /// `reduction[i] = x^i mod f(x)` for `i` in `[0, 2 * BITS)`
    reduction: Vec<Blob<W>>,
}

impl<const W: usize> Gf2<W> {
    pub const BITS: usize = Blob::<W>::BITS;
    pub const BYTES: usize = Blob::<W>::BYTES;

    pub fn new(modulus: u32) -> Self {
        let mut reduction = Vec::with_capacity(2 * Self::BITS);
        let mut x = Blob::one();
        for _ in 0..2 * Self::BITS {
            reduction.push(x);
            x = Self::times_x(&x, modulus);
        }
        Self { modulus, reduction }
    }

    /// Multiplies by `x`, reducing with the modulus directly
    fn times_x(a: &Blob<W>, modulus: u32) -> Blob<W> {
        let carry = a.0[0] >> (WORD_BITS - 1);
        let mut r = Blob::zero();
        for i in 0..W {
            let next = if i + 1 < W { a.0[i + 1] >> (WORD_BITS - 1) } else { 0 };
            r.0[i] = (a.0[i] << 1) | next;
        }
        r.0[W - 1] ^= modulus & 0u32.wrapping_sub(carry);
        r
    }

    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// `x^i mod f(x)`
    ///
    /// # Panics
    /// If `i >= 2 * BITS`.
    pub fn x_pow(&self, i: usize) -> &Blob<W> {
        &self.reduction[i]
    }

    pub fn add(&self, a: &Blob<W>, b: &Blob<W>) -> Blob<W> {
        let mut r = *a;
        r.xor_assign(b);
        r
    }

    /// Folds the part of a double-width product above `x^BITS` back into the field.
    ///
    /// Bit `j` of `high` stands for the coefficient of `x^(BITS + j)`.
    pub fn fold(&self, high: &Blob<W>) -> Blob<W> {
        let mut r = Blob::zero();
        for (i, word) in high.0.iter().enumerate() {
            let base = Self::BITS + (W - 1 - i) * WORD_BITS;
            let mut w = *word;
            while w != 0 {
                let bit = w.trailing_zeros() as usize;
                r.xor_assign(&self.reduction[base + bit]);
                w &= w - 1;
            }
        }
        r
    }

    /// Full multiplication `a * b mod f(x)`
    pub fn multiply(&self, a: &Blob<W>, b: &Blob<W>) -> Blob<W> {
        // double width product, `lo` holds x^0..x^(BITS-1), `hi` the rest
        let (mut lo, mut hi) = (Blob::<W>::zero(), Blob::<W>::zero());
        let mut xor_word = |pos: usize, v: u32| {
            if pos < W {
                lo.0[W - 1 - pos] ^= v;
            } else {
                hi.0[2 * W - 1 - pos] ^= v;
            }
        };

        for i in 0..W {
            let ai = a.0[W - 1 - i];
            if ai == 0 {
                continue;
            }
            for j in 0..W {
                let p = clmul32(ai, b.0[W - 1 - j]);
                xor_word(i + j, p as u32);
                xor_word(i + j + 1, (p >> WORD_BITS) as u32);
            }
        }

        let mut r = self.fold(&hi);
        r.xor_assign(&lo);
        r
    }

    /// `a * x^bits mod f(x)` for any number of bits
    pub fn shift_left(&self, a: &Blob<W>, bits: usize) -> Blob<W> {
        let mut r = *a;
        let mut remaining = bits;
        while remaining > 0 {
            let step = remaining.min(Self::BITS);
            let (lo, hi) = Self::wide_shift_left(&r, step);
            r = self.fold(&hi);
            r.xor_assign(&lo);
            remaining -= step;
        }
        r
    }

    /// Shifts into a double width value; `0 < bits <= BITS`
    fn wide_shift_left(a: &Blob<W>, bits: usize) -> (Blob<W>, Blob<W>) {
        let (ws, bs) = (bits / WORD_BITS, bits % WORD_BITS);
        let (mut lo, mut hi) = (Blob::<W>::zero(), Blob::<W>::zero());
        let mut put = |pos: usize, v: u32| {
            if pos < W {
                lo.0[W - 1 - pos] |= v;
            } else if pos < 2 * W {
                hi.0[2 * W - 1 - pos] |= v;
            }
        };

        for k in 0..W {
            let v = a.0[W - 1 - k];
            put(k + ws, v << bs);
            if bs > 0 {
                put(k + ws + 1, v >> (WORD_BITS - bs));
            }
        }
        (lo, hi)
    }

    /// Plain right shift; coefficients below `x^bits` are dropped.
    pub fn shift_right(&self, a: &Blob<W>, bits: usize) -> Blob<W> {
        if bits >= Self::BITS {
            return Blob::zero();
        }
        let (ws, bs) = (bits / WORD_BITS, bits % WORD_BITS);
        let word = |pos: usize| if pos < W { a.0[W - 1 - pos] } else { 0 };

        let mut r = Blob::zero();
        for k in 0..W {
            let mut v = word(k + ws) >> bs;
            if bs > 0 {
                v |= word(k + ws + 1) << (WORD_BITS - bs);
            }
            r.0[W - 1 - k] = v;
        }
        r
    }

    /// Reads a field element from network order bytes; `None` on a length mismatch
    pub fn from_bytes(&self, bytes: &[u8]) -> Option<Blob<W>> {
        Blob::from_bytes(bytes)
    }

    pub fn to_bytes(&self, a: &Blob<W>) -> Vec<u8> {
        a.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Bitwise reference multiplication
    fn naive_multiply<const W: usize>(f: &Gf2<W>, a: &Blob<W>, b: &Blob<W>) -> Blob<W> {
        let mut r = Blob::zero();
        let mut a = *a;
        for i in 0..Gf2::<W>::BITS {
            if b.bit(i) {
                r.xor_assign(&a);
            }
            a = Gf2::<W>::times_x(&a, f.modulus());
        }
        r
    }

    fn random_blob<const W: usize>(rng: &mut impl Rng) -> Blob<W> {
        let mut b = Blob::zero();
        rng.fill(&mut b.0[..]);
        b
    }

    fn check_multiply<const W: usize>(f: &Gf2<W>) {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let (a, b) = (random_blob::<W>(&mut rng), random_blob::<W>(&mut rng));
            let p = f.multiply(&a, &b);
            assert_eq!(p, naive_multiply(f, &a, &b));
            assert_eq!(p, f.multiply(&b, &a));
            assert_eq!(f.multiply(&a, &Blob::one()), a);
            assert!(f.multiply(&a, &Blob::zero()).is_zero());
        }
    }

    #[test]
    fn multiply_matches_reference_for_all_widths() {
        check_multiply(&*GF2_32);
        check_multiply(&*GF2_64);
        check_multiply(&*GF2_96);
        check_multiply(&*GF2_128);
        check_multiply(&*GF2_256);
    }

    #[test]
    fn reduction_table_wraps_around() {
        let f = &*GF2_96;
        assert_eq!(f.x_pow(0), &Blob::one());
        assert_eq!(f.x_pow(95).0, [0x8000_0000, 0, 0]);
        // x^96 = m(x)
        assert_eq!(f.x_pow(96), &Blob::from_low_bits(MODULUS_96));
        assert_eq!(f.x_pow(97), &Blob::from_low_bits(MODULUS_96 << 1));
    }

    #[test]
    fn shifting_is_multiplying_by_powers_of_x() {
        let mut rng = rand::thread_rng();
        let f = &*GF2_128;
        for bits in [0, 1, 7, 31, 32, 33, 100, 127, 128, 129, 300] {
            let a = random_blob::<4>(&mut rng);
            let x_bits = f.shift_left(&Blob::one(), bits);
            assert_eq!(f.shift_left(&a, bits), f.multiply(&a, &x_bits), "shift by {bits}");
        }
        assert_eq!(f.shift_left(&Blob::one(), 200), *f.x_pow(200));
    }

    #[test]
    fn shift_right_drops_low_coefficients() {
        let f = &*GF2_64;
        let a = Blob::<2>([0x8000_0001, 0x0000_00ff]);
        assert_eq!(f.shift_right(&a, 4).0, [0x0800_0000, 0x1000_000f]);
        assert_eq!(f.shift_right(&a, 32).0, [0, 0x8000_0001]);
        assert_eq!(f.shift_right(&a, 63).0, [0, 1]);
        assert!(f.shift_right(&a, 64).is_zero());
        assert_eq!(f.shift_right(&a, 0), a);
    }

    #[test]
    fn addition_is_xor() {
        let f = &*GF2_32;
        let a = Blob::<1>([0xf0f0_1234]);
        let b = Blob::<1>([0x0ff0_1234]);
        assert_eq!(f.add(&a, &b).0, [0xff00_0000]);
        assert!(f.add(&a, &a).is_zero());
    }

    #[test]
    fn byte_conversion() {
        let f = &*GF2_96;
        let a = f.from_bytes(b"abcdabcdabcd").unwrap();
        assert_eq!(f.to_bytes(&a), b"abcdabcdabcd");
        assert!(f.from_bytes(b"abcd").is_none());
    }
}
