use static_assertions::const_assert;

use super::{Blob, Gf2, WORD_BITS};

const_assert!(WORD_BITS % 8 == 0);
const_assert!(WORD_BITS % 16 == 0);

/// Size of the lookup tables used by [`FastAlpha`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precalculation {
    /// 8 bit chunks, 256 entries per table
    #[default]
    SingleStep,
    /// 16 bit chunks, 65536 entries per table; half the iterations per multiplication
    TwoStep,
}

impl Precalculation {
    pub const fn chunk_bits(self) -> usize {
        match self {
            Self::SingleStep => 8,
            Self::TwoStep => 16,
        }
    }
}

/// Multiplication by a fixed field element `alpha` using precomputed tables.
///
/// The operand is consumed in chunks of [`Precalculation::chunk_bits`] bits, most
/// significant chunk first, in a Horner scheme: the accumulator is shifted left by one
/// chunk (the bits shifted out are folded back through `overflow_table`), then
/// `alpha * chunk` is added from `multiplication_table`.
///
/// Both precalculation modes produce identical results.
pub struct FastAlpha<const W: usize> {
    alpha: Blob<W>,
    precalculation: Precalculation,
    /// `alpha * v` for every chunk value `v`
    multiplication_table: Vec<Blob<W>>,
    /// `v * x^BITS mod f(x)` for every chunk value `v`
    overflow_table: Vec<Blob<W>>,
}

impl<const W: usize> FastAlpha<W> {
    pub fn new(field: &Gf2<W>, alpha: Blob<W>, precalculation: Precalculation) -> Self {
        let chunk_bits = precalculation.chunk_bits();
        let entries = 1usize << chunk_bits;

        let alpha_times_x: Vec<Blob<W>> = (0..chunk_bits)
            .map(|k| field.shift_left(&alpha, k))
            .collect();

        let mut multiplication_table = vec![Blob::zero(); entries];
        let mut overflow_table = vec![Blob::zero(); entries];

        // every entry is the entry without its lowest set bit plus the contribution of that bit
        for v in 1..entries {
            let low = v & v.wrapping_neg();
            let k = low.trailing_zeros() as usize;

            let mut m = multiplication_table[v ^ low];
            m.xor_assign(&alpha_times_x[k]);
            multiplication_table[v] = m;

            let mut o = overflow_table[v ^ low];
            o.xor_assign(field.x_pow(Gf2::<W>::BITS + k));
            overflow_table[v] = o;
        }

        Self {
            alpha,
            precalculation,
            multiplication_table,
            overflow_table,
        }
    }

    pub fn alpha(&self) -> &Blob<W> {
        &self.alpha
    }

    pub fn precalculation(&self) -> Precalculation {
        self.precalculation
    }

    /// `alpha * x`
    #[inline]
    pub fn times_alpha(&self, x: &Blob<W>) -> Blob<W> {
        match self.precalculation {
            Precalculation::SingleStep => self.horner::<8>(x),
            Precalculation::TwoStep => self.horner::<16>(x),
        }
    }

    #[inline]
    fn horner<const C: usize>(&self, x: &Blob<W>) -> Blob<W> {
        let mask = (1u32 << C) - 1;
        let mut acc = Blob::<W>::zero();

        for word in x.0.iter() {
            for k in (0..WORD_BITS / C).rev() {
                let top = (acc.0[0] >> (WORD_BITS - C)) as usize;
                for i in 0..W - 1 {
                    acc.0[i] = (acc.0[i] << C) | (acc.0[i + 1] >> (WORD_BITS - C));
                }
                acc.0[W - 1] <<= C;
                acc.xor_assign(&self.overflow_table[top]);

                let chunk = ((word >> (k * C)) & mask) as usize;
                acc.xor_assign(&self.multiplication_table[chunk]);
            }
        }
        acc
    }
}

impl<const W: usize> Drop for FastAlpha<W> {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.alpha.zeroize();
        for entry in self.multiplication_table.iter_mut() {
            entry.zeroize();
        }
    }
}
