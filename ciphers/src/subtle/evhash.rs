//! Evaluation hash: a Wegman-Carter style authenticator over GF(2^n).
//!
//! The init key is the secret evaluation point `alpha`; its length selects the field width
//! (4, 8, 12, 16 or 32 bytes for 32, 64, 96, 128 or 256 bits). Data is split into blocks of
//! the field width, a short last block of every [`ContextAlgorithm::add`] call is padded
//! with zero bytes, and the tag is updated per block as
//!
//! ```text
//! tag = (tag + block) * alpha
//! ```
//!
//! Finalizing xors the tag with a one-time-pad final key of exactly the field width.
//!
//! ```
//! use qtunnel_cipher_traits::{ContextAlgorithm, Key};
//! use qtunnel_ciphers::gf2::Precalculation;
//! use qtunnel_ciphers::subtle::evhash::EvHash;
//!
//! let mut h = EvHash::new(&Key::from_slice(b"abcdabcdabcd"), Precalculation::SingleStep).unwrap();
//! assert_eq!(h.bits(), 96);
//! for _ in 0..10 {
//!     h.add(b"The quick brown fox jumps over the lazy dog");
//! }
//! let tag = h.finalize(&Key::from_slice(b"123412341234"));
//! assert_eq!(tag.len(), 12);
//! ```

use std::fmt;
use std::sync::Arc;

use qtunnel_cipher_traits::{ContextAlgorithm, ContextError, Key};
use qtunnel_constant_time::xor;
use zeroize::Zeroize;

use crate::gf2::{Blob, FastAlpha, Gf2, Precalculation, GF2_128, GF2_256, GF2_32, GF2_64, GF2_96};

/// Evaluation hash over a field of fixed width
pub struct EvHashImpl<const W: usize> {
    field: &'static Gf2<W>,
    /// Tables only depend on alpha, so copies of a context share them
    alpha: Arc<FastAlpha<W>>,
    tag: Blob<W>,
}

impl<const W: usize> EvHashImpl<W> {
    pub const BITS: usize = Gf2::<W>::BITS;
    pub const BYTES: usize = Gf2::<W>::BYTES;

    /// `None` if the init key does not have exactly [`Self::BYTES`] bytes or is all zero
    pub fn new(
        field: &'static Gf2<W>,
        init_key: &Key,
        precalculation: Precalculation,
    ) -> Option<Self> {
        let alpha = Blob::from_bytes(init_key.as_bytes())?;
        if alpha.is_zero() {
            return None;
        }

        Some(Self {
            field,
            alpha: Arc::new(FastAlpha::new(field, alpha, precalculation)),
            tag: Blob::zero(),
        })
    }

    pub fn bits(&self) -> u32 {
        Self::BITS as u32
    }

    pub fn precalculation(&self) -> Precalculation {
        self.alpha.precalculation()
    }

    fn add_blocks(&mut self, data: &[u8]) -> u64 {
        let mut blocks = 0;
        for chunk in data.chunks(Self::BYTES) {
            let block = Blob::from_bytes_padded(chunk);
            self.tag = self.alpha.times_alpha(&self.field.add(&self.tag, &block));
            blocks += 1;
        }
        blocks
    }

    fn finalize_tag(&mut self, final_key: &Key) -> Vec<u8> {
        let mut out = self.tag.to_bytes();
        xor(&mut out, final_key.as_bytes());
        self.tag.zeroize();
        out
    }

    fn set_tag(&mut self, state: &[u8]) -> Result<(), ContextError> {
        self.tag = Blob::from_bytes(state)
            .ok_or(ContextError::InvalidState("evhash state must be one field element"))?;
        Ok(())
    }
}

impl<const W: usize> Clone for EvHashImpl<W> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            alpha: Arc::clone(&self.alpha),
            tag: self.tag,
        }
    }
}

impl<const W: usize> Drop for EvHashImpl<W> {
    fn drop(&mut self) {
        self.tag.zeroize();
    }
}

/// Evaluation hash in one of the supported field widths
#[derive(Clone)]
pub enum EvHash {
    Bits32(EvHashImpl<1>),
    Bits64(EvHashImpl<2>),
    Bits96(EvHashImpl<3>),
    Bits128(EvHashImpl<4>),
    Bits256(EvHashImpl<8>),
}

/// Runs `$body` with `$h` bound to the width specific implementation
macro_rules! with_impl {
    ($self:expr, $h:ident => $body:expr) => {
        match $self {
            EvHash::Bits32($h) => $body,
            EvHash::Bits64($h) => $body,
            EvHash::Bits96($h) => $body,
            EvHash::Bits128($h) => $body,
            EvHash::Bits256($h) => $body,
        }
    };
}

impl EvHash {
    /// Supported field widths in bits
    pub const VARIANTS: [u32; 5] = [32, 64, 96, 128, 256];

    /// Picks the field width from the length of the init key.
    ///
    /// Returns `None` for init keys of unsupported length and for the all zero key.
    pub fn new(init_key: &Key, precalculation: Precalculation) -> Option<Self> {
        Some(match init_key.len() * 8 {
            32 => Self::Bits32(EvHashImpl::new(&GF2_32, init_key, precalculation)?),
            64 => Self::Bits64(EvHashImpl::new(&GF2_64, init_key, precalculation)?),
            96 => Self::Bits96(EvHashImpl::new(&GF2_96, init_key, precalculation)?),
            128 => Self::Bits128(EvHashImpl::new(&GF2_128, init_key, precalculation)?),
            256 => Self::Bits256(EvHashImpl::new(&GF2_256, init_key, precalculation)?),
            _ => return None,
        })
    }

    /// Field width in bits
    pub fn bits(&self) -> u32 {
        with_impl!(self, h => h.bits())
    }

    /// Field width in bytes
    pub fn bytes(&self) -> usize {
        self.bits() as usize / 8
    }

    pub fn precalculation(&self) -> Precalculation {
        with_impl!(self, h => h.precalculation())
    }
}

impl ContextAlgorithm for EvHash {
    fn name(&self) -> &'static str {
        "evhash"
    }

    fn variant(&self) -> Option<u32> {
        Some(self.bits())
    }

    fn init_key_size(&self) -> usize {
        self.bytes()
    }

    fn final_key_size(&self) -> usize {
        self.bytes()
    }

    fn result_size(&self) -> usize {
        self.bytes()
    }

    fn reuses_init_key(&self) -> bool {
        true
    }

    fn add(&mut self, data: &[u8]) -> u64 {
        with_impl!(self, h => h.add_blocks(data))
    }

    fn finalize(&mut self, final_key: &Key) -> Vec<u8> {
        with_impl!(self, h => h.finalize_tag(final_key))
    }

    fn state(&self) -> Vec<u8> {
        with_impl!(self, h => h.tag.to_bytes())
    }

    fn set_state(&mut self, state: &[u8]) -> Result<(), ContextError> {
        with_impl!(self, h => h.set_tag(state))
    }

    fn duplicate(&self) -> Option<Self> {
        Some(self.clone())
    }
}

impl fmt::Debug for EvHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvHash")
            .field("bits", &self.bits())
            .field("precalculation", &self.precalculation())
            .finish_non_exhaustive()
    }
}
