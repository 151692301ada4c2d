use qtunnel_cipher_traits::{ContextAlgorithm, ContextError, Key};
use qtunnel_constant_time::xor;
use zeroize::Zeroizing;

/// One-time-pad stream cipher: the result is the added data xored with the final key.
///
/// There is no init key. The final key must be at least as long as the data added so
/// far; surplus key bytes are ignored. Applying the cipher twice with the same key gives
/// back the plaintext.
///
/// ```
/// use qtunnel_cipher_traits::{ContextAlgorithm, Key};
/// use qtunnel_ciphers::subtle::xor::Xor;
///
/// let mut enc = Xor::default();
/// enc.add(b"attack at dawn");
/// let ct = enc.finalize(&Key::from_slice(b"0123456789abcdef"));
///
/// let mut dec = Xor::default();
/// dec.add(&ct);
/// assert_eq!(dec.finalize(&Key::from_slice(b"0123456789abcdef")), b"attack at dawn");
/// ```
#[derive(Debug, Default)]
pub struct Xor {
    data: Zeroizing<Vec<u8>>,
}

impl ContextAlgorithm for Xor {
    fn name(&self) -> &'static str {
        "xor"
    }

    fn init_key_size(&self) -> usize {
        0
    }

    fn final_key_size(&self) -> usize {
        self.data.len()
    }

    fn result_size(&self) -> usize {
        self.data.len()
    }

    fn reuses_init_key(&self) -> bool {
        false
    }

    fn consumes_key_per_byte(&self) -> bool {
        true
    }

    fn is_valid_final_key(&self, key: &Key) -> bool {
        key.len() >= self.data.len()
    }

    /// Blocks are single bytes
    fn add(&mut self, data: &[u8]) -> u64 {
        self.data.extend_from_slice(data);
        data.len() as u64
    }

    fn finalize(&mut self, final_key: &Key) -> Vec<u8> {
        let mut out = std::mem::take(&mut *self.data);
        let n = out.len();
        xor(&mut out, &final_key.as_bytes()[..n]);
        out
    }

    fn state(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    fn set_state(&mut self, state: &[u8]) -> Result<(), ContextError> {
        self.data = Zeroizing::new(state.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn quick_brown_fox() {
        let plain = b"The quick brown fox jumps over the lazy dog";
        let key = Key::from_slice(b"abcdefghijklmnopqrstuvwxyz0123456789abcdefg");

        let mut ctx = Xor::default();
        ctx.add(plain);
        assert!(ctx.is_valid_final_key(&key));
        let ct = ctx.finalize(&key);
        assert_eq!(
            ct,
            hex!("350a064414130e0b024a091e02190150171d0b541f031a080a5a5f47574114415e52185500181a44010900")
        );

        let mut ctx = Xor::default();
        ctx.add(&ct);
        assert_eq!(ctx.finalize(&key), plain);
    }

    #[test]
    fn final_key_must_cover_the_data() {
        let mut ctx = Xor::default();
        assert_eq!(ctx.add(b"12345"), 5);
        assert!(!ctx.is_valid_final_key(&Key::from_slice(b"1234")));
        assert!(ctx.is_valid_final_key(&Key::from_slice(b"123456")));
        assert_eq!(ctx.finalize(&Key::from_slice(b"\0\0\0\0\0\xff")), b"12345");
    }

    #[test]
    fn finalize_uses_only_the_key_prefix() {
        let mut ctx = Xor::default();
        ctx.add(b"\x0f\xf0");
        let out = ctx.finalize(&Key::from_slice(b"\xff\xff\x12\x34"));
        assert_eq!(out, b"\xf0\x0f");
        assert_eq!(ctx.final_key_size(), 0);
    }
}
