use qtunnel_cipher_traits::{ContextAlgorithm, ContextError, Key};

/// The no-op algorithm: accepts everything, produces an empty result.
#[derive(Debug, Default)]
pub struct Null;

impl ContextAlgorithm for Null {
    fn name(&self) -> &'static str {
        "null"
    }

    fn init_key_size(&self) -> usize {
        0
    }

    fn final_key_size(&self) -> usize {
        0
    }

    fn result_size(&self) -> usize {
        0
    }

    fn reuses_init_key(&self) -> bool {
        true
    }

    fn is_valid_final_key(&self, _key: &Key) -> bool {
        true
    }

    fn add(&mut self, _data: &[u8]) -> u64 {
        0
    }

    fn finalize(&mut self, _final_key: &Key) -> Vec<u8> {
        Vec::new()
    }

    fn state(&self) -> Vec<u8> {
        Vec::new()
    }

    fn set_state(&mut self, state: &[u8]) -> Result<(), ContextError> {
        match state.is_empty() {
            true => Ok(()),
            false => Err(ContextError::InvalidState("null has no state")),
        }
    }
}
