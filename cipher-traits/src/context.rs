use crate::{ContextError, Key};

/// Models one algorithm usable as a crypto context.
///
/// Implementors only deal with their own state. Bookkeeping common to all contexts
/// (the init key, the number of processed blocks and whether the context has been
/// finalized) is handled by the context wrapping the algorithm, which also guarantees that
/// [`ContextAlgorithm::finalize`] is only called with keys accepted by
/// [`ContextAlgorithm::is_valid_final_key`].
pub trait ContextAlgorithm {
    /// Name of the algorithm as used in schemes
    fn name(&self) -> &'static str;

    /// Variant selector as used in schemes, if the algorithm has variants
    fn variant(&self) -> Option<u32> {
        None
    }

    /// Number of bytes the init key must have
    fn init_key_size(&self) -> usize;

    /// Number of bytes the next call to [`ContextAlgorithm::finalize`] needs; stream
    /// ciphers report the amount of data added so far.
    fn final_key_size(&self) -> usize;

    /// Number of bytes [`ContextAlgorithm::finalize`] would produce right now
    fn result_size(&self) -> usize;

    /// Whether the full behavior of the algorithm is captured by its scheme, so copies can be
    /// made by recreating the context from the scheme.
    fn is_cloneable(&self) -> bool {
        true
    }

    /// Whether the init key may back more than one finalized result
    fn reuses_init_key(&self) -> bool;

    /// Whether the final key grows with every byte added, as for stream ciphers
    fn consumes_key_per_byte(&self) -> bool {
        false
    }

    /// The validity predicate applied to final keys
    fn is_valid_final_key(&self, key: &Key) -> bool {
        key.len() == self.final_key_size()
    }

    /// Feeds data into the algorithm; returns the number of blocks processed.
    fn add(&mut self, data: &[u8]) -> u64;

    /// Produces the result, masked or encrypted with `final_key`.
    fn finalize(&mut self, final_key: &Key) -> Vec<u8>;

    /// Exports the resumable state as raw bytes
    fn state(&self) -> Vec<u8>;

    /// Imports state previously exported by [`ContextAlgorithm::state`]
    fn set_state(&mut self, state: &[u8]) -> Result<(), ContextError>;

    /// An independent copy sharing no mutable state with `self`, when the algorithm can
    /// produce one cheaper than recreating it from the scheme.
    fn duplicate(&self) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }
}
