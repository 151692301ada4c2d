use qtunnel_cipher_traits::{ContextAlgorithm, ContextError, Key, Scheme};
use qtunnel_constant_time::memcmp;

use crate::engine;
use crate::subtle::{evhash::EvHash, null::Null, xor::Xor};

/// The closed set of algorithms a [`Context`] can run
#[derive(Debug)]
pub enum Algorithm {
    Null(Null),
    Xor(Xor),
    EvHash(EvHash),
}

impl Algorithm {
    fn get(&self) -> &dyn ContextAlgorithm {
        match self {
            Self::Null(a) => a,
            Self::Xor(a) => a,
            Self::EvHash(a) => a,
        }
    }

    fn get_mut(&mut self) -> &mut dyn ContextAlgorithm {
        match self {
            Self::Null(a) => a,
            Self::Xor(a) => a,
            Self::EvHash(a) => a,
        }
    }

    fn duplicate(&self) -> Option<Self> {
        match self {
            Self::Null(a) => a.duplicate().map(Self::Null),
            Self::Xor(a) => a.duplicate().map(Self::Xor),
            Self::EvHash(a) => a.duplicate().map(Self::EvHash),
        }
    }
}

/// A crypto context: one algorithm instance plus the bookkeeping shared by all algorithms.
///
/// Contexts are created by the [`engine`] from a [`Scheme`], fed with [`Context::add`] and
/// sealed exactly once by [`Context::finalize`]. The scheme returned by [`Context::scheme`]
/// recreates a context producing the same future results.
///
/// ```
/// use qtunnel_cipher_traits::Key;
/// use qtunnel_ciphers::engine;
///
/// let mut ctx = engine::create("evhash-96:616263646162636461626364").unwrap();
/// ctx.add(b"hello").unwrap();
/// let tag = ctx.finalize(&Key::from_slice(b"123412341234")).unwrap();
/// assert_eq!(tag.len(), 12);
/// assert!(ctx.add(b"more").is_err());
/// ```
#[derive(Debug)]
pub struct Context {
    algorithm: Algorithm,
    init_key: Key,
    blocks: u64,
    finalized: bool,
}

impl Context {
    pub(crate) fn new(algorithm: Algorithm, init_key: Key) -> Self {
        Self {
            algorithm,
            init_key,
            blocks: 0,
            finalized: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.algorithm.get().name()
    }

    pub fn variant(&self) -> Option<u32> {
        self.algorithm.get().variant()
    }

    pub fn init_key(&self) -> &Key {
        &self.init_key
    }

    /// Number of blocks added since the context was created
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn init_key_size(&self) -> usize {
        self.algorithm.get().init_key_size()
    }

    pub fn final_key_size(&self) -> usize {
        self.algorithm.get().final_key_size()
    }

    pub fn result_size(&self) -> usize {
        self.algorithm.get().result_size()
    }

    pub fn is_cloneable(&self) -> bool {
        self.algorithm.get().is_cloneable()
    }

    pub fn reuses_init_key(&self) -> bool {
        self.algorithm.get().reuses_init_key()
    }

    pub fn consumes_key_per_byte(&self) -> bool {
        self.algorithm.get().consumes_key_per_byte()
    }

    /// Whether this is the no-op algorithm, which produces no output at all
    pub fn is_null(&self) -> bool {
        matches!(self.algorithm, Algorithm::Null(_))
    }

    pub fn is_valid_final_key(&self, key: &Key) -> bool {
        self.algorithm.get().is_valid_final_key(key)
    }

    pub fn add(&mut self, data: &[u8]) -> Result<(), ContextError> {
        if self.finalized {
            return Err(ContextError::Final);
        }
        self.blocks += self.algorithm.get_mut().add(data);
        Ok(())
    }

    pub fn finalize(&mut self, final_key: &Key) -> Result<Vec<u8>, ContextError> {
        if self.finalized {
            return Err(ContextError::Final);
        }
        if !self.is_valid_final_key(final_key) {
            return Err(ContextError::WrongKey);
        }
        self.finalized = true;
        Ok(self.algorithm.get_mut().finalize(final_key))
    }

    pub fn state(&self) -> Vec<u8> {
        self.algorithm.get().state()
    }

    pub fn set_state(&mut self, state: &[u8]) -> Result<(), ContextError> {
        self.algorithm.get_mut().set_state(state)
    }

    pub(crate) fn set_blocks(&mut self, blocks: u64) {
        self.blocks = blocks;
    }

    /// The scheme describing this context including its resumable state.
    ///
    /// A context that has not processed anything yet and still holds the all-zero initial
    /// state is described without a state field.
    pub fn scheme(&self) -> Scheme {
        let mut state = self.state();
        if self.blocks == 0 && state.iter().all(|b| *b == 0) {
            state.clear();
        }
        Scheme {
            algorithm: self.name().to_owned(),
            variant: self.variant(),
            init_key: self.init_key.clone(),
            state,
            blocks: self.blocks,
        }
    }

    /// An independent copy of this context.
    ///
    /// Algorithms that cannot copy themselves are recreated from [`Context::scheme`].
    pub fn try_clone(&self) -> Result<Self, ContextError> {
        if !self.is_cloneable() {
            return Err(ContextError::NotCloneable);
        }

        let mut copy = match self.algorithm.duplicate() {
            Some(algorithm) => Context {
                algorithm,
                init_key: self.init_key.clone(),
                blocks: self.blocks,
                finalized: false,
            },
            None => engine::create_from_scheme(&self.scheme()).map_err(|e| {
                log::error!("recreating {} from its scheme failed: {e}", self.name());
                ContextError::InvalidState("scheme does not recreate the context")
            })?,
        };
        copy.finalized = self.finalized;
        Ok(copy)
    }

    /// Whether `scheme` describes this context's algorithm, variant and init key
    pub fn is_compatible(&self, scheme: &Scheme) -> bool {
        scheme.algorithm == self.name()
            && scheme.variant.map_or(true, |v| Some(v) == self.variant())
            && memcmp(scheme.init_key.as_bytes(), self.init_key.as_bytes())
    }

    /// Continues from the state recorded in `scheme`.
    ///
    /// The scheme must describe the same algorithm, variant and init key; state is never
    /// carried over between different algorithm instances. Resuming clears the finalized flag.
    pub fn resume(&mut self, scheme: &Scheme) -> Result<(), ContextError> {
        if !self.is_compatible(scheme) {
            return Err(ContextError::Incompatible);
        }
        self.set_state(&scheme.state)?;
        self.blocks = scheme.blocks;
        self.finalized = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::create;
    use hex_literal::hex;

    const FOX: &[u8] = b"The quick brown fox jumps over the lazy dog";

    #[test]
    fn clone_produces_the_same_result() {
        for scheme in ["null", "xor", "evhash-96:616263646162636461626364", "evhash:61626364"] {
            let mut orig = create(scheme).unwrap();
            orig.add(FOX).unwrap();
            let mut copy = orig.try_clone().unwrap();

            orig.add(b"tail").unwrap();
            copy.add(b"tail").unwrap();
            let key = Key::new(vec![0x5a; orig.final_key_size()]);
            assert_eq!(orig.blocks(), copy.blocks());
            assert_eq!(orig.finalize(&key).unwrap(), copy.finalize(&key).unwrap(), "{scheme}");
        }
    }

    #[test]
    fn scheme_recreates_an_equivalent_context() {
        for scheme in ["null", "xor", "evhash-256:6162636461626364616263646162636461626364616263646162636461626364"] {
            let mut orig = create(scheme).unwrap();
            for _ in 0..3 {
                orig.add(FOX).unwrap();
            }

            let mut again = engine::create_from_scheme(&orig.scheme()).unwrap();
            assert_eq!(again.blocks(), orig.blocks());
            for ctx in [&mut orig, &mut again] {
                ctx.add(FOX).unwrap();
            }
            let key = Key::new(vec![0x33; orig.final_key_size()]);
            assert_eq!(orig.finalize(&key).unwrap(), again.finalize(&key).unwrap(), "{scheme}");
        }
    }

    #[test]
    fn fresh_contexts_have_a_short_scheme() {
        let mut ctx = create("EVHASH-96:616263646162636461626364").unwrap();
        assert_eq!(ctx.scheme().to_string(), "evhash-96:616263646162636461626364");

        ctx.add(b"hello").unwrap();
        let scheme = ctx.scheme();
        assert_eq!(scheme.blocks, 1);
        assert_eq!(scheme.state.len(), 12);
        assert_eq!(engine::create_from_scheme(&scheme).unwrap().scheme(), scheme);

        assert_eq!(create("xor").unwrap().scheme().to_string(), "xor");
        assert_eq!(create("null").unwrap().scheme().to_string(), "null");
    }

    #[test]
    fn finalized_contexts_reject_further_use() {
        let mut ctx = create("evhash-96:616263646162636461626364").unwrap();
        ctx.add(FOX).unwrap();
        assert_eq!(
            ctx.finalize(&Key::from_slice(b"1234")),
            Err(ContextError::WrongKey)
        );
        assert!(!ctx.is_finalized());

        ctx.finalize(&Key::from_slice(b"123412341234")).unwrap();
        assert!(ctx.is_finalized());
        assert_eq!(ctx.add(FOX), Err(ContextError::Final));
        assert_eq!(
            ctx.finalize(&Key::from_slice(b"123412341234")),
            Err(ContextError::Final)
        );
        assert!(ctx.try_clone().unwrap().is_finalized());
    }

    #[test]
    fn resume_continues_the_hash() {
        let scheme: Scheme = "evhash-96:02cc942de299f4b0d86ffd53:fd2cf893f0cfe670d89183dd:12345"
            .parse()
            .unwrap();
        let mut ctx = create("evhash-96:02cc942de299f4b0d86ffd53").unwrap();
        ctx.resume(&scheme).unwrap();
        ctx.add(b"hello").unwrap();
        assert_eq!(ctx.blocks(), 12346);
        assert_eq!(
            ctx.finalize(&Key::new(vec![0; 12])).unwrap(),
            hex!("3d6ecf618a18985abea1cee2")
        );
    }

    #[test]
    fn resume_refuses_other_instances() {
        let mut ctx = create("evhash-96:02cc942de299f4b0d86ffd53").unwrap();
        for other in [
            "evhash-96:02cc942de299f4b0d86ffd54:fd2cf893f0cfe670d89183dd:1",
            "evhash-32:02cc942d:fd2cf893:1",
            "xor::00:1",
        ] {
            let scheme: Scheme = other.parse().unwrap();
            assert_eq!(ctx.resume(&scheme), Err(ContextError::Incompatible), "{other}");
        }
        assert_eq!(ctx.blocks(), 0);
    }
}
