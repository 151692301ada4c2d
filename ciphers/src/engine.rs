//! Builds crypto contexts from schemes.
//!
//! ```
//! use qtunnel_ciphers::engine::{self, EngineError};
//!
//! let ctx = engine::create("evhash-96:02cc942de299f4b0d86ffd53").unwrap();
//! assert_eq!((ctx.name(), ctx.variant()), ("evhash", Some(96)));
//!
//! assert!(matches!(engine::create("rot13"), Err(EngineError::AlgorithmUnknown(_))));
//! assert!(matches!(engine::create("evhash-96:zz"), Err(EngineError::SchemeInvalid(_))));
//! ```

use qtunnel_cipher_traits::{ContextError, Key, Scheme, SchemeError};
use thiserror::Error;

use crate::context::{Algorithm, Context};
use crate::gf2::Precalculation;
use crate::subtle::{evhash::EvHash, null::Null, xor::Xor};

/// Names of all algorithms the engine knows
pub const ALGORITHMS: [&str; 3] = ["null", "xor", "evhash"];

/// Failure to set up a crypto context
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown crypto algorithm {0:?}")]
    AlgorithmUnknown(String),

    #[error(transparent)]
    SchemeInvalid(#[from] SchemeError),

    #[error("init key of {len} bytes is not usable for {algorithm}")]
    InitKeyInvalid { algorithm: String, len: usize },

    #[error("context initialization failed")]
    Context(#[from] ContextError),
}

/// Creates a context from a textual scheme
pub fn create(scheme: &str) -> Result<Context, EngineError> {
    create_from_scheme(&scheme.parse()?)
}

/// Creates a fresh context for `ALGORITHM[-VARIANT]` with the given init key
pub fn create_with_key(algorithm: &str, init_key: &Key) -> Result<Context, EngineError> {
    if algorithm.contains(':') {
        return Err(SchemeError::new(algorithm, "algorithm name must not carry fields").into());
    }
    let scheme = Scheme {
        init_key: init_key.clone(),
        ..algorithm.parse::<Scheme>()?
    };
    create_from_scheme(&scheme)
}

pub fn create_from_scheme(scheme: &Scheme) -> Result<Context, EngineError> {
    create_with(scheme, Precalculation::default())
}

/// Creates a context, choosing the table size for algorithms built on fast-alpha
/// multiplication.
pub fn create_with(scheme: &Scheme, precalculation: Precalculation) -> Result<Context, EngineError> {
    let key_invalid = || EngineError::InitKeyInvalid {
        algorithm: scheme.name(),
        len: scheme.init_key.len(),
    };

    let algorithm = match (scheme.algorithm.as_str(), scheme.variant) {
        ("null", None) if scheme.init_key.is_empty() => Algorithm::Null(Null),
        ("xor", None) if scheme.init_key.is_empty() => Algorithm::Xor(Xor::default()),
        ("null" | "xor", None) => return Err(key_invalid()),
        ("evhash", variant) => {
            if let Some(bits) = variant {
                if !EvHash::VARIANTS.contains(&bits) {
                    return Err(EngineError::AlgorithmUnknown(scheme.name()));
                }
                if scheme.init_key.len() * 8 != bits as usize {
                    return Err(key_invalid());
                }
            }
            let evhash = EvHash::new(&scheme.init_key, precalculation).ok_or_else(key_invalid)?;
            Algorithm::EvHash(evhash)
        }
        _ => return Err(EngineError::AlgorithmUnknown(scheme.name())),
    };

    let mut ctx = Context::new(algorithm, scheme.init_key.clone());
    if !scheme.state.is_empty() || scheme.blocks > 0 {
        ctx.set_state(&scheme.state)?;
        ctx.set_blocks(scheme.blocks);
    }

    log::debug!(
        "created crypto context {} (blocks: {})",
        scheme.name(),
        scheme.blocks
    );
    Ok(ctx)
}

/// Whether `scheme` parses and describes a context the engine can create
pub fn valid_scheme(scheme: &str) -> bool {
    create(scheme).is_ok()
}
