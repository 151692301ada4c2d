//! Traits and shared types for the crypto contexts of qtunnel.
//!
//! A crypto context is created from a textual [`Scheme`], fed with data through
//! [`ContextAlgorithm::add`] and sealed exactly once with a final key. The concrete
//! algorithms and the factory building them from schemes live in `qtunnel-ciphers`.

mod context;
mod error;
mod key;
mod scheme;

pub use context::ContextAlgorithm;
pub use error::{ContextError, SchemeError};
pub use key::Key;
pub use scheme::Scheme;
