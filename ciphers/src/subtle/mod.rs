//! The algorithms backing crypto contexts.
//!
//! Each algorithm implements [`qtunnel_cipher_traits::ContextAlgorithm`]; contexts are
//! normally created through [`crate::engine`] rather than from these types directly.

pub mod evhash;
pub mod null;
pub mod xor;
