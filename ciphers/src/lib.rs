//! Crypto contexts of qtunnel.
//!
//! The GF(2^n) arithmetic in [`gf2`] backs the evaluation hash in [`subtle::evhash`];
//! [`engine`] turns schemes into [`Context`]s and [`association`] bundles four of them for
//! one channel.

pub mod association;
pub mod context;
pub mod engine;
pub mod gf2;
pub mod subtle;

pub use association::{Association, AssociationDefinition, KeyConsumption, Slot};
pub use context::Context;
pub use engine::EngineError;
pub use qtunnel_cipher_traits::{ContextError, Key, Scheme};
