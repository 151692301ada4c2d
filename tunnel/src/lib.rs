//! Secure tunnel core of qtunnel.
//!
//! [`channel::Channel`] turns plain [`msgs::Message`]s into authenticated (and optionally
//! encrypted) wire messages and back, using the crypto contexts of an association from
//! `qtunnel-ciphers` and key material from a [`keys::KeySource`].

pub mod channel;
pub mod cli;
pub mod config;
pub mod keys;
pub mod msgs;

pub use channel::{Channel, ChannelError};
