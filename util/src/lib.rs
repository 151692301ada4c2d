//! Helpers shared by the qtunnel crates.

pub mod length_prefix_encoding;
