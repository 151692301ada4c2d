//! Length-prefixed framing for byte strings written to and read from streams.
//!
//! Every record is an eight byte little-endian length header followed by the record
//! itself. This is the format used to persist crypto context state.

pub mod decoder;
pub mod encoder;

/// Size in bytes of a record header carrying length information
pub const HEADER_SIZE: usize = std::mem::size_of::<u64>();
