#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
//! constant-time implementations of some primitives
//!
//! qtunnel internal library providing the operations whose timing must not depend on
//! secret data: comparing authentication tags and applying one-time-pad keys.
//!
//! # Examples
//!
//! ```rust
//! use qtunnel_constant_time::{memcmp, xor};
//!
//! let a = [1, 2, 3, 4];
//! let b = [1, 2, 3, 4];
//! let c = [1, 2, 3, 5];
//!
//! assert!(memcmp(&a, &b));
//! assert!(!memcmp(&a, &c));
//!
//! let mut d = a;
//! xor(&mut d, &c);
//! assert_eq!(d, [0, 0, 0, 1]);
//! ```
//!
//! # Security Notes
//!
//! While these functions aim to be constant-time, they may leak timing information in some cases:
//!
//! - Length mismatches between inputs are immediately detectable
//! - Execution time scales linearly with input size

mod memcmp;
mod xor;

pub use memcmp::memcmp;
pub use xor::xor;
