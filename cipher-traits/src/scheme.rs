use std::fmt;
use std::str::FromStr;

use crate::{Key, SchemeError};

/// Compact textual description of a crypto context.
///
/// The grammar is `ALGORITHM[-VARIANT][:INITKEY_HEX[:STATE_HEX[:BLOCKS_DEC]]]`. A scheme
/// carries everything needed to recreate a context that produces the same future outputs as
/// the one it was taken from.
///
/// ```
/// use qtunnel_cipher_traits::Scheme;
///
/// let s: Scheme = "evhash-96:02cc942de299f4b0d86ffd53:fd2cf893f0cfe670d89183dd:12345"
///     .parse()
///     .unwrap();
/// assert_eq!(s.algorithm, "evhash");
/// assert_eq!(s.variant, Some(96));
/// assert_eq!(s.init_key.len(), 12);
/// assert_eq!(s.state.len(), 12);
/// assert_eq!(s.blocks, 12345);
///
/// let null: Scheme = "null".parse().unwrap();
/// assert_eq!(null.to_string(), "null");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scheme {
    /// Lowercase algorithm name, e.g. `evhash`
    pub algorithm: String,
    /// Optional variant selector, e.g. the field width of `evhash`
    pub variant: Option<u32>,
    pub init_key: Key,
    /// Algorithm specific resumable state
    pub state: Vec<u8>,
    /// Number of blocks the context has processed so far
    pub blocks: u64,
}

impl Scheme {
    /// A scheme naming just an algorithm
    pub fn named(algorithm: &str) -> Self {
        Self {
            algorithm: algorithm.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// `ALGORITHM[-VARIANT]`, the part of the scheme without key material
    pub fn name(&self) -> String {
        match self.variant {
            Some(v) => format!("{}-{}", self.algorithm, v),
            None => self.algorithm.clone(),
        }
    }
}

fn is_algorithm_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl FromStr for Scheme {
    type Err = SchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| SchemeError::new(s, reason);

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() > 4 {
            return Err(err("too many fields"));
        }

        let (algorithm, variant) = match parts[0].split_once('-') {
            Some((name, variant)) => {
                let variant = variant
                    .parse::<u32>()
                    .map_err(|_| err("variant is not a decimal number"))?;
                (name, Some(variant))
            }
            None => (parts[0], None),
        };
        if algorithm.is_empty() || !algorithm.chars().all(is_algorithm_char) {
            return Err(err("malformed algorithm name"));
        }

        let init_key = match parts.get(1) {
            Some(h) => Key::from_hex(h).map_err(|_| err("init key is not valid hex"))?,
            None => Key::empty(),
        };
        let state = match parts.get(2) {
            Some(h) => hex::decode(h).map_err(|_| err("state is not valid hex"))?,
            None => Vec::new(),
        };
        let blocks = match parts.get(3) {
            Some(b) => b
                .parse::<u64>()
                .map_err(|_| err("blocks is not a decimal number"))?,
            None => 0,
        };

        Ok(Self {
            algorithm: algorithm.to_ascii_lowercase(),
            variant,
            init_key,
            state,
            blocks,
        })
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;

        let with_blocks = self.blocks > 0;
        let with_state = with_blocks || !self.state.is_empty();
        let with_key = with_state || !self.init_key.is_empty();

        if with_key {
            write!(f, ":{}", self.init_key.to_hex())?;
        }
        if with_state {
            write!(f, ":{}", hex::encode(&self.state))?;
        }
        if with_blocks {
            write!(f, ":{}", self.blocks)?;
        }
        Ok(())
    }
}
