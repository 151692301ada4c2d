//! Key material for the channel.
//!
//! Keys are handed out in quanta of a fixed size and addressed by the id of their first
//! quantum. The sender draws outgoing keys in order and names their ids in the message
//! header; the receiver asks for exactly those ids. Ids start at 1, id 0 stands for "no key".

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use qtunnel_ciphers::Key;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    /// The key source has not delivered enough material yet
    #[error("not enough key material: {needed} bytes needed, {available} available")]
    Exhausted { needed: usize, available: usize },

    /// The key id has already been used or was never delivered
    #[error("unknown key id {0}")]
    Unknown(u32),
}

/// Source of the key bytes consumed by a channel.
///
/// Keys are one-time: every byte handed out by `fetch_*` is gone from the source afterwards.
pub trait KeySource {
    /// Takes `len` bytes of outgoing key material; returns the id of the first key used.
    ///
    /// `len == 0` returns id 0 and an empty key without consuming anything.
    fn fetch_outgoing(&mut self, len: usize) -> Result<(u32, Key), KeyError>;

    /// Takes `len` bytes of incoming key material starting at `key_id`
    fn fetch_incoming(&mut self, key_id: u32, len: usize) -> Result<Key, KeyError>;

    /// Whether consecutive `fetch_outgoing` calls for every length in `lens` would succeed
    fn outgoing_available(&self, lens: &[usize]) -> bool;

    /// Whether `fetch_incoming` calls for all `(key_id, len)` requests would succeed
    fn incoming_available(&self, requests: &[(u32, usize)]) -> bool;
}

/// Key quanta of one direction, in id order
#[derive(Default)]
struct KeyQuanta {
    keys: BTreeMap<u32, Key>,
    /// Bytes not yet filling a whole quantum
    pending: Zeroizing<Vec<u8>>,
    next_id: u32,
}

impl KeyQuanta {
    fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    fn push(&mut self, quantum: usize, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        let full = self.pending.len() / quantum * quantum;
        for chunk in self.pending[..full].chunks_exact(quantum) {
            self.keys.insert(self.next_id, Key::from_slice(chunk));
            self.next_id = self.next_id.wrapping_add(1).max(1);
        }
        let rest = Zeroizing::new(self.pending[full..].to_vec());
        self.pending = rest;
    }

    fn ids_for(quantum: usize, first: u32, len: usize) -> impl Iterator<Item = u32> {
        let count = len.div_ceil(quantum) as u32;
        (0..count).map(move |i| first.wrapping_add(i))
    }

    fn take(&mut self, quantum: usize, first: u32, len: usize) -> Result<Key, KeyError> {
        for id in Self::ids_for(quantum, first, len) {
            if !self.keys.contains_key(&id) {
                return Err(self.missing(quantum, id, len));
            }
        }

        let mut out = Zeroizing::new(Vec::with_capacity(len.div_ceil(quantum) * quantum));
        for id in Self::ids_for(quantum, first, len) {
            if let Some(key) = self.keys.remove(&id) {
                out.extend_from_slice(key.as_bytes());
            }
        }
        out.truncate(len);
        Ok(Key::from_slice(&out))
    }

    /// Ids above everything delivered so far may still arrive; lower ones are gone.
    fn missing(&self, quantum: usize, id: u32, len: usize) -> KeyError {
        match self.keys.keys().next_back() {
            Some(last) if id <= *last => KeyError::Unknown(id),
            _ if id < self.next_id => KeyError::Unknown(id),
            _ => KeyError::Exhausted {
                needed: len,
                available: self.keys.len() * quantum,
            },
        }
    }
}

/// In-memory [`KeySource`] holding separate outgoing and incoming key material.
///
/// ```
/// use qtunnel::keys::{KeyBuffer, KeySource};
///
/// let (mut alice, mut bob) = KeyBuffer::pair(4, &[1u8; 64], &[2u8; 64]);
///
/// let (id, key) = alice.fetch_outgoing(6).unwrap();
/// assert_eq!(id, 1);
/// assert_eq!(bob.fetch_incoming(id, 6).unwrap(), key);
///
/// // the rest of the second quantum is gone as well
/// assert_eq!(alice.fetch_outgoing(4).unwrap().0, 3);
/// ```
pub struct KeyBuffer {
    quantum: usize,
    outgoing: KeyQuanta,
    incoming: KeyQuanta,
}

impl KeyBuffer {
    /// # Panics
    /// If `quantum` is zero.
    pub fn new(quantum: usize) -> Self {
        assert!(quantum > 0, "key quantum must not be empty");
        Self {
            quantum,
            outgoing: KeyQuanta::new(),
            incoming: KeyQuanta::new(),
        }
    }

    /// Two buffers sharing key material the way two peers do: what one sends with, the
    /// other receives with.
    pub fn pair(quantum: usize, a_to_b: &[u8], b_to_a: &[u8]) -> (Self, Self) {
        let (mut a, mut b) = (Self::new(quantum), Self::new(quantum));
        a.push_outgoing(a_to_b);
        b.push_incoming(a_to_b);
        b.push_outgoing(b_to_a);
        a.push_incoming(b_to_a);
        (a, b)
    }

    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Appends outgoing key material; ids continue after the last delivered quantum.
    pub fn push_outgoing(&mut self, bytes: &[u8]) {
        self.outgoing.push(self.quantum, bytes);
    }

    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.push(self.quantum, bytes);
    }

    /// Outgoing bytes available in whole quanta
    pub fn outgoing_len(&self) -> usize {
        self.outgoing.keys.len() * self.quantum
    }

    pub fn incoming_len(&self) -> usize {
        self.incoming.keys.len() * self.quantum
    }
}

impl fmt::Debug for KeyBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBuffer")
            .field("quantum", &self.quantum)
            .field("outgoing_len", &self.outgoing_len())
            .field("incoming_len", &self.incoming_len())
            .finish_non_exhaustive()
    }
}

impl KeySource for KeyBuffer {
    fn fetch_outgoing(&mut self, len: usize) -> Result<(u32, Key), KeyError> {
        if len == 0 {
            return Ok((0, Key::empty()));
        }
        let first = match self.outgoing.keys.keys().next() {
            Some(id) => *id,
            None => {
                return Err(KeyError::Exhausted {
                    needed: len,
                    available: 0,
                })
            }
        };
        let key = self.outgoing.take(self.quantum, first, len)?;
        Ok((first, key))
    }

    fn fetch_incoming(&mut self, key_id: u32, len: usize) -> Result<Key, KeyError> {
        if len == 0 {
            return Ok(Key::empty());
        }
        self.incoming.take(self.quantum, key_id, len)
    }

    fn outgoing_available(&self, lens: &[usize]) -> bool {
        let needed: usize = lens.iter().map(|len| len.div_ceil(self.quantum)).sum();
        // outgoing keys are handed out front to back, so they are consecutive
        needed <= self.outgoing.keys.len()
    }

    fn incoming_available(&self, requests: &[(u32, usize)]) -> bool {
        let mut seen = HashSet::new();
        requests
            .iter()
            .filter(|(_, len)| *len > 0)
            .flat_map(|(id, len)| KeyQuanta::ids_for(self.quantum, *id, *len))
            .all(|id| self.incoming.keys.contains_key(&id) && seen.insert(id))
    }
}
