//! The four crypto contexts backing one channel.

use std::fmt;
use std::io::{Read, Write};

use anyhow::Context as _;
use qtunnel_util::length_prefix_encoding::{decoder::LengthPrefixDecoder, encoder::LengthPrefixEncoder};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::context::Context;
use crate::engine::{self, EngineError};

/// Upper bound for one stored scheme; the longest scheme (evhash-256 with state and a
/// 20 digit block count) is well below.
const MAX_STORED_SCHEME: usize = 1024;

/// Scheme strings of the four contexts of an [`Association`]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDefinition {
    pub authentication_incoming: String,
    pub authentication_outgoing: String,
    pub encryption_incoming: String,
    pub encryption_outgoing: String,
}

impl AssociationDefinition {
    /// No authentication and no encryption
    pub fn null() -> Self {
        Self {
            authentication_incoming: "null".to_owned(),
            authentication_outgoing: "null".to_owned(),
            encryption_incoming: "null".to_owned(),
            encryption_outgoing: "null".to_owned(),
        }
    }

    /// The definition as seen by the peer: incoming and outgoing swap places.
    pub fn mirrored(&self) -> Self {
        Self {
            authentication_incoming: self.authentication_outgoing.clone(),
            authentication_outgoing: self.authentication_incoming.clone(),
            encryption_incoming: self.encryption_outgoing.clone(),
            encryption_outgoing: self.encryption_incoming.clone(),
        }
    }

    pub fn get(&self, slot: Slot) -> &str {
        match slot {
            Slot::AuthenticationIncoming => &self.authentication_incoming,
            Slot::AuthenticationOutgoing => &self.authentication_outgoing,
            Slot::EncryptionIncoming => &self.encryption_incoming,
            Slot::EncryptionOutgoing => &self.encryption_outgoing,
        }
    }
}

impl Default for AssociationDefinition {
    fn default() -> Self {
        Self::null()
    }
}

/// Shows algorithm names only; the init keys stay out of logs.
impl fmt::Debug for AssociationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |s: &str| s.split(':').next().unwrap_or_default().to_owned();
        f.debug_struct("AssociationDefinition")
            .field("authentication_incoming", &name(&self.authentication_incoming))
            .field("authentication_outgoing", &name(&self.authentication_outgoing))
            .field("encryption_incoming", &name(&self.encryption_incoming))
            .field("encryption_outgoing", &name(&self.encryption_outgoing))
            .finish()
    }
}

/// Position of a context inside an [`Association`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    AuthenticationIncoming,
    AuthenticationOutgoing,
    EncryptionIncoming,
    EncryptionOutgoing,
}

impl Slot {
    pub const ALL: [Slot; 4] = [
        Slot::AuthenticationIncoming,
        Slot::AuthenticationOutgoing,
        Slot::EncryptionIncoming,
        Slot::EncryptionOutgoing,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Key bytes needed for one protocol round: one authenticated, encrypted message in each
/// direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyConsumption {
    /// Fixed number of bytes per incoming message
    pub incoming: usize,
    /// Fixed number of bytes per outgoing message
    pub outgoing: usize,
    /// Incoming contexts consuming one key byte per payload byte
    pub incoming_per_byte: usize,
    /// Outgoing contexts consuming one key byte per payload byte
    pub outgoing_per_byte: usize,
}

impl KeyConsumption {
    /// Total key bytes for one round carrying `payload_len` bytes in each direction
    pub fn bytes_for(&self, payload_len: usize) -> usize {
        self.incoming
            + self.outgoing
            + (self.incoming_per_byte + self.outgoing_per_byte) * payload_len
    }

    fn account(ctx: &Context) -> (usize, usize) {
        let init = match ctx.reuses_init_key() {
            true => 0,
            false => ctx.init_key_size(),
        };
        match ctx.consumes_key_per_byte() {
            true => (init, 1),
            false => (init + ctx.final_key_size(), 0),
        }
    }
}

/// Four independently owned contexts: authentication and encryption, each incoming and
/// outgoing.
#[derive(Debug)]
pub struct Association {
    contexts: [Context; 4],
}

impl Association {
    pub fn new(definition: &AssociationDefinition) -> Result<Self, EngineError> {
        let create = |slot: Slot| engine::create(definition.get(slot));
        Ok(Self {
            contexts: [
                create(Slot::AuthenticationIncoming)?,
                create(Slot::AuthenticationOutgoing)?,
                create(Slot::EncryptionIncoming)?,
                create(Slot::EncryptionOutgoing)?,
            ],
        })
    }

    pub fn context(&self, slot: Slot) -> &Context {
        &self.contexts[slot.index()]
    }

    pub fn context_mut(&mut self, slot: Slot) -> &mut Context {
        &mut self.contexts[slot.index()]
    }

    /// Puts `ctx` into `slot`, returning the previous context
    pub fn replace(&mut self, slot: Slot, ctx: Context) -> Context {
        std::mem::replace(&mut self.contexts[slot.index()], ctx)
    }

    /// The current schemes of all four contexts, state included
    pub fn definition(&self) -> AssociationDefinition {
        let scheme = |slot: Slot| self.context(slot).scheme().to_string();
        AssociationDefinition {
            authentication_incoming: scheme(Slot::AuthenticationIncoming),
            authentication_outgoing: scheme(Slot::AuthenticationOutgoing),
            encryption_incoming: scheme(Slot::EncryptionIncoming),
            encryption_outgoing: scheme(Slot::EncryptionOutgoing),
        }
    }

    /// Key bytes one protocol round needs under `definition`
    pub fn key_consumption(definition: &AssociationDefinition) -> Result<KeyConsumption, EngineError> {
        let association = Self::new(definition)?;
        let mut kc = KeyConsumption::default();
        for slot in Slot::ALL {
            let (fixed, per_byte) = KeyConsumption::account(association.context(slot));
            match slot {
                Slot::AuthenticationIncoming | Slot::EncryptionIncoming => {
                    kc.incoming += fixed;
                    kc.incoming_per_byte += per_byte;
                }
                Slot::AuthenticationOutgoing | Slot::EncryptionOutgoing => {
                    kc.outgoing += fixed;
                    kc.outgoing_per_byte += per_byte;
                }
            }
        }
        Ok(kc)
    }

    /// Writes the schemes of all four contexts as length-prefixed records
    pub fn store<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        for slot in Slot::ALL {
            let scheme = Zeroizing::new(self.context(slot).scheme().to_string());
            LengthPrefixEncoder::from_message(scheme.as_bytes())
                .write_all_to_stdio(&mut w)
                .with_context(|| format!("writing the {slot:?} context"))?;
        }
        Ok(())
    }

    /// Restores an association written by [`Association::store`]
    pub fn load<R: Read>(mut r: R) -> anyhow::Result<Self> {
        let mut read = |slot: Slot| -> anyhow::Result<Context> {
            let mut decoder = LengthPrefixDecoder::new(vec![0u8; MAX_STORED_SCHEME]);
            let ctx = decoder
                .read_all_from_stdio(&mut r)
                .with_context(|| format!("reading the {slot:?} context"))
                .and_then(|record| {
                    let scheme = std::str::from_utf8(record).context("stored scheme is not UTF-8")?;
                    engine::create(scheme).with_context(|| format!("restoring the {slot:?} context"))
                });
            decoder.clear();
            ctx
        };

        Ok(Self {
            contexts: [
                read(Slot::AuthenticationIncoming)?,
                read(Slot::AuthenticationOutgoing)?,
                read(Slot::EncryptionIncoming)?,
                read(Slot::EncryptionOutgoing)?,
            ],
        })
    }
}
