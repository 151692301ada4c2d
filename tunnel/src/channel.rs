//! The channel: encoding and decoding messages with the four contexts of an association.
//!
//! Encoding compresses (payloads above the compression threshold, and every payload that
//! is to be encrypted), encrypts on request and always authenticates. Decoding verifies,
//! decrypts and decompresses, stopping at the first failure.
//!
//! The contexts in the association serve as templates: every message is processed by
//! fresh copies, so a failed call leaves both the association and the message untouched.
//! Key material is only consumed once everything a message needs is available; the keys
//! used to verify a message that then fails authentication are gone.
//!
//! ```
//! use qtunnel::channel::Channel;
//! use qtunnel::keys::KeyBuffer;
//! use qtunnel::msgs::Message;
//! use qtunnel_ciphers::AssociationDefinition;
//!
//! let definition = AssociationDefinition {
//!     authentication_incoming: "evhash-96:616263646162636461626364".to_owned(),
//!     authentication_outgoing: "evhash-96:616263646162636461626364".to_owned(),
//!     encryption_incoming: "xor".to_owned(),
//!     encryption_outgoing: "xor".to_owned(),
//! };
//! let (alice_keys, bob_keys) = KeyBuffer::pair(32, &[0x11; 4096], &[0x22; 4096]);
//! let mut alice = Channel::from_definition(1, &definition, alice_keys).unwrap();
//! let mut bob = Channel::from_definition(1, &definition.mirrored(), bob_keys).unwrap();
//!
//! let mut msg = Message::new(0, b"attack at dawn".to_vec()).with_encryption(true);
//! alice.encode(&mut msg).unwrap();
//! assert_ne!(msg.payload, b"attack at dawn");
//!
//! bob.decode(&mut msg).unwrap();
//! assert_eq!(msg.payload, b"attack at dawn");
//! ```

use std::io::Read;

use qtunnel_ciphers::{Association, AssociationDefinition, Context, ContextError, Slot};
use qtunnel_constant_time::memcmp;
use thiserror::Error;
use zerocopy::AsBytes;

use crate::keys::{KeyError, KeySource};
use crate::msgs::{Header, Message, HEADER_SIZE, PROTOCOL_VERSION};

/// Payloads larger than this are compressed even when not encrypted
pub const COMPRESSION_THRESHOLD: usize = 32 * 1024;

/// Largest payload a channel accepts before compression and after decompression
pub const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

const COMPRESSION_LEVEL: i32 = 3;

/// Why encoding or decoding a message failed.
///
/// A failed call never produces partial output.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Malformed header, length mismatch or otherwise corrupt data
    #[error("malformed message")]
    Message,

    /// Key material at the requested key ids is missing; the call can be retried once the
    /// key source has been refilled.
    #[error("key material not available")]
    Keys,

    /// Tag mismatch: tampering or desynchronized peers. Never retry with the same tag.
    #[error("message authentication failed")]
    Auth,

    /// A crypto context failed internally
    #[error("crypto context failure")]
    Context,
}

impl ChannelError {
    /// Only missing key material is worth a retry
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Keys)
    }

    /// Whether the error indicates a possible active attack
    pub fn is_security_critical(&self) -> bool {
        matches!(self, Self::Auth)
    }
}

impl From<KeyError> for ChannelError {
    fn from(_: KeyError) -> Self {
        Self::Keys
    }
}

impl From<ContextError> for ChannelError {
    fn from(e: ContextError) -> Self {
        log::error!("crypto context failed: {e}");
        Self::Context
    }
}

/// One end of a secure tunnel
#[derive(Debug)]
pub struct Channel<K: KeySource> {
    id: u16,
    association: Association,
    keys: K,
    next_message_id: u32,
    compression_threshold: usize,
}

impl<K: KeySource> Channel<K> {
    /// Authentication contexts must produce tags of a fixed size, so stream ciphers are
    /// rejected there.
    pub fn new(id: u16, association: Association, keys: K) -> Result<Self, ChannelError> {
        for slot in [Slot::AuthenticationIncoming, Slot::AuthenticationOutgoing] {
            if association.context(slot).consumes_key_per_byte() {
                log::error!(
                    "{} cannot be used for authentication",
                    association.context(slot).name()
                );
                return Err(ChannelError::Context);
            }
        }

        Ok(Self {
            id,
            association,
            keys,
            next_message_id: 1,
            compression_threshold: COMPRESSION_THRESHOLD,
        })
    }

    pub fn from_definition(
        id: u16,
        definition: &AssociationDefinition,
        keys: K,
    ) -> Result<Self, ChannelError> {
        let association = Association::new(definition).map_err(|e| {
            log::error!("setting up channel {id} failed: {e}");
            ChannelError::Context
        })?;
        Self::new(id, association, keys)
    }

    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// Id the next encoded message will carry
    pub fn next_message_id(&self) -> u32 {
        self.next_message_id
    }

    pub fn association(&self) -> &Association {
        &self.association
    }

    pub fn association_mut(&mut self) -> &mut Association {
        &mut self.association
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut K {
        &mut self.keys
    }

    /// Tag length of incoming messages, as needed by [`Message::from_wire`]
    pub fn incoming_tag_len(&self) -> usize {
        self.association
            .context(Slot::AuthenticationIncoming)
            .result_size()
    }

    fn fresh(&self, slot: Slot) -> Result<Context, ChannelError> {
        Ok(self.association.context(slot).try_clone()?)
    }

    /// Compresses, encrypts (if the message asks for it) and authenticates `message`.
    ///
    /// On success the header is complete, the payload is replaced by its encoded form and
    /// the tag is attached. On failure `message` is unchanged.
    ///
    /// Key material is only taken once every key the message needs is available, so a
    /// [`ChannelError::Keys`] failure consumes nothing and no key id is skipped. Should a
    /// context fail after that ([`ChannelError::Context`]), the keys already taken are gone.
    pub fn encode(&mut self, message: &mut Message) -> Result<(), ChannelError> {
        if self.id == 0 {
            log::warn!("refusing to encode on channel 0");
            return Err(ChannelError::Message);
        }
        if message.payload.len() > MAX_PAYLOAD {
            return Err(ChannelError::Message);
        }
        let message_id = self.next_message_id;
        let next_message_id = message_id.checked_add(1).ok_or(ChannelError::Message)?;

        let mut auth = self.fresh(Slot::AuthenticationOutgoing)?;
        let mut enc = self.fresh(Slot::EncryptionOutgoing)?;
        let encrypt = message.header.encrypted() && !enc.is_null();

        let mut header = Header::default();
        header.set_command(message.header.command());
        header.set_message_id(message_id);
        header.set_channel_id(self.id);
        header.set_authentic(true);

        let mut payload = match message.payload.len() > self.compression_threshold || encrypt {
            true => {
                header.set_compressed(true);
                compress(&message.payload)?
            }
            false => message.payload.clone(),
        };

        let mut enc_key_len = 0;
        if encrypt {
            enc.add(&payload)?;
            enc_key_len = enc.final_key_size();
        }
        let auth_key_len = auth.final_key_size();
        let tag_len = auth.result_size();

        let length = u32::try_from(HEADER_SIZE + payload.len() + tag_len)
            .map_err(|_| ChannelError::Message)?;

        if !self.keys.outgoing_available(&[enc_key_len, auth_key_len]) {
            log::warn!(
                "channel {}: not enough key material to send message {message_id}",
                self.id
            );
            return Err(ChannelError::Keys);
        }

        if encrypt {
            let (enc_id, key) = self.keys.fetch_outgoing(enc_key_len)?;
            payload = enc.finalize(&key)?;
            header.set_encrypted(true);
            header.set_encryption_key_id(enc_id);
        }

        let (auth_id, key) = self.keys.fetch_outgoing(auth_key_len)?;
        header.set_authentication_key_id(auth_id);
        header.set_length(length);

        auth.add(header.as_bytes())?;
        auth.add(&payload)?;
        let tag = auth.finalize(&key)?;
        if tag.len() != tag_len {
            return Err(ChannelError::Context);
        }

        log::debug!(
            "channel {}: encoded message {message_id} ({} bytes on the wire)",
            self.id,
            length
        );

        message.header = header;
        message.payload = payload;
        message.tag = tag;
        self.next_message_id = next_message_id;
        Ok(())
    }

    /// Verifies, decrypts and decompresses `message`.
    ///
    /// On success the payload holds the original data and the tag is cleared. On failure
    /// `message` is unchanged and must be discarded.
    pub fn decode(&mut self, message: &mut Message) -> Result<(), ChannelError> {
        let header = message.header;
        if header.channel_id() == 0
            || header.channel_id() != self.id
            || header.version() != PROTOCOL_VERSION
            || !header.authentic()
            || !message.is_length_consistent()
        {
            return Err(ChannelError::Message);
        }

        let mut auth = self.fresh(Slot::AuthenticationIncoming)?;
        let mut enc = self.fresh(Slot::EncryptionIncoming)?;
        if header.encrypted() && enc.is_null() {
            log::error!(
                "channel {}: message {} is encrypted but no decryption is configured",
                self.id,
                header.message_id()
            );
            return Err(ChannelError::Context);
        }

        if message.tag.len() != auth.result_size() {
            return self.auth_failed(&header);
        }

        let auth_key_len = auth.final_key_size();
        let mut enc_key_len = 0;
        if header.encrypted() {
            enc.add(&message.payload)?;
            enc_key_len = enc.final_key_size();
        }

        let requests = [
            (header.authentication_key_id(), auth_key_len),
            (header.encryption_key_id(), enc_key_len),
        ];
        if !self.keys.incoming_available(&requests) {
            log::warn!(
                "channel {}: key material for message {} not available",
                self.id,
                header.message_id()
            );
            return Err(ChannelError::Keys);
        }

        let key = self
            .keys
            .fetch_incoming(header.authentication_key_id(), auth_key_len)?;
        auth.add(header.as_bytes())?;
        auth.add(&message.payload)?;
        let expected = auth.finalize(&key)?;
        if !memcmp(&expected, &message.tag) {
            return self.auth_failed(&header);
        }

        let mut payload = match header.encrypted() {
            true => {
                let key = self
                    .keys
                    .fetch_incoming(header.encryption_key_id(), enc_key_len)?;
                enc.finalize(&key)?
            }
            false => message.payload.clone(),
        };

        if header.compressed() {
            payload = decompress(&payload)?;
        }

        log::debug!(
            "channel {}: decoded message {} ({} payload bytes)",
            self.id,
            header.message_id(),
            payload.len()
        );

        message.payload = payload;
        message.tag.clear();
        Ok(())
    }

    fn auth_failed(&self, header: &Header) -> Result<(), ChannelError> {
        log::warn!(
            "channel {}: authentication of message {} failed (authentication key id {}, encryption key id {})",
            self.id,
            header.message_id(),
            header.authentication_key_id(),
            header.encryption_key_id()
        );
        Err(ChannelError::Auth)
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>, ChannelError> {
    zstd::stream::encode_all(data, COMPRESSION_LEVEL).map_err(|e| {
        log::error!("compression failed: {e}");
        ChannelError::Context
    })
}

/// Decompresses at most [`MAX_PAYLOAD`] bytes; anything larger or undecodable is malformed.
fn decompress(data: &[u8]) -> Result<Vec<u8>, ChannelError> {
    let decoder = zstd::stream::read::Decoder::new(data).map_err(|_| ChannelError::Message)?;
    let mut out = Vec::new();
    decoder
        .take(MAX_PAYLOAD as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|_| ChannelError::Message)?;
    match out.len() > MAX_PAYLOAD {
        true => Err(ChannelError::Message),
        false => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyBuffer;

    #[test]
    fn error_classification() {
        assert!(ChannelError::Keys.is_recoverable());
        assert!(!ChannelError::Auth.is_recoverable());
        assert!(ChannelError::Auth.is_security_critical());
        for e in [ChannelError::Message, ChannelError::Keys, ChannelError::Context] {
            assert!(!e.is_security_critical());
        }
    }

    #[test]
    fn compression_round_trip_and_bound() {
        let data = vec![7u8; 100_000];
        let packed = compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(decompress(&packed).unwrap(), data);

        let bomb = compress(&vec![0u8; MAX_PAYLOAD + 1]).unwrap();
        assert_eq!(decompress(&bomb), Err(ChannelError::Message));
        assert_eq!(decompress(b"not zstd"), Err(ChannelError::Message));
    }

    #[test]
    fn stream_ciphers_cannot_authenticate() {
        let definition = AssociationDefinition {
            authentication_outgoing: "xor".to_owned(),
            ..AssociationDefinition::null()
        };
        let association = Association::new(&definition).unwrap();
        assert_eq!(
            Channel::new(1, association, KeyBuffer::new(8)).unwrap_err(),
            ChannelError::Context
        );
    }

    #[test]
    fn failed_encodes_skip_no_key_ids() {
        let definition = AssociationDefinition {
            authentication_outgoing: "evhash-96:616263646162636461626364".to_owned(),
            encryption_outgoing: "xor".to_owned(),
            ..AssociationDefinition::null()
        };
        let mut keys = KeyBuffer::new(64);
        keys.push_outgoing(&[0x42; 64]);
        let mut a = Channel::from_definition(1, &definition, keys).unwrap();

        // encryption and authentication need one quantum each
        let mut msg = Message::new(0, b"two keys".to_vec()).with_encryption(true);
        assert_eq!(a.encode(&mut msg), Err(ChannelError::Keys));
        assert_eq!(a.keys().outgoing_len(), 64);

        a.keys_mut().push_outgoing(&[0x43; 64]);
        a.encode(&mut msg).unwrap();
        assert_eq!(msg.header.encryption_key_id(), 1);
        assert_eq!(msg.header.authentication_key_id(), 2);
        assert_eq!(a.keys().outgoing_len(), 0);
    }

    #[test]
    fn null_association_passes_messages_through() {
        let mut a = Channel::from_definition(3, &AssociationDefinition::null(), KeyBuffer::new(8))
            .unwrap();
        let mut msg = Message::new(9, b"plain".to_vec()).with_encryption(true);
        a.encode(&mut msg).unwrap();
        assert!(!msg.header.encrypted());
        assert!(!msg.header.compressed());
        assert!(msg.tag.is_empty());

        let mut b = Channel::from_definition(3, &AssociationDefinition::null(), KeyBuffer::new(8))
            .unwrap();
        b.decode(&mut msg).unwrap();
        assert_eq!(msg.payload, b"plain");
        assert_eq!(msg.header.command(), 9);
    }
}
