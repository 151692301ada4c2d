//! Configuration readable from a config file.
//!
//! A tunnel configuration names the channel and the four crypto contexts of its
//! association. It is stored as TOML:
//!
//! ```toml
//! channel_id = 7
//! encrypt = true
//!
//! [association]
//! authentication_incoming = "evhash-96:02cc942de299f4b0d86ffd53"
//! authentication_outgoing = "evhash-96:61626364616263646162636a"
//! encryption_incoming = "xor"
//! encryption_outgoing = "xor"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context as _};
use qtunnel_ciphers::{Association, AssociationDefinition, KeyConsumption, Slot};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::channel::{Channel, COMPRESSION_THRESHOLD};
use crate::keys::KeySource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// id of the channel, must not be 0
    pub channel_id: u16,

    /// payloads above this many bytes are compressed even if not encrypted
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,

    /// whether outgoing messages ask for encryption
    #[serde(default)]
    pub encrypt: bool,

    /// scheme strings of the four crypto contexts
    pub association: AssociationDefinition,

    /// path to the file which provided this configuration
    ///
    /// Not read from the TOML, set by [`TunnelConfig::load`].
    #[serde(skip)]
    pub config_file_path: PathBuf,
}

fn default_compression_threshold() -> usize {
    COMPRESSION_THRESHOLD
}

impl TunnelConfig {
    pub fn new(channel_id: u16, association: AssociationDefinition) -> Self {
        Self {
            channel_id,
            compression_threshold: COMPRESSION_THRESHOLD,
            encrypt: false,
            association,
            config_file_path: PathBuf::new(),
        }
    }

    /// load configuration from a TOML file
    ///
    /// NOTE: no validation is conducted, use [`TunnelConfig::validate`] for that.
    pub fn load<P: AsRef<Path>>(p: P) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(&fs::read_to_string(&p)?)?;
        config.config_file_path = p.as_ref().to_owned();
        Ok(config)
    }

    /// Write a config to a file
    pub fn store<P: AsRef<Path>>(&self, p: P) -> anyhow::Result<()> {
        let serialized_config = toml::to_string_pretty(&self)?;
        fs::write(p, serialized_config)?;
        Ok(())
    }

    /// Validate a configuration
    ///
    /// Every scheme has to be instantiable and the authentication contexts have to produce
    /// fixed size tags.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.channel_id != 0, "channel id 0 is reserved");

        let association = Association::new(&self.association)
            .context("the association contains an invalid scheme")?;

        for slot in [Slot::AuthenticationIncoming, Slot::AuthenticationOutgoing] {
            let ctx = association.context(slot);
            ensure!(
                !ctx.consumes_key_per_byte(),
                "{slot:?}: {} cannot be used for authentication",
                ctx.name()
            );
        }

        if self.encrypt && association.context(Slot::EncryptionOutgoing).is_null() {
            log::warn!("encryption is requested but encryption_outgoing is null");
        }

        Ok(())
    }

    /// Key bytes one protocol round needs with this configuration
    pub fn key_consumption(&self) -> anyhow::Result<KeyConsumption> {
        Association::key_consumption(&self.association)
            .context("the association contains an invalid scheme")
    }

    /// Sets up the channel described by this configuration
    pub fn to_channel<K: KeySource>(&self, keys: K) -> anyhow::Result<Channel<K>> {
        self.validate()?;
        let channel = Channel::from_definition(self.channel_id, &self.association, keys)?
            .with_compression_threshold(self.compression_threshold);
        Ok(channel)
    }

    /// An example configuration with freshly drawn evhash-96 init keys and xor encryption
    pub fn example_config() -> Self {
        let mut rng = rand::thread_rng();
        let mut evhash_96 = || {
            let mut key = zeroize::Zeroizing::new([0u8; 12]);
            // all-zero init keys are invalid
            while key.iter().all(|b| *b == 0) {
                rng.fill_bytes(&mut key[..]);
            }
            format!("evhash-96:{}", hex::encode(&key[..]))
        };

        let association = AssociationDefinition {
            authentication_incoming: evhash_96(),
            authentication_outgoing: evhash_96(),
            encryption_incoming: "xor".to_owned(),
            encryption_outgoing: "xor".to_owned(),
        };

        Self {
            encrypt: true,
            ..Self::new(1, association)
        }
    }
}
