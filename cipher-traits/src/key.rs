use std::fmt;

use zeroize::Zeroizing;

/// Key material handed to a crypto context.
///
/// The bytes are wiped from memory when the key is dropped. The [`Debug`] representation
/// only reveals the length of the key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Key(Zeroizing<Vec<u8>>);

impl Key {
    /// The empty key, used by algorithms without an init key
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    /// Parses a key from its hexadecimal representation
    ///
    /// ```
    /// use qtunnel_cipher_traits::Key;
    /// let k = Key::from_hex("00ff10").unwrap();
    /// assert_eq!(k.as_bytes(), &[0x00, 0xff, 0x10]);
    /// assert!(Key::from_hex("0").is_err());
    /// ```
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self::new(hex::decode(s)?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(<{} bytes>)", self.len())
    }
}
