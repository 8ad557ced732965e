//! Cryptographic key types.

use std::fmt;

use pgp::composed::Deserializable;

use crate::error::{Error, Result};

// Re-export rPGP key types; callers build verification keyrings from these.
pub use pgp::composed::{SignedPublicKey, SignedSecretKey};

/// An armored private key as handed out by the key store.
///
/// The blob is kept armored until a decryption call actually needs it;
/// parsing happens per call because keys may be rotated between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Key identifier assigned by the key store.
    pub id: String,

    /// ASCII-armored private key block.
    pub private_key: String,
}

impl Key {
    /// Creates a key from an identifier and an armored private-key blob.
    pub fn new(id: impl Into<String>, private_key: impl Into<String>) -> Self {
        Key {
            id: id.into(),
            private_key: private_key.into(),
        }
    }

    /// Parses the armored blob into an rPGP secret key.
    pub fn to_signed_secret(&self) -> Result<SignedSecretKey> {
        let (key, _headers) =
            SignedSecretKey::from_string(&self.private_key).map_err(Error::InvalidKey)?;
        Ok(key)
    }
}

/// The mailbox passphrase unlocking the account's private keys.
///
/// `Debug` is redacted so the passphrase never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wraps a passphrase string.
    pub fn new(value: impl Into<String>) -> Self {
        Passphrase(value.into())
    }

    /// The raw passphrase value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase(redacted)")
    }
}

/// One private key paired with the passphrase unlocking it.
///
/// This is the unit handed to the engine for a decrypt attempt; the push
/// pipeline uses exactly one of these.
#[derive(Debug, Clone)]
pub struct DecryptionKey {
    /// The armored private key.
    pub private_key: Key,

    /// Passphrase for the private key.
    pub passphrase: Passphrase,
}

impl DecryptionKey {
    /// Pairs a key with its passphrase.
    pub fn new(private_key: Key, passphrase: Passphrase) -> Self {
        DecryptionKey {
            private_key,
            passphrase,
        }
    }
}

/// A key fingerprint.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    /// Fingerprint as an uppercase hex string without separators.
    pub fn hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

impl From<pgp::types::Fingerprint> for Fingerprint {
    fn from(fingerprint: pgp::types::Fingerprint) -> Fingerprint {
        Fingerprint(fingerprint.as_bytes().to_vec())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.hex())
    }
}
