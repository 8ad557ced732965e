//! Push-notification payload decryption.
//!
//! A much smaller sibling of the message pipeline: push payloads carry a
//! small inline-PGP-armored string and are decrypted with exactly one
//! pre-resolved key.  No key-ring search, no MIME.  Every failure is
//! typed so the notification entry point can fall back to a generic
//! "new message" body instead of crashing or showing ciphertext.

use serde::Deserialize;
use thiserror::Error;

use crate::error::Error as DecryptError;
use crate::key::DecryptionKey;
use crate::keyring::Keyring;
use crate::pgp;

/// Errors produced by the push payload pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PushError {
    /// The supplied key material could not be parsed.
    #[error("push decryption key is unusable")]
    InvalidKey(#[source] DecryptError),

    /// The payload could not be decrypted with the supplied key.
    #[error("push payload decryption failed")]
    DecryptionFailed(#[source] DecryptError),

    /// The decrypted payload is not the expected JSON document.
    #[error("push payload content could not be parsed")]
    InvalidContent(#[from] serde_json::Error),
}

/// Decrypts an armored push payload with a single pre-resolved key.
pub fn decrypt_push_payload(armored: &str, key: &DecryptionKey) -> Result<String, PushError> {
    let secret_key = key
        .private_key
        .to_signed_secret()
        .map_err(PushError::InvalidKey)?;
    let mut keyring = Keyring::new();
    keyring.add(secret_key);

    let msg = pgp::decrypt_armored(armored.as_bytes(), &keyring, &key.passphrase)
        .map_err(PushError::DecryptionFailed)?;
    let content = pgp::message_content(&msg).map_err(PushError::DecryptionFailed)?;
    String::from_utf8(content).map_err(|err| PushError::DecryptionFailed(err.into()))
}

/// Decrypts a push payload and parses the carried JSON content.
pub fn decrypt_push_content(
    armored: &str,
    key: &DecryptionKey,
) -> Result<PushContent, PushError> {
    let decrypted = decrypt_push_payload(armored, key)?;
    Ok(serde_json::from_str(&decrypted)?)
}

/// Decrypted push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PushContent {
    /// Notification data.
    pub data: PushData,
}

/// Notification data carried in a push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PushData {
    /// Message sender.
    pub sender: PushSender,

    /// Notification body.
    pub body: String,

    /// Unread badge count.
    #[serde(default)]
    pub badge: i64,

    /// Identifier of the message the notification is about.
    #[serde(rename = "messageId", default)]
    pub message_id: String,
}

/// Sender of the message a push notification is about.
#[derive(Debug, Clone, Deserialize)]
pub struct PushSender {
    /// Display name; may be empty.
    #[serde(rename = "Name", default)]
    pub name: String,

    /// Sender address.
    #[serde(rename = "Address", default)]
    pub address: String,
}

impl PushSender {
    /// Name to display for the sender: the name when present, otherwise
    /// the address.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.address
        } else {
            &self.name
        }
    }
}
