//! OpenPGP engine boundary using [rPGP facilities](https://github.com/rpgp/rpgp).
//!
//! The rest of the crate treats this module as a capability: "decrypt
//! given keys and ciphertext", "which keys produced a valid signature".
//! Packet parsing and the signature math stay inside rPGP.

use std::collections::HashSet;
use std::io::Cursor;

use chrono::{DateTime, Duration, Utc};
use pgp::composed::{Deserializable, Message};
use pgp::types::PublicKeyTrait;

use crate::error::{Error, Result};
use crate::key::{Fingerprint, Passphrase, SignedPublicKey, SignedSecretKey};
use crate::keyring::Keyring;

/// Decrypts an armored message with keys from the private keyring.
///
/// Every key in the ring is a candidate; rPGP tries them against the
/// session-key packets. The returned message is already decompressed so
/// signature checks do not decompress a second time.
pub(crate) fn decrypt_armored(
    ctext: &[u8],
    private_keys: &Keyring<SignedSecretKey>,
    passphrase: &Passphrase,
) -> Result<Message> {
    let cursor = Cursor::new(ctext);
    let (msg, _headers) = Message::from_armor_single(cursor).map_err(Error::DecryptionFailed)?;

    let skeys: Vec<&SignedSecretKey> = private_keys.keys().iter().collect();
    let pw = passphrase.as_str().to_string();

    let (msg, _key_ids) = msg
        .decrypt(move || pw, &skeys[..])
        .map_err(Error::DecryptionFailed)?;
    let msg = msg.decompress().map_err(Error::DecryptionFailed)?;

    Ok(msg)
}

/// Literal content of a decrypted message.
pub(crate) fn message_content(msg: &Message) -> Result<Vec<u8>> {
    msg.get_content()
        .map_err(Error::DecryptionFailed)?
        .ok_or(Error::EmptyMessage)
}

/// Returns fingerprints of all keys from `verification_keys` that have a
/// valid signature on `msg`.
///
/// Keys whose validity window does not cover `verify_time` are not
/// consulted. If the message is unsigned or wrongly signed, the set is
/// empty.
pub(crate) fn valid_signature_fingerprints(
    msg: &Message,
    verification_keys: &Keyring<SignedPublicKey>,
    verify_time: DateTime<Utc>,
) -> HashSet<Fingerprint> {
    let mut fingerprints: HashSet<Fingerprint> = Default::default();
    if let signed_msg @ Message::Signed { .. } = msg {
        for pkey in verification_keys.keys() {
            if !key_valid_at(pkey, verify_time) {
                continue;
            }
            if signed_msg.verify(&pkey.primary_key).is_ok() {
                fingerprints.insert(pkey.fingerprint().into());
            }
        }
    }
    fingerprints
}

/// Whether a public key's validity window covers `at`.
fn key_valid_at(key: &SignedPublicKey, at: DateTime<Utc>) -> bool {
    let created = *key.created_at();
    if at < created {
        return false;
    }
    match key.expiration() {
        Some(days) => at <= created + Duration::days(i64::from(days)),
        None => true,
    }
}

/// Checks whether `input` starts with a PGP armor header, tolerating
/// leading whitespace.
#[allow(clippy::indexing_slicing)]
pub(crate) fn has_pgp_armor(input: &[u8]) -> bool {
    if let Some(index) = input.iter().position(|b| *b > b' ') {
        if input.len() - index > 26 {
            let start = index;
            let end = start + 27;

            return &input[start..end] == b"-----BEGIN PGP MESSAGE-----";
        }
    }

    false
}
