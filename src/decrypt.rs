//! Message decryption and signature verification.
//!
//! [`MessageDecrypter`] is the single entry point of the pipeline: it
//! resolves decryption keys, picks the PGP/MIME or the inline-armored
//! path, invokes the engine, and shapes the decrypted content for
//! rendering.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::Result;
use crate::key::{Fingerprint, Key, Passphrase, SignedPublicKey, SignedSecretKey};
use crate::keyring::{resolve_address_keys, KeyProvider, Keyring};
use crate::message::MessageRecord;
use crate::mimeparser::{MimeAttachment, MimeMessageData, MimePostProcessor};
use crate::pgp;
use crate::plaintext;

/// Outcome of checking sender signatures during decryption.
///
/// "Nobody asked to verify" and "verification failed" are distinct
/// outcomes and must never be conflated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureVerificationResult {
    /// At least one supplied verification key validated the signature.
    Verified,

    /// No verdict has been recorded for this message yet.  The decrypter
    /// never returns this; it is the initial state for callers that
    /// persist verdicts per message.
    #[default]
    NotVerified,

    /// No verification keys were supplied, so no check was attempted.
    VerificationSkipped,

    /// Verification keys were supplied but the signature did not
    /// validate, does not exist, or validation itself errored.
    Failure,
}

/// Decrypted body plus any attachments extracted on the way.
///
/// `attachments` is populated only when decryption takes the MIME path;
/// it is `None` for inline-armored messages, whose attachments arrive
/// through a separate channel.
#[derive(Debug)]
pub struct DecryptionOutput {
    /// Renderable body text.
    pub body: String,

    /// Attachments extracted from the decrypted MIME structure.
    pub attachments: Option<Vec<MimeAttachment>>,
}

/// Decrypts messages with keys obtained from an injected [`KeyProvider`].
///
/// The decrypter is stateless between calls and safe to use for
/// concurrent decryptions of different messages.  Calls are synchronous
/// and CPU-bound; dispatching them off the UI thread is the caller's
/// concern.
#[derive(Debug)]
pub struct MessageDecrypter<P> {
    keys: P,
    mime: MimePostProcessor,
}

impl<P: KeyProvider> MessageDecrypter<P> {
    /// Creates a decrypter.
    ///
    /// `attachment_dir` is the root under which per-message attachment
    /// directories are created during MIME post-processing.
    pub fn new(keys: P, attachment_dir: impl Into<PathBuf>) -> Self {
        MessageDecrypter {
            keys,
            mime: MimePostProcessor::new(attachment_dir),
        }
    }

    /// Decrypts a message without checking sender signatures.
    pub fn decrypt(&self, message: &MessageRecord) -> Result<DecryptionOutput> {
        let (output, _verification) = self.decrypt_and_verify(message, &Keyring::new())?;
        Ok(output)
    }

    /// Decrypts a message and verifies its sender signature against
    /// `verification_keys`.
    ///
    /// With no resolvable decryption keys the original ciphertext body is
    /// returned unmodified together with
    /// [`SignatureVerificationResult::Failure`]; an address without keys
    /// is an expected state, not an error.  Actual decryption failures
    /// propagate as [`crate::error::Error::DecryptionFailed`].
    pub fn decrypt_and_verify(
        &self,
        message: &MessageRecord,
        verification_keys: &Keyring<SignedPublicKey>,
    ) -> Result<(DecryptionOutput, SignatureVerificationResult)> {
        let address_keys = resolve_address_keys(&self.keys, &message.address_id);
        if address_keys.is_empty() {
            info!("No keys available for address {:?}.", message.address_id);
            let output = DecryptionOutput {
                body: message.body.clone(),
                attachments: None,
            };
            return Ok((output, SignatureVerificationResult::Failure));
        }

        let passphrase = self.keys.mailbox_passphrase();
        let decryption_keys = parse_decryption_keys(&address_keys);
        // Wall-clock time, taken once per call; key validity windows are
        // checked against it.
        let verify_time = Utc::now();

        if message.is_multipart_mixed {
            match self.decrypt_mime(
                message,
                &decryption_keys,
                &passphrase,
                verification_keys,
                verify_time,
            ) {
                Ok(result) => return Ok(result),
                Err(err) => {
                    // Some servers label single-part inline-PGP messages
                    // as multipart/mixed; retry below on the inline path.
                    warn!(
                        "MIME decryption of message {:?} failed, retrying as inline PGP: {:#}.",
                        message.message_id, err
                    );
                }
            }
        }

        if !pgp::has_pgp_armor(message.body.as_bytes()) {
            warn!(
                "Body of message {:?} does not start with a PGP armor header.",
                message.message_id
            );
        }

        let msg = pgp::decrypt_armored(message.body.as_bytes(), &decryption_keys, &passphrase)?;
        let verification = if verification_keys.is_empty() {
            SignatureVerificationResult::VerificationSkipped
        } else {
            verdict(&pgp::valid_signature_fingerprints(
                &msg,
                verification_keys,
                verify_time,
            ))
        };

        let text = String::from_utf8(pgp::message_content(&msg)?)?;
        let body = if message.is_plain_text {
            plaintext::to_html(&text)
        } else {
            text
        };

        let output = DecryptionOutput {
            body,
            attachments: None,
        };
        Ok((output, verification))
    }

    /// PGP/MIME path: decrypt, decode the multipart structure and run the
    /// MIME post-processor.
    ///
    /// Any error here is recoverable; the caller falls back to inline
    /// decryption.
    fn decrypt_mime(
        &self,
        message: &MessageRecord,
        decryption_keys: &Keyring<SignedSecretKey>,
        passphrase: &Passphrase,
        verification_keys: &Keyring<SignedPublicKey>,
        verify_time: DateTime<Utc>,
    ) -> Result<(DecryptionOutput, SignatureVerificationResult)> {
        let msg = pgp::decrypt_armored(message.body.as_bytes(), decryption_keys, passphrase)?;
        let verification = if verification_keys.is_empty() {
            SignatureVerificationResult::VerificationSkipped
        } else {
            verdict(&pgp::valid_signature_fingerprints(
                &msg,
                verification_keys,
                verify_time,
            ))
        };

        let raw = pgp::message_content(&msg)?;
        let data = MimeMessageData::from_bytes(&raw)?;
        info!(
            "Decrypted MIME message {:?} with {} non-body parts.",
            message.message_id,
            data.parts.len()
        );

        let (body, attachments) = self.mime.process(data, &message.message_id);
        let output = DecryptionOutput {
            body,
            attachments: Some(attachments),
        };
        Ok((output, verification))
    }
}

fn verdict(signatures: &HashSet<Fingerprint>) -> SignatureVerificationResult {
    if signatures.is_empty() {
        SignatureVerificationResult::Failure
    } else {
        SignatureVerificationResult::Verified
    }
}

/// Parses armored address keys into engine keys.
///
/// A key that fails to parse is skipped so the remaining candidates still
/// get their trial; rPGP reports a missing key if none fits.
fn parse_decryption_keys(address_keys: &[Key]) -> Keyring<SignedSecretKey> {
    let mut ring = Keyring::new();
    for key in address_keys {
        match key.to_signed_secret() {
            Ok(secret_key) => ring.add(secret_key),
            Err(err) => warn!("Skipping unusable key {:?}: {}.", key.id, err),
        }
    }
    ring
}
