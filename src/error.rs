//! Error taxonomy of the decryption pipeline.

use thiserror::Error;

/// Errors produced while decrypting a message.
///
/// A value of this type means "the user cannot read this message" and is
/// propagated all the way to the presentation layer.  Recoverable
/// conditions never surface here: a failed MIME decode falls back to
/// inline decryption inside [`crate::decrypt::MessageDecrypter`], and a
/// failed attachment write only drops that one part.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Wrong or missing key, corrupted ciphertext or an unsupported
    /// algorithm.
    #[error("message decryption failed")]
    DecryptionFailed(#[source] pgp::errors::Error),

    /// The decrypted payload could not be decoded as a MIME message.
    #[error("failed to decode decrypted MIME structure")]
    MimeDecodeFailed(#[source] anyhow::Error),

    /// The decrypted message carried no literal data.
    #[error("decrypted message is empty")]
    EmptyMessage,

    /// The decrypted payload is not valid UTF-8 text.
    #[error("decrypted message is not valid UTF-8")]
    InvalidText(#[from] std::string::FromUtf8Error),

    /// Armored key material that could not be parsed.
    #[error("unusable key material")]
    InvalidKey(#[source] pgp::errors::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
