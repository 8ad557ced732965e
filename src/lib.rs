//! # mailcrypt
//!
//! Decryption and signature-verification pipeline for encrypted mail.
//!
//! The crate takes an encrypted, possibly multi-part message (PGP/MIME or
//! inline-PGP), selects candidate decryption keys from an injected key
//! provider, decrypts the body, optionally verifies sender signatures and
//! produces a renderable HTML body plus any extracted attachments.
//!
//! The [`decrypt::MessageDecrypter`] is the entry point for messages;
//! [`push::decrypt_push_payload`] is the simplified sibling for push
//! notification payloads.  OpenPGP packet handling is delegated to rPGP
//! and MIME decoding to mailparse; this crate owns the orchestration,
//! the trial logic and the data shaping around them.
//!
//! All operations are synchronous and CPU-bound.  Callers dispatch them
//! onto a background execution context; independent calls are safe to
//! run concurrently without coordination.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    clippy::all,
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::needless_borrow,
    clippy::cast_lossless,
    clippy::unused_async
)]

pub mod decrypt;
pub mod error;
pub mod key;
pub mod keyring;
pub mod message;
pub mod mimeparser;
mod pgp;
pub mod plaintext;
pub mod push;

#[cfg(test)]
mod test_utils;

pub use crate::decrypt::{DecryptionOutput, MessageDecrypter, SignatureVerificationResult};
pub use crate::error::{Error, Result};
pub use crate::message::MessageRecord;
pub use crate::mimeparser::MimeAttachment;
