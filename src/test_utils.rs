//! Utilities to help writing tests.
//!
//! Keys are generated fresh per test; ciphertexts are produced with the
//! same rPGP facilities the pipeline decrypts with.

#![allow(clippy::indexing_slicing)]

use std::collections::HashMap;

use pgp::composed::{
    KeyType as PgpKeyType, Message, SecretKeyParamsBuilder, SignedPublicKey, SignedSecretKey,
    SubkeyParamsBuilder,
};
use pgp::crypto::ecc_curve::ECCCurve;
use pgp::crypto::hash::HashAlgorithm;
use pgp::crypto::sym::SymmetricKeyAlgorithm;
use pgp::types::{CompressionAlgorithm, PublicKeyTrait, SecretKeyTrait};
use rand::thread_rng;
use smallvec::smallvec;
use tempfile::TempDir;

use crate::decrypt::MessageDecrypter;
use crate::key::{Key, Passphrase};
use crate::keyring::KeyProvider;
use crate::message::MessageRecord;

/// In-memory key store for tests.
#[derive(Debug, Default)]
pub(crate) struct TestKeyProvider {
    pub(crate) address_keys: HashMap<String, Vec<Key>>,
    pub(crate) account_keys: Vec<Key>,
    pub(crate) passphrase: String,
}

impl TestKeyProvider {
    pub(crate) fn new(passphrase: &str) -> Self {
        TestKeyProvider {
            passphrase: passphrase.to_string(),
            ..Default::default()
        }
    }
}

impl KeyProvider for TestKeyProvider {
    fn address_keys(&self, address_id: &str) -> Vec<Key> {
        self.address_keys
            .get(address_id)
            .cloned()
            .unwrap_or_default()
    }

    fn account_keys(&self) -> Vec<Key> {
        self.account_keys.clone()
    }

    fn mailbox_passphrase(&self) -> Passphrase {
        Passphrase::new(self.passphrase.clone())
    }
}

/// A ready-to-use decrypter over a fresh keypair and a temporary
/// attachment directory.
pub(crate) struct TestDecrypter {
    pub(crate) decrypter: MessageDecrypter<TestKeyProvider>,
    pub(crate) secret: SignedSecretKey,
    pub(crate) public: SignedPublicKey,
    _attachment_dir: TempDir,
}

impl TestDecrypter {
    /// Keypair registered for address `addr-1`.
    pub(crate) fn new() -> Self {
        let secret = gen_secret_key("alice@example.org");
        let mut provider = TestKeyProvider::new("");
        provider.address_keys.insert(
            "addr-1".to_string(),
            vec![Key::new("key-1", armored_secret(&secret))],
        );
        Self::build(secret, provider)
    }

    /// Keypair registered as an account key only; no address keys exist.
    pub(crate) fn with_account_key_only() -> Self {
        let secret = gen_secret_key("alice@example.org");
        let mut provider = TestKeyProvider::new("");
        provider.account_keys = vec![Key::new("account-key", armored_secret(&secret))];
        Self::build(secret, provider)
    }

    /// A provider that knows no keys at all.
    pub(crate) fn without_keys() -> Self {
        let secret = gen_secret_key("alice@example.org");
        Self::build(secret, TestKeyProvider::new(""))
    }

    fn build(secret: SignedSecretKey, provider: TestKeyProvider) -> Self {
        let attachment_dir = tempfile::tempdir().expect("failed to create tempdir");
        let public = split_public_key(&secret);
        TestDecrypter {
            decrypter: MessageDecrypter::new(provider, attachment_dir.path()),
            secret,
            public,
            _attachment_dir: attachment_dir,
        }
    }

    /// A message record addressed to `addr-1` with the given body.
    pub(crate) fn message(&self, body: &str) -> MessageRecord {
        MessageRecord {
            address_id: "addr-1".to_string(),
            body: body.to_string(),
            is_multipart_mixed: false,
            is_plain_text: false,
            message_id: "msg-1".to_string(),
        }
    }
}

/// Generates a fresh signing key with an encryption subkey.
pub(crate) fn gen_secret_key(addr: &str) -> SignedSecretKey {
    let user_id = format!("<{addr}>");
    let key_params = SecretKeyParamsBuilder::default()
        .key_type(PgpKeyType::EdDSALegacy)
        .can_certify(true)
        .can_sign(true)
        .primary_user_id(user_id)
        .passphrase(None)
        .preferred_symmetric_algorithms(smallvec![
            SymmetricKeyAlgorithm::AES256,
            SymmetricKeyAlgorithm::AES192,
            SymmetricKeyAlgorithm::AES128,
        ])
        .preferred_hash_algorithms(smallvec![
            HashAlgorithm::SHA2_256,
            HashAlgorithm::SHA2_384,
            HashAlgorithm::SHA2_512,
        ])
        .preferred_compression_algorithms(smallvec![
            CompressionAlgorithm::ZLIB,
            CompressionAlgorithm::ZIP,
        ])
        .subkey(
            SubkeyParamsBuilder::default()
                .key_type(PgpKeyType::ECDH(ECCCurve::Curve25519))
                .can_encrypt(true)
                .passphrase(None)
                .build()
                .expect("failed to build subkey parameters"),
        )
        .build()
        .expect("failed to build key parameters");

    let mut rng = thread_rng();
    let secret_key = key_params
        .generate(&mut rng)
        .expect("failed to generate the key")
        .sign(&mut rng, || "".into())
        .expect("failed to sign secret key");
    secret_key.verify().expect("invalid secret key generated");
    secret_key
}

/// Public counterpart of a generated secret key.
pub(crate) fn split_public_key(secret: &SignedSecretKey) -> SignedPublicKey {
    let unsigned_pubkey = SecretKeyTrait::public_key(secret);
    let mut rng = thread_rng();
    unsigned_pubkey
        .sign(&mut rng, secret, || "".into())
        .expect("failed to sign public key")
}

/// Armors a secret key the way the key store hands keys out.
pub(crate) fn armored_secret(secret: &SignedSecretKey) -> String {
    secret
        .to_armored_string(Default::default())
        .expect("failed to armor key")
}

/// Encrypts `plain` to the encryption subkey of `to`, optionally signing
/// with `sign_with`.
pub(crate) fn encrypt_armored(
    plain: &[u8],
    to: &SignedPublicKey,
    sign_with: Option<&SignedSecretKey>,
) -> String {
    let mut rng = thread_rng();
    let lit_msg = Message::new_literal_bytes("", plain);
    let msg = match sign_with {
        Some(secret_key) => lit_msg
            .sign(&mut rng, secret_key, || "".into(), HashAlgorithm::SHA2_256)
            .expect("failed to sign message"),
        None => lit_msg,
    };

    let subkey = to
        .public_subkeys
        .iter()
        .find(|subkey| subkey.is_encryption_key())
        .expect("generated key has no encryption subkey");
    msg.encrypt_to_keys_seipdv1(&mut rng, SymmetricKeyAlgorithm::AES128, &[subkey])
        .expect("failed to encrypt message")
        .to_armored_string(Default::default())
        .expect("failed to armor message")
}

/// A small multipart/mixed document: an HTML body referencing one inline
/// image, plus one named attachment.
pub(crate) fn sample_mime_document() -> String {
    [
        "Content-Type: multipart/mixed; boundary=\"frontier\"",
        "",
        "--frontier",
        "Content-Type: text/html; charset=utf-8",
        "",
        "<html><body>Hi!<img src=\"cid:logo123\"></body></html>",
        "--frontier",
        "Content-Type: image/jpeg",
        "Content-ID: <logo123>",
        "Content-Transfer-Encoding: base64",
        "",
        "Zm9v",
        "--frontier",
        "Content-Type: application/pdf; name=\"report.pdf\"",
        "Content-Disposition: attachment; filename=\"report.pdf\"",
        "Content-Transfer-Encoding: base64",
        "",
        "aGVsbG8=",
        "--frontier--",
        "",
    ]
    .join("\r\n")
}
