//! The message record consumed by the decrypter.

/// An encrypted message as handed over by the message store.
///
/// Read-only from the pipeline's perspective; the store owns the record
/// and this crate never writes it back.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    /// Identifier of the address the message was delivered to, used to
    /// select decryption keys.
    pub address_id: String,

    /// Raw body: armored PGP text, or MIME-wrapped PGP for
    /// multipart/mixed messages.
    pub body: String,

    /// Whether the server labelled the message `multipart/mixed`.
    /// The label is not trusted blindly; see the decrypter's fallback.
    pub is_multipart_mixed: bool,

    /// Whether the decrypted body is plain text rather than HTML.
    pub is_plain_text: bool,

    /// Message identifier, used to derive the attachment directory.
    pub message_id: String,
}
