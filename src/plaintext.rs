//! Plaintext-to-HTML post-processing.
//!
//! Decrypted plain-text bodies are rendered by an HTML view, so they are
//! escaped and newline-converted exactly once.  The conversion is not
//! idempotent: escaping already-escaped text double-escapes.

/// HTML-entity-escapes `&`, `<` and `>`.
pub fn encode_html(text: &str) -> String {
    escaper::encode_minimal(text)
}

/// Replaces line breaks with `<br>` tags.
pub fn ln2br(text: &str) -> String {
    text.replace("\r\n", "<br>")
        .replace('\n', "<br>")
        .replace('\r', "<br>")
}

/// Converts a plain-text body to an HTML fragment: entity-escape first,
/// then line breaks.  Call exactly once per body.
pub fn to_html(text: &str) -> String {
    ln2br(&encode_html(text))
}

/// Wraps a plain-text body into a minimal renderable HTML document.
///
/// Used for multipart messages whose root part is `text/plain`.
pub(crate) fn to_html_document(text: &str) -> String {
    format!("<html><body>{}</body></html>", to_html(text))
}
