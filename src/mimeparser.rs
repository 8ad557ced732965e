//! # Decoded-MIME handling.
//!
//! After the engine has decrypted a PGP/MIME message, the payload is a
//! complete MIME document.  This module decodes it into a flat part list,
//! rewrites inline `cid:` references into self-contained data URIs, and
//! extracts named parts into the per-message attachment directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use mime::Mime;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::error::{Error, Result};
use crate::plaintext;

/// A decoded MIME message: the renderable body plus its non-body parts.
#[derive(Debug)]
pub(crate) struct MimeMessageData {
    /// Body of the part selected for rendering.
    pub body: String,

    /// Content type of the body part, e.g. `text/html`.
    pub mime_type: String,

    /// All remaining leaf parts, in MIME order.
    pub parts: Vec<MimePart>,
}

/// One non-body leaf part of a decoded MIME message.
#[derive(Debug)]
pub(crate) struct MimePart {
    /// `Content-ID` header value, present for inline parts referenced
    /// from the body via `cid:`.
    pub content_id: Option<String>,

    /// Declared content type.
    pub mime_type: String,

    /// Content-disposition label, e.g. `attachment` or `inline`.
    pub disposition: String,

    /// Filename from the disposition or content-type parameters.
    pub filename: Option<String>,

    /// Raw bytes, already decoded per the declared transfer encoding.
    pub data: Vec<u8>,
}

impl MimeMessageData {
    /// Decodes a decrypted payload into body and parts.
    ///
    /// The body is the first `text/html` leaf, falling back to the first
    /// `text/plain` leaf. A payload without any MIME headers is rejected:
    /// that is the signature of a message mislabelled as multipart, and
    /// the caller falls back to inline decryption.
    pub(crate) fn from_bytes(raw: &[u8]) -> Result<MimeMessageData> {
        let mail =
            mailparse::parse_mail(raw).map_err(|err| Error::MimeDecodeFailed(err.into()))?;
        if mail.headers.is_empty() {
            return Err(Error::MimeDecodeFailed(anyhow::anyhow!(
                "decrypted payload carries no MIME headers"
            )));
        }

        let mut leaves = Vec::new();
        collect_leaf_parts(&mail, &mut leaves);

        let body_index = position_of_type(&leaves, &mime::TEXT_HTML)
            .or_else(|| position_of_type(&leaves, &mime::TEXT_PLAIN));
        let (body, mime_type) = match body_index.and_then(|index| leaves.get(index)) {
            Some(part) => {
                let body = part
                    .get_body()
                    .map_err(|err| Error::MimeDecodeFailed(err.into()))?;
                (body, part.ctype.mimetype.clone())
            }
            None => (String::new(), "text/plain".to_string()),
        };

        let mut parts = Vec::new();
        for (index, leaf) in leaves.iter().enumerate() {
            if Some(index) == body_index {
                continue;
            }
            let data = match leaf.get_body_raw() {
                Ok(data) => data,
                Err(err) => {
                    warn!("Skipping undecodable MIME part: {}.", err);
                    continue;
                }
            };
            let disposition = leaf.get_content_disposition();
            parts.push(MimePart {
                content_id: leaf.headers.get_first_value("Content-ID"),
                mime_type: leaf.ctype.mimetype.clone(),
                disposition: disposition_label(&disposition.disposition),
                filename: part_filename(leaf),
                data,
            });
        }

        Ok(MimeMessageData {
            body,
            mime_type,
            parts,
        })
    }
}

/// An attachment extracted from a decrypted MIME message.
///
/// Written once during post-processing and never mutated afterwards; the
/// caller owns the lifetime of the underlying file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeAttachment {
    /// Sanitized filename, also the last component of `storage_path`.
    pub filename: String,

    /// Size of the written file in bytes.
    pub size: usize,

    /// MIME type sniffed from the filename extension, matching what the
    /// renderer expects rather than what the sender declared.
    pub mime_type: String,

    /// Where the raw bytes were written.
    pub storage_path: PathBuf,

    /// Content-disposition label of the source part.
    pub disposition: String,
}

/// Rewrites the body of a decoded MIME message and extracts attachments.
///
/// The attachment directory is injected here instead of being read from
/// an ambient global; every message gets its own subdirectory keyed by
/// message id.
#[derive(Debug, Clone)]
pub struct MimePostProcessor {
    attachment_dir: PathBuf,
}

impl MimePostProcessor {
    /// Creates a post-processor rooted at the given attachment directory.
    pub fn new(attachment_dir: impl Into<PathBuf>) -> Self {
        MimePostProcessor {
            attachment_dir: attachment_dir.into(),
        }
    }

    /// Produces the final HTML body and the extracted attachment list.
    ///
    /// A part that fails to write is dropped with a warning; one bad part
    /// never aborts the whole decryption.
    pub(crate) fn process(
        &self,
        data: MimeMessageData,
        message_id: &str,
    ) -> (String, Vec<MimeAttachment>) {
        let mut body = data.body;

        // multipart messages whose root part is plain text still need to
        // render as HTML.
        if is_type(&data.mime_type, &mime::TEXT_PLAIN) {
            body = plaintext::to_html_document(&body);
        }

        let dir = self
            .attachment_dir
            .join(sanitize_name(message_id).unwrap_or_else(|| "message".to_string()));

        let mut attachments = Vec::new();
        for part in &data.parts {
            if let Some(content_id) = &part.content_id {
                body = replace_inline_reference(body, content_id, part);
            }

            let Some(filename) = part.filename.as_deref().and_then(sanitize_name) else {
                // Without a name the part cannot be surfaced as an attachment.
                continue;
            };
            match write_attachment(&dir, &filename, &part.data) {
                Ok(storage_path) => attachments.push(MimeAttachment {
                    mime_type: sniff_mime_type(&filename),
                    size: part.data.len(),
                    disposition: part.disposition.clone(),
                    filename,
                    storage_path,
                }),
                Err(err) => {
                    warn!("Failed to extract attachment {:?}: {:#}.", filename, err);
                }
            }
        }

        (body, attachments)
    }
}

/// Replaces `src="cid:…"` references to `part` with a base64 data URI.
///
/// The content id is attacker-influenced, so the replacement is a literal
/// substring substitution, never a pattern.
fn replace_inline_reference(body: String, content_id: &str, part: &MimePart) -> String {
    let content_id = content_id
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>');
    let reference = format!("src=\"cid:{content_id}\"");
    if !body.contains(&reference) {
        return body;
    }
    // Data URIs only take base64 payloads; parts that arrived with
    // another transfer encoding are re-encoded.
    let data_uri = format!(
        "src=\"data:{};base64,{}\"",
        part.mime_type,
        BASE64_STANDARD.encode(&part.data)
    );
    body.replace(&reference, &data_uri)
}

/// Writes attachment bytes under `dir`, creating it if needed.
///
/// The write goes through a temporary sibling and an atomic rename, so a
/// concurrent re-decryption of the same message racing on the same
/// filename ends with one complete file.
fn write_attachment(dir: &Path, filename: &str, data: &[u8]) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create attachment directory {}", dir.display()))?;
    let path = dir.join(filename);
    let tmp_path = dir.join(format!("{filename}.part"));
    fs::write(&tmp_path, data)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("failed to move attachment into {}", path.display()))?;
    Ok(path)
}

/// Sanitizes a decoder-supplied filename for use as a single path
/// component.
///
/// Returns `None` when nothing usable remains.  Path separators and
/// parent references must not survive: filenames come out of attacker
/// controlled MIME headers.
fn sanitize_name(name: &str) -> Option<String> {
    let mut name = name;
    for part in name.rsplit('/') {
        if !part.is_empty() {
            name = part;
            break;
        }
    }
    for part in name.rsplit('\\') {
        if !part.is_empty() {
            name = part;
            break;
        }
    }

    let opts = sanitize_filename::Options {
        truncate: true,
        windows: true,
        replacement: "",
    };
    let name = sanitize_filename::sanitize_with_options(name, opts);

    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return None;
    }
    Some(name)
}

static MIME_BY_EXTENSION: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("bmp", "image/bmp"),
        ("csv", "text/csv"),
        ("doc", "application/msword"),
        (
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        ("eml", "message/rfc822"),
        ("gif", "image/gif"),
        ("htm", "text/html"),
        ("html", "text/html"),
        ("ics", "text/calendar"),
        ("jpeg", "image/jpeg"),
        ("jpg", "image/jpeg"),
        ("json", "application/json"),
        ("mov", "video/quicktime"),
        ("mp3", "audio/mpeg"),
        ("mp4", "video/mp4"),
        ("pdf", "application/pdf"),
        ("png", "image/png"),
        ("ppt", "application/vnd.ms-powerpoint"),
        (
            "pptx",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ),
        ("svg", "image/svg+xml"),
        ("txt", "text/plain"),
        ("webp", "image/webp"),
        ("xls", "application/vnd.ms-excel"),
        (
            "xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        ("xml", "application/xml"),
        ("zip", "application/zip"),
    ])
});

/// MIME type derived from the filename extension.
///
/// The declared part header is deliberately ignored here; renderers key
/// off the filename.
fn sniff_mime_type(filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    MIME_BY_EXTENSION
        .get(extension.as_str())
        .copied()
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn collect_leaf_parts<'a, 'b>(mail: &'a ParsedMail<'b>, leaves: &mut Vec<&'a ParsedMail<'b>>) {
    if mail.subparts.is_empty() {
        leaves.push(mail);
    } else {
        for subpart in &mail.subparts {
            collect_leaf_parts(subpart, leaves);
        }
    }
}

fn position_of_type(leaves: &[&ParsedMail<'_>], wanted: &Mime) -> Option<usize> {
    leaves
        .iter()
        .position(|part| is_type(&part.ctype.mimetype, wanted))
}

fn is_type(mimetype: &str, wanted: &Mime) -> bool {
    mimetype
        .parse::<Mime>()
        .map_or(false, |mime| mime.essence_str() == wanted.essence_str())
}

fn part_filename(part: &ParsedMail<'_>) -> Option<String> {
    let disposition = part.get_content_disposition();
    disposition
        .params
        .get("filename")
        .cloned()
        .or_else(|| part.ctype.params.get("name").cloned())
}

fn disposition_label(disposition: &DispositionType) -> String {
    match disposition {
        DispositionType::Inline => "inline".to_string(),
        DispositionType::Attachment => "attachment".to_string(),
        DispositionType::FormData => "form-data".to_string(),
        DispositionType::Extension(other) => other.clone(),
    }
}
