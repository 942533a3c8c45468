//! Interpretation of `/download` responses.
//!
//! A response is classified exactly once, from its status and content type,
//! into a [`ReplyKind`]; everything downstream matches on [`DownloadReply`]
//! instead of re-reading headers.

use bytes::Bytes;

use crate::api::DownloadSummary;
use crate::artifact::ArchiveBody;
use crate::error::{Error, Result};

/// Content type marking a structured (JSON) body.
const STRUCTURED_CONTENT: &str = "application/json";

/// Longest excerpt of a plain-text error body shown to the user.
const EXCERPT_CHARS: usize = 200;

/// Returns `true` if a `Content-Type` value declares structured data.
///
/// Media types are case-insensitive, so `Application/JSON` matches as well.
#[must_use]
pub fn is_structured(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains(STRUCTURED_CONTENT))
}

/// The shape of a `/download` response, known before its body is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Structured,
    Binary,
    /// A non-success status; `structured` tells how to read the error body.
    Error { structured: bool },
}

impl ReplyKind {
    /// Classifies a response by status first, then content type.
    #[must_use]
    pub fn classify(status: u16, content_type: Option<&str>) -> Self {
        let structured = is_structured(content_type);
        if !(200..300).contains(&status) {
            Self::Error { structured }
        } else if structured {
            Self::Structured
        } else {
            Self::Binary
        }
    }
}

/// A parsed `/download` response.
#[derive(Debug)]
pub enum DownloadReply {
    /// Per-link outcome metadata, possibly pointing at an archive.
    Structured(DownloadSummary),
    /// The archive itself, still streaming.
    Binary(ArchiveBody),
    /// A non-success status with the message extracted from its body.
    Error { status: u16, message: String },
}

impl DownloadReply {
    /// Parses a fully buffered response from its status, content type, and body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] when a successful structured body is malformed.
    pub fn parse(status: u16, content_type: Option<&str>, body: &Bytes) -> Result<Self> {
        match ReplyKind::classify(status, content_type) {
            ReplyKind::Error { structured } => Ok(Self::Error {
                status,
                message: error_message(status, structured, body),
            }),
            ReplyKind::Structured => Ok(Self::Structured(serde_json::from_slice(body)?)),
            ReplyKind::Binary => Ok(Self::Binary(ArchiveBody::from_bytes(body.clone()))),
        }
    }
}

/// What the controller does with a successful download.
#[derive(Debug)]
pub enum Reconciliation {
    /// Retrieve the archive for `session_id`, then show the summary.
    WithFile {
        session_id: String,
        summary: DownloadSummary,
    },
    /// Show the summary; there is nothing to retrieve.
    WithoutFile { summary: DownloadSummary },
    /// Deliver the body as the archive.
    Binary(ArchiveBody),
}

/// Decides how a download reply is finished.
///
/// # Errors
///
/// Returns [`Error::Server`] for an error reply.
pub fn reconcile(reply: DownloadReply) -> Result<Reconciliation> {
    match reply {
        DownloadReply::Structured(summary) => match summary.archive_session() {
            Some(id) => Ok(Reconciliation::WithFile {
                session_id: id.to_string(),
                summary,
            }),
            None => {
                if summary.has_file {
                    log::debug!("Structured result has a file but no session id; skipping retrieval");
                }
                Ok(Reconciliation::WithoutFile { summary })
            }
        },
        DownloadReply::Binary(body) => Ok(Reconciliation::Binary(body)),
        DownloadReply::Error { status, message } => Err(Error::Server { status, message }),
    }
}

/// Extracts a user-facing message from a non-success response body.
///
/// Structured bodies yield their `error` field. Plain-text bodies mentioning
/// an error are excerpted; anything else gets a generic message.
#[must_use]
pub fn error_message(status: u16, structured: bool, body: &[u8]) -> String {
    if structured {
        return match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(value) => value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown error occurred")
                .to_string(),
            Err(e) => {
                log::debug!("Unparseable error body: {e}");
                format!("Server returned error (status {status})")
            }
        };
    }

    let Ok(text) = std::str::from_utf8(body) else {
        return format!("Server returned error (status {status})");
    };
    if text.to_ascii_lowercase().contains("error") {
        text.chars().take(EXCERPT_CHARS).collect()
    } else {
        format!("Server error occurred (status {status})")
    }
}
