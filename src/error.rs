//! Error types for the link-dl library.

use thiserror::Error;

/// Message shown when a transport error carries no description of its own.
const CONNECT_FALLBACK: &str = "Failed to connect to server";

/// Errors that can occur during a submission run.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP client error outside of the request round trip itself
    /// (client construction, body streaming).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No response was received from the server.
    #[error("{0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Server {
        /// HTTP status code of the response.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while delivering an archive.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Builds a transport error from a failed request.
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }

    /// Returns `true` when no response was received at all.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Text rendered in the error panel for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } => message.clone(),
            Self::Transport(description) if description.trim().is_empty() => {
                CONNECT_FALLBACK.to_string()
            }
            Self::Transport(description) => description.clone(),
            other => other.to_string(),
        }
    }
}

/// A specialized `Result` type for link-dl operations.
pub type Result<T> = std::result::Result<T, Error>;
