//! Wire types exchanged with the download server.

use serde::{Deserialize, Serialize};

/// A link the validation endpoint accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedLink {
    pub url: String,
}

/// A link the validation endpoint rejected, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLink {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub reason: String,
}

/// Body of a successful `/validate` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    #[serde(default)]
    pub valid: Vec<ValidatedLink>,
    #[serde(default)]
    pub invalid: Vec<RejectedLink>,
}

impl ValidationOutcome {
    /// Message listing every rejection as `title: reason`.
    ///
    /// A reply with no entries at all still explains why nothing is
    /// downloaded.
    #[must_use]
    pub fn rejection_message(&self) -> String {
        let mut message = String::from("All links were rejected:");
        if self.invalid.is_empty() {
            message.push_str("\nNo valid links were submitted");
        }
        for link in &self.invalid {
            message.push('\n');
            message.push_str(&link.title);
            message.push_str(": ");
            message.push_str(&link.reason);
        }
        message
    }
}

/// Result of calling the validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The server classified the links.
    Checked(ValidationOutcome),
    /// The server answered with a non-success status; validation is skipped.
    Unavailable { status: u16 },
}

/// A per-link entry of a structured download result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitledItem {
    #[serde(default)]
    pub title: String,
}

/// Structured `/download` response describing per-link outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSummary {
    #[serde(default)]
    pub has_file: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub successful: Vec<TitledItem>,
    #[serde(default)]
    pub rejected: Vec<TitledItem>,
}

impl DownloadSummary {
    /// Session id of the attached archive, if there is a usable one.
    #[must_use]
    pub fn archive_session(&self) -> Option<&str> {
        if !self.has_file {
            return None;
        }
        self.session_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Renders the successes and failures for the results panel.
    ///
    /// Returns `None` when there is nothing to report.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        let section = |heading: &str, items: &[TitledItem]| {
            (!items.is_empty()).then(|| {
                let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
                format!("{heading}\n{}", titles.join("\n"))
            })
        };

        let parts: Vec<String> = [
            section("Successfully downloaded:", &self.successful),
            section("Could not download:", &self.rejected),
        ]
        .into_iter()
        .flatten()
        .collect();

        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: String,
    #[serde(default)]
    pub active_downloads: u32,
    #[serde(default)]
    pub has_lock_file: bool,
    #[serde(default)]
    pub recent_activity: bool,
    #[serde(default)]
    pub safe_to_restart: bool,
}

impl ServerStatus {
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.status == "busy"
    }
}
