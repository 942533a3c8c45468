//! link-dl - A client for batch link-downloader servers.
//!
//! A run takes the links on a [`Page`], asks the server to validate them,
//! marks rejected links, requests a batch download, and reconciles the reply:
//! either a per-link summary pointing at an archive to fetch, or the archive
//! itself. The page's submit control and message panels reflect each step.
//!
//! # Example
//!
//! ```no_run
//! use link_dl::{ClientConfig, Controller, DirectorySink, HttpLinkService, Page, PageHandle};
//!
//! # async fn example() -> link_dl::Result<()> {
//! let config = ClientConfig::default().with_base_url("http://127.0.0.1:5000");
//! let service = HttpLinkService::new(config.clone())?;
//! let page = PageHandle::new(Page::with_links(["https://youtu.be/abc"]));
//!
//! let mut controller = Controller::new(service, DirectorySink::new("."), page.clone(), config);
//! let outcome = controller.submit().await;
//! println!("{outcome:?}");
//! if let Some(results) = page.snapshot().results.text() {
//!     println!("{results}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod annotate;
pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod links;
pub mod page;
pub mod reply;
pub mod workflow;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use annotate::{clear_invalid_marks, mark_invalid_links};
pub use api::{
    DownloadSummary, HttpLinkService, LinkService, RejectedLink, ServerStatus, TitledItem,
    ValidatedLink, Validation, ValidationOutcome,
};
pub use artifact::{ArchiveBody, ArtifactSink, DirectorySink};
pub use config::{AppConfig, ClientConfig, PathConfig};
pub use error::{Error, Result};
pub use links::{LinkEntry, LinkSet};
pub use page::{LinkField, MessagePanel, Page, PageHandle, SubmitControl, WorkflowState};
pub use reply::{DownloadReply, Reconciliation, ReplyKind, reconcile};
pub use workflow::{Completion, Controller, RunOutcome};
