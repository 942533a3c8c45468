//! The submission workflow: validate, download, reconcile, reset.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::annotate::{clear_invalid_marks, mark_invalid_links};
use crate::api::{DownloadSummary, HttpLinkService, LinkService, Validation, ValidationOutcome};
use crate::artifact::{ArtifactSink, DirectorySink};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::links::LinkSet;
use crate::page::{Page, PageHandle, WorkflowState};
use crate::reply::{Reconciliation, reconcile};

/// Submit label while the validation endpoint is consulted.
pub const VALIDATING_LABEL: &str = "Validating links...";
/// Submit label while the download endpoint works.
pub const DOWNLOADING_LABEL: &str = "Downloading... Please wait";
/// Submit label shown during the display window after a successful run.
pub const COMPLETE_LABEL: &str = "Download Complete!";

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The server described per-link results.
    Summary {
        summary: DownloadSummary,
        /// Whether an archive was retrieved and delivered.
        archive_saved: bool,
    },
    /// The server sent the archive directly.
    Archive { size: u64 },
}

/// Terminal result of one [`Controller::submit`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Validation rejected every link; nothing was downloaded.
    RejectedAll { message: String },
    Complete(Completion),
    /// The run stopped on an error; `message` is what the error panel shows.
    Failed { message: String },
}

/// A delayed restoration of the idle page.
struct ScheduledReset {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

fn set_state(page: &mut Page, state: WorkflowState) {
    if page.state != state {
        log::debug!("Workflow state: {:?} -> {:?}", page.state, state);
    }
    page.state = state;
}

/// Puts the submit control back to `label` and marks the page idle.
fn restore_idle(page: &mut Page, label: &str) {
    page.submit.label = label.to_string();
    page.submit.enabled = true;
    set_state(page, WorkflowState::Idle);
}

/// Applies a scheduled reset unless it was cancelled.
///
/// The token is checked under the page lock so that a reset cancelled by a
/// new run never lands on that run's page.
fn apply_reset(page: &PageHandle, token: &CancellationToken, label: &str, hide_results: bool) {
    let mut page = page.lock();
    if token.is_cancelled() {
        return;
    }
    restore_idle(&mut page, label);
    if hide_results {
        page.results.hide();
    }
}

/// Drives submission runs against a [`LinkService`] and owns the page.
///
/// The controller is the page's only writer: the front-end reads the shared
/// [`PageHandle`] but never mutates it while the controller is alive.
/// `submit` takes `&mut self`, so runs never overlap.
pub struct Controller<S: LinkService = HttpLinkService, A: ArtifactSink = DirectorySink> {
    service: S,
    sink: A,
    page: PageHandle,
    config: ClientConfig,
    idle_label: String,
    pending_reset: Option<ScheduledReset>,
}

impl<S: LinkService, A: ArtifactSink> Controller<S, A> {
    /// Creates a controller. The submit control's current label is the one
    /// restored after every run.
    #[must_use]
    pub fn new(service: S, sink: A, page: PageHandle, config: ClientConfig) -> Self {
        let idle_label = page.lock().submit.label.clone();
        Self {
            service,
            sink,
            page,
            config,
            idle_label,
            pending_reset: None,
        }
    }

    #[must_use]
    pub const fn page(&self) -> &PageHandle {
        &self.page
    }

    #[must_use]
    pub const fn service(&self) -> &S {
        &self.service
    }

    #[must_use]
    pub const fn sink(&self) -> &A {
        &self.sink
    }

    /// Returns `true` while a delayed reset has not yet run.
    #[must_use]
    pub fn is_reset_pending(&self) -> bool {
        self.pending_reset
            .as_ref()
            .is_some_and(|reset| !reset.handle.is_finished())
    }

    /// Waits until any scheduled reset has been applied.
    pub async fn wait_idle(&mut self) {
        if let Some(reset) = self.pending_reset.take()
            && let Err(e) = reset.handle.await
        {
            log::warn!("Page reset task failed: {e}");
        }
    }

    /// Runs one submission of the page's current links.
    pub async fn submit(&mut self) -> RunOutcome {
        self.cancel_pending_reset();
        let links = self.begin();
        log::info!("Submitting {} link(s)", links.len());

        match self.run(&links).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail(&e),
        }
    }

    fn cancel_pending_reset(&mut self) {
        if let Some(reset) = self.pending_reset.take() {
            reset.token.cancel();
        }
    }

    fn begin(&self) -> LinkSet {
        let mut page = self.page.lock();
        clear_invalid_marks(&mut page.fields);
        page.submit.enabled = false;
        page.submit.label = VALIDATING_LABEL.to_string();
        page.error.hide();
        page.results.hide();
        set_state(&mut page, WorkflowState::Validating);
        LinkSet::from_fields(&page.fields)
    }

    async fn run(&mut self, links: &LinkSet) -> Result<RunOutcome> {
        match self.service.validate(links).await {
            Ok(Validation::Checked(outcome)) => {
                if !outcome.invalid.is_empty() {
                    mark_invalid_links(&mut self.page.lock().fields, &outcome.invalid);
                }
                if outcome.valid.is_empty() {
                    return Ok(self.reject_all(&outcome));
                }
                log::info!(
                    "Validation accepted {} link(s), rejected {}",
                    outcome.valid.len(),
                    outcome.invalid.len()
                );
            }
            Ok(Validation::Unavailable { status }) => {
                log::warn!("Validation unavailable (status {status}); downloading unvalidated links");
            }
            Err(e) if e.is_transport() => {
                log::warn!("Validation unreachable ({e}); downloading unvalidated links");
            }
            Err(e) => return Err(e),
        }

        {
            let mut page = self.page.lock();
            page.submit.label = DOWNLOADING_LABEL.to_string();
            set_state(&mut page, WorkflowState::Downloading);
        }

        let reply = self.service.download(links).await?;
        set_state(&mut self.page.lock(), WorkflowState::Reconciling);

        match reconcile(reply)? {
            Reconciliation::WithFile {
                session_id,
                summary,
            } => {
                let saved = self.retrieve_archive(&session_id).await;
                Ok(self.finish_with_summary(summary, saved))
            }
            Reconciliation::WithoutFile { summary } => Ok(self.finish_with_summary(summary, false)),
            Reconciliation::Binary(body) => {
                let size = self.sink.deliver(&self.config.archive_name, body).await?;
                Ok(self.finish_with_archive(size))
            }
        }
    }

    /// Fetches and delivers the archive for `session_id`.
    ///
    /// Failures are logged and reported as `false`; they never fail the run.
    async fn retrieve_archive(&self, session_id: &str) -> bool {
        let body = match self.service.fetch_archive(session_id).await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Could not retrieve archive for session {session_id}: {e}");
                return false;
            }
        };
        match self.sink.deliver(&self.config.archive_name, body).await {
            Ok(size) => {
                log::debug!("Delivered archive for session {session_id} ({size} bytes)");
                true
            }
            Err(e) => {
                log::warn!("Could not deliver archive for session {session_id}: {e}");
                false
            }
        }
    }

    fn reject_all(&self, outcome: &ValidationOutcome) -> RunOutcome {
        let message = outcome.rejection_message();
        log::info!("All {} link(s) rejected by validation", outcome.invalid.len());

        let mut page = self.page.lock();
        page.error.show(message.clone());
        set_state(&mut page, WorkflowState::RejectedAll);
        restore_idle(&mut page, &self.idle_label);
        RunOutcome::RejectedAll { message }
    }

    fn fail(&self, err: &Error) -> RunOutcome {
        let message = format!("Error: {}", err.user_message());
        log::error!("Submission failed: {err}");

        let mut page = self.page.lock();
        page.error.show(message.clone());
        set_state(&mut page, WorkflowState::Failed);
        restore_idle(&mut page, &self.idle_label);
        RunOutcome::Failed { message }
    }

    fn finish_with_summary(&mut self, summary: DownloadSummary, archive_saved: bool) -> RunOutcome {
        {
            let mut page = self.page.lock();
            if let Some(text) = summary.render() {
                page.results.show(text);
            }
            self.complete(&mut page);
        }
        log::info!(
            "Download finished: {} succeeded, {} failed",
            summary.successful.len(),
            summary.rejected.len()
        );
        self.schedule_reset(self.config.structured_reset_delay(), true);
        RunOutcome::Complete(Completion::Summary {
            summary,
            archive_saved,
        })
    }

    fn finish_with_archive(&mut self, size: u64) -> RunOutcome {
        self.complete(&mut self.page.lock());
        log::info!("Download finished: archive of {size} bytes");
        self.schedule_reset(self.config.binary_reset_delay(), false);
        RunOutcome::Complete(Completion::Archive { size })
    }

    fn complete(&self, page: &mut Page) {
        page.clear_inputs();
        page.submit.label = COMPLETE_LABEL.to_string();
        set_state(page, WorkflowState::Complete);
    }

    fn schedule_reset(&mut self, delay: std::time::Duration, hide_results: bool) {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let page = self.page.clone();
        let label = self.idle_label.clone();
        let deadline = tokio::time::Instant::now() + delay;

        let handle = tokio::spawn(async move {
            tokio::select! {
                () = task_token.cancelled() => {}
                () = tokio::time::sleep_until(deadline) => {
                    apply_reset(&page, &task_token, &label, hide_results);
                }
            }
        });
        self.pending_reset = Some(ScheduledReset { token, handle });
    }
}
