//! In-memory model of the submission page.
//!
//! The page is shared between the [`Controller`](crate::Controller) and the
//! front-end rendering it. Only the controller (and the reset task it
//! schedules) writes to it; front-ends read.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Label the submit control carries when no run is in progress.
pub const DEFAULT_SUBMIT_LABEL: &str = "Download";

/// Lifecycle of a single submission run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    /// No run in progress.
    #[default]
    Idle,
    /// Waiting for the validation endpoint.
    Validating,
    /// Every link was rejected by validation.
    RejectedAll,
    /// Waiting for the download endpoint.
    Downloading,
    /// Interpreting the download reply and retrieving the archive.
    Reconciling,
    /// The run finished; the page resets after a display window.
    Complete,
    /// The run failed.
    Failed,
}

/// One link input on the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkField {
    /// Current text of the input.
    pub value: String,
    /// Whether the input is marked as holding a rejected link.
    pub invalid: bool,
}

impl LinkField {
    /// Creates an unmarked field holding `value`.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            invalid: false,
        }
    }
}

/// The form's submit button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitControl {
    pub label: String,
    pub enabled: bool,
}

impl Default for SubmitControl {
    fn default() -> Self {
        Self {
            label: DEFAULT_SUBMIT_LABEL.to_string(),
            enabled: true,
        }
    }
}

/// A message container that is either shown with some text or hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePanel {
    text: String,
    visible: bool,
}

impl MessagePanel {
    pub fn show(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns the text if the panel is visible.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.visible.then_some(self.text.as_str())
    }
}

/// Everything a run reads from or writes to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub fields: Vec<LinkField>,
    pub submit: SubmitControl,
    pub error: MessagePanel,
    pub results: MessagePanel,
    pub state: WorkflowState,
}

impl Page {
    /// Creates a page with `slots` empty link fields.
    #[must_use]
    pub fn with_slots(slots: usize) -> Self {
        Self {
            fields: vec![LinkField::default(); slots],
            ..Self::default()
        }
    }

    /// Creates a page whose fields hold the given links, in order.
    #[must_use]
    pub fn with_links<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: links.into_iter().map(LinkField::new).collect(),
            ..Self::default()
        }
    }

    /// Empties every input and drops its invalid mark.
    pub fn clear_inputs(&mut self) {
        for field in &mut self.fields {
            field.value.clear();
            field.invalid = false;
        }
    }

    /// Indices of the fields currently marked invalid.
    #[must_use]
    pub fn invalid_indices(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.invalid.then_some(i))
            .collect()
    }
}

/// Shared handle to a [`Page`].
#[derive(Debug, Clone, Default)]
pub struct PageHandle(Arc<Mutex<Page>>);

impl PageHandle {
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self(Arc::new(Mutex::new(page)))
    }

    /// Locks the page. A poisoned lock is recovered; the page holds plain data.
    pub fn lock(&self) -> MutexGuard<'_, Page> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the current page.
    #[must_use]
    pub fn snapshot(&self) -> Page {
        self.lock().clone()
    }
}
