//! Spinner and outcome reporting for CLI submissions.

use std::path::Path;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

use crate::{Completion, Page, PageHandle, RunOutcome, ServerStatus};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates the spinner standing in for the form's submit control.
pub fn make_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .expect("spinner template is valid"),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Keeps the spinner's message in sync with the submit control's label.
pub fn mirror_submit_label(spinner: ProgressBar, page: PageHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        loop {
            ticker.tick().await;
            let label = page.lock().submit.label.clone();
            spinner.set_message(label);
        }
    })
}

/// Prints the page's panels and where the archive went.
pub fn print_outcome(page: &Page, outcome: &RunOutcome, archive_path: &Path) {
    if let Some(error) = page.error.text() {
        eprintln!("{}", style(error).red());
    }

    let highlighted = page.fields.iter().filter(|f| f.invalid).count();
    if highlighted > 0 {
        eprintln!("{highlighted} link(s) marked invalid");
    }

    let RunOutcome::Complete(completion) = outcome else {
        return;
    };

    println!("{SEPARATOR}");
    if let Some(results) = page.results.text() {
        println!("{}", style(results).green());
        println!("{SEPARATOR}");
    }

    match completion {
        Completion::Summary {
            archive_saved: true,
            ..
        } => println!("Archive saved to {}", archive_path.display()),
        Completion::Summary { summary, .. } if summary.has_file => {
            println!("{}", style("The archive could not be retrieved.").yellow());
        }
        Completion::Summary { .. } => println!("No archive was produced."),
        Completion::Archive { size } => println!(
            "Archive saved to {} ({})",
            archive_path.display(),
            human_size(*size)
        ),
    }
    println!("{}", style(page.submit.label.as_str()).bold());
}

/// Prints the server's activity report.
pub fn print_status(server: &str, status: &ServerStatus) {
    let state = if status.is_busy() {
        style(status.status.as_str()).yellow()
    } else {
        style(status.status.as_str()).green()
    };
    println!("{server}: {state}");
    println!("  Active downloads:  {}", status.active_downloads);
    println!("  Lock file present: {}", status.has_lock_file);
    println!("  Recent activity:   {}", status.recent_activity);
    println!("  Safe to restart:   {}", status.safe_to_restart);
}

#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
