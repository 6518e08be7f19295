use indicatif::{ProgressBar, ProgressStyle};
use ncsync_core::SyncProgress;

pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["-", "\\", "|", "/"])
            .template("{msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Bar that follows [`SyncProgress`] updates from the reconciler.
pub fn create_sync_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("   Syncing {pos} of {len} {bar:30}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}

pub fn report(bar: &ProgressBar, update: SyncProgress) {
    bar.set_length(update.total as u64);
    bar.set_position(update.progress as u64);
}
