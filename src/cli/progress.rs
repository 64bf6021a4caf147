//! Terminal progress display for a full export.

use indicatif::{ProgressBar, ProgressStyle};

use crate::agent::ProgressUpdate;

/// Page-level progress bar driven by [`ProgressUpdate`]s.
pub struct ExportProgress {
    bar: ProgressBar,
}

impl ExportProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} pages")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        bar.set_message("Acquiring");
        Self { bar }
    }

    /// A display that draws nothing.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn update(&self, update: &ProgressUpdate) {
        self.bar.set_length(u64::from(update.total_pages));
        self.bar.set_position(u64::from(update.current_page));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ExportProgress {
    fn default() -> Self {
        Self::new()
    }
}
