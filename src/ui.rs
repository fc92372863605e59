use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a batch of URLs is scanned
pub struct ScanProgress {
    bar: ProgressBar,
}

impl ScanProgress {
    pub fn new(total: u64, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total)
        };

        match ProgressStyle::with_template("{prefix} {spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}") {
            Ok(s) => bar.set_style(s.tick_strings(&["▰▱▱▱", "▰▰▱▱", "▰▰▰▱", "▰▰▰▰", "▱▰▰▰", "▱▱▰▰", "▱▱▱▰", "▱▱▱▱"])),
            Err(e) => log::debug!("Progress template rejected: {}", e),
        }
        bar.set_prefix(style("linkward").cyan().bold().to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar }
    }

    pub fn started(&self, url: &str) {
        self.bar.set_message(style(url).dim().to_string());
    }

    pub fn completed(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for ScanProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
