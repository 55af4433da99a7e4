//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a single lookup is outstanding
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner. Plain mode stays silent so stdout remains parseable.
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        }
    }
}

/// Progress bar for batch resolution.
///
/// Interactive terminals get an indicatif bar on stderr; otherwise nothing
/// is drawn.
pub struct BatchProgress {
    bar: Option<ProgressBar>,
}

impl BatchProgress {
    pub fn new(ctx: &UiContext, total: u64) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::new(total);
            if let Ok(progress_style) = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Resolving {bar:24.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(
                    progress_style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .progress_chars("━╸─"),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Self { bar }
    }

    /// Record one settled coordinate
    pub fn advance(&self, label: &str, ok: bool) {
        if let Some(ref bar) = self.bar {
            bar.inc(1);
            let mark = if ok {
                style("ok").green()
            } else {
                style("failed").red()
            };
            bar.set_message(format!("{} {}", label, mark));
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Resolving 37.77490,-122.41940");
        spinner.stop("Done");
        spinner.stop_error("not reached");
    }

    #[test]
    fn batch_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = BatchProgress::new(&ctx, 2);
        progress.advance("1.00000,1.00000", true);
        progress.advance("2.00000,2.00000", false);
        progress.finish();
    }
}
