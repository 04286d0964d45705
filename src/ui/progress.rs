//! Spinners and the pre-cache progress bar

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner for a single long-running step
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

    /// Start spinning, or print the message in plain mode
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    pub fn stop_warn(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(format!("{} {}", style("!").yellow(), message)),
            None => println!("{} {}", style("[WARN]").yellow(), message),
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {}", style("[FAIL]").red(), message),
        }
    }
}

/// Bar that advances once per manifest entry fetched
///
/// Plain mode prints one line per entry instead.
#[derive(Clone)]
pub struct PrecacheProgress {
    bar: Option<ProgressBar>,
}

impl PrecacheProgress {
    pub fn new(ctx: &UiContext, generation: &str, total: usize) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total as u64);
            if let Ok(bar_style) = ProgressStyle::default_bar().template(
                "  {spinner:.cyan} Pre-caching {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}",
            ) {
                bar.set_style(
                    bar_style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .progress_chars("━╸─"),
                );
            }
            bar.set_prefix(generation.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Pre-caching {} entries into {}...", total, generation);
            None
        };
        Self { bar }
    }

    /// A manifest entry finished downloading
    pub fn on_fetched(&self, url: &str, status: Option<u16>) {
        match &self.bar {
            Some(bar) => {
                bar.inc(1);
                bar.set_message(short_url(url));
            }
            None => match status {
                Some(status) => println!("  {} {}", status, url),
                None => println!("  --- {}", url),
            },
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Trim a URL to fit beside the bar
fn short_url(url: &str) -> String {
    let trimmed = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    if trimmed.chars().count() > 48 {
        let tail: String = trimmed
            .chars()
            .rev()
            .take(45)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    } else {
        trimmed.to_string()
    }
}
