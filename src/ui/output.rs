//! Status lines with a plain-text fallback

use super::context::UiContext;
use console::{style, StyledObject};

/// Outcome mark shown in front of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Mark {
    fn label(self) -> StyledObject<&'static str> {
        match self {
            Self::Ok => style("[OK]").green(),
            Self::Warn => style("[WARN]").yellow(),
            Self::Fail => style("[FAIL]").red(),
            Self::Info => style("[INFO]").cyan(),
        }
    }
}

/// One rendered status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub mark: Mark,
    pub message: String,
    pub detail: Option<String>,
}

impl Line {
    pub fn new(mark: Mark, message: impl Into<String>) -> Self {
        Self {
            mark,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn text(&self, dim_detail: bool) -> String {
        match &self.detail {
            Some(detail) if dim_detail => format!("{} ({})", self.message, style(detail).dim()),
            Some(detail) => format!("{} ({})", self.message, detail),
            None => self.message.clone(),
        }
    }

    /// Plain rendering used when the terminal is not interactive
    pub fn plain(&self) -> String {
        format!("  {} {}", self.mark.label(), self.text(false))
    }
}

/// Print one line, through cliclack when the terminal allows it
pub fn emit(ctx: &UiContext, line: &Line) {
    if !ctx.use_fancy_output() {
        println!("{}", line.plain());
        return;
    }
    let text = line.text(true);
    let _ = match line.mark {
        Mark::Ok => cliclack::log::success(text),
        Mark::Warn => cliclack::log::warning(text),
        Mark::Fail => cliclack::log::error(text),
        Mark::Info => cliclack::log::info(text),
    };
}

/// Print every line in order
pub fn emit_all(ctx: &UiContext, lines: &[Line]) {
    for line in lines {
        emit(ctx, line);
    }
}

/// Shorthand for a line without detail
pub fn step(ctx: &UiContext, mark: Mark, message: &str) {
    emit(ctx, &Line::new(mark, message));
}

/// Title line for a command
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
    }
}

/// Closing line; anything but [`Mark::Ok`] is shown as a warning
pub fn outro(ctx: &UiContext, mark: Mark, message: &str) {
    let styled = match mark {
        Mark::Ok => style(message).green().bold(),
        _ => style(message).yellow().bold(),
    };
    if ctx.use_fancy_output() {
        cliclack::outro(styled).ok();
    } else {
        println!("{} {}", mark.label(), styled);
    }
}

/// Dim follow-up line
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        println!("  {}", style(message).dim());
    }
}
