//! Leveled status lines for the operator.
//!
//! Every line is mirrored as a `tracing` event so JSON logs carry the same
//! story as the terminal.

use std::fmt::Display;
use std::io::IsTerminal;

const RED: &str = "\x1b[0;31m";
const GREEN: &str = "\x1b[0;32m";
const YELLOW: &str = "\x1b[1;33m";
const BLUE: &str = "\x1b[0;34m";
const CYAN: &str = "\x1b[0;36m";
const RESET: &str = "\x1b[0m";

/// Writes status lines to stderr.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    color: bool,
    quiet: bool,
}

#[allow(clippy::print_stderr)]
impl Console {
    /// Colors output when stderr is a terminal and `NO_COLOR` is unset.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            color: std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
            quiet: false,
        }
    }

    /// Suppresses terminal output; tracing events are still emitted.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            color: false,
            quiet: true,
        }
    }

    /// `[INFO]` line.
    pub fn info(&self, message: impl Display) {
        tracing::info!(%message);
        self.tagged(CYAN, "INFO", &message);
    }

    /// `[SUCCESS]` line.
    pub fn success(&self, message: impl Display) {
        tracing::info!(%message, outcome = "success");
        self.tagged(GREEN, "SUCCESS", &message);
    }

    /// `[WARNING]` line.
    pub fn warning(&self, message: impl Display) {
        tracing::warn!(%message);
        self.tagged(YELLOW, "WARNING", &message);
    }

    /// `[ERROR]` line.
    pub fn error(&self, message: impl Display) {
        tracing::error!(%message);
        self.tagged(RED, "ERROR", &message);
    }

    /// Framed title line.
    pub fn banner(&self, title: impl Display) {
        let rule = "=".repeat(42);
        self.line(&self.paint(BLUE, &rule));
        self.line(&self.paint(BLUE, &title.to_string()));
        self.line(&self.paint(BLUE, &rule));
        self.line("");
    }

    /// Raw line.
    pub fn line(&self, text: &str) {
        if !self.quiet {
            eprintln!("{text}");
        }
    }

    /// Wraps `text` in `color` when coloring is enabled.
    #[must_use]
    pub fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    /// Green variant of [`Console::paint`].
    #[must_use]
    pub fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    /// Yellow variant of [`Console::paint`].
    #[must_use]
    pub fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn tagged(&self, color: &str, tag: &str, message: &dyn Display) {
        if !self.quiet {
            eprintln!("{} {message}", self.paint(color, &format!("[{tag}]")));
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::detect()
    }
}
