//! Colored terminal output for CLI commands.
//!
//! Uses `termcolor` for cross-platform colored output; respects the
//! `NO_COLOR` environment variable.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
}

impl StyledOutput {
    /// Auto-detect color support, honoring `NO_COLOR`.
    pub fn auto() -> Self {
        let choice = if std::env::var_os("NO_COLOR").is_some() {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Self {
            stdout: StandardStream::stdout(choice),
        }
    }

    fn writeln_styled(&mut self, text: &str, color: Color, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color)).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = writeln!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Progress line.
    pub fn status(&mut self, text: &str) {
        self.writeln_styled(text, Color::Cyan, false);
    }

    /// Green bold completion line.
    pub fn success(&mut self, text: &str) {
        self.writeln_styled(text, Color::Green, true);
    }
}
