//! Colored report lines for the `soba` commands.
//!
//! Uses `termcolor`; respects `NO_COLOR` and the `--color` flag.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Indent of the detail lines under a class or instance
const DETAIL_INDENT: &str = "      ";

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Report writer: results on one stream, errors on the other
pub struct StyledOutput<W = StandardStream> {
    stdout: W,
    stderr: W,
}

impl StyledOutput {
    /// Terminal output with the given color choice
    pub fn new(choice: ColorChoice) -> Self {
        Self::with_writers(StandardStream::stdout(choice), StandardStream::stderr(choice))
    }
}

impl<W: WriteColor> StyledOutput<W> {
    /// Output over arbitrary writers
    pub fn with_writers(stdout: W, stderr: W) -> Self {
        Self { stdout, stderr }
    }

    fn styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    fn label(&mut self, label: &str) {
        self.styled(&format!("{}{}: ", DETAIL_INDENT, label), Some(Color::White), false);
    }

    /// Manifest path heading
    pub fn manifest(&mut self, path: &str) {
        self.styled(path, None, true);
        let _ = writeln!(self.stdout);
    }

    /// "  ✓ <class>" for a registered class
    pub fn class_registered(&mut self, class: &str) {
        self.styled("  ✓ ", Some(Color::Green), true);
        self.styled(class, None, true);
        let _ = writeln!(self.stdout);
    }

    /// "instance #<id> of <class>"
    pub fn instance(&mut self, id: u64, class: &str) {
        self.styled("instance ", Some(Color::Green), true);
        self.styled(&format!("#{}", id), None, true);
        let _ = writeln!(self.stdout, " of {}", class);
    }

    /// Detail line with a plain value
    pub fn field(&mut self, label: &str, value: &str) {
        self.label(label);
        let _ = writeln!(self.stdout, "{}", value);
    }

    /// Detail line listing names, or "none"
    pub fn field_list(&mut self, label: &str, items: &[String]) {
        self.label(label);
        if items.is_empty() {
            self.styled("none", Some(Color::White), false);
        } else {
            self.styled(&items.join(", "), Some(Color::Cyan), false);
        }
        let _ = writeln!(self.stdout);
    }

    /// Closing "<n> classes registered" line
    pub fn summary(&mut self, registered: usize) {
        let _ = writeln!(self.stdout);
        self.styled(&format!("{} classes registered", registered), Some(Color::Green), true);
        let _ = writeln!(self.stdout);
    }

    /// Flush stdout
    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// "error: <message>" on stderr, label in red bold
    pub fn report_error(&mut self, message: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = write!(self.stderr, "error");
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr, ": {}", message);
    }

    #[cfg(test)]
    fn into_writers(self) -> (W, W) {
        (self.stdout, self.stderr)
    }
}
