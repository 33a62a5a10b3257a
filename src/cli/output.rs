//! Colored terminal output for release operations
//!
//! Provides consistent, colored CLI output with proper formatting

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn emit(&self, marker: Option<(&str, ColorSpec)>, message: &str, message_color: Option<ColorSpec>) {
        let mut buffer = self.bufwtr.buffer();
        if let Some((symbol, spec)) = marker {
            let _ = buffer.set_color(&spec);
            let _ = write!(&mut buffer, "{}", symbol);
            let _ = buffer.reset();
            let _ = write!(&mut buffer, " ");
        }
        if let Some(spec) = message_color {
            let _ = buffer.set_color(&spec);
        }
        let _ = writeln!(&mut buffer, "{}", message);
        let _ = buffer.reset();
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.emit(Some(("✓", fg(Color::Green, true))), message, None);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.emit(
            Some(("⚠", fg(Color::Yellow, true))),
            message,
            Some(fg(Color::Yellow, false)),
        );
    }

    /// Print an error message (always shown)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();

        if buffer.set_color(&fg(Color::Red, true)).is_err()
            || write!(&mut buffer, "✗").is_err()
            || buffer.reset().is_err()
            || buffer.set_color(&fg(Color::Red, false)).is_err()
            || writeln!(&mut buffer, " {}", message).is_err()
            || buffer.reset().is_err()
            || bufwtr.print(&buffer).is_err()
        {
            // Stderr failed - fallback to stdout as last resort
            println!("[STDERR ERROR] ✗ {}", message);
        }
    }

    /// Print a verbose/debug message (only in verbose mode)
    pub fn verbose(&self, message: &str) {
        if !self.verbose || self.quiet {
            return;
        }
        self.emit(Some(("→", fg(Color::Blue, false))), message, None);
    }

    /// Print a progress message
    pub fn progress(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.emit(Some(("⋯", fg(Color::Magenta, false))), message, None);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        self.emit(None, "", None);
        self.emit(None, &format!("═══ {} ═══", title), Some(fg(Color::Cyan, true)));
    }

    /// Print indented text (for sub-items); multi-line text is indented line by line
    pub fn indent(&self, message: &str) {
        if self.quiet {
            return;
        }
        for line in message.lines() {
            self.emit(None, &format!("    {}", line), None);
        }
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.emit(None, message, None);
    }

    /// Print a remote response, indented. Shown even in quiet mode.
    pub fn response(&self, message: &str) {
        if message.trim().is_empty() {
            self.emit(None, "    (empty response body)", Some(fg(Color::White, false)));
            return;
        }
        for line in message.lines() {
            self.emit(None, &format!("    {}", line), Some(fg(Color::White, false)));
        }
    }
}

fn fg(color: Color, bold: bool) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color)).set_bold(bold);
    spec
}
