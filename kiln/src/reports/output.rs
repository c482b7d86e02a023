//! Output trait for rendering reports to different formats.

/// Target output for reports.
///
/// Reports describe *what* to output using these semantic methods.
/// Implementations decide *how* to render.
pub trait Output {
    /// Render a title/header.
    fn title(&mut self, text: &str);

    /// Render a key-value pair.
    fn key_value(&mut self, key: &str, value: &str);

    /// Render an error message.
    fn error(&mut self, msg: &str);

    /// Render a warning message.
    fn warning(&mut self, msg: &str);

    /// Render a block of preformatted text.
    fn preformatted(&mut self, text: &str);

    /// Render a blank line.
    fn newline(&mut self);
}

/// A report that can render itself to an output.
pub trait Report {
    /// Render this report to the given output.
    fn render(&self, out: &mut dyn Output);
}

/// Terminal output implementation.
pub struct TerminalOutput;

impl TerminalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for TerminalOutput {
    fn title(&mut self, text: &str) {
        println!("{}", text);
        println!("{}", "=".repeat(text.chars().count()));
    }

    fn key_value(&mut self, key: &str, value: &str) {
        println!("  {}: {}", key, value);
    }

    fn error(&mut self, msg: &str) {
        eprintln!("error: {}", msg);
    }

    fn warning(&mut self, msg: &str) {
        eprintln!("warning: {}", msg);
    }

    fn preformatted(&mut self, text: &str) {
        println!("{}", text);
    }

    fn newline(&mut self) {
        println!();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Renders into a string so reports can be snapshotted.
    #[derive(Default)]
    pub(crate) struct RecordingOutput {
        pub text: String,
    }

    impl RecordingOutput {
        pub fn render(report: &dyn Report) -> String {
            let mut out = Self::default();
            report.render(&mut out);
            out.text
        }

        fn line(&mut self, line: impl AsRef<str>) {
            self.text.push_str(line.as_ref());
            self.text.push('\n');
        }
    }

    impl Output for RecordingOutput {
        fn title(&mut self, text: &str) {
            self.line(text);
            self.line("=".repeat(text.chars().count()));
        }

        fn key_value(&mut self, key: &str, value: &str) {
            self.line(format!("  {}: {}", key, value));
        }

        fn error(&mut self, msg: &str) {
            self.line(format!("error: {}", msg));
        }

        fn warning(&mut self, msg: &str) {
            self.line(format!("warning: {}", msg));
        }

        fn preformatted(&mut self, text: &str) {
            self.line(text);
        }

        fn newline(&mut self) {
            self.text.push('\n');
        }
    }
}
