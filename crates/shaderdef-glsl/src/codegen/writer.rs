//! Indenting line writer.

use alloc::string::String;

const INDENT: &str = "    ";

/// Accumulates GLSL source one line at a time.
#[derive(Debug, Default)]
pub struct GlslWriter {
    out: String,
    depth: usize,
}

impl GlslWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current indentation.
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn finish(self) -> String {
        self.out
    }
}
