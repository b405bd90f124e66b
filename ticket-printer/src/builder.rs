//! Plain-text ticket builder
//!
//! Provides a fluent API for laying out fixed-width ticket text.

use crate::encoding::{pad_text, text_width, truncate_text, wrap_text};

/// Fixed-width ticket builder
///
/// Common widths:
/// - 58mm paper: 32 characters
/// - 80mm paper: 42-48 characters
pub struct TicketBuilder {
    lines: Vec<String>,
    width: usize,
}

impl TicketBuilder {
    /// Create a new builder with the specified paper width in characters
    pub fn new(width: usize) -> Self {
        Self {
            lines: Vec::with_capacity(64),
            width: width.max(1),
        }
    }

    /// Get the configured paper width
    pub fn width(&self) -> usize {
        self.width
    }

    // === Text Output ===

    /// Write a line, truncated to the paper width
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.lines.push(truncate_text(s, self.width));
        self
    }

    /// Write a line word-wrapped to the paper width.
    ///
    /// Continuation lines are prefixed by `indent` as well.
    pub fn wrapped(&mut self, indent: &str, s: &str) -> &mut Self {
        let available = self.width.saturating_sub(text_width(indent)).max(1);
        for part in wrap_text(s, available) {
            self.lines.push(format!("{}{}", indent, part));
        }
        self
    }

    /// Write a centered line
    pub fn center(&mut self, s: &str) -> &mut Self {
        let s = truncate_text(s.trim(), self.width);
        let pad = (self.width - text_width(&s)) / 2;
        self.lines.push(format!("{}{}", " ".repeat(pad), s));
        self
    }

    /// Write a label on the left and a value aligned to the right edge
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let right_width = text_width(right).min(self.width);
        let left_width = self.width - right_width;
        if left_width == 0 {
            return self.line(right);
        }
        let left = pad_text(left, left_width.saturating_sub(1), false);
        self.lines
            .push(format!("{} {}", left, pad_text(right, right_width, true)));
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    // === Separators ===

    /// Full-width `=` rule
    pub fn sep_double(&mut self) -> &mut Self {
        self.lines.push("=".repeat(self.width));
        self
    }

    /// Full-width `-` rule
    pub fn sep_single(&mut self) -> &mut Self {
        self.lines.push("-".repeat(self.width));
        self
    }

    // === Output ===

    /// Access the lines written so far
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consume the builder and return the raw lines
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Build the final text (newline-terminated lines)
    pub fn build(self) -> String {
        let mut out = String::with_capacity(self.lines.len() * (self.width + 1));
        for line in &self.lines {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Whether a line is a structural rule (one repeated non-alphanumeric character)
pub fn is_rule_line(line: &str) -> bool {
    let trimmed = line.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) if !first.is_alphanumeric() && !first.is_whitespace() => {
            trimmed.len() >= 3 && chars.all(|c| c == first)
        }
        _ => false,
    }
}
