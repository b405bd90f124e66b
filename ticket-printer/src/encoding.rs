//! Text width and codepage utilities for thermal printers
//!
//! Receipt printers lay text out in fixed character cells and expect the
//! payload in a single-byte or legacy double-byte codepage. This module provides:
//! - Column widths (CJK characters take two cells)
//! - Truncating / padding / wrapping to a column width
//! - Converting the UTF-8 text payload to the printer codepage

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// Column width of a single character
fn char_width(c: char) -> usize {
    match c as u32 {
        // Hangul Jamo, CJK radicals .. Yi, Hangul syllables, CJK compat, fullwidth forms
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6 => 2,
        _ => 1,
    }
}

/// Get the column width of a string
pub fn text_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Truncate a string to fit within a column width
pub fn truncate_text(s: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let w = char_width(c);
        if width + w > max_width {
            break;
        }
        result.push(c);
        width += w;
    }
    result
}

/// Pad a string to a specific column width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_text(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_text(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// Word-wrap a string into lines of at most `width` columns.
///
/// Words wider than a full line are split hard. Always returns at least one line.
pub fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in s.split_whitespace() {
        let mut word = word.to_string();
        let mut word_width = text_width(&word);

        // Hard-split words that can never fit on one line
        while word_width > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            let head = truncate_text(&word, width);
            let rest = word[head.len()..].to_string();
            lines.push(head);
            word = rest;
            word_width = text_width(&word);
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word_width
        } else {
            current_width + 1 + word_width
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(&word);
        current_width += word_width;
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Printer codepage for the text payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Codepage {
    /// Raw UTF-8 (printers with a Unicode font)
    Utf8,
    /// Windows-1252 / Latin-1 (Western European and Portuguese text)
    #[default]
    Latin1,
    /// GBK (Chinese printers)
    Gbk,
}

impl Codepage {
    /// Convert UTF-8 text to this codepage.
    ///
    /// Unmappable characters are replaced by the encoder's numeric escape.
    #[instrument(skip(text), fields(len = text.len()))]
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Latin1 => encoding_rs::WINDOWS_1252.encode(text).0.into_owned(),
            Self::Gbk => encoding_rs::GBK.encode(text).0.into_owned(),
        }
    }
}

impl FromStr for Codepage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "latin1" | "cp1252" | "windows-1252" => Ok(Self::Latin1),
            "gbk" => Ok(Self::Gbk),
            other => Err(format!("Unknown codepage: {}", other)),
        }
    }
}
