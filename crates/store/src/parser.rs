//! Source file parsing and text extraction.

use critiq_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Parse a source file and extract clean text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path);

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Store(format!("Failed to read {:?}: {}", path, e)))?;

    let cleaned = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => strip_html(&raw),
        ContentType::PlainText => raw,
        ContentType::Unknown => {
            if is_likely_text(&raw) {
                raw
            } else {
                tracing::warn!("Skipping likely binary file: {:?}", path);
                return Err(AppError::Store("Binary file not supported".to_string()));
            }
        }
    };

    Ok(cleaned)
}

/// Clean markdown down to its prose.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        // Skip horizontal rules and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Strip HTML tags, keeping text content.
fn strip_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;

    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Heuristic check for text content.
fn is_likely_text(content: &str) -> bool {
    let sample: Vec<char> = content.chars().take(512).collect();
    if sample.is_empty() {
        return true;
    }

    let control = sample
        .iter()
        .filter(|c| c.is_control() && !c.is_whitespace())
        .count();

    (control as f32) / (sample.len() as f32) < 0.05
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::from_path(&PathBuf::from("notes.md")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::from_path(&PathBuf::from("page.html")),
            ContentType::Html
        );
        assert_eq!(
            ContentType::from_path(&PathBuf::from("readme.txt")),
            ContentType::PlainText
        );
        assert_eq!(
            ContentType::from_path(&PathBuf::from("binary.bin")),
            ContentType::Unknown
        );
    }

    #[test]
    fn test_clean_markdown_strips_fences_and_headers() {
        let text = "# Title\n\nSome prose.\n\n```\ncode here\n```\n\n---\n\nMore prose.";
        let cleaned = clean_markdown(text);

        assert!(cleaned.contains("Title"));
        assert!(cleaned.contains("Some prose."));
        assert!(cleaned.contains("More prose."));
        assert!(!cleaned.contains("```"));
        assert!(!cleaned.contains("---"));
    }

    #[test]
    fn test_strip_html() {
        let html = "<p>Hello <b>world</b></p>";
        assert_eq!(strip_html(html), "Hello world");
    }

    #[test]
    fn test_is_likely_text() {
        assert!(is_likely_text("plain readable text"));
        assert!(!is_likely_text("\u{0}\u{1}\u{2}\u{3}bin\u{4}\u{5}\u{6}\u{7}"));
    }
}
