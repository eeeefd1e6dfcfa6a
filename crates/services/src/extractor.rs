//! Boundary to the external text-extraction collaborator.
//!
//! Extraction itself (PDF parsing, OCR, whatever the deployment uses) lives
//! outside this crate; services only depend on the trait. The helpers below
//! normalize whatever text comes back before it is handed to the content
//! generator.

use async_trait::async_trait;

use crate::error::ExtractionError;

/// Plain text pulled out of a stored material file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: u32,
}

/// External collaborator that turns a stored file into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text and page count from the file identified by `source`.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError` when the file cannot be read or parsed;
    /// extraction failures propagate to the caller unchanged.
    async fn extract(&self, source: &str) -> Result<ExtractedText, ExtractionError>;
}

/// Collapses runs of spaces and newlines left behind by extraction.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_newline = false;
    let mut pending_space = false;

    for ch in raw.chars() {
        if ch == '\n' {
            pending_newline = true;
            pending_space = false;
        } else if ch.is_whitespace() {
            if !pending_newline {
                pending_space = true;
            }
        } else {
            if pending_newline && !out.is_empty() {
                out.push('\n');
            } else if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_newline = false;
            pending_space = false;
            out.push(ch);
        }
    }

    out
}

/// Caps prompt material at `max_chars` characters, respecting char
/// boundaries. Generator prompts have a budget; the tail of a long
/// document is dropped rather than failing the request.
#[must_use]
pub fn truncate_for_prompt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
