//! Text chunking with configurable window size and overlap.

use serde_json::json;
use sha2::{Digest, Sha256};

/// A chunk candidate produced at indexing time, before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source_id: String,
    pub position: u32,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Chunk text into overlapping character windows.
///
/// Window boundaries are clamped to UTF-8 char boundaries. Trailing windows
/// shorter than a tenth of the window size are dropped.
pub fn chunk_text(
    source_id: &str,
    source_name: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    if text.is_empty() {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }

        let window = &text[start..end];

        if window.len() < chunk_size / 10 {
            break;
        }

        let hash = format!("{:x}", Sha256::digest(window.as_bytes()));

        chunks.push(ChunkCandidate {
            source_id: source_id.to_string(),
            position,
            text: window.trim().to_string(),
            metadata: json!({
                "source": source_name,
                "start": start,
                "end": end,
                "hash": hash,
            }),
        });

        position += 1;

        let step = if chunk_size > overlap {
            chunk_size - overlap
        } else {
            chunk_size
        };

        let mut next_start = start + step;
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked {} into {} chunks (size: {}, overlap: {})",
        source_name,
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}
