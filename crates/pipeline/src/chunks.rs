//! Evidence chunk extraction.
//!
//! Turns one retrieval result into an ordered sequence of numbered evidence
//! chunks. Chunk ids are positions in retrieval order and stay stable for
//! the lifetime of a pipeline run; the critic's verdicts index back into this
//! list by id.

use crate::step::RetrievedDocument;

/// A numbered unit of retrieved evidence text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position in retrieval order; dense for one run
    pub id: usize,

    /// Originating document name, when the backend provided one
    pub source: Option<String>,

    /// Page within the source, when the backend provided one
    pub page: Option<u32>,

    /// Evidence text
    pub body: String,
}

impl Chunk {
    /// Render this chunk as a labeled block for the critic's evaluation
    /// request.
    pub fn block(&self) -> String {
        let mut block = format!("[Chunk {}]\n", self.id);
        if let Some(ref source) = self.source {
            block.push_str(&format!("Source: {}\n", source));
        }
        if let Some(page) = self.page {
            block.push_str(&format!("Page: {}\n", page));
        }
        block.push_str(&format!("Content: {}\n", self.body));
        block
    }
}

/// Extract evidence chunks from a retrieval result.
///
/// Structured documents win when present: one chunk per document, in order,
/// with source and page lifted from metadata. Without them the consolidated
/// text blob is split on blank-line boundaries. An empty blob yields an empty
/// sequence. Never fails.
pub fn extract_chunks(raw_text: &str, documents: &[RetrievedDocument]) -> Vec<Chunk> {
    if !documents.is_empty() {
        return documents
            .iter()
            .enumerate()
            .map(|(id, doc)| Chunk {
                id,
                source: doc
                    .metadata
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                page: doc
                    .metadata
                    .get("page")
                    .and_then(|v| v.as_u64())
                    .map(|p| p as u32),
                body: doc.content.clone(),
            })
            .collect();
    }

    raw_text
        .split("\n\n")
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(id, segment)| Chunk {
            id,
            source: None,
            page: None,
            body: segment.to_string(),
        })
        .collect()
}

/// Render all chunks as the critic's evaluation listing.
pub fn chunk_listing(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("=== CHUNK {} ===\n{}", chunk.id, chunk.block()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
