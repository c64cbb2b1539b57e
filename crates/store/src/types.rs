//! Retrieval store type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source document tracked by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSource {
    /// Unique source identifier
    pub id: String,

    /// Source file path
    pub path: PathBuf,

    /// Content type ("markdown", "html", "text", ...)
    pub content_type: String,

    /// When this source was indexed
    pub indexed_at: DateTime<Utc>,

    /// Source size in bytes
    pub size_bytes: u64,
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector (normalized)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Metadata (source name, character range, content hash)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Options for the indexing operation.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Files or directories to index
    pub paths: Vec<PathBuf>,

    /// Substring include patterns; when non-empty, a file must match one
    pub include: Vec<String>,

    /// Substring exclude patterns
    pub exclude: Vec<String>,

    /// Drop existing index content first
    pub reset: bool,

    /// Character window for chunking
    pub chunk_size: usize,

    /// Overlap between adjacent chunks
    pub chunk_overlap: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            reset: false,
            chunk_size: 512,
            chunk_overlap: 64,
        }
    }
}

/// Result of one indexing operation.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub sources_count: u32,
    pub chunks_count: u32,
    pub bytes_processed: u64,
    pub duration_secs: f64,
}

/// Store-wide counts.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub sources_count: u32,
    pub chunks_count: u32,
    pub db_size_bytes: u64,
}
