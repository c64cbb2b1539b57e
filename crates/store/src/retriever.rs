//! Pipeline retriever backed by the local store.

use crate::types::StoredChunk;
use critiq_core::AppResult;
use critiq_pipeline::{DocumentRetriever, RetrievedDocument};
use std::path::PathBuf;

/// Retrieval seam implementation over the SQLite store.
///
/// Opens the index per query; SQLite connections are not shareable across
/// threads, and queries are rare enough that reopening is the simpler
/// trade.
pub struct StoreRetriever {
    db_path: PathBuf,
    top_k: usize,
    min_score: f32,
}

impl StoreRetriever {
    pub fn new(db_path: PathBuf, top_k: usize, min_score: f32) -> Self {
        Self {
            db_path,
            top_k,
            min_score,
        }
    }
}

#[async_trait::async_trait]
impl DocumentRetriever for StoreRetriever {
    async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievedDocument>> {
        let results = crate::search(&self.db_path, query, self.top_k, self.min_score)?;

        Ok(results
            .into_iter()
            .map(|(chunk, score)| to_document(chunk, score))
            .collect())
    }
}

/// Map a stored chunk to the pipeline's document shape.
///
/// The chunk's metadata (source name, character range, hash) passes through;
/// the similarity score is added for diagnostics.
fn to_document(chunk: StoredChunk, score: f32) -> RetrievedDocument {
    let mut metadata = chunk.metadata;

    if let Some(map) = metadata.as_object_mut() {
        map.insert("score".to_string(), serde_json::json!(score));
        map.insert("position".to_string(), serde_json::json!(chunk.position));
    }

    RetrievedDocument {
        content: chunk.text,
        metadata,
    }
}
