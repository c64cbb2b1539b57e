//! Local retrieval store for critiq.
//!
//! Indexes text, markdown, and HTML sources into a SQLite-backed vector
//! index and serves cosine top-k chunk retrieval. The pipeline consumes this
//! through its retriever seam; see [`StoreRetriever`].

pub mod chunker;
pub mod embed;
pub mod index;
pub mod parser;
pub mod retriever;
pub mod types;

// Re-export commonly used types
pub use embed::TrigramEmbedder;
pub use index::EvidenceIndex;
pub use retriever::StoreRetriever;
pub use types::{IndexOptions, IndexStats, StoreStats, StoredChunk, StoredSource};

use chrono::Utc;
use critiq_core::AppResult;
use std::path::Path;
use std::time::Instant;
use walkdir::WalkDir;

/// Index sources into the store.
pub fn index_sources(db_path: &Path, options: &IndexOptions) -> AppResult<IndexStats> {
    let start = Instant::now();

    tracing::info!("Indexing {} paths", options.paths.len());

    let index = EvidenceIndex::open(db_path)?;

    if options.reset {
        tracing::info!("Resetting index before indexing");
        index.reset()?;
    }

    let embedder = TrigramEmbedder::new();

    let mut sources_count = 0u32;
    let mut chunks_count = 0u32;
    let mut bytes_processed = 0u64;

    for path in &options.paths {
        if path.is_file() {
            if let Ok((chunks, bytes)) = index_file(&index, &embedder, path, options) {
                sources_count += 1;
                chunks_count += chunks;
                bytes_processed += bytes;
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && should_include(entry_path, options) {
                    if let Ok((chunks, bytes)) = index_file(&index, &embedder, entry_path, options)
                    {
                        sources_count += 1;
                        chunks_count += chunks;
                        bytes_processed += bytes;
                    }
                }
            }
        }
    }

    let duration = start.elapsed();

    tracing::info!(
        "Indexed {} sources, {} chunks, {} bytes in {:.2}s",
        sources_count,
        chunks_count,
        bytes_processed,
        duration.as_secs_f64()
    );

    Ok(IndexStats {
        sources_count,
        chunks_count,
        bytes_processed,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Index a single file.
fn index_file(
    index: &EvidenceIndex,
    embedder: &TrigramEmbedder,
    path: &Path,
    options: &IndexOptions,
) -> AppResult<(u32, u64)> {
    tracing::debug!("Indexing file: {:?}", path);

    let text = parser::parse_file(path)?;
    let size_bytes = text.len() as u64;

    let source_id = uuid::Uuid::new_v4().to_string();
    let source = StoredSource {
        id: source_id.clone(),
        path: path.to_path_buf(),
        content_type: parser::ContentType::from_path(path).as_str().to_string(),
        indexed_at: Utc::now(),
        size_bytes,
    };

    index.insert_source(&source)?;

    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    let candidates = chunker::chunk_text(
        &source_id,
        &source_name,
        &text,
        options.chunk_size,
        options.chunk_overlap,
    );

    let mut chunks_count = 0u32;

    for candidate in candidates {
        let embedding = embedder.embed(&candidate.text);

        let chunk = StoredChunk {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: candidate.source_id,
            position: candidate.position,
            text: candidate.text,
            embedding: Some(embedding),
            metadata: candidate.metadata,
        };

        index.insert_chunk(&chunk)?;
        chunks_count += 1;
    }

    tracing::debug!("Indexed {:?}: {} chunks, {} bytes", path, chunks_count, size_bytes);

    Ok((chunks_count, size_bytes))
}

/// Check if a file should be indexed based on the include/exclude patterns.
fn should_include(path: &Path, options: &IndexOptions) -> bool {
    let path_str = path.to_string_lossy();

    for pattern in &options.exclude {
        if path_str.contains(pattern) {
            return false;
        }
    }

    if !options.include.is_empty() {
        return options
            .include
            .iter()
            .any(|pattern| path_str.contains(pattern));
    }

    true
}

/// Query the store for the top-k chunks above a similarity floor.
pub fn search(
    db_path: &Path,
    query: &str,
    top_k: usize,
    min_score: f32,
) -> AppResult<Vec<(StoredChunk, f32)>> {
    let index = EvidenceIndex::open(db_path)?;
    let embedder = TrigramEmbedder::new();

    let query_embedding = embedder.embed(query);
    let results = index.search(&query_embedding, top_k)?;

    let filtered: Vec<_> = results
        .into_iter()
        .filter(|(_chunk, score)| *score >= min_score)
        .collect();

    if filtered.is_empty() {
        tracing::info!("No relevant chunks found (all scores below {:.2})", min_score);
    } else {
        tracing::info!(
            "Retrieved {} relevant chunks (top score: {:.3})",
            filtered.len(),
            filtered.first().map(|(_, s)| *s).unwrap_or(0.0)
        );
    }

    Ok(filtered)
}

/// Get statistics for the store.
pub fn stats(db_path: &Path) -> AppResult<StoreStats> {
    let index = EvidenceIndex::open(db_path)?;
    let mut stats = index.stats()?;

    stats.db_size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_should_include_excludes_win() {
        let options = IndexOptions {
            include: vec!["docs".to_string()],
            exclude: vec!["draft".to_string()],
            ..IndexOptions::default()
        };

        assert!(should_include(&PathBuf::from("docs/final.md"), &options));
        assert!(!should_include(&PathBuf::from("docs/draft.md"), &options));
        assert!(!should_include(&PathBuf::from("other/file.md"), &options));
    }

    #[test]
    fn test_should_include_defaults_to_everything() {
        let options = IndexOptions::default();
        assert!(should_include(&PathBuf::from("any/file.txt"), &options));
    }
}
