//! SQLite-backed vector index for evidence chunks.

use crate::types::{StoreStats, StoredChunk, StoredSource};
use critiq_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;

/// Handle on the SQLite index.
///
/// Connections are cheap to open; callers that need concurrent access open
/// one handle per operation.
pub struct EvidenceIndex {
    conn: Connection,
}

impl EvidenceIndex {
    /// Open (creating if needed) the index database.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open SQLite index: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                content_type TEXT NOT NULL,
                indexed_at TEXT NOT NULL,
                size_bytes INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT,
                FOREIGN KEY (source_id) REFERENCES sources(id)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Ok(Self { conn })
    }

    /// Insert a source into the index.
    pub fn insert_source(&self, source: &StoredSource) -> AppResult<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sources (id, path, content_type, indexed_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    source.id,
                    source.path.to_string_lossy().to_string(),
                    source.content_type,
                    source.indexed_at.to_rfc3339(),
                    source.size_bytes as i64,
                ],
            )
            .map_err(|e| AppError::Store(format!("Failed to insert source: {}", e)))?;

        Ok(())
    }

    /// Insert a chunk with its embedding.
    pub fn insert_chunk(&self, chunk: &StoredChunk) -> AppResult<()> {
        let embedding = chunk
            .embedding
            .as_ref()
            .ok_or_else(|| AppError::Store("Chunk missing embedding".to_string()))?;

        let metadata_json = serde_json::to_string(&chunk.metadata)
            .map_err(|e| AppError::Store(format!("Failed to serialize metadata: {}", e)))?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    chunk.id,
                    chunk.source_id,
                    chunk.position as i64,
                    chunk.text,
                    embedding_to_bytes(embedding),
                    metadata_json,
                ],
            )
            .map_err(|e| AppError::Store(format!("Failed to insert chunk: {}", e)))?;

        Ok(())
    }

    /// Query the index for the top-k most similar chunks.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(StoredChunk, f32)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, source_id, position, text, embedding, metadata FROM chunks")
            .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

        let chunks_iter = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                let embedding = bytes_to_embedding(&embedding_bytes)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

                let metadata_json: String = row.get(5)?;
                let metadata: serde_json::Value = serde_json::from_str(&metadata_json)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

                Ok(StoredChunk {
                    id: row.get(0)?,
                    source_id: row.get(1)?,
                    position: row.get::<_, i64>(2)? as u32,
                    text: row.get(3)?,
                    embedding: Some(embedding),
                    metadata,
                })
            })
            .map_err(|e| AppError::Store(format!("Failed to query chunks: {}", e)))?;

        let mut results: Vec<(StoredChunk, f32)> = chunks_iter
            .filter_map(|r| r.ok())
            .map(|chunk| {
                let score = match chunk.embedding.as_ref() {
                    Some(embedding) => cosine_similarity(query_embedding, embedding),
                    None => 0.0,
                };
                (chunk, score)
            })
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!("Retrieved {} chunks (requested top-{})", results.len(), top_k);

        Ok(results)
    }

    /// Store-wide counts.
    pub fn stats(&self) -> AppResult<StoreStats> {
        let sources_count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sources", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Store(format!("Failed to count sources: {}", e)))?;

        let chunks_count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Store(format!("Failed to count chunks: {}", e)))?;

        Ok(StoreStats {
            sources_count,
            chunks_count,
            db_size_bytes: 0,
        })
    }

    /// Delete all indexed data.
    pub fn reset(&self) -> AppResult<()> {
        self.conn
            .execute("DELETE FROM chunks", [])
            .map_err(|e| AppError::Store(format!("Failed to delete chunks: {}", e)))?;

        self.conn
            .execute("DELETE FROM sources", [])
            .map_err(|e| AppError::Store(format!("Failed to delete sources: {}", e)))?;

        tracing::info!("Reset retrieval index");
        Ok(())
    }
}

/// Convert an embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert stored bytes back to an embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store("Invalid embedding bytes length".to_string()));
    }

    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        embedding.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(embedding)
}

/// Cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn test_source(id: &str) -> StoredSource {
        StoredSource {
            id: id.to_string(),
            path: "doc.txt".into(),
            content_type: "text".to_string(),
            indexed_at: Utc::now(),
            size_bytes: 100,
        }
    }

    fn test_chunk(id: &str, source_id: &str, text: &str, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            id: id.to_string(),
            source_id: source_id.to_string(),
            position: 0,
            text: text.to_string(),
            embedding: Some(embedding),
            metadata: serde_json::json!({"source": "doc.txt"}),
        }
    }

    #[test]
    fn test_open_creates_tables() {
        let temp_file = NamedTempFile::new().unwrap();
        let index = EvidenceIndex::open(temp_file.path()).unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.sources_count, 0);
        assert_eq!(stats.chunks_count, 0);
    }

    #[test]
    fn test_insert_and_search() {
        let temp_file = NamedTempFile::new().unwrap();
        let index = EvidenceIndex::open(temp_file.path()).unwrap();

        index.insert_source(&test_source("source1")).unwrap();
        index
            .insert_chunk(&test_chunk("chunk1", "source1", "aligned", vec![1.0, 0.0, 0.0]))
            .unwrap();
        index
            .insert_chunk(&test_chunk("chunk2", "source1", "orthogonal", vec![0.0, 1.0, 0.0]))
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 5).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "chunk1", "Most similar chunk comes first");
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_search_truncates_to_top_k() {
        let temp_file = NamedTempFile::new().unwrap();
        let index = EvidenceIndex::open(temp_file.path()).unwrap();

        index.insert_source(&test_source("source1")).unwrap();
        for i in 0..10 {
            index
                .insert_chunk(&test_chunk(
                    &format!("chunk{}", i),
                    "source1",
                    "text",
                    vec![1.0, i as f32, 0.0],
                ))
                .unwrap();
        }

        let results = index.search(&[1.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let temp_file = NamedTempFile::new().unwrap();
        let index = EvidenceIndex::open(temp_file.path()).unwrap();

        index.insert_source(&test_source("source1")).unwrap();
        index
            .insert_chunk(&test_chunk("chunk1", "source1", "text", vec![1.0]))
            .unwrap();

        index.reset().unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.sources_count, 0);
        assert_eq!(stats.chunks_count, 0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
