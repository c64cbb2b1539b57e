//! Integration tests for the indexing and retrieval path.

use critiq_pipeline::DocumentRetriever;
use critiq_store::{index_sources, search, stats, IndexOptions, StoreRetriever};
use std::fs;
use tempfile::TempDir;

fn seed_workspace() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();

    fs::write(
        dir.path().join("vectors.md"),
        "# Vector databases\n\nA vector database stores embeddings and answers \
         similarity search queries over them. Vector databases power retrieval \
         augmented generation systems.",
    )
    .unwrap();

    fs::write(
        dir.path().join("cooking.txt"),
        "Pasta recipes require boiling salted water. Cooking times vary by \
         pasta shape and thickness.",
    )
    .unwrap();

    let db_path = dir.path().join("index.sqlite");
    (dir, db_path)
}

#[test]
fn test_index_and_search_round_trip() {
    let (dir, db_path) = seed_workspace();

    let options = IndexOptions {
        paths: vec![dir.path().to_path_buf()],
        exclude: vec!["index.sqlite".to_string()],
        chunk_size: 256,
        chunk_overlap: 32,
        ..IndexOptions::default()
    };

    let index_stats = index_sources(&db_path, &options).unwrap();
    assert_eq!(index_stats.sources_count, 2);
    assert!(index_stats.chunks_count >= 2);

    let results = search(&db_path, "vector database similarity search", 5, 0.0).unwrap();
    assert!(!results.is_empty());

    // The vector-database chunk must outrank the cooking chunk
    assert!(results[0].0.text.contains("vector database"));

    let store_stats = stats(&db_path).unwrap();
    assert_eq!(store_stats.sources_count, 2);
    assert!(store_stats.db_size_bytes > 0);
}

#[test]
fn test_reindex_with_reset_replaces_content() {
    let (dir, db_path) = seed_workspace();

    let options = IndexOptions {
        paths: vec![dir.path().join("vectors.md")],
        ..IndexOptions::default()
    };
    index_sources(&db_path, &options).unwrap();

    let reset_options = IndexOptions {
        paths: vec![dir.path().join("cooking.txt")],
        reset: true,
        ..IndexOptions::default()
    };
    index_sources(&db_path, &reset_options).unwrap();

    let store_stats = stats(&db_path).unwrap();
    assert_eq!(store_stats.sources_count, 1);
}

#[tokio::test]
async fn test_store_retriever_returns_documents() {
    let (dir, db_path) = seed_workspace();

    let options = IndexOptions {
        paths: vec![dir.path().to_path_buf()],
        exclude: vec!["index.sqlite".to_string()],
        ..IndexOptions::default()
    };
    index_sources(&db_path, &options).unwrap();

    let retriever = StoreRetriever::new(db_path, 3, 0.0);
    let documents = retriever
        .retrieve("what does a vector database store?")
        .await
        .unwrap();

    assert!(!documents.is_empty());
    assert!(documents[0].metadata.get("source").is_some());
    assert!(documents[0].metadata.get("score").is_some());
}
