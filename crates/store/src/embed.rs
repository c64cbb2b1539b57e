//! Deterministic local embeddings.
//!
//! Content-aware bag-of-trigrams embedding, normalized to a unit vector.
//! Deterministic and dependency-free, which keeps indexing and search fully
//! local; swap in a real embedding provider behind the same signature for
//! production-grade recall.

use std::collections::{HashMap, HashSet};

/// Default embedding dimension.
pub const EMBEDDING_DIM: usize = 384;

/// Trigram-hash embedder.
#[derive(Debug, Clone)]
pub struct TrigramEmbedder {
    dim: usize,
}

impl TrigramEmbedder {
    pub fn new() -> Self {
        Self { dim: EMBEDDING_DIM }
    }

    pub fn with_dim(dim: usize) -> Self {
        Self { dim }
    }

    /// Embed text into a normalized vector.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dim];

        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split_whitespace()
            .filter(|w| !STOP_WORDS.contains(w) && w.len() > 2)
            .collect();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in &words {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            // Character trigrams spread each word over several dimensions
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let dim_idx = (hash_str(&trigram, 37) as usize) % self.dim;
                embedding[dim_idx] += (*freq as f32).sqrt();
            }

            // Whole-word signal
            let base_dim = (hash_str(word, 31) as usize) % self.dim;
            embedding[base_dim] += *freq as f32;
        }

        normalize(&mut embedding);
        embedding
    }
}

impl Default for TrigramEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_str(s: &str, multiplier: u64) -> u64 {
    s.bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(b as u64))
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in v.iter_mut() {
            *value /= norm;
        }
    }
}

/// Common English words filtered out for better discrimination.
static STOP_WORDS: std::sync::LazyLock<HashSet<&'static str>> = std::sync::LazyLock::new(|| {
    [
        "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to",
        "of", "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have",
        "has", "had", "it", "its", "their", "they", "them",
    ]
    .into_iter()
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_normalized() {
        let embedder = TrigramEmbedder::new();
        let embedding = embedder.embed("vector databases store embeddings");

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(embedding.len(), EMBEDDING_DIM);
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = TrigramEmbedder::new();
        let a = embedder.embed("same input text");
        let b = embedder.embed("same input text");
        assert_eq!(a, b);
    }

    #[test]
    fn test_similar_texts_are_closer_than_unrelated() {
        let embedder = TrigramEmbedder::new();
        let query = embedder.embed("vector database similarity search");
        let related = embedder.embed("vector databases support similarity search over embeddings");
        let unrelated = embedder.embed("pasta recipes require boiling water");

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };

        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let embedder = TrigramEmbedder::with_dim(16);
        let embedding = embedder.embed("");
        assert!(embedding.iter().all(|v| *v == 0.0));
        assert_eq!(embedding.len(), 16);
    }
}
