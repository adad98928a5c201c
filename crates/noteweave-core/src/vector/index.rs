use crate::error::{NoteweaveError, Result};
use crate::types::{Embedding, NoteId};
use instant_distance::{Builder, HnswMap, Point, Search};
use rayon::prelude::*;
use std::collections::HashMap;

/// Result from a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub note_id: NoteId,
    pub score: f32,    // Cosine similarity, 0.0 to 1.0
    pub distance: f32, // 1.0 - score
}

/// Trait for vector similarity search over note embeddings
pub trait VectorIndex: Send + Sync {
    /// Add or replace the vector for a note.
    fn insert(&mut self, id: NoteId, embedding: &Embedding) -> Result<()>;

    /// Remove a vector.
    fn remove(&mut self, id: NoteId) -> Result<()>;

    /// Find the K nearest neighbors to a query vector.
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SimilarityResult>>;

    /// Up to `k` vectors with similarity at or above `threshold`, best first.
    fn search_threshold(
        &self,
        query: &Embedding,
        threshold: f32,
        k: usize,
    ) -> Result<Vec<SimilarityResult>>;

    /// Number of vectors in the index.
    fn len(&self) -> usize;

    /// Check if index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild the index from scratch (after bulk inserts).
    fn rebuild(&mut self) -> Result<()>;
}

/// Cosine similarity of two vectors. Zero when either has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Wrapper for embeddings to implement Point trait
#[derive(Clone, Debug)]
struct EmbeddingPoint(Vec<f32>);

impl Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Cosine distance = 1 - cosine similarity
        1.0 - cosine_similarity(&self.0, &other.0)
    }
}

/// HNSW-based vector index implementation
pub struct HnswIndex {
    /// The HNSW graph, None until the first rebuild
    index: Option<HnswMap<EmbeddingPoint, NoteId>>,

    /// Raw data for rebuilding and brute-force search
    vectors: HashMap<NoteId, Vec<f32>>,

    /// Embedding dimension
    dimension: usize,

    /// Inserts or removals since the last rebuild
    dirty: bool,
}

impl HnswIndex {
    /// Create a new empty HNSW index
    pub fn new(dimension: usize) -> Self {
        Self {
            index: None,
            vectors: HashMap::new(),
            dimension,
            dirty: false,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.vectors.contains_key(id)
    }

    /// Whether the HNSW graph lags behind the stored vectors
    pub fn is_stale(&self) -> bool {
        self.dirty
    }

    /// Convert distance to similarity score
    fn distance_to_similarity(distance: f32) -> f32 {
        (1.0 - distance).clamp(0.0, 1.0)
    }

    /// Exact search, used until the HNSW graph is built or while it is stale
    fn brute_force_search(&self, query: &Embedding, k: usize) -> Vec<SimilarityResult> {
        let query_point = EmbeddingPoint(query.clone());
        let mut results: Vec<SimilarityResult> = self
            .vectors
            .par_iter()
            .map(|(id, vec)| {
                let distance = query_point.distance(&EmbeddingPoint(vec.clone()));
                SimilarityResult {
                    note_id: *id,
                    score: Self::distance_to_similarity(distance),
                    distance,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.note_id.cmp(&b.note_id))
        });
        results.truncate(k);
        results
    }
}

impl VectorIndex for HnswIndex {
    fn insert(&mut self, id: NoteId, embedding: &Embedding) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(NoteweaveError::Validation(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        self.vectors.insert(id, embedding.clone());
        self.dirty = true;
        Ok(())
    }

    fn remove(&mut self, id: NoteId) -> Result<()> {
        if self.vectors.remove(&id).is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SimilarityResult>> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(NoteweaveError::Validation(format!(
                "Query dimension mismatch: expected {}, got {}",
                self.dimension,
                query.len()
            )));
        }

        let index = match (&self.index, self.dirty) {
            (Some(index), false) => index,
            _ => return Ok(self.brute_force_search(query, k)),
        };

        let query_point = EmbeddingPoint(query.clone());
        let mut search = Search::default();

        Ok(index
            .search(&query_point, &mut search)
            .take(k)
            .map(|item| SimilarityResult {
                note_id: *item.value,
                score: Self::distance_to_similarity(item.distance),
                distance: item.distance,
            })
            .collect())
    }

    fn search_threshold(
        &self,
        query: &Embedding,
        threshold: f32,
        k: usize,
    ) -> Result<Vec<SimilarityResult>> {
        let results = self.search(query, self.vectors.len().max(1))?;

        Ok(results
            .into_iter()
            .filter(|r| r.score >= threshold)
            .take(k)
            .collect())
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn rebuild(&mut self) -> Result<()> {
        self.dirty = false;

        if self.vectors.is_empty() {
            self.index = None;
            return Ok(());
        }

        let mut points = Vec::with_capacity(self.vectors.len());
        let mut values = Vec::with_capacity(self.vectors.len());

        for (id, vec) in &self.vectors {
            points.push(EmbeddingPoint(vec.clone()));
            values.push(*id);
        }

        self.index = Some(Builder::default().build(points, values));
        Ok(())
    }
}
