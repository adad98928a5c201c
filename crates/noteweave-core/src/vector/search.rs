use crate::error::{NoteweaveError, Result};
use crate::types::{Embedding, NoteId};
use crate::vector::index::VectorIndex;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// A nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    pub note_id: NoteId,
    /// Cosine similarity, 0.0 to 1.0
    pub similarity: f32,
}

/// Nearest-neighbour lookup by vector. May be remote, slow or failing.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Up to `count` notes with similarity >= `threshold`, best first.
    async fn search(
        &self,
        query: &Embedding,
        threshold: f32,
        count: usize,
    ) -> Result<Vec<SimilarityMatch>>;
}

#[async_trait]
impl<V: VectorSearch + ?Sized> VectorSearch for Arc<V> {
    async fn search(
        &self,
        query: &Embedding,
        threshold: f32,
        count: usize,
    ) -> Result<Vec<SimilarityMatch>> {
        (**self).search(query, threshold, count).await
    }
}

/// In-process search over a shared [`VectorIndex`]
pub struct LocalVectorSearch<V: VectorIndex> {
    index: Arc<RwLock<V>>,
}

impl<V: VectorIndex> Clone for LocalVectorSearch<V> {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
        }
    }
}

impl<V: VectorIndex> LocalVectorSearch<V> {
    pub fn new(index: V) -> Self {
        Self {
            index: Arc::new(RwLock::new(index)),
        }
    }

    pub fn upsert(&self, id: NoteId, embedding: &Embedding) -> Result<()> {
        self.index.write().map_err(|_| Self::poisoned())?.insert(id, embedding)
    }

    pub fn remove(&self, id: NoteId) -> Result<()> {
        self.index.write().map_err(|_| Self::poisoned())?.remove(id)
    }

    pub fn rebuild(&self) -> Result<()> {
        self.index.write().map_err(|_| Self::poisoned())?.rebuild()
    }

    pub fn len(&self) -> usize {
        self.index.read().map(|index| index.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> NoteweaveError {
        NoteweaveError::Capability("Vector index lock poisoned".to_string())
    }
}

#[async_trait]
impl<V: VectorIndex + 'static> VectorSearch for LocalVectorSearch<V> {
    async fn search(
        &self,
        query: &Embedding,
        threshold: f32,
        count: usize,
    ) -> Result<Vec<SimilarityMatch>> {
        let index = self.index.read().map_err(|_| Self::poisoned())?;
        let results = index.search_threshold(query, threshold, count)?;

        Ok(results
            .into_iter()
            .map(|r| SimilarityMatch {
                note_id: r.note_id,
                similarity: r.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::HnswIndex;

    #[tokio::test]
    async fn test_local_search_threshold_and_count() {
        let search = LocalVectorSearch::new(HnswIndex::new(2));
        let close = NoteId::now_v7();
        let near = NoteId::now_v7();
        let far = NoteId::now_v7();

        search.upsert(close, &vec![1.0, 0.0]).unwrap();
        search.upsert(near, &vec![0.8, 0.2]).unwrap();
        search.upsert(far, &vec![0.0, 1.0]).unwrap();
        search.rebuild().unwrap();

        let hits = search.search(&vec![1.0, 0.0], 0.5, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].note_id, close);
        assert!(hits.iter().all(|h| h.similarity >= 0.5));

        let one = search.search(&vec![1.0, 0.0], 0.5, 1).await.unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_handle_sees_writes() {
        let search = LocalVectorSearch::new(HnswIndex::new(2));
        let other = search.clone();

        other.upsert(NoteId::now_v7(), &vec![1.0, 0.0]).unwrap();
        assert_eq!(search.len(), 1);
    }
}
