use super::*;
use crate::error::{NoteweaveError, Result};
use crate::storage::{RedbStorage, Storage};
use crate::types::{Edge, Embedding, Note, NoteId, Visibility};
use crate::vector::{EmbeddingProvider, SimilarityMatch, VectorSearch};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const LONG_TEXT: &str = "A long enough subject text about entangled particles";

// === Fake capabilities ===

struct FixedEmbedder(Embedding);

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Ok(self.0.clone())
    }
    fn dimension(&self) -> usize {
        self.0.len()
    }
    fn model_name(&self) -> &str {
        "fixed"
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Err(NoteweaveError::Capability("no credentials".into()))
    }
    fn dimension(&self) -> usize {
        0
    }
    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Returns canned hits and counts calls
#[derive(Default)]
struct FixedSearch {
    hits: Vec<SimilarityMatch>,
    calls: AtomicUsize,
}

impl FixedSearch {
    fn new(hits: Vec<(NoteId, f32)>) -> Self {
        Self {
            hits: hits
                .into_iter()
                .map(|(note_id, similarity)| SimilarityMatch {
                    note_id,
                    similarity,
                })
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorSearch for FixedSearch {
    async fn search(
        &self,
        _query: &Embedding,
        threshold: f32,
        count: usize,
    ) -> Result<Vec<SimilarityMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .hits
            .iter()
            .filter(|h| h.similarity >= threshold)
            .take(count)
            .cloned()
            .collect())
    }
}

struct FailingSearch;

#[async_trait]
impl VectorSearch for FailingSearch {
    async fn search(&self, _q: &Embedding, _t: f32, _c: usize) -> Result<Vec<SimilarityMatch>> {
        Err(NoteweaveError::Capability("vector store unreachable".into()))
    }
}

struct SlowSearch;

#[async_trait]
impl VectorSearch for SlowSearch {
    async fn search(&self, _q: &Embedding, _t: f32, _c: usize) -> Result<Vec<SimilarityMatch>> {
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        Ok(Vec::new())
    }
}

// === Helpers ===

fn create_test_storage() -> (Arc<RedbStorage>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let storage = RedbStorage::open(temp_dir.path().join("suggest.redb")).unwrap();
    (Arc::new(storage), temp_dir)
}

fn add_note(
    storage: &RedbStorage,
    owner: &str,
    visibility: Visibility,
    title: &str,
    tags: &[&str],
    age_days: i64,
) -> Note {
    let mut note = Note::new(owner, visibility, title, "body").with_tags(tags.iter().copied());
    note.created_at = Utc::now() - Duration::days(age_days);
    storage.put_note(&note).unwrap();
    note
}

fn ranker(storage: &Arc<RedbStorage>) -> SuggestionRanker<RedbStorage> {
    SuggestionRanker::new(storage.clone(), SuggestConfig::default()).unwrap()
}

fn semantic_ranker(
    storage: &Arc<RedbStorage>,
    search: Arc<dyn VectorSearch>,
) -> SuggestionRanker<RedbStorage> {
    ranker(storage)
        .with_embedder(Arc::new(FixedEmbedder(vec![1.0, 0.0])))
        .with_vector_search(search)
}

// === Fallback path ===

#[tokio::test]
async fn test_fallback_prefers_recent_with_equal_tags() {
    let (storage, _temp) = create_test_storage();
    let old = add_note(&storage, "u2", Visibility::Public, "Old", &["physics"], 30);
    let mid = add_note(&storage, "u2", Visibility::Public, "Mid", &["physics"], 10);
    let new = add_note(&storage, "u2", Visibility::Public, "New", &["physics"], 1);

    let request = SuggestRequest::new("short", 5).with_tags(["physics"]);
    let results = ranker(&storage).suggest(&request).await;

    let ids: Vec<_> = results.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![new.id, mid.id, old.id]);
    assert!((results[0].score - 0.3).abs() < 1e-6);
    assert!((results[1].score - 0.2).abs() < 1e-6);
    assert!(results.iter().all(|s| s.similarity.is_none()));
}

#[tokio::test]
async fn test_fallback_more_shared_tags_rank_higher() {
    let (storage, _temp) = create_test_storage();
    let one = add_note(&storage, "u2", Visibility::Public, "One", &["physics"], 1);
    let two = add_note(&storage, "u2", Visibility::Public, "Two", &["physics", "math"], 20);
    add_note(&storage, "u2", Visibility::Public, "None", &["cooking"], 1);

    let request = SuggestRequest::new("", 5).with_tags(["physics", "math"]);
    let results = ranker(&storage).suggest(&request).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, two.id);
    assert_eq!(results[1].id, one.id);
}

#[tokio::test]
async fn test_fallback_repeated_request_tag_counts_once() {
    let (storage, _temp) = create_test_storage();
    let old = add_note(&storage, "u2", Visibility::Public, "Old", &["physics"], 30);

    let request = SuggestRequest::new("", 5).with_tags(["Physics", "physics", "#PHYSICS", "++"]);
    assert_eq!(request.tags, vec!["physics".to_string()]);

    let results = ranker(&storage).suggest(&request).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, old.id);
    assert!((results[0].score - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn test_fallback_without_tags_returns_recent_public() {
    let (storage, _temp) = create_test_storage();
    let older = add_note(&storage, "u2", Visibility::Public, "Older", &[], 5);
    let newer = add_note(&storage, "u2", Visibility::Public, "Newer", &[], 1);
    add_note(&storage, "u2", Visibility::Private, "Hidden", &[], 0);

    let results = ranker(&storage).suggest(&SuggestRequest::new("tiny", 10)).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, newer.id);
    assert_eq!(results[1].id, older.id);
    assert!(results.iter().all(|s| (s.score - 0.1).abs() < 1e-6));
}

#[tokio::test]
async fn test_viewer_sees_own_private_notes() {
    let (storage, _temp) = create_test_storage();
    let mine = add_note(&storage, "u1", Visibility::Private, "Mine", &["x"], 1);
    add_note(&storage, "u2", Visibility::Private, "Theirs", &["x"], 1);

    let request = SuggestRequest::new("", 10).with_tags(["x"]).with_viewer("u1");
    let results = ranker(&storage).suggest(&request).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, mine.id);
}

#[tokio::test]
async fn test_deleted_notes_never_suggested() {
    let (storage, _temp) = create_test_storage();
    let gone = add_note(&storage, "u2", Visibility::Public, "Gone", &["x"], 1);
    storage.delete_note(gone.id).unwrap();

    let request = SuggestRequest::new("", 10).with_tags(["x"]);
    assert!(ranker(&storage).suggest(&request).await.is_empty());
}

#[tokio::test]
async fn test_short_text_skips_semantic_path() {
    let (storage, _temp) = create_test_storage();
    let hit = add_note(&storage, "u2", Visibility::Public, "Hit", &[], 1);
    let search = Arc::new(FixedSearch::new(vec![(hit.id, 0.9)]));

    let results = semantic_ranker(&storage, search.clone())
        .suggest(&SuggestRequest::new("too short", 5))
        .await;

    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    assert!(results.iter().all(|s| s.similarity.is_none()));
}

// === Semantic path ===

#[tokio::test]
async fn test_semantic_scoring_and_order() {
    let (storage, _temp) = create_test_storage();
    let a = add_note(&storage, "u2", Visibility::Public, "A", &["physics"], 30);
    let b = add_note(&storage, "u2", Visibility::Public, "B", &[], 1);
    let c = add_note(&storage, "u2", Visibility::Public, "C", &[], 30);

    let search = Arc::new(FixedSearch::new(vec![(a.id, 0.7), (b.id, 0.78), (c.id, 0.6)]));
    let request = SuggestRequest::new(LONG_TEXT, 10).with_tags(["physics"]);
    let results = semantic_ranker(&storage, search).suggest(&request).await;

    // b: 0.78 + recency 0.05, a: 0.7 + one shared tag 0.1, c: 0.6
    let ids: Vec<_> = results.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![b.id, a.id, c.id]);
    assert!((results[0].score - 0.83).abs() < 1e-5);
    assert!((results[1].score - 0.8).abs() < 1e-5);
    assert!((results[2].score - 0.6).abs() < 1e-5);
    assert_eq!(results[0].similarity, Some(0.78));
}

#[tokio::test]
async fn test_semantic_excludes_subject_and_neighbours() {
    let (storage, _temp) = create_test_storage();
    let subject = add_note(&storage, "u1", Visibility::Public, "Subject", &[], 1);
    let linked_to = add_note(&storage, "u2", Visibility::Public, "Linked To", &[], 1);
    let links_in = add_note(&storage, "u2", Visibility::Public, "Links In", &[], 1);
    let fresh = add_note(&storage, "u2", Visibility::Public, "Fresh", &[], 1);

    storage
        .insert_edges(&[
            Edge::new(subject.id, linked_to.id, "out", "u1"),
            Edge::new(links_in.id, subject.id, "in", "u2"),
        ])
        .unwrap();

    let search = Arc::new(FixedSearch::new(vec![
        (subject.id, 0.99),
        (linked_to.id, 0.95),
        (links_in.id, 0.9),
        (fresh.id, 0.6),
    ]));

    let request = SuggestRequest::new(LONG_TEXT, 10).with_subject(subject.id);
    let results = semantic_ranker(&storage, search).suggest(&request).await;

    let ids: Vec<_> = results.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![fresh.id]);
}

#[tokio::test]
async fn test_stored_subject_embedding_used_without_embedder() {
    let (storage, _temp) = create_test_storage();
    let mut subject = add_note(&storage, "u1", Visibility::Public, "Subject", &[], 1);
    subject.embedding = Some(vec![1.0, 0.0]);
    storage.put_note(&subject).unwrap();
    let other = add_note(&storage, "u2", Visibility::Public, "Other", &[], 1);

    let search = Arc::new(FixedSearch::new(vec![(other.id, 0.8)]));
    let ranker = ranker(&storage).with_vector_search(search.clone());

    let request = SuggestRequest::new(LONG_TEXT, 5).with_subject(subject.id);
    let results = ranker.suggest(&request).await;

    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(results[0].similarity, Some(0.8));
}

#[tokio::test]
async fn test_overfetch_requests_three_times_limit() {
    let (storage, _temp) = create_test_storage();
    let mut hits = Vec::new();
    for i in 0..10 {
        let note = add_note(&storage, "u2", Visibility::Public, &format!("N{}", i), &[], 1);
        hits.push((note.id, 0.9 - i as f32 * 0.01));
    }
    // The first two hits are private to someone else and get filtered
    for (id, _) in hits.iter().take(2) {
        let mut note = storage.get_note(*id).unwrap().unwrap();
        note.visibility = Visibility::Private;
        storage.put_note(&note).unwrap();
    }

    let search = Arc::new(FixedSearch::new(hits));
    let results = semantic_ranker(&storage, search)
        .suggest(&SuggestRequest::new(LONG_TEXT, 2))
        .await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|s| s.similarity.is_some()));
}

// === Degradation ===

#[tokio::test]
async fn test_failing_search_falls_back() {
    let (storage, _temp) = create_test_storage();
    for i in 0..5 {
        add_note(&storage, "u2", Visibility::Public, &format!("T{}", i), &["x"], i);
    }

    let request = SuggestRequest::new(LONG_TEXT, 3).with_tags(["x"]);
    let results = semantic_ranker(&storage, Arc::new(FailingSearch))
        .suggest(&request)
        .await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|s| s.similarity.is_none()));
}

#[tokio::test]
async fn test_failing_embedder_falls_back() {
    let (storage, _temp) = create_test_storage();
    add_note(&storage, "u2", Visibility::Public, "T", &["x"], 1);
    let search = Arc::new(FixedSearch::new(Vec::new()));

    let ranker = ranker(&storage)
        .with_embedder(Arc::new(FailingEmbedder))
        .with_vector_search(search.clone());
    let results = ranker
        .suggest(&SuggestRequest::new(LONG_TEXT, 3).with_tags(["x"]))
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_slow_search_times_out_to_fallback() {
    let (storage, _temp) = create_test_storage();
    add_note(&storage, "u2", Visibility::Public, "T", &["x"], 1);

    let config =
        SuggestConfig::new().with_capability_timeout(std::time::Duration::from_millis(50));
    let ranker = SuggestionRanker::new(storage.clone(), config)
        .unwrap()
        .with_embedder(Arc::new(FixedEmbedder(vec![1.0, 0.0])))
        .with_vector_search(Arc::new(SlowSearch));

    let started = std::time::Instant::now();
    let results = ranker
        .suggest(&SuggestRequest::new(LONG_TEXT, 3).with_tags(["x"]))
        .await;

    assert_eq!(results.len(), 1);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn test_empty_semantic_result_falls_back() {
    let (storage, _temp) = create_test_storage();
    let tagged = add_note(&storage, "u2", Visibility::Public, "T", &["x"], 1);

    let results = semantic_ranker(&storage, Arc::new(FixedSearch::new(Vec::new())))
        .suggest(&SuggestRequest::new(LONG_TEXT, 3).with_tags(["x"]))
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, tagged.id);
}

#[tokio::test]
async fn test_limits() {
    let (storage, _temp) = create_test_storage();
    for i in 0..8 {
        add_note(&storage, "u2", Visibility::Public, &format!("L{}", i), &[], 1);
    }

    let r = ranker(&storage);
    assert!(r.suggest(&SuggestRequest::new("", 0)).await.is_empty());
    assert_eq!(r.suggest(&SuggestRequest::new("", 3)).await.len(), 3);

    let capped = SuggestionRanker::new(storage.clone(), SuggestConfig::new().with_max_limit(2))
        .unwrap();
    assert_eq!(capped.suggest(&SuggestRequest::new("", 50)).await.len(), 2);
}
