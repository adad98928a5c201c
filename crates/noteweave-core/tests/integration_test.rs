use async_trait::async_trait;
use noteweave_core::*;
use std::sync::Arc;
use tempfile::tempdir;

fn open_library(dir: &tempfile::TempDir) -> Noteweave {
    let storage = Arc::new(RedbStorage::open(dir.path().join("test.redb")).unwrap());
    Noteweave::with_parts(storage, Arc::new(Disabled), LibraryConfig::default()).unwrap()
}

fn put(storage: &RedbStorage, owner: &str, visibility: Visibility, title: &str) -> Note {
    let note = Note::new(owner, visibility, title, "");
    storage.put_note(&note).unwrap();
    note
}

// ── Synchronisation scenarios ────────────────────────────────────────────────

#[test]
fn test_repeated_mention_yields_one_edge() {
    let dir = tempdir().unwrap();
    let storage = Arc::new(RedbStorage::open(dir.path().join("test.redb")).unwrap());
    let sink = Arc::new(MemorySink::new());
    let synchronizer =
        GraphSynchronizer::new(storage.clone(), sink.clone(), LinkerConfig::default()).unwrap();

    let target = put(&storage, "bob", Visibility::Public, "Quantum Entanglement");
    let source = put(&storage, "alice", Visibility::Public, "Source");

    let report = synchronizer
        .sync(
            source.id,
            "See [[Quantum Entanglement]] and [[Quantum Entanglement]] again.",
            "alice",
        )
        .unwrap();

    assert_eq!(report.valid_links, 1);
    let edges = storage.edges_from(source.id).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target, target.id);
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_private_target_of_another_user_is_not_linked() {
    let dir = tempdir().unwrap();
    let storage = Arc::new(RedbStorage::open(dir.path().join("test.redb")).unwrap());
    let sink = Arc::new(MemorySink::new());
    let synchronizer =
        GraphSynchronizer::new(storage.clone(), sink.clone(), LinkerConfig::default()).unwrap();

    put(&storage, "user-2", Visibility::Private, "B");
    let a = put(&storage, "user-1", Visibility::Public, "A");

    let report = synchronizer.sync(a.id, "Mentions [[B]].", "user-1").unwrap();

    assert_eq!(report.valid_links, 0);
    assert_eq!(report.unresolved, 1);
    assert!(storage.edges_from(a.id).unwrap().is_empty());
    assert!(sink.is_empty());
}

#[test]
fn test_identical_resync_is_idempotent() {
    let dir = tempdir().unwrap();
    let storage = Arc::new(RedbStorage::open(dir.path().join("test.redb")).unwrap());
    let sink = Arc::new(MemorySink::new());
    let synchronizer =
        GraphSynchronizer::new(storage.clone(), sink.clone(), LinkerConfig::default()).unwrap();

    let b = put(&storage, "bob", Visibility::Public, "B");
    let a = put(&storage, "alice", Visibility::Public, "A");
    let text = "Sentence mentioning [[B]].";

    synchronizer.sync(a.id, text, "alice").unwrap();
    let first = storage.edges_from(a.id).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].context, "Sentence mentioning [[B]].");
    assert_eq!(first[0].target, b.id);

    let report = synchronizer.sync(a.id, text, "alice").unwrap();
    let second = storage.edges_from(a.id).unwrap();

    assert_eq!(report.created, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(sink.len(), 1, "no second notification");
}

#[test]
fn test_removed_mention_deletes_edge() {
    let dir = tempdir().unwrap();
    let nw = open_library(&dir);

    let (b, _) = nw.create_note("bob", Visibility::Public, "B", "", &[]).unwrap();
    let (a, report) = nw
        .create_note("alice", Visibility::Public, "A", "Sentence mentioning [[B]].", &[])
        .unwrap();
    assert_eq!(report.valid_links, 1);
    assert!(nw.storage().edge_between(a.id, b.id).unwrap().is_some());

    let (_, report) = nw.update_body(a.id, "No links any more.", "alice").unwrap();

    assert_eq!(report.valid_links, 0);
    assert_eq!(report.removed, 1);
    assert!(nw.storage().edge_between(a.id, b.id).unwrap().is_none());
    assert!(nw.storage().edges_to(b.id).unwrap().is_empty());
}

#[test]
fn test_no_self_links() {
    let dir = tempdir().unwrap();
    let nw = open_library(&dir);

    let (note, report) = nw
        .create_note("alice", Visibility::Public, "Ouroboros", "I am [[Ouroboros]].", &[])
        .unwrap();

    assert_eq!(report.valid_links, 0);
    assert!(nw.storage().edges_from(note.id).unwrap().is_empty());
}

#[test]
fn test_edge_count_equals_distinct_titles() {
    let dir = tempdir().unwrap();
    let nw = open_library(&dir);

    for title in ["One", "Two", "Three"] {
        nw.create_note("alice", Visibility::Public, title, "", &[]).unwrap();
    }
    let (hub, report) = nw
        .create_note(
            "alice",
            Visibility::Public,
            "Hub",
            "[[One]] [[Two]]. [[One]] again! [[Three]]? [[Missing]] [[Two]]",
            &[],
        )
        .unwrap();

    assert_eq!(report.valid_links, 3);
    assert_eq!(report.unresolved, 1);
    assert_eq!(nw.storage().edges_from(hub.id).unwrap().len(), 3);

    for edge in nw.storage().edges_from(hub.id).unwrap() {
        let target = nw.get_note(edge.target).unwrap().unwrap();
        assert!(edge.context.contains(&format!("[[{}]]", target.title)));
    }
}

#[test]
fn test_edges_survive_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.redb");

    let (a_id, b_id) = {
        let nw = Noteweave::open(&db_path, LibraryConfig::default()).unwrap();
        let (b, _) = nw.create_note("bob", Visibility::Public, "B", "", &[]).unwrap();
        let (a, _) = nw
            .create_note("alice", Visibility::Public, "A", "Links [[B]].", &[])
            .unwrap();
        (a.id, b.id)
    };

    let nw = Noteweave::open(&db_path, LibraryConfig::default()).unwrap();
    let edge = nw
        .storage()
        .edge_between(a_id, b_id)
        .unwrap()
        .expect("edge should survive reopen");
    assert_eq!(edge.context, "Links [[B]].");
    assert_eq!(nw.stats().unwrap().pending_events, 1);
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[test]
fn test_outbox_redelivers_after_failure() {
    let dir = tempdir().unwrap();
    let nw = open_library(&dir);

    nw.create_note("bob", Visibility::Public, "B", "", &[]).unwrap();
    nw.create_note("carol", Visibility::Public, "C", "", &[]).unwrap();
    nw.create_note("alice", Visibility::Public, "A", "[[B]] and [[C]]", &[])
        .unwrap();

    let delivered = nw
        .drain_outbox(10, |event| {
            if event.recipient == "carol" {
                Err(NoteweaveError::Capability("mail server down".into()))
            } else {
                Ok(())
            }
        })
        .unwrap();
    assert_eq!(delivered, 1);

    let mut recipients = Vec::new();
    let delivered = nw
        .drain_outbox(10, |event| {
            recipients.push(event.recipient.clone());
            Ok(())
        })
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(recipients, vec!["carol".to_string()]);
    assert_eq!(nw.stats().unwrap().pending_events, 0);
}

// ── Suggestions ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fallback_prefers_recent_among_tied_tags() {
    let dir = tempdir().unwrap();
    let nw = open_library(&dir);
    let storage = nw.storage();

    let mut ids = Vec::new();
    for (title, age_days) in [("Oldest", 30), ("Middle", 10), ("Newest", 1)] {
        let mut note = Note::new("alice", Visibility::Public, title, "")
            .with_tags(vec!["physics".to_string()]);
        note.created_at = chrono::Utc::now() - chrono::Duration::days(age_days);
        storage.put_note(&note).unwrap();
        ids.push(note.id);
    }

    let request = SuggestRequest::new("short", 10).with_tags(["physics"]);
    let results = nw.suggest(&request).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].title, "Newest");
    assert!(results[0].score > results[1].score);
    assert_eq!(results[1].title, "Middle");
    assert_eq!(results[2].title, "Oldest");
}

#[tokio::test]
async fn test_suggestions_exclude_subject_and_both_directions() {
    let dir = tempdir().unwrap();
    let nw = open_library(&dir);
    let tags = vec!["shared".to_string()];

    let (outgoing, _) = nw
        .create_note("alice", Visibility::Public, "Outgoing", "", &tags)
        .unwrap();
    let (subject, _) = nw
        .create_note("alice", Visibility::Public, "Subject", "Links [[Outgoing]].", &tags)
        .unwrap();
    let (incoming, _) = nw
        .create_note("alice", Visibility::Public, "Incoming", "Back to [[Subject]].", &tags)
        .unwrap();
    let (unrelated, _) = nw
        .create_note("alice", Visibility::Public, "Unrelated", "", &tags)
        .unwrap();

    let results = nw.suggest_for(subject.id, 10).await.unwrap();
    let ids: Vec<NoteId> = results.iter().map(|s| s.id).collect();

    assert!(!ids.contains(&subject.id));
    assert!(!ids.contains(&outgoing.id));
    assert!(!ids.contains(&incoming.id));
    assert_eq!(ids, vec![unrelated.id]);
}

struct BrokenSearch;

#[async_trait]
impl VectorSearch for BrokenSearch {
    async fn search(
        &self,
        _query: &Embedding,
        _threshold: f32,
        _count: usize,
    ) -> Result<Vec<SimilarityMatch>> {
        Err(NoteweaveError::Capability("index offline".into()))
    }
}

struct ConstantEmbedder;

#[async_trait]
impl EmbeddingProvider for ConstantEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Ok(vec![1.0, 0.0, 0.0])
    }
    fn dimension(&self) -> usize {
        3
    }
    fn model_name(&self) -> &str {
        "constant"
    }
}

#[tokio::test]
async fn test_broken_vector_search_degrades_within_limit() {
    let dir = tempdir().unwrap();
    let storage = Arc::new(RedbStorage::open(dir.path().join("test.redb")).unwrap());
    for i in 0..8 {
        let note = Note::new("alice", Visibility::Public, format!("Note {}", i), "")
            .with_tags(vec!["topic".to_string()]);
        storage.put_note(&note).unwrap();
    }

    let ranker = SuggestionRanker::new(storage, SuggestConfig::default())
        .unwrap()
        .with_embedder(Arc::new(ConstantEmbedder))
        .with_vector_search(Arc::new(BrokenSearch));

    let request = SuggestRequest::new("long enough text to try the semantic path", 5)
        .with_tags(["topic"]);
    let results = ranker.suggest(&request).await;

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|s| s.similarity.is_none()));
}

#[tokio::test]
async fn test_suggest_limit_zero_is_empty() {
    let dir = tempdir().unwrap();
    let nw = open_library(&dir);
    nw.create_note("alice", Visibility::Public, "Anything", "", &[]).unwrap();

    let results = nw.suggest(&SuggestRequest::new("", 0)).await;
    assert!(results.is_empty());
}
