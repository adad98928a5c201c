use crate::linker::{GraphSynchronizer, LinkerConfig, LinkerMetrics, SyncReport};
use crate::notify::{drain_outbox, LinkCreated, OutboxSink};
use crate::storage::{NoteFilter, RedbStorage, Storage, StorageStats};
use crate::suggest::{SuggestConfig, SuggestRequest, SuggestionRanker};
use crate::types::{normalize_tag, Note, NoteId, Suggestion, UserId, Visibility};
use crate::vector::{
    embedding_input, Disabled, EmbeddingProvider, FastEmbedProvider, HnswIndex,
    LocalVectorSearch, VectorIndex,
};
use crate::{NoteweaveError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Config for embedded library mode.
#[derive(Debug, Clone, Default)]
pub struct LibraryConfig {
    /// Embedding model name, e.g. "bge-small-en-v1.5". None disables
    /// semantic suggestions and the backfill.
    pub embedding_model: Option<String>,
    pub linker: LinkerConfig,
    pub suggest: SuggestConfig,
}

/// Outcome of an embedding backfill batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    pub embedded: usize,
    pub failed: usize,
    /// Notes still without an embedding after this batch.
    pub remaining: usize,
}

/// High-level, embedded Noteweave API. No server required.
///
/// # Example
/// ```rust,no_run
/// use noteweave_core::{LibraryConfig, Noteweave, Visibility};
///
/// # async fn run() -> noteweave_core::Result<()> {
/// let nw = Noteweave::open("./notes.redb", LibraryConfig::default())?;
/// nw.create_note("alice", Visibility::Public, "Entanglement", "Spooky.", &[])?;
/// let (note, report) =
///     nw.create_note("alice", Visibility::Public, "Bell", "See [[Entanglement]].", &[])?;
/// assert_eq!(report.valid_links, 1);
/// let related = nw.suggest_for(note.id, 5).await?;
/// # Ok(())
/// # }
/// ```
pub struct Noteweave {
    storage: Arc<RedbStorage>,
    synchronizer: GraphSynchronizer<RedbStorage, OutboxSink<RedbStorage>>,
    ranker: SuggestionRanker<RedbStorage>,
    embedder: Arc<dyn EmbeddingProvider>,
    search: LocalVectorSearch<HnswIndex>,
}

impl Noteweave {
    /// Open (or create) a database at the given path.
    pub fn open(path: impl AsRef<Path>, config: LibraryConfig) -> Result<Self> {
        let storage = Arc::new(RedbStorage::open(path.as_ref())?);

        let embedder: Arc<dyn EmbeddingProvider> = match &config.embedding_model {
            Some(name) => Arc::new(FastEmbedProvider::with_model(
                FastEmbedProvider::parse_model(name)?,
            )?),
            None => Arc::new(Disabled),
        };

        Self::with_parts(storage, embedder, config)
    }

    /// Assemble from an open store and any embedding provider.
    pub fn with_parts(
        storage: Arc<RedbStorage>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: LibraryConfig,
    ) -> Result<Self> {
        let search = LocalVectorSearch::new(Self::load_index(&storage, embedder.as_ref())?);

        let synchronizer = GraphSynchronizer::new(
            storage.clone(),
            OutboxSink::new(storage.clone()),
            config.linker,
        )?;

        let ranker = SuggestionRanker::new(storage.clone(), config.suggest)?
            .with_embedder(embedder.clone())
            .with_vector_search(Arc::new(search.clone()));

        Ok(Self {
            storage,
            synchronizer,
            ranker,
            embedder,
            search,
        })
    }

    /// Build the HNSW index from stored embeddings
    fn load_index(storage: &RedbStorage, embedder: &dyn EmbeddingProvider) -> Result<HnswIndex> {
        let notes = storage.list_notes(NoteFilter::new())?;

        let dimension = if embedder.is_enabled() {
            embedder.dimension()
        } else {
            notes
                .iter()
                .find_map(|n| n.embedding.as_ref().map(Vec::len))
                .unwrap_or(0)
        };

        let mut index = HnswIndex::new(dimension);
        let mut skipped = 0usize;
        for note in &notes {
            if let Some(embedding) = &note.embedding {
                if index.insert(note.id, embedding).is_err() {
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            log::warn!(
                "Skipped {} stored embeddings whose dimension is not {}",
                skipped,
                dimension
            );
        }
        index.rebuild()?;

        Ok(index)
    }

    pub fn storage(&self) -> &Arc<RedbStorage> {
        &self.storage
    }

    /// Create a note and link it.
    pub fn create_note(
        &self,
        owner: impl Into<UserId>,
        visibility: Visibility,
        title: impl Into<String>,
        body: impl Into<String>,
        tags: &[String],
    ) -> Result<(Note, SyncReport)> {
        let note = Note::new(owner, visibility, title, body)
            .with_tags(tags.iter().map(|t| normalize_tag(t)).filter(|t| !t.is_empty()));
        self.save_note(note)
    }

    /// Persist a note as written by its owner, then sync its links.
    ///
    /// A new title or visibility changes who can resolve the note, so the
    /// notes already linking to it are re-synced as well.
    pub fn save_note(&self, note: Note) -> Result<(Note, SyncReport)> {
        let previous = self.storage.get_note(note.id)?;
        self.storage.put_note(&note)?;

        if let Some(embedding) = &note.embedding {
            if let Err(e) = self.search.upsert(note.id, embedding) {
                log::warn!("Failed to index note {}: {}", note.id, e);
            }
        }

        let report = self.synchronizer.sync(note.id, &note.body, &note.owner)?;

        if let Some(previous) = previous {
            if previous.title != note.title || previous.visibility != note.visibility {
                self.resync_backlinks(note.id)?;
            }
        }

        Ok((note, report))
    }

    /// Re-sync every live note with an edge into `target`, as its owner
    fn resync_backlinks(&self, target: NoteId) -> Result<()> {
        let mut removed = 0usize;
        for edge in self.storage.edges_to(target)? {
            let Some(source) = self.storage.get_note(edge.source)?.filter(|n| !n.deleted) else {
                continue;
            };
            removed += self
                .synchronizer
                .sync(source.id, &source.body, &source.owner)?
                .removed;
        }

        if removed > 0 {
            log::info!(
                "Dropped {} links into note {} after a title or visibility change",
                removed,
                target
            );
        }
        Ok(())
    }

    /// Replace the body of a note. Only the owner may do this.
    pub fn update_body(
        &self,
        id: NoteId,
        body: impl Into<String>,
        actor: &str,
    ) -> Result<(Note, SyncReport)> {
        let mut note = self.owned_note(id, actor)?;
        note.set_body(body);

        // The old vector no longer describes the text
        note.embedding = None;
        if let Err(e) = self.search.remove(id) {
            log::warn!("Failed to unindex note {}: {}", id, e);
        }

        self.save_note(note)
    }

    /// Tombstone a note. Its edges go with it.
    pub fn delete_note(&self, id: NoteId, actor: &str) -> Result<()> {
        self.owned_note(id, actor)?;
        self.storage.delete_note(id)?;

        if let Err(e) = self.search.remove(id) {
            log::warn!("Failed to unindex note {}: {}", id, e);
        }
        Ok(())
    }

    fn owned_note(&self, id: NoteId, actor: &str) -> Result<Note> {
        let note = self
            .storage
            .get_note(id)?
            .filter(|n| !n.deleted)
            .ok_or(NoteweaveError::NoteNotFound(id))?;

        if note.owner != actor {
            return Err(NoteweaveError::Validation(format!(
                "Note {} is owned by another user",
                id
            )));
        }
        Ok(note)
    }

    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        self.storage.get_note(id)
    }

    pub fn list_notes(&self, filter: NoteFilter) -> Result<Vec<Note>> {
        self.storage.list_notes(filter)
    }

    /// Reconcile a note's edges against `text`.
    pub fn sync(&self, source: NoteId, text: &str, actor: &str) -> Result<SyncReport> {
        self.synchronizer.sync(source, text, actor)
    }

    /// Re-sync every live note as its owner. Picks up titles that started
    /// resolving since the mentioning note was last saved.
    pub fn resync_all(&self) -> Result<SyncReport> {
        let mut total = SyncReport::default();

        for note in self.storage.list_notes(NoteFilter::new())? {
            let report = self.synchronizer.sync(note.id, &note.body, &note.owner)?;
            total.valid_links += report.valid_links;
            total.created += report.created;
            total.updated += report.updated;
            total.removed += report.removed;
            total.unresolved += report.unresolved;
            total.failures += report.failures;
        }

        Ok(total)
    }

    pub async fn suggest(&self, request: &SuggestRequest) -> Vec<Suggestion> {
        self.ranker.suggest(request).await
    }

    /// Suggestions for a stored note, as seen by its owner.
    pub async fn suggest_for(&self, id: NoteId, limit: usize) -> Result<Vec<Suggestion>> {
        let note = self
            .storage
            .get_note(id)?
            .ok_or(NoteweaveError::NoteNotFound(id))?;
        Ok(self.ranker.suggest(&SuggestRequest::for_note(&note, limit)).await)
    }

    /// Embed up to `batch` notes that have no embedding yet.
    pub async fn backfill_embeddings(&self, batch: usize) -> Result<BackfillReport> {
        if !self.embedder.is_enabled() {
            return Err(NoteweaveError::Capability(
                "No embedding model configured".to_string(),
            ));
        }

        let pending = self
            .storage
            .list_notes(NoteFilter::new().missing_embedding().with_limit(batch))?;

        let mut report = BackfillReport::default();
        if !pending.is_empty() {
            let inputs: Vec<String> = pending.iter().map(embedding_input).collect();
            let embeddings = self.embedder.embed_batch(inputs).await?;

            for (mut note, embedding) in pending.into_iter().zip(embeddings) {
                let id = note.id;
                note.embedding = Some(embedding.clone());
                // Storage first: the index is rebuilt from it on open
                let stored = self
                    .storage
                    .put_note(&note)
                    .and_then(|_| self.search.upsert(id, &embedding));
                match stored {
                    Ok(()) => report.embedded += 1,
                    Err(e) => {
                        log::warn!("Failed to store embedding for note {}: {}", id, e);
                        report.failed += 1;
                    }
                }
            }

            self.search.rebuild()?;
        }

        report.remaining = self
            .storage
            .list_notes(NoteFilter::new().missing_embedding())?
            .len();

        log::info!(
            "Backfill: embedded {}, failed {}, {} remaining",
            report.embedded,
            report.failed,
            report.remaining
        );

        Ok(report)
    }

    /// Deliver pending link events, oldest first.
    pub fn drain_outbox<F>(&self, limit: usize, deliver: F) -> Result<usize>
    where
        F: FnMut(&LinkCreated) -> Result<()>,
    {
        drain_outbox(self.storage.as_ref(), limit, deliver)
    }

    pub fn linker_metrics(&self) -> LinkerMetrics {
        self.synchronizer.metrics()
    }

    /// Copy the database file to `path`, creating parent directories.
    pub fn backup(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NoteweaveError::Validation(format!("Failed to create directory: {}", e))
            })?;
        }
        self.storage.snapshot(path)
    }

    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }

    /// Number of vectors currently searchable
    pub fn indexed_count(&self) -> usize {
        self.search.len()
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }
}
