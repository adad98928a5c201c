use crate::error::Result;
use crate::storage::{NoteFilter, Storage};
use crate::suggest::scoring::{
    fallback_score, is_recent, rank_order, semantic_score, shared_tag_count,
};
use crate::suggest::SuggestConfig;
use crate::types::{normalize_tag, Embedding, Note, NoteId, Suggestion, UserId};
use crate::vector::{guard, Capability, EmbeddingProvider, Unavailable, VectorSearch};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// A request for notes related to a subject
#[derive(Debug, Clone, Default)]
pub struct SuggestRequest {
    /// The note being viewed or edited, if it is already stored.
    pub subject_id: Option<NoteId>,
    pub text: String,
    pub tags: Vec<String>,
    pub limit: usize,
    /// Who will see the results. `None` restricts to public notes.
    pub viewer: Option<UserId>,
}

impl SuggestRequest {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
            ..Default::default()
        }
    }

    /// Suggestions for a stored note, as seen by its owner
    pub fn for_note(note: &Note, limit: usize) -> Self {
        Self {
            subject_id: Some(note.id),
            text: note.body.clone(),
            tags: note.tags.clone(),
            limit,
            viewer: Some(note.owner.clone()),
        }
    }

    pub fn with_subject(mut self, id: NoteId) -> Self {
        self.subject_id = Some(id);
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.tags.clear();
        for tag in tags.into_iter().map(|t| normalize_tag(t.as_ref())) {
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }

    pub fn with_viewer(mut self, viewer: impl Into<UserId>) -> Self {
        self.viewer = Some(viewer.into());
        self
    }
}

/// Ranks related notes, semantically when it can and by tags and recency
/// when it cannot. Never fails: every error degrades to a smaller answer.
pub struct SuggestionRanker<S: Storage> {
    storage: Arc<S>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    search: Option<Arc<dyn VectorSearch>>,
    config: SuggestConfig,
}

impl<S: Storage> SuggestionRanker<S> {
    pub fn new(storage: Arc<S>, config: SuggestConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            storage,
            embedder: None,
            search: None,
            config,
        })
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_vector_search(mut self, search: Arc<dyn VectorSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.config
    }

    /// At most `limit` suggestions, never the subject or its neighbours.
    pub async fn suggest(&self, request: &SuggestRequest) -> Vec<Suggestion> {
        let limit = request.limit.min(self.config.max_limit);
        if limit == 0 {
            return Vec::new();
        }

        let excluded = match self.excluded_ids(request.subject_id) {
            Ok(ids) => ids,
            Err(e) => {
                // Without the neighbour set exclusion cannot be honoured
                log::warn!("Failed to load neighbours for suggestions: {}", e);
                return Vec::new();
            }
        };

        let now = Utc::now();

        if request.text.trim().chars().count() >= self.config.min_text_chars {
            match self.semantic(request, &excluded, limit, now).await {
                Capability::Available(results) if !results.is_empty() => return results,
                Capability::Available(_) => {
                    log::debug!("No semantic candidates left after filtering, using fallback")
                }
                Capability::Unavailable(Unavailable::NotConfigured) => {
                    log::debug!("Semantic search not configured, using fallback")
                }
                Capability::Unavailable(reason) => {
                    log::warn!("Semantic search unavailable ({}), using fallback", reason)
                }
            }
        }

        self.fallback(request, &excluded, limit, now)
    }

    /// The subject plus every note linked to or from it
    fn excluded_ids(&self, subject: Option<NoteId>) -> Result<HashSet<NoteId>> {
        let mut excluded = HashSet::new();
        let Some(subject) = subject else {
            return Ok(excluded);
        };

        excluded.insert(subject);
        excluded.extend(self.storage.edges_from(subject)?.into_iter().map(|e| e.target));
        excluded.extend(self.storage.edges_to(subject)?.into_iter().map(|e| e.source));
        Ok(excluded)
    }

    fn eligible(&self, note: &Note, viewer: Option<&str>, excluded: &HashSet<NoteId>) -> bool {
        if note.deleted || excluded.contains(&note.id) {
            return false;
        }
        match viewer {
            Some(viewer) => note.is_visible_to(viewer),
            None => note.visibility == crate::types::Visibility::Public,
        }
    }

    async fn subject_embedding(&self, request: &SuggestRequest) -> Capability<Embedding> {
        if let Some(id) = request.subject_id {
            match self.storage.get_note(id) {
                Ok(Some(Note {
                    embedding: Some(embedding),
                    ..
                })) => return Capability::Available(embedding),
                Ok(_) => {}
                Err(e) => log::warn!("Failed to load subject note {}: {}", id, e),
            }
        }

        match &self.embedder {
            Some(embedder) if embedder.is_enabled() => {
                guard(self.config.capability_timeout, embedder.embed(&request.text)).await
            }
            _ => Capability::Unavailable(Unavailable::NotConfigured),
        }
    }

    async fn semantic(
        &self,
        request: &SuggestRequest,
        excluded: &HashSet<NoteId>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Capability<Vec<Suggestion>> {
        let Some(search) = &self.search else {
            return Capability::Unavailable(Unavailable::NotConfigured);
        };

        let embedding = match self.subject_embedding(request).await {
            Capability::Available(embedding) => embedding,
            Capability::Unavailable(reason) => return Capability::Unavailable(reason),
        };

        let count = limit.saturating_mul(self.config.overfetch_factor);
        let matches = match guard(
            self.config.capability_timeout,
            search.search(&embedding, self.config.similarity_threshold, count),
        )
        .await
        {
            Capability::Available(matches) => matches,
            Capability::Unavailable(reason) => return Capability::Unavailable(reason),
        };

        let mut results = Vec::new();
        for hit in matches {
            if excluded.contains(&hit.note_id) {
                continue;
            }

            let note = match self.storage.get_note(hit.note_id) {
                Ok(Some(note)) => note,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Failed to load candidate {}: {}", hit.note_id, e);
                    continue;
                }
            };

            if !self.eligible(&note, request.viewer.as_deref(), excluded) {
                continue;
            }

            let shared = shared_tag_count(&request.tags, &note.tags);
            let recent = is_recent(note.created_at, now, &self.config);
            let score = semantic_score(hit.similarity, shared, recent, &self.config);
            results.push(Suggestion::from_note(&note, score, Some(hit.similarity)));
        }

        results.sort_by(rank_order);
        results.truncate(limit);
        Capability::Available(results)
    }

    fn fallback(
        &self,
        request: &SuggestRequest,
        excluded: &HashSet<NoteId>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<Suggestion> {
        let viewer = request.viewer.as_deref();

        let mut results: Vec<Suggestion> = if request.tags.is_empty() {
            // Most recent eligible notes, flat score
            let mut filter =
                NoteFilter::new().excluding(excluded.iter().copied().collect());
            filter = match viewer {
                Some(viewer) => filter.visible_to(viewer),
                None => filter.public_only(),
            };

            match self.storage.list_notes(filter.with_limit(limit)) {
                Ok(notes) => notes
                    .iter()
                    .map(|note| Suggestion::from_note(note, self.config.fallback_base_score, None))
                    .collect(),
                Err(e) => {
                    log::warn!("Fallback listing failed: {}", e);
                    return Vec::new();
                }
            }
        } else {
            match self.storage.notes_with_tags(&request.tags) {
                Ok(notes) => notes
                    .iter()
                    .filter(|note| self.eligible(note, viewer, excluded))
                    .map(|note| {
                        let shared = shared_tag_count(&request.tags, &note.tags);
                        let recent = is_recent(note.created_at, now, &self.config);
                        Suggestion::from_note(
                            note,
                            fallback_score(shared, recent, &self.config),
                            None,
                        )
                    })
                    .collect(),
                Err(e) => {
                    log::warn!("Fallback tag lookup failed: {}", e);
                    return Vec::new();
                }
            }
        };

        results.sort_by(rank_order);
        results.truncate(limit);
        results
    }
}
