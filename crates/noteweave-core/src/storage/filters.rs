use crate::types::{Note, NoteId, UserId, Visibility};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter criteria for querying notes
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub owner: Option<UserId>,
    /// Only notes this user may read (own notes plus public ones).
    pub visible_to: Option<UserId>,
    /// Only public notes. Combined with `visible_to`, public wins.
    pub public_only: bool,
    /// Notes carrying at least one of these tags.
    pub tags: Option<Vec<String>>,
    pub exclude: Option<Vec<NoteId>>,
    /// Only notes still waiting for an embedding
    pub missing_embedding: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl NoteFilter {
    /// Create a new empty filter
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner: impl Into<UserId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Restrict to notes `user` may read
    pub fn visible_to(mut self, user: impl Into<UserId>) -> Self {
        self.visible_to = Some(user.into());
        self
    }

    pub fn public_only(mut self) -> Self {
        self.public_only = true;
        self
    }

    /// Filter by tags (notes must have at least one of these tags)
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn excluding(mut self, ids: Vec<NoteId>) -> Self {
        self.exclude = Some(ids);
        self
    }

    pub fn missing_embedding(mut self) -> Self {
        self.missing_embedding = true;
        self
    }

    /// Limit number of results
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip first N results
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Check whether a note passes every criterion
    pub fn matches(&self, note: &Note) -> bool {
        if note.deleted {
            return false;
        }

        if let Some(ref owner) = self.owner {
            if note.owner != *owner {
                return false;
            }
        }

        if self.public_only && note.visibility != Visibility::Public {
            return false;
        }

        if let Some(ref viewer) = self.visible_to {
            if !note.is_visible_to(viewer) {
                return false;
            }
        }

        if let Some(ref tags) = self.tags {
            if !tags.iter().any(|t| note.tags.contains(t)) {
                return false;
            }
        }

        if let Some(ref exclude) = self.exclude {
            if exclude.contains(&note.id) {
                return false;
            }
        }

        if self.missing_embedding && note.embedding.is_some() {
            return false;
        }

        true
    }
}

/// Storage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    pub note_count: u64,
    pub public_note_count: u64,
    pub embedded_note_count: u64,
    pub edge_count: u64,
    pub tag_count: u64,
    pub pending_events: u64,
    pub db_size_bytes: u64,
    pub oldest_note: Option<DateTime<Utc>>,
    pub newest_note: Option<DateTime<Utc>>,
}
