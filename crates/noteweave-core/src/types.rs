use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type alias for note identifiers
pub type NoteId = Uuid;

/// Type alias for edge identifiers
pub type EdgeId = Uuid;

/// Type alias for outbox event identifiers
pub type EventId = Uuid;

/// Type alias for user identifiers. Opaque to the core.
pub type UserId = String;

/// Type alias for embedding vectors
pub type Embedding = Vec<f32>;

pub const MAX_TITLE_CHARS: usize = 256;
pub const MAX_TAGS: usize = 32;
pub const MAX_TAG_CHARS: usize = 64;

/// Who may see a note.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only the owner.
    #[default]
    Private,
    /// Everyone.
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            other => Err(format!("unknown visibility `{other}`; expected private|public")),
        }
    }
}

/// A free-text note authored by a single user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    /// Unique identifier. UUIDv7 for time-sortability.
    pub id: NoteId,

    /// Author. Only the owner mutates the note.
    pub owner: UserId,

    pub visibility: Visibility,

    /// Resolution key for `[[wikilinks]]`. Not globally unique.
    pub title: String,

    /// Raw text, may contain wikilinks.
    pub body: String,

    /// Lowercase tag names.
    pub tags: Vec<String>,

    /// None until the embedding backfill reaches this note.
    pub embedding: Option<Embedding>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Soft delete. Tombstoned notes never resolve and are never suggested.
    pub deleted: bool,
}

impl Note {
    /// Create a new note with the given parameters
    pub fn new(
        owner: impl Into<UserId>,
        visibility: Visibility,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Note {
            id: Uuid::now_v7(),
            owner: owner.into(),
            visibility,
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
            embedding: None,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }

    /// Set the tags, keeping the first occurrence of each
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.clear();
        for tag in tags {
            let tag = tag.into();
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }

    /// Whether `user` may read (and therefore link to) this note
    pub fn is_visible_to(&self, user: &str) -> bool {
        self.visibility == Visibility::Public || self.owner == user
    }

    /// Validate the note before it is written
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title must not be empty".to_string());
        }

        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(format!("Title exceeds {} characters", MAX_TITLE_CHARS));
        }

        if self.owner.trim().is_empty() {
            return Err("Owner must not be empty".to_string());
        }

        if self.tags.len() > MAX_TAGS {
            return Err(format!("More than {} tags", MAX_TAGS));
        }

        for (i, tag) in self.tags.iter().enumerate() {
            if self.tags[..i].contains(tag) {
                return Err(format!("Tag '{}' is listed twice", tag));
            }
            if tag.is_empty() || tag.chars().count() > MAX_TAG_CHARS {
                return Err(format!(
                    "Tag '{}' must be between 1 and {} characters",
                    tag, MAX_TAG_CHARS
                ));
            }
            if !tag
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return Err(format!(
                    "Tag '{}' contains invalid characters (only lowercase alphanumeric and hyphens allowed)",
                    tag
                ));
            }
        }

        Ok(())
    }

    /// Replace the body and bump `updated_at`
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.updated_at = Utc::now();
    }
}

/// Normalise a user-supplied tag name into the stored form.
///
/// Lowercases, turns whitespace and underscores into single hyphens and
/// drops anything outside `[a-z0-9-]`, so `#C++ Tips` becomes `c-tips`.
/// May return an empty string.
pub fn normalize_tag(raw: &str) -> String {
    let mut tag = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            tag.push(c);
        } else if (c == '-' || c == '_' || c.is_whitespace())
            && !tag.is_empty()
            && !tag.ends_with('-')
        {
            tag.push('-');
        }
    }

    tag.truncate(MAX_TAG_CHARS);
    while tag.ends_with('-') {
        tag.pop();
    }
    tag
}

/// A directed link derived from a wikilink in the source note's text.
///
/// Edges are a projection of note text, never authored directly: the
/// synchroniser creates, rewrites and deletes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    /// Unique identifier. UUIDv7.
    pub id: EdgeId,

    /// The note whose text contains the mention.
    pub source: NoteId,

    /// The note the mention resolved to.
    pub target: NoteId,

    /// Sentence-bounded snippet around the most recent mention.
    pub context: String,

    /// The user whose save produced this edge.
    pub created_by: UserId,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Edge {
    /// Create a new edge with the given parameters
    pub fn new(
        source: NoteId,
        target: NoteId,
        context: impl Into<String>,
        created_by: impl Into<UserId>,
    ) -> Self {
        let now = Utc::now();
        Edge {
            id: Uuid::now_v7(),
            source,
            target,
            context: context.into(),
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.source == self.target {
            return Err("Self-edges are not allowed".to_string());
        }
        Ok(())
    }

    /// Rewrite the context and bump `updated_at`
    pub fn set_context(&mut self, context: impl Into<String>) {
        self.context = context.into();
        self.updated_at = Utc::now();
    }
}

/// A tag with its live usage count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub usage_count: u64,
}

/// A ranked related-note candidate. Computed per request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub score: f32,
    /// Raw cosine similarity. Only set on the semantic path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    pub tags: Vec<String>,
}

impl Suggestion {
    pub fn from_note(note: &Note, score: f32, similarity: Option<f32>) -> Self {
        Suggestion {
            id: note.id,
            title: note.title.clone(),
            body: note.body.clone(),
            created_at: note.created_at,
            score,
            similarity,
            tags: note.tags.clone(),
        }
    }
}
