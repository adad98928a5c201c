use crate::error::Result;
use crate::notify::LinkCreated;
use crate::storage::filters::{NoteFilter, StorageStats};
use crate::types::{Edge, EdgeId, EventId, Note, NoteId, Tag};
use std::path::Path;

/// Storage trait for notes, the derived link graph and the event outbox
pub trait Storage: Send + Sync {
    // === Note Operations ===

    /// Store a note (insert or update). Maintains title and tag indexes.
    fn put_note(&self, note: &Note) -> Result<()>;

    /// Retrieve a note by ID
    fn get_note(&self, id: NoteId) -> Result<Option<Note>>;

    /// Tombstone a note and drop every edge touching it
    fn delete_note(&self, id: NoteId) -> Result<()>;

    /// List notes matching the filter, newest first
    fn list_notes(&self, filter: NoteFilter) -> Result<Vec<Note>>;

    /// Live notes whose title equals `title` exactly
    fn find_by_title(&self, title: &str) -> Result<Vec<Note>>;

    /// Live notes carrying at least one of `tags`, newest first
    fn notes_with_tags(&self, tags: &[String]) -> Result<Vec<Note>>;

    // === Edge Operations ===

    /// Retrieve an edge by ID
    fn get_edge(&self, id: EdgeId) -> Result<Option<Edge>>;

    /// Get all edges originating from a note
    fn edges_from(&self, note_id: NoteId) -> Result<Vec<Edge>>;

    /// Get all edges pointing to a note
    fn edges_to(&self, note_id: NoteId) -> Result<Vec<Edge>>;

    /// The edge for an ordered pair, if any
    fn edge_between(&self, source: NoteId, target: NoteId) -> Result<Option<Edge>>;

    /// Insert edges in a single transaction.
    ///
    /// An edge whose `(source, target)` pair already exists is skipped, so
    /// concurrent writers converge on one edge per pair. Returns the edges
    /// that were actually written.
    fn insert_edges(&self, edges: &[Edge]) -> Result<Vec<Edge>>;

    /// Overwrite the context snippet of an existing edge
    fn update_edge_context(&self, id: EdgeId, context: &str) -> Result<()>;

    /// Delete an edge (hard delete, edges are derived data)
    fn delete_edge(&self, id: EdgeId) -> Result<()>;

    // === Tags ===

    fn get_tag(&self, name: &str) -> Result<Option<Tag>>;

    /// Tags with at least one live note, most used first
    fn list_tags(&self) -> Result<Vec<Tag>>;

    // === Outbox ===

    /// Persist events for later delivery
    fn enqueue_events(&self, events: &[LinkCreated]) -> Result<()>;

    /// Oldest undelivered events first
    fn pending_events(&self, limit: usize) -> Result<Vec<LinkCreated>>;

    /// Remove a delivered event
    fn ack_event(&self, id: EventId) -> Result<()>;

    // === Maintenance ===

    /// Get database statistics
    fn stats(&self) -> Result<StorageStats>;

    /// Create a file-level backup/snapshot
    fn snapshot(&self, path: &Path) -> Result<()>;
}
