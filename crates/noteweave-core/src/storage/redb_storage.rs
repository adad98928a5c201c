use crate::error::{NoteweaveError, Result};
use crate::notify::LinkCreated;
use crate::storage::filters::{NoteFilter, StorageStats};
use crate::storage::traits::Storage;
use crate::types::{Edge, EdgeId, EventId, Note, NoteId, Tag, Visibility};
use chrono::{DateTime, Utc};
use redb::{
    Database, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition,
    WriteTransaction,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Table definitions
const NOTES: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("notes");
const EDGES: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("edges");

// Uniqueness index: source||target -> edge id
const EDGE_PAIRS: TableDefinition<&[u8; 32], &[u8; 16]> = TableDefinition::new("edge_pairs");

// Secondary indexes
const EDGES_BY_SOURCE: MultimapTableDefinition<&[u8; 16], &[u8; 16]> =
    MultimapTableDefinition::new("edges_by_source");
const EDGES_BY_TARGET: MultimapTableDefinition<&[u8; 16], &[u8; 16]> =
    MultimapTableDefinition::new("edges_by_target");
const NOTES_BY_TITLE: MultimapTableDefinition<&str, &[u8; 16]> =
    MultimapTableDefinition::new("notes_by_title");
const NOTES_BY_TAG: MultimapTableDefinition<&str, &[u8; 16]> =
    MultimapTableDefinition::new("notes_by_tag");

// Tag usage counts (live notes only)
const TAGS: TableDefinition<&str, u64> = TableDefinition::new("tags");

// Pending link events, keyed by UUIDv7 so iteration is oldest first
const OUTBOX: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("outbox");

// Metadata table
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_VERSION_KEY: &str = "schema_version";
const STATS_EDGE_COUNT_KEY: &str = "stats:edge_count";

/// Redb-based storage implementation
pub struct RedbStorage {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStorage {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NoteweaveError::Validation(format!("Failed to create directory: {}", e))
            })?;
        }

        let is_new = !path.exists();
        let db = Database::create(&path)?;

        if !is_new {
            Self::check_schema_version(&db)?;
        }

        // Ensure tables exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(NOTES)?;
            let _ = write_txn.open_table(EDGES)?;
            let _ = write_txn.open_table(EDGE_PAIRS)?;
            let _ = write_txn.open_multimap_table(EDGES_BY_SOURCE)?;
            let _ = write_txn.open_multimap_table(EDGES_BY_TARGET)?;
            let _ = write_txn.open_multimap_table(NOTES_BY_TITLE)?;
            let _ = write_txn.open_multimap_table(NOTES_BY_TAG)?;
            let _ = write_txn.open_table(TAGS)?;
            let _ = write_txn.open_table(OUTBOX)?;
            let mut meta = write_txn.open_table(META)?;
            if is_new {
                meta.insert(
                    SCHEMA_VERSION_KEY,
                    CURRENT_SCHEMA_VERSION.to_string().as_bytes(),
                )?;
            }
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Check schema version. Returns error on mismatch.
    fn check_schema_version(db: &Database) -> Result<()> {
        let read_txn = db.begin_read()?;
        let version = {
            let table = read_txn.open_table(META).ok();
            table
                .and_then(|t| {
                    t.get(SCHEMA_VERSION_KEY).ok().flatten().and_then(|v| {
                        std::str::from_utf8(v.value())
                            .ok()
                            .and_then(|s| s.parse::<u32>().ok())
                    })
                })
                .unwrap_or(CURRENT_SCHEMA_VERSION)
        };

        match version.cmp(&CURRENT_SCHEMA_VERSION) {
            std::cmp::Ordering::Equal => Ok(()),
            std::cmp::Ordering::Less => Err(NoteweaveError::Validation(format!(
                "Database schema v{} is older than current v{}.",
                version, CURRENT_SCHEMA_VERSION
            ))),
            std::cmp::Ordering::Greater => Err(NoteweaveError::Validation(format!(
                "Database schema v{} is newer than this binary v{}. Upgrade noteweave.",
                version, CURRENT_SCHEMA_VERSION
            ))),
        }
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn uuid_to_bytes(id: &uuid::Uuid) -> [u8; 16] {
        *id.as_bytes()
    }

    fn bytes_to_uuid(bytes: &[u8; 16]) -> uuid::Uuid {
        uuid::Uuid::from_bytes(*bytes)
    }

    fn pair_key(source: &NoteId, target: &NoteId) -> [u8; 32] {
        let mut key = [0u8; 32];
        key[..16].copy_from_slice(source.as_bytes());
        key[16..].copy_from_slice(target.as_bytes());
        key
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(NoteweaveError::from)
    }

    fn deserialize_note(bytes: &[u8]) -> Result<Note> {
        bincode::deserialize(bytes).map_err(NoteweaveError::from)
    }

    fn deserialize_edge(bytes: &[u8]) -> Result<Edge> {
        bincode::deserialize(bytes).map_err(NoteweaveError::from)
    }

    fn read_note_in(txn: &WriteTransaction, id: &NoteId) -> Result<Option<Note>> {
        let table = txn.open_table(NOTES)?;
        let bytes = table
            .get(&Self::uuid_to_bytes(id))?
            .map(|guard| guard.value().to_vec());
        bytes.map(|b| Self::deserialize_note(&b)).transpose()
    }

    fn read_edge_in(txn: &WriteTransaction, id: &EdgeId) -> Result<Option<Edge>> {
        let table = txn.open_table(EDGES)?;
        let bytes = table
            .get(&Self::uuid_to_bytes(id))?
            .map(|guard| guard.value().to_vec());
        bytes.map(|b| Self::deserialize_edge(&b)).transpose()
    }

    /// Update title and tag indexes plus tag usage counts for a note write
    fn update_note_indexes(txn: &WriteTransaction, note: &Note, old_note: Option<&Note>) -> Result<()> {
        let note_id_bytes = Self::uuid_to_bytes(&note.id);

        // Title index
        {
            let mut title_table = txn.open_multimap_table(NOTES_BY_TITLE)?;
            if let Some(old) = old_note {
                if old.title != note.title {
                    title_table.remove(old.title.as_str(), &note_id_bytes)?;
                }
            }
            title_table.insert(note.title.as_str(), &note_id_bytes)?;
        }

        // Tag index
        {
            let mut tag_table = txn.open_multimap_table(NOTES_BY_TAG)?;
            if let Some(old) = old_note {
                for old_tag in &old.tags {
                    if !note.tags.contains(old_tag) {
                        tag_table.remove(old_tag.as_str(), &note_id_bytes)?;
                    }
                }
            }
            for tag in &note.tags {
                tag_table.insert(tag.as_str(), &note_id_bytes)?;
            }
        }

        // Usage counts follow live notes only
        let old_live: HashSet<&str> = old_note
            .filter(|old| !old.deleted)
            .map(|old| old.tags.iter().map(String::as_str).collect())
            .unwrap_or_default();
        let new_live: HashSet<&str> = if note.deleted {
            HashSet::new()
        } else {
            note.tags.iter().map(String::as_str).collect()
        };

        let mut tags = txn.open_table(TAGS)?;
        for added in new_live.difference(&old_live) {
            let current = tags.get(*added)?.map(|v| v.value()).unwrap_or(0);
            tags.insert(*added, current + 1)?;
        }
        for removed in old_live.difference(&new_live) {
            let current = tags.get(*removed)?.map(|v| v.value()).unwrap_or(0);
            if current <= 1 {
                tags.remove(*removed)?;
            } else {
                tags.insert(*removed, current - 1)?;
            }
        }

        Ok(())
    }

    fn write_edge_indexes(txn: &WriteTransaction, edge: &Edge) -> Result<()> {
        let edge_id_bytes = Self::uuid_to_bytes(&edge.id);

        {
            let mut pairs = txn.open_table(EDGE_PAIRS)?;
            pairs.insert(&Self::pair_key(&edge.source, &edge.target), &edge_id_bytes)?;
        }
        {
            let mut by_source = txn.open_multimap_table(EDGES_BY_SOURCE)?;
            by_source.insert(&Self::uuid_to_bytes(&edge.source), &edge_id_bytes)?;
        }
        {
            let mut by_target = txn.open_multimap_table(EDGES_BY_TARGET)?;
            by_target.insert(&Self::uuid_to_bytes(&edge.target), &edge_id_bytes)?;
        }

        Ok(())
    }

    /// Remove an edge and all its index entries inside an open transaction
    fn remove_edge_in(txn: &WriteTransaction, edge: &Edge) -> Result<()> {
        let edge_id_bytes = Self::uuid_to_bytes(&edge.id);

        {
            let mut pairs = txn.open_table(EDGE_PAIRS)?;
            pairs.remove(&Self::pair_key(&edge.source, &edge.target))?;
        }
        {
            let mut by_source = txn.open_multimap_table(EDGES_BY_SOURCE)?;
            by_source.remove(&Self::uuid_to_bytes(&edge.source), &edge_id_bytes)?;
        }
        {
            let mut by_target = txn.open_multimap_table(EDGES_BY_TARGET)?;
            by_target.remove(&Self::uuid_to_bytes(&edge.target), &edge_id_bytes)?;
        }
        {
            let mut edges = txn.open_table(EDGES)?;
            edges.remove(&edge_id_bytes)?;
        }

        Self::adjust_counter(txn, STATS_EDGE_COUNT_KEY, -1)
    }

    fn adjust_counter(txn: &WriteTransaction, key: &str, delta: i64) -> Result<()> {
        let mut meta = txn.open_table(META)?;
        let current = meta
            .get(key)?
            .map(|v| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(v.value());
                u64::from_le_bytes(bytes)
            })
            .unwrap_or(0);
        let next = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current + delta as u64
        };
        meta.insert(key, next.to_le_bytes().as_slice())?;
        Ok(())
    }

    fn read_counter(&self, key: &str) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        let meta = read_txn.open_table(META)?;
        Ok(meta
            .get(key)?
            .map(|v| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(v.value());
                u64::from_le_bytes(bytes)
            })
            .unwrap_or(0))
    }

    fn ids_in_multimap(
        txn: &WriteTransaction,
        def: MultimapTableDefinition<'static, &'static [u8; 16], &'static [u8; 16]>,
        key: &NoteId,
    ) -> Result<Vec<EdgeId>> {
        let table = txn.open_multimap_table(def)?;
        let raw: Vec<[u8; 16]> = table
            .get(&Self::uuid_to_bytes(key))?
            .map(|r| r.map(|g| *g.value()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raw.iter().map(Self::bytes_to_uuid).collect())
    }

    fn edges_via_index(
        &self,
        def: MultimapTableDefinition<'static, &'static [u8; 16], &'static [u8; 16]>,
        note_id: NoteId,
    ) -> Result<Vec<Edge>> {
        let read_txn = self.db.begin_read()?;
        let edges_table = read_txn.open_table(EDGES)?;
        let index = read_txn.open_multimap_table(def)?;

        let edge_ids: Vec<EdgeId> = index
            .get(&Self::uuid_to_bytes(&note_id))?
            .map(|result| result.map(|guard| Self::bytes_to_uuid(guard.value())))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut edges = Vec::with_capacity(edge_ids.len());
        for edge_id in edge_ids {
            if let Some(bytes) = edges_table.get(&Self::uuid_to_bytes(&edge_id))? {
                edges.push(Self::deserialize_edge(bytes.value())?);
            }
        }

        Ok(edges)
    }

    /// Check both endpoints exist and are live
    fn check_endpoints(txn: &WriteTransaction, edge: &Edge) -> Result<()> {
        for (role, id) in [("Source", &edge.source), ("Target", &edge.target)] {
            match Self::read_note_in(txn, id)? {
                Some(note) if !note.deleted => {}
                Some(_) => {
                    return Err(NoteweaveError::InvalidEdge {
                        reason: format!("{} note {} is deleted", role, id),
                    })
                }
                None => {
                    return Err(NoteweaveError::InvalidEdge {
                        reason: format!("{} note {} does not exist", role, id),
                    })
                }
            }
        }
        Ok(())
    }
}

impl Storage for RedbStorage {
    fn put_note(&self, note: &Note) -> Result<()> {
        note.validate().map_err(NoteweaveError::Validation)?;

        let write_txn = self.db.begin_write()?;
        let old_note = Self::read_note_in(&write_txn, &note.id)?;

        let note_bytes = Self::serialize(note)?;
        {
            let mut notes_table = write_txn.open_table(NOTES)?;
            notes_table.insert(&Self::uuid_to_bytes(&note.id), note_bytes.as_slice())?;
        }

        Self::update_note_indexes(&write_txn, note, old_note.as_ref())?;

        write_txn.commit()?;
        Ok(())
    }

    fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTES)?;

        if let Some(bytes) = table.get(&Self::uuid_to_bytes(&id))? {
            Ok(Some(Self::deserialize_note(bytes.value())?))
        } else {
            Ok(None)
        }
    }

    fn delete_note(&self, id: NoteId) -> Result<()> {
        let write_txn = self.db.begin_write()?;

        let old = Self::read_note_in(&write_txn, &id)?.ok_or(NoteweaveError::NoteNotFound(id))?;
        if old.deleted {
            return Ok(());
        }

        let mut note = old.clone();
        note.deleted = true;
        note.updated_at = Utc::now();

        let note_bytes = Self::serialize(&note)?;
        {
            let mut notes_table = write_txn.open_table(NOTES)?;
            notes_table.insert(&Self::uuid_to_bytes(&id), note_bytes.as_slice())?;
        }
        Self::update_note_indexes(&write_txn, &note, Some(&old))?;

        // Edges are derived from live text; a tombstoned note has none
        let mut edge_ids = Self::ids_in_multimap(&write_txn, EDGES_BY_SOURCE, &id)?;
        edge_ids.extend(Self::ids_in_multimap(&write_txn, EDGES_BY_TARGET, &id)?);
        for edge_id in edge_ids {
            if let Some(edge) = Self::read_edge_in(&write_txn, &edge_id)? {
                Self::remove_edge_in(&write_txn, &edge)?;
            }
        }

        write_txn.commit()?;
        Ok(())
    }

    fn list_notes(&self, filter: NoteFilter) -> Result<Vec<Note>> {
        let read_txn = self.db.begin_read()?;
        let notes_table = read_txn.open_table(NOTES)?;

        let mut notes = Vec::new();

        // Use the tag index when filtering by tag
        if let Some(ref tags) = filter.tags {
            let tag_index = read_txn.open_multimap_table(NOTES_BY_TAG)?;
            let mut seen = HashSet::new();

            for tag in tags {
                let note_ids: Vec<NoteId> = tag_index
                    .get(tag.as_str())?
                    .map(|result| result.map(|guard| Self::bytes_to_uuid(guard.value())))
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                for note_id in note_ids {
                    if !seen.insert(note_id) {
                        continue;
                    }
                    if let Some(bytes) = notes_table.get(&Self::uuid_to_bytes(&note_id))? {
                        let note = Self::deserialize_note(bytes.value())?;
                        if filter.matches(&note) {
                            notes.push(note);
                        }
                    }
                }
            }
        } else {
            // Full table scan
            for item in notes_table.iter()? {
                let (_, value) = item?;
                let note = Self::deserialize_note(value.value())?;
                if filter.matches(&note) {
                    notes.push(note);
                }
            }
        }

        // Newest first, id as a stable tiebreak
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let start = filter.offset.unwrap_or(0);
        let take = filter.limit.unwrap_or(usize::MAX);
        Ok(notes.into_iter().skip(start).take(take).collect())
    }

    fn find_by_title(&self, title: &str) -> Result<Vec<Note>> {
        let read_txn = self.db.begin_read()?;
        let notes_table = read_txn.open_table(NOTES)?;
        let title_index = read_txn.open_multimap_table(NOTES_BY_TITLE)?;

        let note_ids: Vec<NoteId> = title_index
            .get(title)?
            .map(|result| result.map(|guard| Self::bytes_to_uuid(guard.value())))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut notes = Vec::new();
        for note_id in note_ids {
            if let Some(bytes) = notes_table.get(&Self::uuid_to_bytes(&note_id))? {
                let note = Self::deserialize_note(bytes.value())?;
                // The index is not rewritten on tombstone
                if !note.deleted && note.title == title {
                    notes.push(note);
                }
            }
        }

        Ok(notes)
    }

    fn notes_with_tags(&self, tags: &[String]) -> Result<Vec<Note>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        self.list_notes(NoteFilter::new().with_tags(tags.to_vec()))
    }

    fn get_edge(&self, id: EdgeId) -> Result<Option<Edge>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EDGES)?;

        if let Some(bytes) = table.get(&Self::uuid_to_bytes(&id))? {
            Ok(Some(Self::deserialize_edge(bytes.value())?))
        } else {
            Ok(None)
        }
    }

    fn edges_from(&self, note_id: NoteId) -> Result<Vec<Edge>> {
        self.edges_via_index(EDGES_BY_SOURCE, note_id)
    }

    fn edges_to(&self, note_id: NoteId) -> Result<Vec<Edge>> {
        self.edges_via_index(EDGES_BY_TARGET, note_id)
    }

    fn edge_between(&self, source: NoteId, target: NoteId) -> Result<Option<Edge>> {
        let read_txn = self.db.begin_read()?;
        let pairs = read_txn.open_table(EDGE_PAIRS)?;
        let edge_id = pairs
            .get(&Self::pair_key(&source, &target))?
            .map(|guard| Self::bytes_to_uuid(guard.value()));
        drop(pairs);

        match edge_id {
            Some(id) => {
                let edges = read_txn.open_table(EDGES)?;
                let bytes = edges.get(&Self::uuid_to_bytes(&id))?;
                bytes
                    .map(|b| Self::deserialize_edge(b.value()))
                    .transpose()
            }
            None => Ok(None),
        }
    }

    fn insert_edges(&self, edges: &[Edge]) -> Result<Vec<Edge>> {
        for edge in edges {
            edge.validate()
                .map_err(|reason| NoteweaveError::InvalidEdge { reason })?;
        }

        // Single write transaction: redb serialises writers, so the pair
        // check and the insert cannot interleave with another sync.
        let write_txn = self.db.begin_write()?;
        let mut inserted = Vec::new();

        for edge in edges {
            Self::check_endpoints(&write_txn, edge)?;

            let exists = {
                let pairs = write_txn.open_table(EDGE_PAIRS)?;
                let found = pairs
                    .get(&Self::pair_key(&edge.source, &edge.target))?
                    .is_some();
                found
            };
            if exists {
                log::debug!(
                    "Edge {} -> {} already present, skipping insert",
                    edge.source,
                    edge.target
                );
                continue;
            }

            let edge_bytes = Self::serialize(edge)?;
            {
                let mut edges_table = write_txn.open_table(EDGES)?;
                edges_table.insert(&Self::uuid_to_bytes(&edge.id), edge_bytes.as_slice())?;
            }
            Self::write_edge_indexes(&write_txn, edge)?;
            Self::adjust_counter(&write_txn, STATS_EDGE_COUNT_KEY, 1)?;

            inserted.push(edge.clone());
        }

        write_txn.commit()?;
        Ok(inserted)
    }

    fn update_edge_context(&self, id: EdgeId, context: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;

        let mut edge = Self::read_edge_in(&write_txn, &id)?.ok_or(NoteweaveError::EdgeNotFound(id))?;
        edge.set_context(context);

        let edge_bytes = Self::serialize(&edge)?;
        {
            let mut edges_table = write_txn.open_table(EDGES)?;
            edges_table.insert(&Self::uuid_to_bytes(&id), edge_bytes.as_slice())?;
        }

        write_txn.commit()?;
        Ok(())
    }

    fn delete_edge(&self, id: EdgeId) -> Result<()> {
        let write_txn = self.db.begin_write()?;

        let edge = Self::read_edge_in(&write_txn, &id)?.ok_or(NoteweaveError::EdgeNotFound(id))?;
        Self::remove_edge_in(&write_txn, &edge)?;

        write_txn.commit()?;
        Ok(())
    }

    fn get_tag(&self, name: &str) -> Result<Option<Tag>> {
        let read_txn = self.db.begin_read()?;
        let tags = read_txn.open_table(TAGS)?;
        let tag = tags.get(name)?.map(|count| Tag {
            name: name.to_string(),
            usage_count: count.value(),
        });
        Ok(tag)
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        let read_txn = self.db.begin_read()?;
        let tags_table = read_txn.open_table(TAGS)?;

        let mut tags = Vec::new();
        for item in tags_table.iter()? {
            let (name, count) = item?;
            tags.push(Tag {
                name: name.value().to_string(),
                usage_count: count.value(),
            });
        }

        tags.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then(a.name.cmp(&b.name)));
        Ok(tags)
    }

    fn enqueue_events(&self, events: &[LinkCreated]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut outbox = write_txn.open_table(OUTBOX)?;
            for event in events {
                let bytes = Self::serialize(event)?;
                outbox.insert(&Self::uuid_to_bytes(&event.id), bytes.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn pending_events(&self, limit: usize) -> Result<Vec<LinkCreated>> {
        let read_txn = self.db.begin_read()?;
        let outbox = read_txn.open_table(OUTBOX)?;

        let mut events = Vec::new();
        for item in outbox.iter()? {
            if events.len() >= limit {
                break;
            }
            let (_, value) = item?;
            let event: LinkCreated = bincode::deserialize(value.value())?;
            events.push(event);
        }

        Ok(events)
    }

    fn ack_event(&self, id: EventId) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut outbox = write_txn.open_table(OUTBOX)?;
            outbox.remove(&Self::uuid_to_bytes(&id))?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        let edge_count = self.read_counter(STATS_EDGE_COUNT_KEY)?;

        let read_txn = self.db.begin_read()?;
        let notes_table = read_txn.open_table(NOTES)?;
        let tags_table = read_txn.open_table(TAGS)?;
        let outbox = read_txn.open_table(OUTBOX)?;

        let mut note_count = 0u64;
        let mut public_note_count = 0u64;
        let mut embedded_note_count = 0u64;
        let mut oldest_note: Option<DateTime<Utc>> = None;
        let mut newest_note: Option<DateTime<Utc>> = None;

        for item in notes_table.iter()? {
            let (_, value) = item?;
            let note = Self::deserialize_note(value.value())?;
            if note.deleted {
                continue;
            }
            note_count += 1;
            if note.visibility == Visibility::Public {
                public_note_count += 1;
            }
            if note.embedding.is_some() {
                embedded_note_count += 1;
            }
            if oldest_note.map_or(true, |t| note.created_at < t) {
                oldest_note = Some(note.created_at);
            }
            if newest_note.map_or(true, |t| note.created_at > t) {
                newest_note = Some(note.created_at);
            }
        }

        let tag_count = tags_table.iter()?.count() as u64;
        let pending_events = outbox.iter()?.count() as u64;

        let db_size_bytes = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StorageStats {
            note_count,
            public_note_count,
            embedded_note_count,
            edge_count,
            tag_count,
            pending_events,
            db_size_bytes,
            oldest_note,
            newest_note,
        })
    }

    fn snapshot(&self, path: &Path) -> Result<()> {
        std::fs::copy(&self.path, path).map_err(|e| {
            NoteweaveError::Validation(format!("Failed to create snapshot: {}", e))
        })?;
        Ok(())
    }
}
