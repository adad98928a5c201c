//! Outbound "link created" events.
//!
//! The synchroniser never calls a notification service directly. It hands
//! events to a [`NotificationSink`]; the durable sink ([`OutboxSink`]) writes
//! them to the store's outbox table, and [`drain_outbox`] delivers them later.
//! Delivery is at-least-once: an event is acked only after `deliver` succeeds.

use crate::error::Result;
use crate::storage::Storage;
use crate::types::{EventId, NoteId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Someone linked to a note you own
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkCreated {
    /// UUIDv7, so outbox order is creation order.
    pub id: EventId,
    /// Owner of the target note.
    pub recipient: UserId,
    pub source: NoteId,
    pub target: NoteId,
    /// The user whose save created the edge.
    pub actor: UserId,
    pub created_at: DateTime<Utc>,
}

impl LinkCreated {
    pub fn new(
        recipient: impl Into<UserId>,
        source: NoteId,
        target: NoteId,
        actor: impl Into<UserId>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            recipient: recipient.into(),
            source,
            target,
            actor: actor.into(),
            created_at: Utc::now(),
        }
    }
}

/// Fire-and-forget consumer of link events
pub trait NotificationSink: Send + Sync {
    fn publish(&self, events: &[LinkCreated]) -> Result<()>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn publish(&self, events: &[LinkCreated]) -> Result<()> {
        (**self).publish(events)
    }
}

/// Durable sink backed by the store's outbox table
pub struct OutboxSink<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> OutboxSink<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> NotificationSink for OutboxSink<S> {
    fn publish(&self, events: &[LinkCreated]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        self.storage.enqueue_events(events)
    }
}

/// Collects events in memory. Used by tests and embedded callers that
/// forward events themselves.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<LinkCreated>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LinkCreated> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl NotificationSink for MemorySink {
    fn publish(&self, events: &[LinkCreated]) -> Result<()> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| crate::error::NoteweaveError::Validation("Sink lock poisoned".into()))?;
        guard.extend_from_slice(events);
        Ok(())
    }
}

/// Drops every event
pub struct NullSink;

impl NotificationSink for NullSink {
    fn publish(&self, _events: &[LinkCreated]) -> Result<()> {
        Ok(())
    }
}

/// Deliver up to `limit` pending outbox events, oldest first.
///
/// Stops at the first delivery failure, leaving that event and everything
/// after it pending. Returns the number of events delivered and acked.
pub fn drain_outbox<S, F>(storage: &S, limit: usize, mut deliver: F) -> Result<usize>
where
    S: Storage + ?Sized,
    F: FnMut(&LinkCreated) -> Result<()>,
{
    let pending = storage.pending_events(limit)?;
    let mut delivered = 0;

    for event in &pending {
        if let Err(e) = deliver(event) {
            log::warn!(
                "Outbox delivery failed for event {} (recipient {}): {}",
                event.id,
                event.recipient,
                e
            );
            break;
        }
        storage.ack_event(event.id)?;
        delivered += 1;
    }

    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoteweaveError;
    use crate::storage::RedbStorage;
    use tempfile::TempDir;

    fn create_test_storage() -> (Arc<RedbStorage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = RedbStorage::open(temp_dir.path().join("outbox.redb")).unwrap();
        (Arc::new(storage), temp_dir)
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        let event = LinkCreated::new("bob", Uuid::now_v7(), Uuid::now_v7(), "alice");
        sink.publish(&[event.clone()]).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0], event);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_outbox_sink_persists_and_drains_in_order() {
        let (storage, _temp) = create_test_storage();
        let sink = OutboxSink::new(storage.clone());

        let first = LinkCreated::new("bob", Uuid::now_v7(), Uuid::now_v7(), "alice");
        let second = LinkCreated::new("carol", Uuid::now_v7(), Uuid::now_v7(), "alice");
        sink.publish(&[first.clone(), second.clone()]).unwrap();

        let mut seen = Vec::new();
        let delivered = drain_outbox(storage.as_ref(), 10, |event| {
            seen.push(event.recipient.clone());
            Ok(())
        })
        .unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(seen, vec!["bob".to_string(), "carol".to_string()]);
        assert!(storage.pending_events(10).unwrap().is_empty());
    }

    #[test]
    fn test_failed_delivery_stays_pending() {
        let (storage, _temp) = create_test_storage();
        let sink = OutboxSink::new(storage.clone());

        let first = LinkCreated::new("bob", Uuid::now_v7(), Uuid::now_v7(), "alice");
        let second = LinkCreated::new("carol", Uuid::now_v7(), Uuid::now_v7(), "alice");
        sink.publish(&[first.clone(), second.clone()]).unwrap();

        let delivered = drain_outbox(storage.as_ref(), 10, |event| {
            if event.recipient == "carol" {
                Err(NoteweaveError::Validation("mailer down".into()))
            } else {
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(delivered, 1);
        let pending = storage.pending_events(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
    }
}
