use crate::error::Result;
use crate::storage::Storage;
use crate::types::{Note, NoteId};

/// Maps mention titles to link targets.
///
/// A title that matches nothing and a title that only matches notes the
/// actor cannot see both resolve to `None`, so callers cannot probe for
/// private notes.
pub struct TargetResolver<'a, S: Storage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: Storage + ?Sized> TargetResolver<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Resolve `title` for `actor` writing in note `source`.
    ///
    /// Errors only when the title lookup itself fails.
    pub fn resolve(&self, title: &str, actor: &str, source: NoteId) -> Result<Option<NoteId>> {
        let candidates = self.storage.find_by_title(title)?;
        Ok(pick_target(&candidates, actor, source))
    }
}

/// Choose among notes sharing a title.
///
/// Eligible: live, not the source, visible to the actor. Among those the
/// actor's own notes win, then the oldest, then the smallest id.
pub fn pick_target(candidates: &[Note], actor: &str, source: NoteId) -> Option<NoteId> {
    candidates
        .iter()
        .filter(|n| !n.deleted && n.id != source && n.is_visible_to(actor))
        .min_by(|a, b| {
            (a.owner != actor)
                .cmp(&(b.owner != actor))
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        })
        .map(|n| n.id)
}
