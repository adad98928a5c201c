use crate::error::Result;
use crate::linker::extract::{clip_context, extract_context, extract_mentions};
use crate::linker::resolver::TargetResolver;
use crate::linker::{LinkerConfig, LinkerMetrics, SyncReport};
use crate::notify::{LinkCreated, NotificationSink};
use crate::storage::Storage;
use crate::types::{Edge, NoteId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Keeps a note's outgoing edges in step with the wikilinks in its text.
///
/// Every mention and every edge write is independent: a failed write is
/// logged and counted in the report, and processing carries on.
pub struct GraphSynchronizer<S: Storage, N: NotificationSink> {
    storage: Arc<S>,
    sink: N,
    config: LinkerConfig,
    metrics: Mutex<LinkerMetrics>,
}

impl<S: Storage, N: NotificationSink> GraphSynchronizer<S, N> {
    pub fn new(storage: Arc<S>, sink: N, config: LinkerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            storage,
            sink,
            config,
            metrics: Mutex::new(LinkerMetrics::new()),
        })
    }

    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    /// Snapshot of the running totals
    pub fn metrics(&self) -> LinkerMetrics {
        self.metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Reconcile the outgoing edges of `source` with `text`, as written by `actor`.
    ///
    /// Fails only if the existing edges cannot be read.
    pub fn sync(&self, source: NoteId, text: &str, actor: &str) -> Result<SyncReport> {
        let start = Instant::now();
        let mut report = SyncReport::default();

        // 1. Existing outgoing edges, keyed by target
        let existing: HashMap<NoteId, Edge> = self
            .storage
            .edges_from(source)?
            .into_iter()
            .map(|edge| (edge.target, edge))
            .collect();

        // 2. Resolve mentions; the last context per target wins
        let mentions = extract_mentions(text);
        if mentions.len() > self.config.max_mentions {
            log::warn!(
                "Note {} has {} mentions, only the first {} are linked",
                source,
                mentions.len(),
                self.config.max_mentions
            );
        }

        let resolver = TargetResolver::new(self.storage.as_ref());
        let mut resolved: HashMap<&str, Option<NoteId>> = HashMap::new();
        let mut found: HashMap<NoteId, String> = HashMap::new();
        let mut order: Vec<NoteId> = Vec::new();
        let mut lookup_failed = false;

        for mention in mentions.iter().take(self.config.max_mentions) {
            let target = match resolved.get(mention.title.as_str()) {
                Some(target) => *target,
                None => {
                    let target = match resolver.resolve(&mention.title, actor, source) {
                        Ok(target) => target,
                        Err(e) => {
                            log::warn!(
                                "Title lookup for '{}' in note {} failed: {}",
                                mention.title,
                                source,
                                e
                            );
                            report.failures += 1;
                            lookup_failed = true;
                            None
                        }
                    };
                    resolved.insert(mention.title.as_str(), target);
                    target
                }
            };

            let Some(target) = target else {
                log::debug!("Mention '{}' in note {} unresolved", mention.title, source);
                report.unresolved += 1;
                continue;
            };

            let context = clip_context(
                &extract_context(text, mention.start, mention.match_text.len()),
                &mention.match_text,
                self.config.max_context_chars,
            );

            log::debug!("Mention '{}' in note {} -> {}", mention.title, source, target);
            if found.insert(target, context).is_none() {
                order.push(target);
            }
        }

        // 3. Rewrite contexts of surviving edges, stage the rest
        let mut staged = Vec::new();
        for target in &order {
            let context = &found[target];
            match existing.get(target) {
                Some(edge) => match self.storage.update_edge_context(edge.id, context) {
                    Ok(()) => report.updated += 1,
                    Err(e) => {
                        log::warn!("Failed to update context of edge {}: {}", edge.id, e);
                        report.failures += 1;
                    }
                },
                None => staged.push(Edge::new(source, *target, context.clone(), actor)),
            }
        }

        // 4. Persist new edges
        let created = self.insert_staged(&staged, &mut report);
        report.created = created.len();

        // 5. Tell target owners, never the actor
        self.notify(&created, actor, &mut report);

        // 6. Drop stale edges. A failed lookup leaves the target set
        // incomplete, so nothing is treated as stale in that case.
        if lookup_failed {
            log::warn!(
                "Skipping stale edge removal for note {} after lookup failures",
                source
            );
        } else {
            for (target, edge) in &existing {
                if found.contains_key(target) {
                    continue;
                }
                match self.storage.delete_edge(edge.id) {
                    Ok(()) => report.removed += 1,
                    Err(e) => {
                        log::warn!("Failed to delete stale edge {}: {}", edge.id, e);
                        report.failures += 1;
                    }
                }
            }
        }

        // 7. Valid-link count
        report.valid_links = found.len();

        log::info!(
            "Synced note {}: {} links ({} created, {} updated, {} removed, {} unresolved, {} failures)",
            source,
            report.valid_links,
            report.created,
            report.updated,
            report.removed,
            report.unresolved,
            report.failures
        );

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record(&report, start.elapsed());
        }

        Ok(report)
    }

    /// Bulk insert, falling back to one edge at a time if the batch fails
    fn insert_staged(&self, staged: &[Edge], report: &mut SyncReport) -> Vec<Edge> {
        if staged.is_empty() {
            return Vec::new();
        }

        match self.storage.insert_edges(staged) {
            Ok(inserted) => return inserted,
            Err(e) => log::warn!(
                "Bulk insert of {} edges failed, retrying individually: {}",
                staged.len(),
                e
            ),
        }

        let mut inserted = Vec::new();
        for edge in staged {
            match self.storage.insert_edges(std::slice::from_ref(edge)) {
                Ok(mut written) => inserted.append(&mut written),
                Err(e) => {
                    log::warn!(
                        "Failed to insert edge {} -> {}: {}",
                        edge.source,
                        edge.target,
                        e
                    );
                    report.failures += 1;
                }
            }
        }
        inserted
    }

    fn notify(&self, created: &[Edge], actor: &str, report: &mut SyncReport) {
        let mut events = Vec::new();

        for edge in created {
            match self.storage.get_note(edge.target) {
                Ok(Some(target)) if target.owner != actor => {
                    events.push(LinkCreated::new(target.owner, edge.source, edge.target, actor));
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Failed to load target note {}: {}", edge.target, e);
                    report.failures += 1;
                }
            }
        }

        if events.is_empty() {
            return;
        }

        if let Err(e) = self.sink.publish(&events) {
            log::warn!("Failed to publish {} link events: {}", events.len(), e);
            report.failures += 1;
        }
    }
}
