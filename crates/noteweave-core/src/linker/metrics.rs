use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a single sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Distinct resolved targets in the text. This is the valid-link count.
    pub valid_links: usize,

    /// Edges inserted by this sync.
    pub created: usize,

    /// Existing edges whose context was rewritten.
    pub updated: usize,

    /// Stale edges deleted.
    pub removed: usize,

    /// Mentions that matched no eligible note.
    pub unresolved: usize,

    /// Absorbed storage or publish errors.
    pub failures: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Running totals across syncs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkerMetrics {
    /// Total syncs completed.
    pub syncs: u64,

    pub edges_created: u64,

    pub edges_updated: u64,

    pub edges_removed: u64,

    pub mentions_unresolved: u64,

    pub failures: u64,

    /// Processing time of the last sync.
    #[serde(with = "duration_serializer")]
    pub last_sync_duration: Duration,

    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Default for LinkerMetrics {
    fn default() -> Self {
        Self {
            syncs: 0,
            edges_created: 0,
            edges_updated: 0,
            edges_removed: 0,
            mentions_unresolved: 0,
            failures: 0,
            last_sync_duration: Duration::from_millis(0),
            last_sync_at: None,
        }
    }
}

impl LinkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sync into the totals
    pub fn record(&mut self, report: &SyncReport, duration: Duration) {
        self.syncs += 1;
        self.edges_created += report.created as u64;
        self.edges_updated += report.updated as u64;
        self.edges_removed += report.removed as u64;
        self.mentions_unresolved += report.unresolved as u64;
        self.failures += report.failures as u64;
        self.last_sync_duration = duration;
        self.last_sync_at = Some(Utc::now());
    }

    /// Get a summary string for logging
    pub fn summary(&self) -> String {
        format!(
            "{} syncs: created {} edges, updated {}, removed {}, {} unresolved mentions, \
             {} failures | last sync {:?}",
            self.syncs,
            self.edges_created,
            self.edges_updated,
            self.edges_removed,
            self.mentions_unresolved,
            self.failures,
            self.last_sync_duration
        )
    }
}

// Custom serializer for Duration
mod duration_serializer {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut metrics = LinkerMetrics::new();
        let report = SyncReport {
            valid_links: 3,
            created: 2,
            updated: 1,
            removed: 1,
            unresolved: 4,
            failures: 0,
        };

        metrics.record(&report, Duration::from_millis(12));
        metrics.record(&report, Duration::from_millis(7));

        assert_eq!(metrics.syncs, 2);
        assert_eq!(metrics.edges_created, 4);
        assert_eq!(metrics.mentions_unresolved, 8);
        assert_eq!(metrics.last_sync_duration, Duration::from_millis(7));
        assert!(metrics.last_sync_at.is_some());
        assert!(metrics.summary().starts_with("2 syncs"));
    }

    #[test]
    fn test_metrics_serialize_duration_as_millis() {
        let mut metrics = LinkerMetrics::new();
        metrics.record(&SyncReport::default(), Duration::from_millis(250));

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["last_sync_duration"], 250);
    }
}
