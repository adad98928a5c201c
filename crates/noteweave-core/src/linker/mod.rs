//! Link graph synchronisation
//!
//! Edges are a cache derived from note text. On every save the synchroniser:
//! - Extracts `[[title]]` mentions and their sentence context
//! - Resolves each title to a note the author may see
//! - Rewrites, inserts and deletes edges until they match the text
//! - Emits a `LinkCreated` event for each new edge into someone else's note

mod config;
mod extract;
mod metrics;
mod resolver;
mod sync;


pub use config::LinkerConfig;
pub use extract::{clip_context, extract_context, extract_mentions, Mention};
pub use metrics::{LinkerMetrics, SyncReport};
pub use resolver::{pick_target, TargetResolver};
pub use sync::GraphSynchronizer;
