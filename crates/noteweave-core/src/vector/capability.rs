use crate::error::Result;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Why an optional capability produced nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// No provider wired in (no model, no credentials).
    NotConfigured,
    /// The provider returned an error.
    Failed(String),
    /// The provider did not answer within the budget.
    TimedOut,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::NotConfigured => f.write_str("not configured"),
            Unavailable::Failed(reason) => write!(f, "failed: {}", reason),
            Unavailable::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Result of calling an optional capability. Never an error: callers
/// branch on it.
#[derive(Debug, Clone, PartialEq)]
pub enum Capability<T> {
    Available(T),
    Unavailable(Unavailable),
}

impl<T> Capability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Capability::Available(value) => Some(value),
            Capability::Unavailable(_) => None,
        }
    }
}

/// Run a capability call under `timeout`, folding errors and timeouts
/// into [`Capability::Unavailable`].
pub async fn guard<T, F>(timeout: Duration, call: F) -> Capability<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Capability::Available(value),
        Ok(Err(e)) => Capability::Unavailable(Unavailable::Failed(e.to_string())),
        Err(_) => Capability::Unavailable(Unavailable::TimedOut),
    }
}
