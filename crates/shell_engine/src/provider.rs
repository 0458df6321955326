use futures::future::LocalBoxFuture;
use shell_contract::{HistoryEntry, ShellError};

/// Source of submissions older than the session's local history.
pub trait HistoryProvider {
    /// Fetches the entry `index` steps back from the most recent submission.
    ///
    /// Providers may serve a different (clamped) index and report it in
    /// [`HistoryEntry::index`].
    fn fetch(&self, index: usize) -> LocalBoxFuture<'_, Result<HistoryEntry, ShellError>>;
}

/// Best-effort sink for submitted command lines.
pub trait CommandLog {
    /// Records one submitted line. Failures are logged and otherwise ignored by the session.
    fn record(&self, command: &str) -> Result<(), ShellError>;
}
