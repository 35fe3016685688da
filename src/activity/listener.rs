use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TryRecvError};

use super::ActivityEntry;

/// Live view of the activity stream.
///
/// Receives every entry appended after [`ActivityLog::subscribe`] was called,
/// except those dropped because this listener's buffer was full.
///
/// Dropping the listener closes the channel; the log keeps the dead sender
/// and skips it on every broadcast.
///
/// [`ActivityLog::subscribe`]: super::ActivityLog::subscribe
#[derive(Debug)]
pub struct ActivityListener {
    pub(crate) inner: mpsc::Receiver<Arc<ActivityEntry>>,
}

impl ActivityListener {
    /// Waits for the next entry. `None` once the log itself is gone.
    pub async fn recv(&mut self) -> Option<Arc<ActivityEntry>> {
        self.inner.recv().await
    }

    /// Returns an entry if one is already buffered.
    pub fn try_recv(&mut self) -> Result<Arc<ActivityEntry>, TryRecvError> {
        self.inner.try_recv()
    }

    /// Explicitly stop listening. Same as `drop(self)`.
    pub fn unsubscribe(self) {}
}
