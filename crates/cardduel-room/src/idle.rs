//! Expiry timer for room actors.

use std::time::Duration;

use tokio::time::Instant;

/// An optional point in time a room actor races its inbox against.
///
/// When unset, [`wait`](Self::wait) never completes, so the actor's
/// `select!` only wakes for commands.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub(crate) fn arm(&mut self, after: Duration) {
        self.at = Some(Instant::now() + after);
    }

    pub(crate) fn disarm(&mut self) {
        self.at = None;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    pub(crate) async fn wait(self) {
        match self.at {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}
