//! Cooperative cancellation for resets and workers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::systems::SystemError;

/// Cloneable cancellation signal.
///
/// All clones observe the same flag. Once cancelled it stays cancelled; use a
/// fresh `Cancellation` for the next attempt.
#[derive(Clone, Debug)]
pub struct Cancellation {
    flag: Arc<watch::Sender<bool>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(watch::Sender::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Returns `Err(SystemError::Cancelled)` if cancellation was requested.
    pub fn check(&self, system: &'static str) -> Result<(), SystemError> {
        if self.is_cancelled() {
            return Err(SystemError::Cancelled { system });
        }
        Ok(())
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
