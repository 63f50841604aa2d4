use std::sync::Arc;

use tokio::sync::watch;

use crate::error::GenerationError;

/// Cooperative cancellation flag shared between a run loop and its owner.
///
/// Clones observe the same flag. The driver checks it before every wait and
/// every network call, so an abandoned generation stops promptly instead of
/// polling in the background forever.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn check(&self) -> Result<(), GenerationError> {
        if self.is_cancelled() {
            Err(GenerationError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // wait_for only fails when the sender is dropped, and self holds it
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
