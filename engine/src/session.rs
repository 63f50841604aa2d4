use std::sync::Mutex;

use crate::cancel::CancelToken;

/// Serializes user-driven generations: beginning a new one cancels whatever
/// run is still in flight, so an abandoned poll loop stops instead of racing
/// the new request.
#[derive(Default)]
pub struct GenerationSession {
    current: Mutex<Option<CancelToken>>,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for the next run; any previous run is cancelled first
    pub fn begin(&self) -> CancelToken {
        let token = CancelToken::new();
        let mut current = self
            .current
            .lock()
            .expect("generation session lock poisoned");
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancels the outstanding run, if any
    pub fn cancel_current(&self) {
        let mut current = self
            .current
            .lock()
            .expect("generation session lock poisoned");
        if let Some(token) = current.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beginning_a_run_cancels_the_previous_one() {
        let session = GenerationSession::new();

        let first = session.begin();
        assert!(!first.is_cancelled());

        let second = session.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn cancel_current_is_idempotent() {
        let session = GenerationSession::new();
        session.cancel_current();

        let token = session.begin();
        session.cancel_current();
        assert!(token.is_cancelled());

        session.cancel_current();
    }
}
