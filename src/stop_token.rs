use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single cooperative interrupt flag, shared by the motor driver, the
/// feedback controller and the continuous-rotation task. Owned by the
/// session and cloned into whatever needs to poll it.
#[derive(Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear_and_tracks_requests() {
        let token = StopToken::new();
        assert!(!token.is_stop_requested());
        token.request_stop();
        assert!(token.is_stop_requested());
        token.clear();
        assert!(!token.is_stop_requested());
    }

    #[test]
    fn clones_share_state() {
        let token = StopToken::new();
        let clone = token.clone();
        clone.request_stop();
        assert!(token.is_stop_requested());
    }
}
