//! Pause/cancel signalling between a caller and a running transfer.
//!
//! Clones share state. The engine polls at every chunk boundary and between
//! files; `cancel` also releases a paused worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::errors::TransferError;

const PAUSE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Flags {
    paused: AtomicBool,
    cancelled: AtomicBool,
}

#[derive(Debug, Clone, Default)]
pub struct TransferControl {
    flags: Arc<Flags>,
}

impl TransferControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.flags.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.flags.paused.store(false, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.flags.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.cancelled.load(Ordering::SeqCst)
    }

    /// Block while paused. Returns whether any waiting happened.
    pub fn should_pause(&self) -> bool {
        let mut waited = false;
        while self.is_paused() && !self.is_cancelled() {
            waited = true;
            thread::sleep(PAUSE_POLL);
        }
        waited
    }

    /// Wait out a pause, then fail with `Cancelled` if cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), TransferError> {
        if self.should_pause() {
            tracing::debug!("transfer resumed");
        }
        if self.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        Ok(())
    }
}
