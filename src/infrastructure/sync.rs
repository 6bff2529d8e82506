//! Shared view of the surrounding indexer's synchronization state.
//!
//! The indexer publishes into one `Arc<SyncStatus>`; every token graph polls
//! it for the liveness gate, the replay watermark and the startup-backfill
//! gauge. Engines never write it outside of tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Lifecycle of the surrounding indexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    /// Startup backfill still in progress
    Starting,
    /// Steady-state incremental processing
    Running,
    /// Shutting down
    Stopped,
}

/// Atomic snapshot of indexer-wide sync facts
#[derive(Debug)]
pub struct SyncStatus {
    state: AtomicU8,
    best_block_height: AtomicU64,
    synced: AtomicBool,
    startup_pending: AtomicUsize,
}

impl SyncStatus {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
            best_block_height: AtomicU64::new(0),
            synced: AtomicBool::new(false),
            startup_pending: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> IndexerState {
        match self.state.load(Ordering::SeqCst) {
            0 => IndexerState::Starting,
            1 => IndexerState::Running,
            _ => IndexerState::Stopped,
        }
    }

    pub fn set_state(&self, state: IndexerState) {
        let code = match state {
            IndexerState::Starting => 0,
            IndexerState::Running => 1,
            IndexerState::Stopped => 2,
        };
        self.state.store(code, Ordering::SeqCst);
    }

    /// Chain tip height as last published by the indexer
    pub fn best_block_height(&self) -> u64 {
        self.best_block_height.load(Ordering::SeqCst)
    }

    pub fn set_best_block_height(&self, height: u64) {
        self.best_block_height.store(height, Ordering::SeqCst);
    }

    /// True once block and mempool synchronization caught up with the node
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }

    /// True while the indexer-level startup backfill still has work queued
    pub fn startup_active(&self) -> bool {
        self.startup_pending.load(Ordering::SeqCst) > 0
    }

    /// The indexer registers one unit of startup backfill work
    pub fn startup_enqueued(&self) {
        self.startup_pending.fetch_add(1, Ordering::SeqCst);
    }

    /// The indexer finished one unit of startup backfill work
    pub fn startup_finished(&self) {
        let _ = self
            .startup_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_gauge_tracks_pending_units() {
        let sync = SyncStatus::new();
        assert!(!sync.startup_active());
        sync.startup_enqueued();
        sync.startup_enqueued();
        assert!(sync.startup_active());
        sync.startup_finished();
        sync.startup_finished();
        assert!(!sync.startup_active());
        // Underflow is ignored
        sync.startup_finished();
        assert!(!sync.startup_active());
    }

    #[test]
    fn state_round_trips() {
        let sync = SyncStatus::new();
        assert_eq!(sync.state(), IndexerState::Starting);
        sync.set_state(IndexerState::Running);
        assert_eq!(sync.state(), IndexerState::Running);
        sync.set_state(IndexerState::Stopped);
        assert_eq!(sync.state(), IndexerState::Stopped);
    }
}
