//! Global run-state flag
//!
//! The pause flag provides cooperative cancellation for the texture load
//! pipeline: loads check it at submission and again when a decode completes,
//! and resolve as failures while the engine is paused. The flag is cloneable
//! and safe to read from decode worker threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared pause flag for the engine run loop
#[derive(Clone, Debug, Default)]
pub struct RunState {
    paused: Arc<AtomicBool>,
}

impl RunState {
    /// Create a new, unpaused run state
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause the engine; in-flight and new loads will resolve as failures
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        log::info!("Engine paused");
    }

    /// Resume the engine
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        log::info!("Engine resumed");
    }

    /// Whether the engine is currently paused
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
