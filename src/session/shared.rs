//! State shared between the orchestrator loop and the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::SessionRecord;

/// Observable session state. The orchestrator writes, the host reads;
/// everything is behind atomics or a lock so either side may live on its
/// own thread.
pub struct SharedState {
    /// Exactly one session may be in flight at a time.
    session_active: AtomicBool,
    /// Request the orchestrator loop to exit.
    shutdown_requested: AtomicBool,
    /// Record of the most recently finished session.
    last_record: RwLock<Option<SessionRecord>>,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            session_active: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
            last_record: RwLock::new(None),
        })
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active.load(Ordering::SeqCst)
    }

    pub fn set_session_active(&self, value: bool) {
        self.session_active.store(value, Ordering::SeqCst);
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn publish_record(&self, record: SessionRecord) {
        *self.last_record.write() = Some(record);
    }

    pub fn last_record(&self) -> Option<SessionRecord> {
        self.last_record.read().clone()
    }
}
