//! Session state
//!
//! Everything a command needs: the memory context it resolves and reads
//! through, and the capture log it appends to.

use crate::capture::CaptureStore;
use crate::core::MemoryContext;

pub struct Session {
    /// Source of symbols and bytes
    context: Box<dyn MemoryContext>,
    /// Capture log for `capval` / `capmem`
    store: CaptureStore,
}

impl Session {
    pub fn new(context: Box<dyn MemoryContext>, store: CaptureStore) -> Self {
        Self { context, store }
    }

    pub fn context(&self) -> &dyn MemoryContext {
        self.context.as_ref()
    }

    pub fn store(&self) -> &CaptureStore {
        &self.store
    }

    /// Number of decodable records in the capture log (0 if unreadable)
    pub fn capture_count(&self) -> usize {
        self.store.records().map(|r| r.len()).unwrap_or(0)
    }
}
