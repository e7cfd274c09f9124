//! Capture module - Persistent value and memory snapshots
//!
//! Records are kept in a single JSON array on disk. Each append re-reads
//! the whole file, pushes one record and rewrites the file.

pub mod record;
pub mod store;

pub use record::{CaptureFlag, CaptureInfo, CaptureRecord, MemoryCapture, Operand, ValueCapture};
pub use store::{CaptureStore, PersistenceError};
