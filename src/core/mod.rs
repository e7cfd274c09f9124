//! Core module - Memory contexts
//!
//! Command handlers never talk to a debugger directly. They resolve
//! expressions and read bytes through [`MemoryContext`], which is backed
//! either by a live process or by a flat memory image.

pub mod image;
pub mod memory;

// Re-export common types
pub use image::ImageMemory;
pub use memory::{to_address, ContextError, MemoryContext, ProcessMemory};
