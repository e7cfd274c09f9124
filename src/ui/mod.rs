//! UI module - Command Line Interface
//!
//! Provides the reedline-based REPL and plain-text renderers.

pub mod cli;
pub mod hexdump;
