//! App module - session state and command dispatch
//!
//! Provides the command table and the state each command runs against.

mod commands;
mod state;

pub use commands::*;
pub use state::*;
