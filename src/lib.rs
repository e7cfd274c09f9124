//! tracecap - command dispatch and capture log for debugging sessions
//!
//! - [`parse`]: argument tokenizer and numeric literal parser
//! - [`capture`]: value/memory capture records and the JSON capture log
//! - [`core`]: memory contexts commands resolve and read through
//! - [`app`]: session state and the command table
//! - [`ui`]: REPL and text rendering

pub mod app;
pub mod capture;
pub mod config;
pub mod core;
pub mod parse;
pub mod ui;
