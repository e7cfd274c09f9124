//! Parse module - Command line text handling
//!
//! Splits raw argument strings into tokens and turns numeric literals
//! (`0x1A`, `4k`, `-10`) into integers.

pub mod literal;
pub mod tokenizer;

pub use literal::{parse_int, LiteralError};
pub use tokenizer::{tokenize, TokenizeError};
