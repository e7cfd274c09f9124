//! Tokenizer - Shell-like argument splitting
//!
//! Splits on single spaces, groups text inside double quotes and accepts
//! `\\` and `\"` as the only escape sequences.

use thiserror::Error;

/// Tokenizer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("Illegal escape sequence: \\{0}")]
    IllegalEscapeSequence(char),

    #[error("Backslash at end of string provided")]
    DanglingEscape,
}

/// Split a command argument string into tokens.
///
/// Every space outside of quotes opens a new token, so repeated spaces
/// yield empty tokens. An unterminated quote is accepted and simply runs
/// to the end of the input.
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut tokens = vec![String::new()];
    let mut quoted = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        // `tokens` always holds at least one slot
        let current = tokens.len() - 1;
        match c {
            ' ' if quoted => tokens[current].push(c),
            ' ' => tokens.push(String::new()),
            '"' => quoted = !quoted,
            '\\' => match chars.next() {
                Some(escaped @ ('\\' | '"')) => tokens[current].push(escaped),
                Some(other) => return Err(TokenizeError::IllegalEscapeSequence(other)),
                None => return Err(TokenizeError::DanglingEscape),
            },
            _ => tokens[current].push(c),
        }
    }

    Ok(tokens)
}
