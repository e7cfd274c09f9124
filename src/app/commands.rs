//! Command processing
//!
//! Commands are rows in [`COMMANDS`]: a name, the required and optional
//! argument names, and a handler. [`dispatch`] tokenizes the argument
//! string, checks it against the declared arity and calls the handler.

use super::state::Session;
use crate::capture::{CaptureFlag, CaptureRecord, Operand, PersistenceError};
use crate::core::ContextError;
use crate::parse::{parse_int, tokenize, LiteralError, TokenizeError};
use crate::ui::hexdump;
use std::collections::BTreeSet;
use thiserror::Error;

/// Upper bound for a single memory read
pub const MAX_READ_LENGTH: usize = 64 * 1024 * 1024;

/// Bytes of payload shown by `captures`
const PREVIEW_BYTES: usize = 16;

/// Command errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unknown command: '{0}'")]
    UnknownCommand(String),

    #[error("Supplied {supplied} arguments, but {expected} expected: {synopsis}")]
    Usage {
        supplied: usize,
        expected: String,
        synopsis: String,
    },

    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Literal(#[from] LiteralError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Unknown capture flag '{0}'")]
    UnknownFlag(String),

    #[error("Invalid length '{expr}': {reason}")]
    InvalidLength { expr: String, reason: String },

    #[error("Unsupported pointer width: {0} bytes")]
    PointerWidth(usize),
}

/// Command handler; returns the text to show the user
pub type Handler = fn(&mut Session, &Invocation) -> Result<String, CommandError>;

/// One entry of the command table
pub struct CommandSpec {
    pub name: &'static str,
    /// Required argument names, in order
    pub args: &'static [&'static str],
    /// Optional argument names following the required ones
    pub optional: &'static [&'static str],
    pub help: &'static str,
    pub handler: Handler,
}

impl CommandSpec {
    /// `name arg1 arg2 [opt1] [opt2]`
    pub fn synopsis(&self) -> String {
        let mut synopsis = self.name.to_string();
        for arg in self.args {
            synopsis.push(' ');
            synopsis.push_str(arg);
        }
        for arg in self.optional {
            synopsis.push_str(&format!(" [{}]", arg));
        }
        synopsis
    }

    /// Check `tokens` against this command's arity and pad missing
    /// optional arguments with `None`.
    pub fn bind(&self, tokens: Vec<String>) -> Result<Invocation, CommandError> {
        let min = self.args.len();
        let max = min + self.optional.len();
        if tokens.len() < min || tokens.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            };
            return Err(CommandError::Usage {
                supplied: tokens.len(),
                expected,
                synopsis: self.synopsis(),
            });
        }

        let mut values: Vec<Option<String>> = tokens.into_iter().map(Some).collect();
        values.resize(max, None);
        Ok(Invocation { values })
    }
}

/// Arguments bound to a command, one slot per declared argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    values: Vec<Option<String>>,
}

impl Invocation {
    /// Required argument `index`
    pub fn arg(&self, index: usize) -> &str {
        self.get(index).unwrap_or_default()
    }

    /// Argument `index`, `None` if it was not supplied
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "hexdump",
        args: &["start", "length"],
        optional: &[],
        help: "prints a hex dump from 'start' ranging 'length' bytes",
        handler: cmd_hexdump,
    },
    CommandSpec {
        name: "capval",
        args: &["expr"],
        optional: &[],
        help: "captures the value of 'expr' into the capture log",
        handler: cmd_capval,
    },
    CommandSpec {
        name: "capmem",
        args: &["start", "length"],
        optional: &["comment", "flags"],
        help: "captures 'length' bytes from 'start'; flags: str",
        handler: cmd_capmem,
    },
    CommandSpec {
        name: "deref",
        args: &["expr"],
        optional: &[],
        help: "reads the pointer stored at 'expr'",
        handler: cmd_deref,
    },
    CommandSpec {
        name: "captures",
        args: &[],
        optional: &["count"],
        help: "lists the last 'count' entries of the capture log",
        handler: cmd_captures,
    },
];

/// Look up a command by name
pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Run one command line against `session`
pub fn dispatch(session: &mut Session, line: &str) -> Result<String, CommandError> {
    let line = line.trim_start_matches(' ');
    let (name, argstr) = line.split_once(' ').unwrap_or((line, ""));
    let spec = find_command(name).ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

    let invocation = spec.bind(tokenize(trim_separators(argstr))?)?;
    log::debug!("Dispatching {} {:?}", spec.name, invocation);
    (spec.handler)(session, &invocation)
}

/// Strip separator spaces around an argument string. Trailing spaces are
/// kept when they sit inside a quote that is never closed.
fn trim_separators(argstr: &str) -> &str {
    let argstr = argstr.trim_start_matches(' ');
    let mut quoted = false;
    let mut chars = argstr.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => quoted = !quoted,
            '\\' => {
                chars.next();
            }
            _ => {}
        }
    }

    if quoted {
        argstr
    } else {
        argstr.trim_end_matches(' ')
    }
}

/// `0x1a`, or `-0xa` for negative values
fn format_int(value: i128) -> String {
    if value < 0 {
        format!("-{:#x}", value.unsigned_abs())
    } else {
        format!("{:#x}", value)
    }
}

/// Resolve a byte count through the context
fn resolve_length(session: &Session, expr: &str) -> Result<usize, CommandError> {
    let invalid = |reason: String| CommandError::InvalidLength {
        expr: expr.to_string(),
        reason,
    };

    let value = session.context().resolve(expr)?;
    let length = usize::try_from(value).map_err(|_| invalid("does not fit in memory".into()))?;
    if length > MAX_READ_LENGTH {
        return Err(invalid(format!("exceeds {} bytes", MAX_READ_LENGTH)));
    }
    Ok(length)
}

/// Parse a comma separated flag list such as `str`
fn parse_flags(text: &str) -> Result<BTreeSet<CaptureFlag>, CommandError> {
    text.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(|label| {
            CaptureFlag::from_label(label).ok_or_else(|| CommandError::UnknownFlag(label.to_string()))
        })
        .collect()
}

fn cmd_hexdump(session: &mut Session, args: &Invocation) -> Result<String, CommandError> {
    let start = session.context().resolve_address(args.arg(0))?;
    let length = resolve_length(session, args.arg(1))?;
    let data = session.context().read(start, length)?;
    Ok(hexdump::render(&data, start))
}

fn cmd_capval(session: &mut Session, args: &Invocation) -> Result<String, CommandError> {
    let expr = args.arg(0);
    let value = session.context().resolve(expr)?;
    session
        .store()
        .append(CaptureRecord::build_value(Operand::new(expr, value)))?;
    Ok(format!("Captured {} = {} ({})", expr, format_int(value), value))
}

fn cmd_capmem(session: &mut Session, args: &Invocation) -> Result<String, CommandError> {
    let start_expr = args.arg(0);
    let length_expr = args.arg(1);
    let comment = args.get(2).filter(|c| !c.is_empty()).map(str::to_string);
    let flags = match args.get(3) {
        Some(text) => parse_flags(text)?,
        None => BTreeSet::new(),
    };

    let start = session.context().resolve_address(start_expr)?;
    let length = resolve_length(session, length_expr)?;
    let data = session.context().read(start, length)?;

    let record = CaptureRecord::build_memory(
        Operand::new(start_expr, start),
        Operand::new(length_expr, length as u64),
        data,
        comment,
        flags,
    );
    let record = session.store().append(record)?;

    let mut summary = format!("Captured {} bytes at {:#x} ({})", length, start, start_expr);
    if let CaptureRecord::Mem(mem) = &record {
        if mem.data.len() != length {
            summary.push_str(&format!(", kept {}", mem.data.len()));
        }
        for info in &mem.info {
            summary.push_str(&format!(" [{}]", info.label()));
        }
    }
    Ok(summary)
}

fn cmd_deref(session: &mut Session, args: &Invocation) -> Result<String, CommandError> {
    let expr = args.arg(0);
    let width = session.context().pointer_width();
    if width == 0 || width > 8 {
        return Err(CommandError::PointerWidth(width));
    }

    let address = session.context().resolve_address(expr)?;
    let bytes = session.context().read(address, width)?;
    let pointer = bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    Ok(format!("*({}) @ {:#x} = {:#x}", expr, address, pointer))
}

fn cmd_captures(session: &mut Session, args: &Invocation) -> Result<String, CommandError> {
    let records = session.store().records()?;
    let count = match args.get(0) {
        Some(text) => usize::try_from(parse_int(text)?).map_err(|_| CommandError::InvalidLength {
            expr: text.to_string(),
            reason: "must not be negative".into(),
        })?,
        None => records.len(),
    };

    let skip = records.len().saturating_sub(count);
    let lines: Vec<String> = records
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(index, record)| format!("#{:<4} {:.3}  {}", index, record.timestamp(), describe(record)))
        .collect();

    if records.is_empty() {
        return Ok(format!("No captures in {}", session.store().path().display()));
    }
    Ok(lines.join("\n"))
}

/// One-line summary of a capture record
fn describe(record: &CaptureRecord) -> String {
    match record {
        CaptureRecord::Val(val) => {
            format!("val {} = {}", val.expr.sym, format_int(val.expr.value))
        }
        CaptureRecord::Mem(mem) => {
            let shown = mem.data.len().min(PREVIEW_BYTES);
            let ellipsis = if mem.data.len() > shown { "..." } else { "" };
            let mut line = format!(
                "mem {}@{} len {} = {}{}",
                mem.start.sym,
                format_int(mem.start.value),
                mem.data.len(),
                hex::encode(&mem.data[..shown]),
                ellipsis
            );
            if let Some(comment) = &mem.comment {
                line.push_str(&format!(" \"{}\"", comment));
            }
            line
        }
    }
}
