//! Memory - Expression resolution and memory reads
//!
//! Defines the [`MemoryContext`] capability and the live-process backend.

use crate::parse::{parse_int, LiteralError};
use thiserror::Error;

/// Memory context errors
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Failed to read {size} bytes at {address:#x}: {reason}")]
    ReadFailed {
        address: u64,
        size: usize,
        reason: String,
    },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error(transparent)]
    Literal(#[from] LiteralError),

    #[error("Process not found: {pid}")]
    ProcessNotFound { pid: u32 },

    #[error("Process memory access is not supported on this platform")]
    Unsupported,
}

/// Host capabilities needed by the command layer
pub trait MemoryContext {
    /// Resolve an expression (symbol or literal) to its integer value,
    /// anywhere in `i64::MIN..=u64::MAX`
    fn resolve(&self, expr: &str) -> Result<i128, ContextError>;

    /// Resolve an expression used as an address
    fn resolve_address(&self, expr: &str) -> Result<u64, ContextError> {
        Ok(to_address(self.resolve(expr)?))
    }

    /// Read exactly `length` bytes starting at `address`
    fn read(&self, address: u64, length: usize) -> Result<Vec<u8>, ContextError>;

    /// Pointer size of the target in bytes
    fn pointer_width(&self) -> usize {
        std::mem::size_of::<usize>()
    }

    /// Short label for prompts and logs
    fn describe(&self) -> String;
}

pub fn resolve_literal(expr: &str) -> Result<i128, ContextError> {
    Ok(parse_int(expr)?)
}

/// Map a resolved value onto the 64-bit address space. Negative values
/// wrap to their two's complement, the way a debugger reinterprets them
/// as pointers.
pub fn to_address(value: i128) -> u64 {
    value as u64
}

/// Memory of a running process, read through `/proc/<pid>/mem`
pub struct ProcessMemory {
    pid: u32,
}

impl ProcessMemory {
    /// Open a process for memory reads
    #[cfg(target_os = "linux")]
    pub fn open(pid: u32) -> Result<Self, ContextError> {
        if !std::path::Path::new(&format!("/proc/{}", pid)).exists() {
            return Err(ContextError::ProcessNotFound { pid });
        }
        log::info!("Using memory of process {}", pid);
        Ok(Self { pid })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn open(_pid: u32) -> Result<Self, ContextError> {
        Err(ContextError::Unsupported)
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl MemoryContext for ProcessMemory {
    fn resolve(&self, expr: &str) -> Result<i128, ContextError> {
        resolve_literal(expr)
    }

    fn read(&self, address: u64, length: usize) -> Result<Vec<u8>, ContextError> {
        let mut buffer = vec![0u8; length];
        self.read_into(address, &mut buffer)?;
        Ok(buffer)
    }

    fn describe(&self) -> String {
        format!("pid:{}", self.pid)
    }
}

// Linux-specific implementations
#[cfg(target_os = "linux")]
impl ProcessMemory {
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<(), ContextError> {
        use std::fs::File;
        use std::io::{Read, Seek, SeekFrom};

        let size = buffer.len();
        let failed = |e: std::io::Error| ContextError::ReadFailed {
            address,
            size,
            reason: e.to_string(),
        };

        let mem_path = format!("/proc/{}/mem", self.pid);
        let mut file = File::open(&mem_path).map_err(failed)?;
        file.seek(SeekFrom::Start(address)).map_err(failed)?;
        file.read_exact(buffer).map_err(failed)?;

        log::debug!("Read {} bytes at {:#x} from pid {}", size, address, self.pid);
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
impl ProcessMemory {
    fn read_into(&self, _address: u64, _buffer: &mut [u8]) -> Result<(), ContextError> {
        Err(ContextError::Unsupported)
    }
}
