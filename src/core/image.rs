//! Flat memory image mapped at a base address.
//!
//! Used when no live process is attached: a raw dump (or any file) is
//! treated as memory starting at `base`, with an optional symbol table.

use super::memory::{resolve_literal, ContextError, MemoryContext};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct ImageMemory {
    base: u64,
    data: Vec<u8>,
    symbols: HashMap<String, u64>,
    pointer_width: usize,
}

impl ImageMemory {
    pub fn new(base: u64, data: Vec<u8>) -> Self {
        Self {
            base,
            data,
            symbols: HashMap::new(),
            pointer_width: std::mem::size_of::<usize>(),
        }
    }

    /// An image with no bytes; only literals and symbols resolve
    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    /// Load a file as memory starting at `base`
    pub fn from_file<P: AsRef<Path>>(path: P, base: u64) -> std::io::Result<Self> {
        let data = fs::read(&path)?;
        log::info!(
            "Loaded {} bytes from {} at {:#x}",
            data.len(),
            path.as_ref().display(),
            base
        );
        Ok(Self::new(base, data))
    }

    pub fn with_symbol(mut self, name: impl Into<String>, address: u64) -> Self {
        self.symbols.insert(name.into(), address);
        self
    }

    pub fn with_pointer_width(mut self, width: usize) -> Self {
        self.pointer_width = width;
        self
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl MemoryContext for ImageMemory {
    fn resolve(&self, expr: &str) -> Result<i128, ContextError> {
        if let Some(&address) = self.symbols.get(expr) {
            return Ok(i128::from(address));
        }
        match resolve_literal(expr) {
            Ok(value) => Ok(value),
            // Identifier-looking text is a missing symbol, not a bad number
            Err(_) if expr.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') => {
                Err(ContextError::UnknownSymbol(expr.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn read(&self, address: u64, length: usize) -> Result<Vec<u8>, ContextError> {
        let out_of_range = || ContextError::ReadFailed {
            address,
            size: length,
            reason: format!(
                "outside image {:#x}..{:#x}",
                self.base,
                self.base.wrapping_add(self.data.len() as u64)
            ),
        };

        let offset = address.checked_sub(self.base).ok_or_else(out_of_range)?;
        let start = usize::try_from(offset).map_err(|_| out_of_range())?;
        let end = start.checked_add(length).ok_or_else(out_of_range)?;
        self.data
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(out_of_range)
    }

    fn pointer_width(&self) -> usize {
        self.pointer_width
    }

    fn describe(&self) -> String {
        format!("img:{:#x}+{:#x}", self.base, self.data.len())
    }
}
