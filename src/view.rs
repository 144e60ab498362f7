//! Read-only windowed references over a [`Memory`] sub-range.
//!
//! A view borrows the memory immutably, so the borrow checker enforces
//! the contract for free: while a view lives, nothing can mutate the
//! underlying store, and release is scoped and guaranteed.

use crate::error::Result;
use crate::memory::{Items, Values};
use crate::{Address, Memory};

/// Read-only window `(memory, start, endex)`. Created by
/// [`Memory::view`]; no data is copied.
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    memory: &'a Memory,
    start: Address,
    endex: Address,
}

impl<'a> MemoryView<'a> {
    pub(crate) fn new(memory: &'a Memory, start: Address, endex: Address) -> Self {
        Self { memory, start, endex }
    }

    #[inline]
    pub fn start(&self) -> Address {
        self.start
    }

    #[inline]
    pub fn endex(&self) -> Address {
        self.endex
    }

    #[inline]
    pub fn span(&self) -> (Address, Address) {
        (self.start, self.endex)
    }

    #[allow(clippy::len_without_is_empty)]
    #[inline]
    pub fn len(&self) -> Address {
        self.endex - self.start
    }

    /// True when no populated cell falls inside the window.
    pub fn is_empty(&self) -> bool {
        self.memory.items(Some(self.start), Some(self.endex)).next().is_none()
    }

    /// Byte at `address`, `None` for an empty cell or an address outside
    /// the window.
    pub fn peek(&self, address: Address) -> Option<u8> {
        if address < self.start || address >= self.endex {
            return None;
        }
        self.memory.peek(address)
    }

    pub fn get(&self, address: Address, default: u8) -> u8 {
        self.peek(address).unwrap_or(default)
    }

    /// Sequence surface: every cell in the window, `None` for empty ones.
    pub fn values(&self) -> Values<'a> {
        self.memory.values(Some(self.start), Some(self.endex), None)
    }

    /// Mapping surface: populated cells only.
    pub fn items(&self) -> Items<'a> {
        self.memory.items(Some(self.start), Some(self.endex))
    }

    /// Block spans clipped to the window.
    pub fn intervals(&self) -> crate::memory::Intervals<'a> {
        self.memory.intervals(Some(self.start), Some(self.endex))
    }

    /// True when the window is gap-free.
    pub fn contiguous(&self) -> bool {
        self.memory.as_slice(Some(self.start), Some(self.endex)).is_ok()
    }

    /// Contiguous borrow of the window; fails with `DataGap` on any
    /// empty cell.
    pub fn as_slice(&self) -> Result<&'a [u8]> {
        self.memory.as_slice(Some(self.start), Some(self.endex))
    }

    /// Materialises the window; fails with `DataGap` on any empty cell.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.memory.to_bytes(Some(self.start), Some(self.endex))
    }

    /// Materialises the window, flooding gaps with `pattern`.
    pub fn to_bytes_with(&self, pattern: &[u8]) -> Result<Vec<u8>> {
        self.memory.to_bytes_with(Some(self.start), Some(self.endex), pattern)
    }

    /// Copies the window out into an owned memory bounded to it.
    pub fn to_memory(&self) -> Memory {
        match self.memory.extract(Some(self.start), Some(self.endex), None, None, true) {
            Ok(memory) => memory,
            Err(_) => Memory::new(),
        }
    }
}
