//! Seekable byte-stream adapter over a [`Memory`].
//!
//! # Cursor model
//! [`MemoryIO`] owns its memory (like `std::io::Cursor` owns its buffer)
//! and keeps a signed stream position.  The position is just a number —
//! it may sit inside a gap, before all content, or past the end; reads
//! and writes interpret it against the store on each call.
//!
//! # Gap policy
//! Sparse stores have empty cells, and a byte stream has no way to say
//! "no byte here".  [`GapFill`] decides what reads do about that:
//! `GapFill::Byte(fill)` (the default, `0x00`) materialises empty cells
//! as the fill byte; `GapFill::Strict` fails the read with
//! [`MemoryError::DataGap`] instead.  `skip_data` / `skip_hole` let
//! callers hop between blocks and gaps explicitly and never touch the
//! policy.
//!
//! # Interop
//! The native API is signed-address and infallible where the store is;
//! `std::io::{Read, Write, Seek}` impls delegate to it so the adapter
//! drops into generic stream code.  Positions that cannot round-trip
//! through `u64` surface as `std::io` errors, never as panics.

use std::io;

use crate::error::{MemoryError, Result};
use crate::view::MemoryView;
use crate::{Address, Memory};

/// Where a [`MemoryIO::seek`] offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Absolute address zero.
    Start,
    /// The current stream position.
    Current,
    /// The memory's `endex`.
    End,
}

/// What reads do when they meet an empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapFill {
    /// Materialise empty cells as this byte.
    Byte(u8),
    /// Fail the read with `DataGap`.
    Strict,
}

impl Default for GapFill {
    fn default() -> Self {
        GapFill::Byte(0)
    }
}

const LINE_TERMINATOR: u8 = 0x0A;

/// Seekable stream cursor over an owned [`Memory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryIO {
    memory: Memory,
    position: Address,
    gap_fill: GapFill,
}

impl MemoryIO {
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            position: 0,
            gap_fill: GapFill::default(),
        }
    }

    /// Cursor with an explicit gap policy.
    pub fn with_gap_fill(memory: Memory, gap_fill: GapFill) -> Self {
        Self { memory, position: 0, gap_fill }
    }

    pub fn into_inner(self) -> Memory {
        self.memory
    }

    pub fn get_ref(&self) -> &Memory {
        &self.memory
    }

    pub fn get_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    #[inline]
    pub fn gap_fill(&self) -> GapFill {
        self.gap_fill
    }

    // ── Position ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn tell(&self) -> Address {
        self.position
    }

    /// Moves the stream position; returns the updated position.
    pub fn seek(&mut self, offset: Address, whence: Whence) -> Address {
        self.position = match whence {
            Whence::Start => offset,
            Whence::Current => self.position + offset,
            Whence::End => self.memory.endex() + offset,
        };
        self.position
    }

    /// Advances past the end of the current block; no-op inside a gap.
    pub fn skip_data(&mut self) -> Address {
        let (_, block_endex, value) = self.memory.block_span(self.position);
        if value.is_some() {
            if let Some(block_endex) = block_endex {
                self.position = block_endex;
            }
        }
        self.position
    }

    /// Advances to the start of the next block; no-op inside a block or
    /// past all content.
    pub fn skip_hole(&mut self) -> Address {
        let (_, gap_endex, value) = self.memory.block_span(self.position);
        if value.is_none() {
            if let Some(gap_endex) = gap_endex {
                self.position = gap_endex;
            }
        }
        self.position
    }

    // ── Reading ──────────────────────────────────────────────────────────────

    /// Reads up to `size` bytes from the current position, advancing it.
    /// Stops short at the memory's `endex`; gap cells follow the gap
    /// policy.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let chunk = self.read_at(self.position, size)?;
        self.position += chunk.len() as Address;
        Ok(chunk)
    }

    /// Like [`MemoryIO::read`], without moving the position.
    pub fn peek(&self, size: usize) -> Result<Vec<u8>> {
        self.read_at(self.position, size)
    }

    fn read_at(&self, start: Address, size: usize) -> Result<Vec<u8>> {
        let endex = self.memory.endex().min(start + size as Address);
        if start >= endex {
            return Ok(Vec::new());
        }
        match self.gap_fill {
            GapFill::Byte(fill) => self.memory.to_bytes_with(Some(start), Some(endex), &[fill]),
            GapFill::Strict => self.memory.to_bytes(Some(start), Some(endex)),
        }
    }

    /// Reads up to and including the next `0x0A`, or to the end.
    pub fn read_line(&mut self) -> Result<Vec<u8>> {
        let endex = self.memory.endex();
        let mut line = Vec::new();

        for value in self.memory.values(Some(self.position), Some(endex), None) {
            let byte = match (value, self.gap_fill) {
                (Some(byte), _) => byte,
                (None, GapFill::Byte(fill)) => fill,
                (None, GapFill::Strict) => {
                    return Err(MemoryError::DataGap {
                        address: self.position + line.len() as Address,
                    });
                }
            };
            line.push(byte);
            if byte == LINE_TERMINATOR {
                break;
            }
        }
        self.position += line.len() as Address;
        Ok(line)
    }

    /// Collects lines until the end of the stream.
    pub fn read_lines(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            if line.is_empty() {
                return Ok(lines);
            }
            lines.push(line);
        }
    }

    /// The whole image over the span, gaps handled by the gap policy.
    pub fn get_value(&self) -> Result<Vec<u8>> {
        let (start, endex) = self.memory.span();
        if start >= endex {
            return Ok(Vec::new());
        }
        match self.gap_fill {
            GapFill::Byte(fill) => self.memory.to_bytes_with(Some(start), Some(endex), &[fill]),
            GapFill::Strict => self.memory.to_bytes(Some(start), Some(endex)),
        }
    }

    /// Read-only view over the whole span, no copy.
    pub fn get_buffer(&self) -> MemoryView<'_> {
        self.memory.view(None, None)
    }

    // ── Writing ──────────────────────────────────────────────────────────────

    /// Writes at the current position and advances by the buffer length
    /// (bounds on the memory may clip what is stored).
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.memory.write(self.position, data);
        self.position += data.len() as Address;
        data.len()
    }

    /// Clears content at and after `size` (or the current position) and
    /// moves the position there; returns the new size.
    pub fn truncate(&mut self, size: Option<Address>) -> Address {
        let size = size.unwrap_or(self.position);
        self.memory.clear(Some(size), None);
        self.position = size;
        size
    }
}

// ── std::io interop ──────────────────────────────────────────────────────────

fn to_io_error(error: MemoryError) -> io::Error {
    let kind = match error {
        MemoryError::DataGap { .. } => io::ErrorKind::InvalidData,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, error)
}

impl io::Read for MemoryIO {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = MemoryIO::read(self, buf.len()).map_err(to_io_error)?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

impl io::Write for MemoryIO {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(MemoryIO::write(self, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for MemoryIO {
    fn seek(&mut self, position: io::SeekFrom) -> io::Result<u64> {
        let updated = match position {
            io::SeekFrom::Start(offset) => {
                let offset: Address = offset
                    .try_into()
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset overflow"))?;
                self.seek(offset, Whence::Start)
            }
            io::SeekFrom::Current(offset) => self.seek(offset, Whence::Current),
            io::SeekFrom::End(offset) => self.seek(offset, Whence::End),
        };
        updated
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "position before zero"))
    }
}
