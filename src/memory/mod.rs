//! The [`Memory`] façade — a sparse byte-addressable store.
//!
//! Populated bytes live in a sorted collection of non-overlapping,
//! non-adjacent blocks; everything else is *empty*, a first-class state
//! distinct from any byte value (`Option<u8>::None` throughout).
//! Addresses are signed 64-bit, so content can sit below zero.
//!
//! ```
//! use sparsemem::Memory;
//!
//! let mut mem = Memory::from_blocks([(5, b"abc".to_vec()), (10, b"xy".to_vec())]);
//! assert_eq!(mem.peek(5), Some(b'a'));
//! assert_eq!(mem.peek(8), None);
//!
//! mem.write(7, b"ZZZZ");
//! assert_eq!(mem.to_blocks(None, None), vec![(5, b"abZZZZy".to_vec())]);
//! ```

mod backup;
mod find;
mod iter;

pub use backup::{InsertBackup, PokeBackup, ReserveBackup, ShiftBackup, UpdateBackup};
pub use iter::{Blocks, Chop, Gaps, Intervals, Items, Keys, RItems, RKeys, RValues, Values};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockVector};
use crate::bounds::Bounds;
use crate::error::{MemoryError, Result};
use crate::hexdump::{self, HexdumpOptions};
use crate::view::MemoryView;
use crate::Address;

/// Sparse byte-addressable virtual memory.
///
/// Behaves simultaneously as an ordered sequence over `[start, endex)`
/// where empty cells read as `None`, and as a mapping from address to byte
/// over populated cells only. Optional bounds clamp every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MemoryRepr", into = "MemoryRepr")]
pub struct Memory {
    pub(crate) blocks: BlockVector,
    pub(crate) bounds: Bounds,
}

/// Plain block-list representation used for serde.
#[derive(Serialize, Deserialize)]
struct MemoryRepr {
    bound_start: Option<Address>,
    bound_endex: Option<Address>,
    blocks: Vec<(Address, Vec<u8>)>,
}

impl From<Memory> for MemoryRepr {
    fn from(memory: Memory) -> Self {
        MemoryRepr {
            bound_start: memory.bound_start(),
            bound_endex: memory.bound_endex(),
            blocks: memory.to_blocks(None, None),
        }
    }
}

impl From<MemoryRepr> for Memory {
    fn from(repr: MemoryRepr) -> Self {
        let mut memory = Memory::from_blocks(repr.blocks);
        memory.set_bound_span(repr.bound_start, repr.bound_endex);
        memory
    }
}

impl Memory {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Empty store, no bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with optional bounds.
    pub fn with_bounds(start: Option<Address>, endex: Option<Address>) -> Self {
        Self {
            blocks: BlockVector::new(),
            bounds: Bounds::new(start, endex),
        }
    }

    /// Single block at `offset` (no block when `data` is empty).
    pub fn from_bytes(data: impl Into<Vec<u8>>, offset: Address) -> Self {
        let data = data.into();
        let mut blocks = BlockVector::new();
        if !data.is_empty() {
            blocks.push_unchecked(Block::new(offset, data));
        }
        Self { blocks, bounds: Bounds::UNBOUNDED }
    }

    /// Builds from `(address, bytes)` pairs, normalising as it goes:
    /// pairs are applied in order, so later data overwrites earlier data at
    /// overlapping addresses, and touching runs merge.
    pub fn from_blocks(pairs: impl IntoIterator<Item = (Address, Vec<u8>)>) -> Self {
        let mut memory = Self::new();
        for (address, data) in pairs {
            memory.write(address, &data);
        }
        memory
    }

    /// Wraps a block list the caller guarantees to satisfy the invariants;
    /// [`Memory::validate`] is the external witness.
    pub fn from_blocks_unchecked(blocks: Vec<Block>) -> Self {
        Self {
            blocks: BlockVector::from_vec_unchecked(blocks),
            bounds: Bounds::UNBOUNDED,
        }
    }

    /// Deep copy of `other`, translated by `offset`. Bounds are not
    /// carried over.
    pub fn from_memory(other: &Memory, offset: Address) -> Self {
        let blocks = other
            .blocks
            .iter()
            .map(|block| Block::new(block.start + offset, block.data.clone()))
            .collect();
        Self {
            blocks: BlockVector::from_vec_unchecked(blocks),
            bounds: Bounds::UNBOUNDED,
        }
    }

    /// Builds from `(address, value)` items, translated by `offset`.
    /// Later items win at the same address; `None` values contribute
    /// nothing.
    pub fn from_items(
        items: impl IntoIterator<Item = (Address, Option<u8>)>,
        offset: Address,
    ) -> Self {
        let map: BTreeMap<Address, Option<u8>> = items.into_iter().collect();
        let mut blocks = BlockVector::new();
        let mut run_start = 0;
        let mut run: Vec<u8> = Vec::new();

        for (address, value) in map {
            let Some(value) = value else { continue };
            if !run.is_empty() && run_start + run.len() as Address == address {
                run.push(value);
            } else {
                if !run.is_empty() {
                    blocks.push_unchecked(Block::new(run_start + offset, core::mem::take(&mut run)));
                }
                run_start = address;
                run.push(value);
            }
        }
        if !run.is_empty() {
            blocks.push_unchecked(Block::new(run_start + offset, run));
        }
        Self { blocks, bounds: Bounds::UNBOUNDED }
    }

    /// Builds from consecutive cell values starting at `offset`; `None`
    /// entries produce gaps.
    pub fn from_values(
        values: impl IntoIterator<Item = Option<u8>>,
        offset: Address,
    ) -> Self {
        let mut blocks = BlockVector::new();
        let mut address = offset;
        let mut run_start = offset;
        let mut run: Vec<u8> = Vec::new();

        for value in values {
            match value {
                Some(value) => {
                    if run.is_empty() {
                        run_start = address;
                    }
                    run.push(value);
                }
                None => {
                    if !run.is_empty() {
                        blocks.push_unchecked(Block::new(run_start, core::mem::take(&mut run)));
                    }
                }
            }
            address += 1;
        }
        if !run.is_empty() {
            blocks.push_unchecked(Block::new(run_start, run));
        }
        Self { blocks, bounds: Bounds::UNBOUNDED }
    }

    /// Parses a hex string (ASCII whitespace ignored) into a contiguous
    /// block at address zero.
    pub fn from_hex(string: &str) -> Result<Self> {
        let mut data = Vec::with_capacity(string.len() / 2);
        let mut high: Option<u8> = None;

        for ch in string.chars() {
            if ch.is_ascii_whitespace() {
                continue;
            }
            let digit = ch
                .to_digit(16)
                .ok_or_else(|| MemoryError::ValueRange(format!("invalid hex digit {ch:?}")))?
                as u8;
            match high.take() {
                Some(high) => data.push((high << 4) | digit),
                None => high = Some(digit),
            }
        }
        if high.is_some() {
            return Err(MemoryError::ValueRange("odd-length hex string".into()));
        }
        Ok(Self::from_bytes(data, 0))
    }

    // ── Bounds ───────────────────────────────────────────────────────────────

    #[inline]
    pub fn bound_start(&self) -> Option<Address> {
        self.bounds.start()
    }

    #[inline]
    pub fn bound_endex(&self) -> Option<Address> {
        self.bounds.endex()
    }

    #[inline]
    pub fn bound_span(&self) -> (Option<Address>, Option<Address>) {
        self.bounds.span()
    }

    /// Sets the lower bound and retroactively clips existing blocks.
    pub fn set_bound_start(&mut self, start: Option<Address>) {
        self.bounds.set_start(start);
        self.crop_to_bounds();
    }

    /// Sets the upper bound and retroactively clips existing blocks.
    pub fn set_bound_endex(&mut self, endex: Option<Address>) {
        self.bounds.set_endex(endex);
        self.crop_to_bounds();
    }

    /// Sets both bounds and retroactively clips existing blocks.
    pub fn set_bound_span(&mut self, start: Option<Address>, endex: Option<Address>) {
        self.bounds.set_span(start, endex);
        self.crop_to_bounds();
    }

    /// Resolves an open range against content and bounds, clamping closed
    /// ends into the active bounds. The result never has `start > endex`.
    pub fn bound(&self, start: Option<Address>, endex: Option<Address>) -> (Address, Address) {
        let bound_start = self.bounds.start();
        let bound_endex = self.bounds.endex();
        let mut endex = endex;

        let start = match start {
            None => match bound_start {
                Some(bound_start) => bound_start,
                None => self.blocks.first().map_or(0, |block| block.start),
            },
            Some(mut start) => {
                if let Some(bound_start) = bound_start {
                    if start < bound_start {
                        start = bound_start;
                    }
                }
                if let Some(e) = endex {
                    if e < start {
                        endex = Some(start);
                    }
                }
                start
            }
        };

        let endex = match endex {
            None => match bound_endex {
                Some(bound_endex) => bound_endex,
                None => self.blocks.last().map_or(start, Block::endex),
            },
            Some(mut endex) => {
                if let Some(bound_endex) = bound_endex {
                    if endex > bound_endex {
                        endex = bound_endex;
                    }
                }
                endex
            }
        };

        (start.min(endex), endex)
    }

    // ── Derived quantities ───────────────────────────────────────────────────

    /// First populated address, or the default start when empty.
    pub fn content_start(&self) -> Address {
        match self.blocks.first() {
            Some(block) => block.start,
            None => self.bounds.start().unwrap_or(0),
        }
    }

    /// Exclusive end of the last block, or the default start when empty.
    pub fn content_endex(&self) -> Address {
        match self.blocks.last() {
            Some(block) => block.endex(),
            None => self.bounds.start().unwrap_or(0),
        }
    }

    #[inline]
    pub fn content_endin(&self) -> Address {
        self.content_endex() - 1
    }

    #[inline]
    pub fn content_span(&self) -> (Address, Address) {
        (self.content_start(), self.content_endex())
    }

    /// Total populated byte count.
    #[inline]
    pub fn content_size(&self) -> usize {
        self.blocks.content_size()
    }

    /// Number of blocks.
    #[inline]
    pub fn content_parts(&self) -> usize {
        self.blocks.len()
    }

    /// Start of the span: the lower bound when set, else `content_start`.
    pub fn start(&self) -> Address {
        match self.bounds.start() {
            Some(bound_start) => bound_start,
            None => self.blocks.first().map_or(0, |block| block.start),
        }
    }

    /// Exclusive end of the span: the upper bound when set, else
    /// `content_endex`.
    pub fn endex(&self) -> Address {
        match self.bounds.endex() {
            Some(bound_endex) => bound_endex,
            None => self.blocks.last().map_or_else(|| self.start(), Block::endex),
        }
    }

    #[inline]
    pub fn endin(&self) -> Address {
        self.endex() - 1
    }

    #[inline]
    pub fn span(&self) -> (Address, Address) {
        (self.start(), self.endex())
    }

    /// Span length, `endex - start`.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> Address {
        (self.endex() - self.start()).max(0)
    }

    /// True when no byte is stored (the span may still be non-empty under
    /// bounds).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// True when the populated span has no holes and the bounds do not
    /// introduce one.
    pub fn contiguous(&self) -> bool {
        self.contiguous_slice().is_ok()
    }

    // ── Point access ─────────────────────────────────────────────────────────

    /// Byte at `address`, or `None` for an empty cell.
    #[inline]
    pub fn peek(&self, address: Address) -> Option<u8> {
        self.blocks.peek(address)
    }

    /// Byte at `address`, or `default` for an empty cell.
    #[inline]
    pub fn get(&self, address: Address, default: u8) -> u8 {
        self.peek(address).unwrap_or(default)
    }

    /// Overwrites a single cell; `None` clears it. Fails with
    /// `OutOfBounds` when `address` falls outside active bounds.
    pub fn poke(&mut self, address: Address, value: Option<u8>) -> Result<()> {
        if !self.bounds.contains(address) {
            return Err(MemoryError::OutOfBounds { address });
        }
        match value {
            None => self.blocks.erase(address, address + 1, false),
            Some(value) => self.poke_value(address, value),
        }
        Ok(())
    }

    /// Infallible single-cell write used on pre-clipped addresses.
    fn poke_value(&mut self, address: Address, value: u8) {
        let blocks = &mut self.blocks;

        if let Some(block_index) = blocks.index_endex(address).checked_sub(1) {
            let block = &blocks.as_slice()[block_index];
            let block_endex = block.endex();

            if block.contains(address) {
                // Within an existing block: update directly
                let offset = (address - block.start) as usize;
                if let Some(block) = blocks.get_mut(block_index) {
                    block.data[offset] = value;
                }
                return;
            }

            if address == block_endex {
                // Just after the block: append, then merge if it now
                // touches the next block
                if let Some(block) = blocks.get_mut(block_index) {
                    block.data.push(value);
                }
                if block_index + 1 < blocks.len()
                    && blocks.as_slice()[block_index].endex()
                        == blocks.as_slice()[block_index + 1].start
                {
                    let next = blocks.remove(block_index + 1);
                    if let Some(block) = blocks.get_mut(block_index) {
                        block.data.extend_from_slice(&next.data);
                    }
                }
                return;
            }

            if block_index + 1 < blocks.len()
                && address + 1 == blocks.as_slice()[block_index + 1].start
            {
                // Just before the next block: prepend
                if let Some(block) = blocks.get_mut(block_index + 1) {
                    block.data.insert(0, value);
                    block.start -= 1;
                }
                return;
            }
        }

        // Standalone cell
        blocks.erase(address, address + 1, false);
        blocks.place(address, vec![value], false);
    }

    // ── Editing algebra ──────────────────────────────────────────────────────

    /// Overwrites `[address, address + data.len())`, clipping to bounds.
    pub fn write(&mut self, address: Address, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let mut start = address;
        let mut endex = start + data.len() as Address;
        let mut data = data;

        if let Some(bound_endex) = self.bounds.endex() {
            if start >= bound_endex {
                return;
            }
            if endex > bound_endex {
                data = &data[..(bound_endex - start) as usize];
                endex = bound_endex;
            }
        }
        if let Some(bound_start) = self.bounds.start() {
            if endex <= bound_start {
                return;
            }
            if bound_start > start {
                data = &data[(bound_start - start) as usize..];
                start = bound_start;
            }
        }

        if data.len() == 1 {
            self.poke_value(start, data[0]);
        } else {
            self.blocks.erase(start, endex, false);
            self.blocks.place(start, data.to_vec(), false);
        }
    }

    /// Overwrites with another memory's content at `offset`; the source's
    /// gaps leave the destination untouched unless `clear` is set, in
    /// which case the whole source span is cleared first (so source gaps
    /// become destination gaps).
    pub fn write_memory(&mut self, offset: Address, source: &Memory, clear: bool) {
        let source_start = source.start() + offset;
        let source_endex = source.endex() + offset;
        if source_start >= source_endex {
            return;
        }

        if clear {
            self.blocks.erase(source_start, source_endex, false);
        } else {
            for block in &source.blocks {
                self.blocks
                    .erase(block.start + offset, block.endex() + offset, false);
            }
        }

        for block in &source.blocks {
            self.blocks
                .place(block.start + offset, block.data.clone(), false);
        }
        self.crop_to_bounds();
    }

    /// Shifts everything at and after `address` right by `data.len()`,
    /// then writes `data` at `address`.
    pub fn insert(&mut self, address: Address, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.blocks.place(address, data.to_vec(), true);
        self.crop_to_bounds();
    }

    /// Reserves room for the source's span, then writes it.
    pub fn insert_memory(&mut self, offset: Address, source: &Memory) {
        let source_start = source.start() + offset;
        let size = source.len();
        if size > 0 {
            self.reserve(source_start, size);
            self.write_memory(offset, source, false);
        }
    }

    /// Removes `[start, endex)` and compacts addresses: everything after
    /// the range shifts left by its size.
    pub fn delete(&mut self, start: Option<Address>, endex: Option<Address>) {
        let (start, endex) = self.bound(start, endex);
        if start < endex {
            self.blocks.erase(start, endex, true);
        }
    }

    /// Removes `[start, endex)`, leaving a gap.
    pub fn clear(&mut self, start: Option<Address>, endex: Option<Address>) {
        let (start, endex) = self.bound(start, endex);
        if start < endex {
            self.blocks.erase(start, endex, false);
        }
    }

    /// Keeps only `[start, endex)`: content outside the range is cleared,
    /// with no address compaction.
    pub fn crop(&mut self, start: Option<Address>, endex: Option<Address>) {
        if let (Some(start), Some(first)) = (start, self.blocks.first()) {
            let block_start = first.start;
            if block_start < start {
                self.blocks.erase(block_start, start, false);
            }
        }
        if let (Some(endex), Some(last)) = (endex, self.blocks.last()) {
            let block_endex = last.endex();
            if endex < block_endex {
                self.blocks.erase(endex, block_endex, false);
            }
        }
    }

    pub(crate) fn crop_to_bounds(&mut self) {
        if !self.bounds.is_unbounded() {
            self.crop(self.bounds.start(), self.bounds.endex());
        }
    }

    /// Extracts `[start, endex)` into a new memory and clears it here.
    /// With `bound`, the result's bounds are set to the cut range.
    pub fn cut(&mut self, start: Option<Address>, endex: Option<Address>, bound: bool) -> Memory {
        let start_arg = start;
        let endex_arg = endex;
        let start = start.unwrap_or_else(|| self.start());
        let mut endex = endex.unwrap_or_else(|| self.endex());
        if endex < start {
            endex = start;
        }

        let mut taken = Memory::new();
        if start < endex && !self.blocks.is_empty() {
            let index_start = match start_arg {
                Some(_) => self.blocks.index_start(start),
                None => 0,
            };
            let index_endex = match endex_arg {
                Some(_) => self.blocks.index_endex(endex),
                None => self.blocks.len(),
            };

            let mut copied: Vec<Block> = self.blocks.as_slice()[index_start..index_endex].to_vec();
            if let Some(first) = copied.first_mut() {
                if first.start < start {
                    first.data.drain(..(start - first.start) as usize);
                    first.start = start;
                }
            }
            if let Some(last) = copied.last_mut() {
                if endex < last.endex() {
                    if last.start < endex {
                        last.data.truncate((endex - last.start) as usize);
                    } else {
                        copied.pop();
                    }
                }
            }
            copied.retain(|block| !block.is_empty());

            taken.blocks = BlockVector::from_vec_unchecked(copied);
            self.blocks.erase(start, endex, false);
        }

        if bound {
            taken.bounds = Bounds::new(Some(start), Some(endex));
        }
        taken
    }

    /// Shifts everything at and after `address` right by `size`, leaving
    /// a gap. Data pushed past the upper bound is discarded.
    pub fn reserve(&mut self, address: Address, size: Address) {
        if size > 0 && !self.blocks.is_empty() {
            self.pretrim_endex(Some(address), size);
            self.blocks.open_gap(address, size);
        }
    }

    /// Translates all blocks by `offset`; with bounds active, data pushed
    /// outside is discarded.
    pub fn shift(&mut self, offset: Address) {
        if offset != 0 && !self.blocks.is_empty() {
            if offset < 0 {
                self.pretrim_start(None, -offset);
            } else {
                self.pretrim_endex(None, offset);
            }
            self.blocks.shift_all(offset);
        }
    }

    /// Clears up to `size` cells just above the lower bound, making room
    /// for a leftward shift. No-op when unbounded below.
    pub(crate) fn pretrim_start(&mut self, endex_max: Option<Address>, size: Address) {
        if let Some(bound_start) = self.bounds.start() {
            if size > 0 {
                let mut endex = bound_start + size;
                if let Some(endex_max) = endex_max {
                    if endex > endex_max {
                        endex = endex_max;
                    }
                }
                self.blocks.erase(self.content_start(), endex, false);
            }
        }
    }

    /// Clears up to `size` cells just below the upper bound, making room
    /// for a rightward shift. No-op when unbounded above.
    pub(crate) fn pretrim_endex(&mut self, start_min: Option<Address>, size: Address) {
        if let Some(bound_endex) = self.bounds.endex() {
            if size > 0 {
                let mut start = bound_endex - size;
                if let Some(start_min) = start_min {
                    if start < start_min {
                        start = start_min;
                    }
                }
                self.blocks.erase(start, self.content_endex(), false);
            }
        }
    }

    /// Overwrites `[start, endex)` with `pattern` repeated, aligned to the
    /// requested start.
    pub fn fill(
        &mut self,
        start: Option<Address>,
        endex: Option<Address>,
        pattern: &[u8],
    ) -> Result<()> {
        if pattern.is_empty() {
            return Err(MemoryError::ValueRange("non-empty pattern required".into()));
        }
        let start_arg = start;
        let (start, endex) = self.bound(start, endex);
        if start >= endex {
            return Ok(());
        }

        let rotation = match start_arg {
            Some(start_arg) if start > start_arg => {
                (start - start_arg).rem_euclid(pattern.len() as Address) as usize
            }
            _ => 0,
        };
        let data = cycle_pattern(pattern, rotation, (endex - start) as usize);

        self.blocks.erase(start, endex, false);
        self.blocks.place(start, data, false);
        Ok(())
    }

    /// Writes `pattern` only into the gaps inside `[start, endex)`;
    /// populated cells are untouched.
    pub fn flood(
        &mut self,
        start: Option<Address>,
        endex: Option<Address>,
        pattern: &[u8],
    ) -> Result<()> {
        if pattern.is_empty() {
            return Err(MemoryError::ValueRange("non-empty pattern required".into()));
        }
        let (mut start, mut endex) = self.bound(start, endex);
        if start >= endex {
            return Ok(());
        }

        let mut index_start = self.blocks.index_start(start);

        // A block ending exactly at `start` joins the flooded region
        if index_start > 0 && self.blocks.as_slice()[index_start - 1].endex() == start {
            index_start -= 1;
        }

        let mut rotation = 0;
        if let Some(block) = self.blocks.get(index_start) {
            if block.start <= start && endex <= block.endex() {
                return Ok(()); // no emptiness to flood
            }
            if block.start < start {
                rotation = (block.start - start).rem_euclid(pattern.len() as Address) as usize;
                start = block.start;
            }
        }

        let index_endex = self.blocks.index_endex(endex);
        if index_start < index_endex {
            let block = &self.blocks.as_slice()[index_endex - 1];
            if endex < block.endex() {
                endex = block.endex();
            }
        }

        let filled = cycle_pattern(pattern, rotation, (endex - start) as usize);
        let removed = self.blocks.splice(index_start..index_endex, Block::new(start, filled));
        if let Some(merged) = self.blocks.get_mut(index_start) {
            for block in removed {
                let offset = (block.start - start) as usize;
                merged.data[offset..offset + block.data.len()].copy_from_slice(&block.data);
            }
        }
        Ok(())
    }

    /// Appends one byte at `content_endex`.
    pub fn append(&mut self, value: u8) {
        match self.blocks.last_mut() {
            Some(block) => block.data.push(value),
            None => {
                let address = self.content_endex();
                self.blocks.push_unchecked(Block::new(address, vec![value]));
            }
        }
        self.crop_to_bounds();
    }

    /// Writes `data` at `content_endex + offset`. `offset` must not be
    /// negative.
    pub fn extend(&mut self, data: &[u8], offset: Address) -> Result<()> {
        if offset < 0 {
            return Err(MemoryError::ValueRange("negative extension offset".into()));
        }
        self.write(self.content_endex() + offset, data);
        Ok(())
    }

    /// Writes another memory at `content_endex + offset`.
    pub fn extend_memory(&mut self, source: &Memory, offset: Address) -> Result<()> {
        if offset < 0 {
            return Err(MemoryError::ValueRange("negative extension offset".into()));
        }
        let at = self.content_endex() + offset;
        self.write_memory(at - source.start(), source, false);
        Ok(())
    }

    /// Removes and returns the last content byte.
    pub fn pop(&mut self) -> Option<u8> {
        let block = self.blocks.last_mut()?;
        let value = block.data.pop();
        if block.is_empty() {
            self.blocks.pop();
        }
        value
    }

    /// Removes and returns the byte at `address`, compacting addresses
    /// after it.
    pub fn pop_at(&mut self, address: Address) -> Option<u8> {
        let value = self.peek(address);
        self.blocks.erase(address, address + 1, true);
        value
    }

    /// Removes and returns the last populated `(address, value)` cell.
    pub fn pop_item(&mut self) -> Option<(Address, u8)> {
        let block = self.blocks.last_mut()?;
        let value = block.data.pop()?;
        let address = block.start + block.data.len() as Address;
        if block.is_empty() {
            self.blocks.pop();
        }
        Some((address, value))
    }

    /// Finds the leftmost match of `pattern` and deletes it (with address
    /// compaction). Fails with `NotFound` when absent.
    pub fn remove(
        &mut self,
        pattern: &[u8],
        start: Option<Address>,
        endex: Option<Address>,
    ) -> Result<()> {
        let address = self.index(pattern, start, endex)?;
        self.blocks
            .erase(address, address + pattern.len() as Address, true);
        Ok(())
    }

    /// Bulk single-cell update from `(address, value)` items; `None`
    /// values clear cells. All addresses are validated against bounds
    /// before any cell changes.
    pub fn update(&mut self, items: impl IntoIterator<Item = (Address, Option<u8>)>) -> Result<()> {
        let items: Vec<(Address, Option<u8>)> = items.into_iter().collect();
        for &(address, _) in &items {
            if !self.bounds.contains(address) {
                return Err(MemoryError::OutOfBounds { address });
            }
        }
        for (address, value) in items {
            match value {
                None => self.blocks.erase(address, address + 1, false),
                Some(value) => self.poke_value(address, value),
            }
        }
        Ok(())
    }

    /// Reverses the content in place within the content span: bytes and
    /// gaps mirror around its middle.
    pub fn reverse(&mut self) {
        let (start, endex) = self.content_span();
        let pivot = start + endex;
        let mut reversed: Vec<Block> = self
            .blocks
            .iter()
            .map(|block| {
                let mut data = block.data.clone();
                data.reverse();
                Block::new(pivot - block.endex(), data)
            })
            .collect();
        reversed.reverse();
        self.blocks = BlockVector::from_vec_unchecked(reversed);
    }

    /// Concatenates `times` copies of the span, gaps included, tiling at
    /// span-length strides.
    pub fn repeat(&mut self, times: usize) {
        if times == 0 || self.blocks.is_empty() {
            self.blocks.clear();
            return;
        }
        let size = self.endex() - self.start();
        let template = self.clone();
        let mut offset = size;
        for _ in 1..times {
            self.write_memory(offset, &template, false);
            offset += size;
        }
    }

    // ── Extraction & serialisation ───────────────────────────────────────────

    /// Copies `[start, endex)` into a new memory.
    ///
    /// `pattern` floods the copy's gaps; `step > 1` subsamples every
    /// `step`-th cell into consecutive addresses; `bound` sets the
    /// result's bounds to the requested range.
    pub fn extract(
        &self,
        start: Option<Address>,
        endex: Option<Address>,
        pattern: Option<&[u8]>,
        step: Option<Address>,
        bound: bool,
    ) -> Result<Memory> {
        let step_value = step.unwrap_or(1);
        if step_value < 1 {
            return Err(MemoryError::ValueRange(format!("step must be >= 1, got {step_value}")));
        }
        let start_arg = start;
        let mut endex_arg = endex;
        let mut memory = Memory::new();

        if step_value == 1 {
            let (start, endex) = self.bound(start, endex);

            if start < endex && !self.blocks.is_empty() {
                let index_start = match start_arg {
                    Some(_) => self.blocks.index_start(start),
                    None => 0,
                };
                let index_endex = match endex_arg {
                    Some(_) => self.blocks.index_endex(endex),
                    None => self.blocks.len(),
                };

                let copied = self.blocks.as_slice()[index_start..index_endex].to_vec();
                memory.blocks = BlockVector::from_vec_unchecked(copied);
                memory.crop(Some(start), Some(endex));

                if let Some(pattern) = pattern {
                    memory.flood(Some(start), Some(endex), pattern)?;
                }
            }
        } else {
            let (start, endex) = self.bound(start, endex);
            let mut offset = start;

            for value in self
                .values(Some(start), Some(endex), pattern)
                .step_by(step_value as usize)
            {
                if let Some(value) = value {
                    memory.blocks.place(offset, vec![value], false);
                }
                offset += 1;
            }
            if bound {
                endex_arg = Some(offset);
            }
        }

        if bound {
            memory.bounds = Bounds::new(start_arg, endex_arg);
        }
        Ok(memory)
    }

    /// Materialises `[start, endex)` as raw bytes; any empty cell in the
    /// range fails with `DataGap`.
    pub fn to_bytes(&self, start: Option<Address>, endex: Option<Address>) -> Result<Vec<u8>> {
        Ok(self.as_slice(start, endex)?.to_vec())
    }

    /// Materialises `[start, endex)` as raw bytes, flooding gaps with the
    /// repeating `pattern` aligned to the range start.
    pub fn to_bytes_with(
        &self,
        start: Option<Address>,
        endex: Option<Address>,
        pattern: &[u8],
    ) -> Result<Vec<u8>> {
        if pattern.is_empty() {
            return Err(MemoryError::ValueRange("non-empty pattern required".into()));
        }
        let (start, endex) = self.bound(start, endex);
        Ok(self
            .values(Some(start), Some(endex), Some(pattern))
            .map(|value| value.unwrap_or(pattern[0]))
            .collect())
    }

    /// Clipped block list as `(address, bytes)` pairs.
    pub fn to_blocks(
        &self,
        start: Option<Address>,
        endex: Option<Address>,
    ) -> Vec<(Address, Vec<u8>)> {
        self.blocks_in(start, endex)
            .map(|(address, data)| (address, data.to_vec()))
            .collect()
    }

    /// Borrows `[start, endex)` as a contiguous slice; fails with
    /// `DataGap` at the first empty cell in the range.
    pub fn as_slice(&self, start: Option<Address>, endex: Option<Address>) -> Result<&[u8]> {
        let (start, endex) = self.bound(start, endex);
        if start >= endex {
            return Ok(&[]);
        }
        let index = self
            .blocks
            .index_at(start)
            .ok_or(MemoryError::DataGap { address: start })?;
        let block = &self.blocks.as_slice()[index];
        if endex > block.endex() {
            return Err(MemoryError::DataGap { address: block.endex() });
        }
        let offset = (start - block.start) as usize;
        Ok(&block.data[offset..offset + (endex - start) as usize])
    }

    /// Whole populated content as one slice; empty when no content.
    fn contiguous_slice(&self) -> Result<&[u8]> {
        match self.blocks.len() {
            0 => {
                if let (Some(start), Some(endex)) = self.bounds.span() {
                    if start < endex - 1 {
                        return Err(MemoryError::ContiguityRequired);
                    }
                }
                Ok(&[])
            }
            1 => {
                let block = &self.blocks.as_slice()[0];
                if let Some(start) = self.bounds.start() {
                    if start != block.start {
                        return Err(MemoryError::ContiguityRequired);
                    }
                }
                if let Some(endex) = self.bounds.endex() {
                    if endex != block.endex() {
                        return Err(MemoryError::ContiguityRequired);
                    }
                }
                Ok(&block.data)
            }
            _ => Err(MemoryError::ContiguityRequired),
        }
    }

    /// Hex string of the whole contiguous content. `sep` groups digits
    /// every `bytes_per_sep` bytes, counted from the right when positive
    /// and from the left when negative.
    pub fn hex(&self, sep: Option<char>, bytes_per_sep: isize) -> Result<String> {
        use core::fmt::Write as _;

        let data = self.contiguous_slice()?;
        let mut out = String::with_capacity(data.len() * 3);

        for (index, byte) in data.iter().enumerate() {
            if index > 0 {
                if let Some(sep) = sep {
                    let group = bytes_per_sep.unsigned_abs();
                    if group > 0 {
                        let boundary = if bytes_per_sep > 0 {
                            (data.len() - index) % group == 0
                        } else {
                            index % group == 0
                        };
                        if boundary {
                            out.push(sep);
                        }
                    }
                }
            }
            let _ = write!(out, "{byte:02x}");
        }
        Ok(out)
    }

    /// Read-only window over `[start, endex)`; while it lives, the
    /// borrow checker keeps this memory immutable.
    pub fn view(&self, start: Option<Address>, endex: Option<Address>) -> MemoryView<'_> {
        let start = start.unwrap_or_else(|| self.start());
        let mut endex = endex.unwrap_or_else(|| self.endex());
        if endex < start {
            endex = start;
        }
        MemoryView::new(self, start, endex)
    }

    /// Canonical hex/ASCII dump of the selected range.
    pub fn hexdump(&self, options: &HexdumpOptions) -> String {
        hexdump::render(self, options)
    }

    // ── Validation ───────────────────────────────────────────────────────────

    /// Verifies the block invariants and bounds enclosure; the witness for
    /// externally constructed states.
    pub fn validate(&self) -> Result<()> {
        let (start, endex) = self.bound(None, None);

        if self.blocks.is_empty() {
            if endex < start {
                return Err(MemoryError::InvariantBroken("invalid bounds".into()));
            }
            return Ok(());
        }

        if endex <= start {
            return Err(MemoryError::InvariantBroken("invalid bounds".into()));
        }

        let mut previous_endex = self.blocks.as_slice()[0].start - 1;
        for block in &self.blocks {
            let block_endex = block.endex();

            if block.start <= previous_endex {
                return Err(MemoryError::InvariantBroken("invalid block interleaving".into()));
            }
            if block_endex <= block.start {
                return Err(MemoryError::InvariantBroken("invalid block data size".into()));
            }
            if block.start < start || endex < block_endex {
                return Err(MemoryError::InvariantBroken("invalid block bounds".into()));
            }
            previous_endex = block_endex;
        }
        Ok(())
    }
}

/// `pattern` repeated to `size` bytes, starting `rotation` bytes into it.
pub(crate) fn cycle_pattern(pattern: &[u8], rotation: usize, size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(size);
    let mut index = rotation % pattern.len();
    for _ in 0..size {
        out.push(pattern[index]);
        index += 1;
        if index == pattern.len() {
            index = 0;
        }
    }
    out
}

impl PartialEq<[u8]> for Memory {
    /// A memory equals a byte string when its whole content is one block
    /// holding exactly those bytes (both empty also match).
    fn eq(&self, other: &[u8]) -> bool {
        match self.blocks.len() {
            0 => other.is_empty(),
            1 => self.blocks.as_slice()[0].data == other,
            _ => false,
        }
    }
}

impl PartialEq<&[u8]> for Memory {
    fn eq(&self, other: &&[u8]) -> bool {
        self == *other
    }
}

impl FromIterator<(Address, u8)> for Memory {
    fn from_iter<T: IntoIterator<Item = (Address, u8)>>(iter: T) -> Self {
        Memory::from_items(iter.into_iter().map(|(address, value)| (address, Some(value))), 0)
    }
}
