//! Lazy iteration over cells, blocks, intervals, and gaps.
//!
//! Every iterator here is a cursor over the block slice — none of them
//! materialise the range they walk. `Values` (and `RValues`) can be
//! endless when the far end is left open; callers bound them with `take`
//! or an explicit end address.

use crate::block::Block;
use crate::error::{MemoryError, Result};
use crate::{Address, Memory};

/// Cell values over `[start, endex)`, `None` for empty cells.
///
/// With a `pattern`, empty cells yield the cyclic pattern byte aligned to
/// the iteration start instead. With `endex = None` the iterator never
/// ends.
pub struct Values<'a> {
    blocks: &'a [Block],
    block_index: usize,
    address: Address,
    endex: Option<Address>,
    origin: Address,
    pattern: Option<&'a [u8]>,
}

impl<'a> Iterator for Values<'a> {
    type Item = Option<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(endex) = self.endex {
            if self.address >= endex {
                return None;
            }
        }
        while self.block_index < self.blocks.len()
            && self.blocks[self.block_index].endex() <= self.address
        {
            self.block_index += 1;
        }

        let value = match self.blocks.get(self.block_index) {
            Some(block) if block.contains(self.address) => {
                Some(block.data[(self.address - block.start) as usize])
            }
            _ => self.pattern.map(|pattern| {
                let phase = (self.address - self.origin).rem_euclid(pattern.len() as Address);
                pattern[phase as usize]
            }),
        };
        self.address += 1;
        Some(value)
    }
}

/// Cell values walking leftwards from `endex - 1`; endless when `start`
/// is left open. Pattern fill is aligned to the iteration's `endex`.
pub struct RValues<'a> {
    blocks: &'a [Block],
    block_index: usize,
    address: Option<Address>,
    start: Option<Address>,
    origin: Address,
    pattern: Option<&'a [u8]>,
}

impl<'a> Iterator for RValues<'a> {
    type Item = Option<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let address = self.address?;
        if let Some(start) = self.start {
            if address < start {
                return None;
            }
        }
        while self.block_index > 0 && self.blocks[self.block_index - 1].start > address {
            self.block_index -= 1;
        }

        let value = match self.block_index.checked_sub(1).map(|index| &self.blocks[index]) {
            Some(block) if block.contains(address) => {
                Some(block.data[(address - block.start) as usize])
            }
            _ => self.pattern.map(|pattern| {
                let phase = (address - self.origin).rem_euclid(pattern.len() as Address);
                pattern[phase as usize]
            }),
        };
        self.address = address.checked_sub(1);
        Some(value)
    }
}

/// Populated `(address, value)` cells in ascending address order.
pub struct Items<'a> {
    blocks: &'a [Block],
    block_index: usize,
    address: Address,
    endex: Address,
}

impl<'a> Iterator for Items<'a> {
    type Item = (Address, u8);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let block = self.blocks.get(self.block_index)?;
            if self.address < block.start {
                self.address = block.start;
            }
            if self.address >= self.endex {
                return None;
            }
            if self.address >= block.endex() {
                self.block_index += 1;
                continue;
            }
            let value = block.data[(self.address - block.start) as usize];
            let address = self.address;
            self.address += 1;
            return Some((address, value));
        }
    }
}

/// Populated addresses in ascending order.
pub struct Keys<'a> {
    inner: Items<'a>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = Address;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(address, _)| address)
    }
}

/// Populated `(address, value)` cells in descending address order.
pub struct RItems<'a> {
    blocks: &'a [Block],
    block_index: usize,
    address: Address,
    start: Address,
}

impl<'a> Iterator for RItems<'a> {
    type Item = (Address, u8);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let block = match self.block_index.checked_sub(1) {
                Some(index) => &self.blocks[index],
                None => return None,
            };
            if self.address >= block.endex() {
                self.address = block.endex() - 1;
            }
            if self.address < self.start {
                return None;
            }
            if self.address < block.start {
                self.block_index -= 1;
                continue;
            }
            let value = block.data[(self.address - block.start) as usize];
            let address = self.address;
            self.address -= 1;
            return Some((address, value));
        }
    }
}

/// Populated addresses in descending order.
pub struct RKeys<'a> {
    inner: RItems<'a>,
}

impl<'a> Iterator for RKeys<'a> {
    type Item = Address;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(address, _)| address)
    }
}

/// `(start, endex)` span of each block clipped to the requested range.
pub struct Intervals<'a> {
    blocks: &'a [Block],
    block_index: usize,
    index_endex: usize,
    start: Address,
    endex: Address,
}

impl<'a> Iterator for Intervals<'a> {
    type Item = (Address, Address);

    fn next(&mut self) -> Option<Self::Item> {
        while self.block_index < self.index_endex {
            let block = &self.blocks[self.block_index];
            self.block_index += 1;

            let slice_start = block.start.max(self.start);
            let slice_endex = block.endex().min(self.endex);
            if slice_start < slice_endex {
                return Some((slice_start, slice_endex));
            }
        }
        None
    }
}

/// Clipped `(address, data)` pairs, one per intersecting block.
pub struct Blocks<'a> {
    blocks: &'a [Block],
    block_index: usize,
    index_endex: usize,
    start: Address,
    endex: Address,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = (Address, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        while self.block_index < self.index_endex {
            let block = &self.blocks[self.block_index];
            self.block_index += 1;

            let slice_start = block.start.max(self.start);
            let slice_endex = block.endex().min(self.endex);
            if slice_start < slice_endex {
                let offset = (slice_start - block.start) as usize;
                let length = (slice_endex - slice_start) as usize;
                return Some((slice_start, &block.data[offset..offset + length]));
            }
        }
        None
    }
}

/// Empty intervals, `None` marking an open side.
///
/// With both range ends open, the leading and trailing gaps are reported
/// unbounded; an empty memory reports the single gap `(None, None)`.
pub struct Gaps<'a> {
    blocks: &'a [Block],
    block_index: usize,
    index_endex: usize,
    cursor: Address,
    endex: Address,
    start_open: bool,
    endex_open: bool,
    state: GapState,
}

enum GapState {
    Init,
    Scan,
    Tail,
    Done,
}

impl<'a> Iterator for Gaps<'a> {
    type Item = (Option<Address>, Option<Address>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                GapState::Init => {
                    if self.blocks.is_empty() {
                        self.state = GapState::Done;
                        return Some((None, None));
                    }
                    self.state = GapState::Scan;
                    if self.start_open {
                        let first = self.blocks[0].start;
                        self.cursor = self.blocks[0].endex();
                        self.block_index += 1;
                        return Some((None, Some(first)));
                    }
                }
                GapState::Scan => {
                    while self.block_index < self.index_endex {
                        let block = &self.blocks[self.block_index];
                        self.block_index += 1;

                        let gap_start = self.cursor;
                        self.cursor = block.endex();
                        if gap_start < block.start {
                            return Some((Some(gap_start), Some(block.start)));
                        }
                    }
                    self.state = GapState::Tail;
                }
                GapState::Tail => {
                    self.state = GapState::Done;
                    if self.endex_open {
                        return Some((Some(self.cursor), None));
                    }
                    if self.cursor < self.endex {
                        return Some((Some(self.cursor), Some(self.endex)));
                    }
                }
                GapState::Done => return None,
            }
        }
    }
}

/// `(address, data)` tiles of width `step` covering populated content.
pub struct Chop<'a> {
    blocks: &'a [Block],
    block_index: usize,
    start: Address,
    endex: Address,
    step: Address,
    align: bool,
    tile: Option<Address>,
}

impl<'a> Iterator for Chop<'a> {
    type Item = (Address, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let block = self.blocks.get(self.block_index)?;
            if block.start >= self.endex {
                return None;
            }
            let clip_start = block.start.max(self.start);
            let clip_endex = block.endex().min(self.endex);
            if clip_start >= clip_endex {
                self.block_index += 1;
                self.tile = None;
                continue;
            }

            let tile_start = self.tile.unwrap_or(clip_start);
            if tile_start >= clip_endex {
                self.block_index += 1;
                self.tile = None;
                continue;
            }

            let tile_endex = if self.align {
                ((tile_start.div_euclid(self.step) + 1) * self.step).min(clip_endex)
            } else {
                (tile_start + self.step).min(clip_endex)
            };
            self.tile = Some(tile_endex);

            let offset = (tile_start - block.start) as usize;
            let length = (tile_endex - tile_start) as usize;
            return Some((tile_start, &block.data[offset..offset + length]));
        }
    }
}

impl Memory {
    /// Lazy cell stream over `[start, endex)`; see [`Values`].
    pub fn values<'a>(
        &'a self,
        start: Option<Address>,
        endex: Option<Address>,
        pattern: Option<&'a [u8]>,
    ) -> Values<'a> {
        let start = start.unwrap_or_else(|| self.start());
        Values {
            blocks: self.blocks.as_slice(),
            block_index: self.blocks.index_start(start),
            address: start,
            endex,
            origin: start,
            pattern: pattern.filter(|pattern| !pattern.is_empty()),
        }
    }

    /// Lazy reverse cell stream; see [`RValues`].
    pub fn rvalues<'a>(
        &'a self,
        start: Option<Address>,
        endex: Option<Address>,
        pattern: Option<&'a [u8]>,
    ) -> RValues<'a> {
        let endex = endex.unwrap_or_else(|| self.endex());
        RValues {
            blocks: self.blocks.as_slice(),
            block_index: self.blocks.index_endex(endex - 1),
            address: Some(endex - 1),
            start,
            origin: endex,
            pattern: pattern.filter(|pattern| !pattern.is_empty()),
        }
    }

    /// Populated `(address, value)` cells within `[start, endex)`.
    pub fn items(&self, start: Option<Address>, endex: Option<Address>) -> Items<'_> {
        let (start, endex) = self.bound(start, endex);
        Items {
            blocks: self.blocks.as_slice(),
            block_index: self.blocks.index_start(start),
            address: start,
            endex,
        }
    }

    /// Populated addresses within `[start, endex)`.
    pub fn keys(&self, start: Option<Address>, endex: Option<Address>) -> Keys<'_> {
        Keys { inner: self.items(start, endex) }
    }

    /// Populated `(address, value)` cells within `[start, endex)`, walked
    /// from the high end.
    pub fn ritems(&self, start: Option<Address>, endex: Option<Address>) -> RItems<'_> {
        let (start, endex) = self.bound(start, endex);
        RItems {
            blocks: self.blocks.as_slice(),
            block_index: self.blocks.index_endex(endex - 1),
            address: endex - 1,
            start,
        }
    }

    /// Populated addresses within `[start, endex)`, descending.
    pub fn rkeys(&self, start: Option<Address>, endex: Option<Address>) -> RKeys<'_> {
        RKeys { inner: self.ritems(start, endex) }
    }

    /// Block spans clipped to `[start, endex)`.
    pub fn intervals(&self, start: Option<Address>, endex: Option<Address>) -> Intervals<'_> {
        let block_index = match start {
            Some(start) => self.blocks.index_start(start),
            None => 0,
        };
        let index_endex = match endex {
            Some(endex) => self.blocks.index_endex(endex),
            None => self.blocks.len(),
        };
        let (start, endex) = self.bound(start, endex);
        Intervals {
            blocks: self.blocks.as_slice(),
            block_index,
            index_endex,
            start,
            endex,
        }
    }

    /// Empty intervals within `[start, endex)`; open range ends report
    /// unbounded leading/trailing gaps.
    pub fn gaps(&self, start: Option<Address>, endex: Option<Address>) -> Gaps<'_> {
        let start_open = start.is_none();
        let endex_open = endex.is_none();
        let block_index = match start {
            Some(start) => self.blocks.index_start(start),
            None => 0,
        };
        let index_endex = match endex {
            Some(endex) => self.blocks.index_endex(endex),
            None => self.blocks.len(),
        };
        let (start, endex) = self.bound(start, endex);
        Gaps {
            blocks: self.blocks.as_slice(),
            block_index,
            index_endex,
            cursor: start,
            endex,
            start_open,
            endex_open,
            state: GapState::Init,
        }
    }

    /// Clipped `(address, data)` block pairs within `[start, endex)`.
    pub fn blocks_in(&self, start: Option<Address>, endex: Option<Address>) -> Blocks<'_> {
        let block_index = match start {
            Some(start) => self.blocks.index_start(start),
            None => 0,
        };
        let index_endex = match endex {
            Some(endex) => self.blocks.index_endex(endex),
            None => self.blocks.len(),
        };
        let (start, endex) = self.bound(start, endex);
        Blocks {
            blocks: self.blocks.as_slice(),
            block_index,
            index_endex,
            start,
            endex,
        }
    }

    /// Fixed-width tiles over populated content. `align` snaps tile
    /// boundaries to multiples of `step`, which may shorten the first
    /// tile of each run.
    pub fn chop(
        &self,
        step: Address,
        start: Option<Address>,
        endex: Option<Address>,
        align: bool,
    ) -> Result<Chop<'_>> {
        if step < 1 {
            return Err(MemoryError::ValueRange(format!("step must be >= 1, got {step}")));
        }
        let (start, endex) = self.bound(start, endex);
        Ok(Chop {
            blocks: self.blocks.as_slice(),
            block_index: self.blocks.index_start(start),
            start,
            endex,
            step,
            align,
            tile: None,
        })
    }

    // ── Content-granular iteration (never reports emptiness) ─────────────────

    /// Every block as `(address, data)`, unclipped.
    pub fn content_blocks(&self) -> impl Iterator<Item = (Address, &[u8])> + '_ {
        self.blocks.iter().map(|block| (block.start, block.data.as_slice()))
    }

    /// Every populated `(address, value)` cell.
    pub fn content_items(&self) -> impl Iterator<Item = (Address, u8)> + '_ {
        self.blocks.iter().flat_map(|block| {
            block
                .data
                .iter()
                .enumerate()
                .map(move |(offset, &value)| (block.start + offset as Address, value))
        })
    }

    /// Every populated address.
    pub fn content_keys(&self) -> impl Iterator<Item = Address> + '_ {
        self.content_items().map(|(address, _)| address)
    }

    /// Every populated byte, in address order.
    pub fn content_values(&self) -> impl Iterator<Item = u8> + '_ {
        self.blocks.iter().flat_map(|block| block.data.iter().copied())
    }
}
