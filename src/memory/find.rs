//! Pattern search and span queries.
//!
//! A match is always contiguous, so it can never straddle a gap — the
//! search visits each intersecting block independently, delegating the
//! byte scanning to `memchr`.

use memchr::{memchr, memmem, memrchr};

use crate::error::{MemoryError, Result};
use crate::{Address, Memory};

impl Memory {
    /// Leftmost address where `pattern` matches contiguously within
    /// `[start, endex)`, or `None`.
    pub fn find(
        &self,
        pattern: &[u8],
        start: Option<Address>,
        endex: Option<Address>,
    ) -> Option<Address> {
        if pattern.is_empty() {
            return None;
        }
        let (start, endex) = self.bound(start, endex);
        let index_start = self.blocks.index_start(start);
        let index_endex = self.blocks.index_endex(endex);

        for block in &self.blocks.as_slice()[index_start..index_endex] {
            let Some(haystack) = clip(block.start, &block.data, start, endex) else {
                continue;
            };
            let found = if pattern.len() == 1 {
                memchr(pattern[0], haystack.1)
            } else {
                memmem::find(haystack.1, pattern)
            };
            if let Some(offset) = found {
                return Some(haystack.0 + offset as Address);
            }
        }
        None
    }

    /// Rightmost match address, or `None`.
    pub fn rfind(
        &self,
        pattern: &[u8],
        start: Option<Address>,
        endex: Option<Address>,
    ) -> Option<Address> {
        if pattern.is_empty() {
            return None;
        }
        let (start, endex) = self.bound(start, endex);
        let index_start = self.blocks.index_start(start);
        let index_endex = self.blocks.index_endex(endex);

        for block in self.blocks.as_slice()[index_start..index_endex].iter().rev() {
            let Some(haystack) = clip(block.start, &block.data, start, endex) else {
                continue;
            };
            let found = if pattern.len() == 1 {
                memrchr(pattern[0], haystack.1)
            } else {
                memmem::rfind(haystack.1, pattern)
            };
            if let Some(offset) = found {
                return Some(haystack.0 + offset as Address);
            }
        }
        None
    }

    /// Like [`Memory::find`], failing with `NotFound` instead of `None`.
    pub fn index(
        &self,
        pattern: &[u8],
        start: Option<Address>,
        endex: Option<Address>,
    ) -> Result<Address> {
        self.find(pattern, start, endex).ok_or(MemoryError::NotFound)
    }

    /// Like [`Memory::rfind`], failing with `NotFound` instead of `None`.
    pub fn rindex(
        &self,
        pattern: &[u8],
        start: Option<Address>,
        endex: Option<Address>,
    ) -> Result<Address> {
        self.rfind(pattern, start, endex).ok_or(MemoryError::NotFound)
    }

    /// True when `pattern` occurs anywhere in the content.
    pub fn contains(&self, pattern: &[u8]) -> bool {
        self.find(pattern, None, None).is_some()
    }

    /// Number of non-overlapping matches within `[start, endex)`.
    pub fn count(&self, pattern: &[u8], start: Option<Address>, endex: Option<Address>) -> usize {
        if pattern.is_empty() {
            return 0;
        }
        let (start, endex) = self.bound(start, endex);
        let index_start = self.blocks.index_start(start);
        let index_endex = self.blocks.index_endex(endex);

        self.blocks.as_slice()[index_start..index_endex]
            .iter()
            .filter_map(|block| clip(block.start, &block.data, start, endex))
            .map(|(_, haystack)| {
                if pattern.len() == 1 {
                    memchr::memchr_iter(pattern[0], haystack).count()
                } else {
                    memmem::find_iter(haystack, pattern).count()
                }
            })
            .sum()
    }

    /// `(start, endex, value)` of the maximal run of equal bytes — or of
    /// the gap — surrounding `address`. Open sides are `None`; the value
    /// is `None` for a gap.
    pub fn equal_span(&self, address: Address) -> (Option<Address>, Option<Address>, Option<u8>) {
        let block_index = self.blocks.index_start(address);

        if let Some(block) = self.blocks.get(block_index) {
            if block.contains(address) {
                let offset = (address - block.start) as usize;
                let value = block.data[offset];

                let mut run_start = offset;
                while run_start > 0 && block.data[run_start - 1] == value {
                    run_start -= 1;
                }
                let mut run_endex = offset + 1;
                while run_endex < block.data.len() && block.data[run_endex] == value {
                    run_endex += 1;
                }
                return (
                    Some(block.start + run_start as Address),
                    Some(block.start + run_endex as Address),
                    Some(value),
                );
            }
            return self.gap_span(block_index, block.start);
        }

        match self.blocks.last() {
            Some(last) => (Some(last.endex()), None, None),
            None => (None, None, None),
        }
    }

    /// Like [`Memory::equal_span`] at block granularity: the whole
    /// containing block's span, with the byte stored at `address`.
    pub fn block_span(&self, address: Address) -> (Option<Address>, Option<Address>, Option<u8>) {
        let block_index = self.blocks.index_start(address);

        if let Some(block) = self.blocks.get(block_index) {
            if block.contains(address) {
                let value = block.data[(address - block.start) as usize];
                return (Some(block.start), Some(block.endex()), Some(value));
            }
            return self.gap_span(block_index, block.start);
        }

        match self.blocks.last() {
            Some(last) => (Some(last.endex()), None, None),
            None => (None, None, None),
        }
    }

    /// Span of the gap ending at `gap_endex`, just before block
    /// `block_index`.
    fn gap_span(
        &self,
        block_index: usize,
        gap_endex: Address,
    ) -> (Option<Address>, Option<Address>, Option<u8>) {
        match block_index.checked_sub(1).and_then(|index| self.blocks.get(index)) {
            Some(previous) => (Some(previous.endex()), Some(gap_endex), None),
            None => (None, Some(gap_endex), None),
        }
    }
}

/// Clips a block's data to `[start, endex)`, returning the clipped base
/// address and slice, or `None` when the intersection is empty.
fn clip(
    block_start: Address,
    data: &[u8],
    start: Address,
    endex: Address,
) -> Option<(Address, &[u8])> {
    let block_endex = block_start + data.len() as Address;
    let slice_start = start.max(block_start);
    let slice_endex = endex.min(block_endex);
    if slice_start >= slice_endex {
        return None;
    }
    let offset = (slice_start - block_start) as usize;
    let length = (slice_endex - slice_start) as usize;
    Some((slice_start, &data[offset..offset + length]))
}
