//! Per-operation backup/restore pairs.
//!
//! Every destructive operation `op` has an `op_backup` capturing the
//! minimal state needed to undo it, and an `op_restore` reapplying that
//! state. Backups are shadow [`Memory`] values (bounded to the affected
//! range, so restored gaps land where they were) or small tokens when a
//! shadow would be overkill.
//!
//! Contract, for every op: `backup` then `op` then `restore` leaves the
//! memory byte-for-byte identical, bounds included.

use crate::error::Result;
use crate::{Address, Memory};

/// Token undoing an `insert`: the inserted range, plus whatever the
/// rightward shift pushed past the upper bound.
#[derive(Debug, Clone)]
pub struct InsertBackup {
    pub address: Address,
    pub size: Address,
    pub spill: Memory,
}

/// Token undoing a `reserve`: the opened range, plus the upper-bound
/// spill.
#[derive(Debug, Clone)]
pub struct ReserveBackup {
    pub address: Address,
    pub size: Address,
    pub spill: Memory,
}

/// Token undoing a `shift`: the offset and the content clipped off at
/// the bound the shift pushed against.
#[derive(Debug, Clone)]
pub struct ShiftBackup {
    pub offset: Address,
    pub trimmed: Memory,
}

/// Token undoing a `poke`: the cell's previous state.
#[derive(Debug, Clone, Copy)]
pub struct PokeBackup {
    pub address: Address,
    pub value: Option<u8>,
}

/// Token undoing an `update`: previous cell states, deduplicated.
pub type UpdateBackup = Vec<(Address, Option<u8>)>;

impl Memory {
    /// Extracts with the result bounded to the requested range, so the
    /// restore path knows the full affected span. Infallible for step 1.
    fn extract_span(&self, start: Option<Address>, endex: Option<Address>) -> Memory {
        match self.extract(start, endex, None, None, true) {
            Ok(memory) => memory,
            Err(_) => Memory::new(),
        }
    }

    // ── write ────────────────────────────────────────────────────────────────

    pub fn write_backup(&self, address: Address, size: Address) -> Memory {
        self.extract_span(Some(address), Some(address + size))
    }

    pub fn write_restore(&mut self, backup: &Memory) {
        self.write_memory(0, backup, true);
    }

    /// One shadow per source block when gaps are kept, or one for the
    /// whole span when `clear` is set.
    pub fn write_memory_backup(&self, offset: Address, source: &Memory, clear: bool) -> Vec<Memory> {
        if clear {
            vec![self.extract_span(
                Some(source.start() + offset),
                Some(source.endex() + offset),
            )]
        } else {
            source
                .content_blocks()
                .map(|(start, data)| {
                    self.extract_span(
                        Some(start + offset),
                        Some(start + offset + data.len() as Address),
                    )
                })
                .collect()
        }
    }

    pub fn write_memory_restore(&mut self, backups: &[Memory]) {
        for backup in backups {
            self.write_memory(0, backup, true);
        }
    }

    // ── insert / reserve ─────────────────────────────────────────────────────

    pub fn insert_backup(&self, address: Address, size: Address) -> InsertBackup {
        InsertBackup {
            address,
            size,
            spill: self.upper_spill(address, size),
        }
    }

    pub fn insert_restore(&mut self, backup: &InsertBackup) {
        self.delete(Some(backup.address), Some(backup.address + backup.size));
        self.write_memory(0, &backup.spill, true);
    }

    pub fn reserve_backup(&self, address: Address, size: Address) -> ReserveBackup {
        ReserveBackup {
            address,
            size,
            spill: self.upper_spill(address, size),
        }
    }

    pub fn reserve_restore(&mut self, backup: &ReserveBackup) {
        self.delete(Some(backup.address), Some(backup.address + backup.size));
        self.write_memory(0, &backup.spill, true);
    }

    /// Content a rightward shift of `size` starting at `address` would
    /// push past the upper bound.
    fn upper_spill(&self, address: Address, size: Address) -> Memory {
        match self.bound_endex() {
            Some(bound_endex) if size > 0 => {
                let start = (bound_endex - size).max(address);
                self.extract_span(Some(start), Some(bound_endex))
            }
            _ => Memory::new(),
        }
    }

    // ── delete / clear / crop / cut ──────────────────────────────────────────

    pub fn delete_backup(&self, start: Option<Address>, endex: Option<Address>) -> Memory {
        let (start, endex) = self.bound(start, endex);
        self.extract_span(Some(start), Some(endex))
    }

    pub fn delete_restore(&mut self, backup: &Memory) {
        self.reserve(backup.start(), backup.len());
        self.write_memory(0, backup, true);
    }

    pub fn clear_backup(&self, start: Option<Address>, endex: Option<Address>) -> Memory {
        let (start, endex) = self.bound(start, endex);
        self.extract_span(Some(start), Some(endex))
    }

    pub fn clear_restore(&mut self, backup: &Memory) {
        self.write_memory(0, backup, true);
    }

    /// The content that `crop` would drop on each side.
    pub fn crop_backup(
        &self,
        start: Option<Address>,
        endex: Option<Address>,
    ) -> (Option<Memory>, Option<Memory>) {
        let mut backup_start = None;
        let mut backup_endex = None;

        if let (Some(start), Some(first)) = (start, self.blocks.first()) {
            if first.start < start {
                backup_start = Some(self.extract_span(Some(first.start), Some(start)));
            }
        }
        if let (Some(endex), Some(last)) = (endex, self.blocks.last()) {
            if endex < last.endex() {
                backup_endex = Some(self.extract_span(Some(endex), Some(last.endex())));
            }
        }
        (backup_start, backup_endex)
    }

    pub fn crop_restore(&mut self, backup_start: Option<&Memory>, backup_endex: Option<&Memory>) {
        if let Some(backup) = backup_start {
            self.write_memory(0, backup, true);
        }
        if let Some(backup) = backup_endex {
            self.write_memory(0, backup, true);
        }
    }

    /// A `cut` result is its own backup.
    pub fn cut_restore(&mut self, taken: &Memory) {
        self.write_memory(0, taken, true);
    }

    // ── fill / flood ─────────────────────────────────────────────────────────

    pub fn fill_backup(&self, start: Option<Address>, endex: Option<Address>) -> Memory {
        let (start, endex) = self.bound(start, endex);
        self.extract_span(Some(start), Some(endex))
    }

    pub fn fill_restore(&mut self, backup: &Memory) {
        self.write_memory(0, backup, true);
    }

    /// The gap intervals `flood` would fill. An open side means the
    /// store had no content there at all.
    pub fn flood_backup(
        &self,
        start: Option<Address>,
        endex: Option<Address>,
    ) -> Vec<(Option<Address>, Option<Address>)> {
        let (start, endex) = self.bound(start, endex);
        self.gaps(Some(start), Some(endex)).collect()
    }

    pub fn flood_restore(&mut self, backup: &[(Option<Address>, Option<Address>)]) {
        for &(gap_start, gap_endex) in backup {
            self.clear(gap_start, gap_endex);
        }
    }

    // ── shift ────────────────────────────────────────────────────────────────

    pub fn shift_backup(&self, offset: Address) -> ShiftBackup {
        let trimmed = if offset < 0 {
            self.lower_spill(-offset)
        } else {
            self.upper_spill(Address::MIN, offset)
        };
        ShiftBackup { offset, trimmed }
    }

    pub fn shift_restore(&mut self, backup: &ShiftBackup) {
        self.shift(-backup.offset);
        self.write_memory(0, &backup.trimmed, true);
    }

    /// Content a leftward shift of `size` would push past the lower bound.
    fn lower_spill(&self, size: Address) -> Memory {
        match self.bound_start() {
            Some(bound_start) if size > 0 => {
                self.extract_span(Some(bound_start), Some(bound_start + size))
            }
            _ => Memory::new(),
        }
    }

    // ── point and tail ops ───────────────────────────────────────────────────

    pub fn poke_backup(&self, address: Address) -> PokeBackup {
        PokeBackup { address, value: self.peek(address) }
    }

    pub fn poke_restore(&mut self, backup: &PokeBackup) -> Result<()> {
        self.poke(backup.address, backup.value)
    }

    pub fn update_backup(
        &self,
        items: impl IntoIterator<Item = (Address, Option<u8>)>,
    ) -> UpdateBackup {
        let mut backup: UpdateBackup = Vec::new();
        for (address, _) in items {
            if !backup.iter().any(|&(seen, _)| seen == address) {
                backup.push((address, self.peek(address)));
            }
        }
        backup
    }

    pub fn update_restore(&mut self, backup: &UpdateBackup) -> Result<()> {
        self.update(backup.iter().copied())
    }

    pub fn append_backup(&self) {}

    pub fn append_restore(&mut self) {
        self.pop();
    }

    /// The content end before an extension (`extend` or `extend_memory`);
    /// restore deletes from there.
    pub fn extend_backup(&self) -> Address {
        self.content_endex()
    }

    pub fn extend_restore(&mut self, content_endex: Address) {
        self.delete(Some(content_endex), None);
    }

    pub fn pop_backup(&self) -> PokeBackup {
        let address = self.content_endex() - 1;
        PokeBackup { address, value: self.peek(address) }
    }

    pub fn pop_at_backup(&self, address: Address) -> PokeBackup {
        PokeBackup { address, value: self.peek(address) }
    }

    /// Undoes a `pop`/`pop_at`: reopens the cell and puts the byte back.
    pub fn pop_restore(&mut self, backup: &PokeBackup) {
        match backup.value {
            None => self.reserve(backup.address, 1),
            Some(value) => {
                if backup.address == self.content_endex() {
                    self.append(value);
                } else {
                    self.insert(backup.address, &[value]);
                }
            }
        }
    }

    // ── remove ───────────────────────────────────────────────────────────────

    pub fn remove_backup(
        &self,
        pattern: &[u8],
        start: Option<Address>,
        endex: Option<Address>,
    ) -> Result<Memory> {
        let address = self.index(pattern, start, endex)?;
        Ok(self.extract_span(Some(address), Some(address + pattern.len() as Address)))
    }

    pub fn remove_restore(&mut self, backup: &Memory) {
        self.reserve(backup.start(), backup.len());
        self.write_memory(0, backup, true);
    }
}
