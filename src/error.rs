use crate::Address;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, MemoryError>;

/// Failure conditions surfaced by memory operations.
///
/// No operation performs a partial mutation and then fails: arguments are
/// validated up front, so an `Err` means the store is untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address 0x{address:X} outside bounds")]
    OutOfBounds { address: Address },

    #[error("subsection not found")]
    NotFound,

    #[error("empty cell at address 0x{address:X}")]
    DataGap { address: Address },

    #[error("value out of range: {0}")]
    ValueRange(String),

    #[error("invariant broken: {0}")]
    InvariantBroken(String),

    #[error("non-contiguous data within range")]
    ContiguityRequired,
}
