pub mod block;
pub mod bounds;
pub mod error;
pub mod hexdump;
pub mod io_stream;
pub mod memory;
pub mod view;

/// Signed cell address; content can sit below zero.
pub type Address = i64;
/// Stored byte value; emptiness is `Option<Value>::None`, never a byte.
pub type Value = u8;

pub use block::{Block, BlockVector};
pub use bounds::Bounds;
pub use error::{MemoryError, Result};
pub use hexdump::HexdumpOptions;
pub use io_stream::{GapFill, MemoryIO, Whence};
pub use memory::Memory;
pub use view::MemoryView;
