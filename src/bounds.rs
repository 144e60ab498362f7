//! Optional half-open address clamp applied by mutating operations.

use serde::{Deserialize, Serialize};

use crate::Address;

/// Optional `[start, endex)` clamp.
///
/// Either side may be open. Whenever both are set, `start <= endex`; the
/// setters normalise a crossing pair by dragging the other side along,
/// mirroring how the span behaves when assigned as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    start: Option<Address>,
    endex: Option<Address>,
}

impl Bounds {
    pub const UNBOUNDED: Bounds = Bounds { start: None, endex: None };

    pub fn new(start: Option<Address>, endex: Option<Address>) -> Self {
        let endex = match (start, endex) {
            (Some(s), Some(e)) if e < s => Some(s),
            _ => endex,
        };
        Self { start, endex }
    }

    #[inline]
    pub fn start(&self) -> Option<Address> {
        self.start
    }

    #[inline]
    pub fn endex(&self) -> Option<Address> {
        self.endex
    }

    #[inline]
    pub fn span(&self) -> (Option<Address>, Option<Address>) {
        (self.start, self.endex)
    }

    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.endex.is_none()
    }

    /// Sets the lower bound, dragging the upper bound up if it would cross.
    pub fn set_start(&mut self, start: Option<Address>) {
        if let (Some(s), Some(e)) = (start, self.endex) {
            if e < s {
                self.endex = Some(s);
            }
        }
        self.start = start;
    }

    /// Sets the upper bound, dragging the lower bound down if it would cross.
    pub fn set_endex(&mut self, endex: Option<Address>) {
        if let (Some(s), Some(e)) = (self.start, endex) {
            if e < s {
                self.start = Some(e);
            }
        }
        self.endex = endex;
    }

    pub fn set_span(&mut self, start: Option<Address>, endex: Option<Address>) {
        *self = Bounds::new(start, endex);
    }

    /// Whether `address` satisfies the clamp.
    pub fn contains(&self, address: Address) -> bool {
        if let Some(start) = self.start {
            if address < start {
                return false;
            }
        }
        if let Some(endex) = self.endex {
            if address >= endex {
                return false;
            }
        }
        true
    }
}
