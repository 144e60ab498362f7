//! Canonical hex/ASCII dump rendering.
//!
//! One line per `columns`-cell row, rows aligned down to a multiple of
//! `columns`:
//!
//! ```text
//! 00000000  -- -- 41 42 -- -- -- --  -- -- -- -- 7E -- -- --  |  AB        ~   |
//! ```
//!
//! A populated byte renders as two hex digits; an empty cell inside the
//! requested range renders `--` in the hex column and a space in the
//! ASCII column (a populated non-printable byte renders `.`, so the two
//! never collide).  Cells outside the requested range render blank.
//! Runs of two or more all-empty rows collapse to a single `*` line.

use crate::{Address, Memory};

/// Options for [`Memory::hexdump`].
#[derive(Debug, Clone)]
pub struct HexdumpOptions {
    pub start: Option<Address>,
    pub endex: Option<Address>,
    pub columns: usize,
}

impl Default for HexdumpOptions {
    fn default() -> Self {
        Self { start: None, endex: None, columns: 16 }
    }
}

pub(crate) fn render(memory: &Memory, options: &HexdumpOptions) -> String {
    let columns = options.columns.max(1) as Address;
    let (start, endex) = memory.bound(options.start, options.endex);
    if start >= endex {
        return String::new();
    }

    let mut out = String::new();
    let mut row = start.div_euclid(columns) * columns;
    let mut pending_gap_row: Option<Address> = None;
    let mut pending_gap_rows = 0usize;

    while row < endex {
        let populated = (row..row + columns)
            .any(|address| start <= address && address < endex && memory.peek(address).is_some());

        if populated {
            match pending_gap_rows {
                0 => {}
                1 => {
                    if let Some(gap_row) = pending_gap_row.take() {
                        render_row(&mut out, memory, gap_row, columns, start, endex);
                    }
                }
                _ => out.push_str("*\n"),
            }
            pending_gap_rows = 0;
            render_row(&mut out, memory, row, columns, start, endex);
        } else {
            if pending_gap_rows == 0 {
                pending_gap_row = Some(row);
            }
            pending_gap_rows += 1;
        }
        row += columns;
    }

    match pending_gap_rows {
        0 => {}
        1 => {
            if let Some(gap_row) = pending_gap_row.take() {
                render_row(&mut out, memory, gap_row, columns, start, endex);
            }
        }
        _ => out.push_str("*\n"),
    }
    out
}

fn render_row(
    out: &mut String,
    memory: &Memory,
    row: Address,
    columns: Address,
    start: Address,
    endex: Address,
) {
    use core::fmt::Write as _;

    let _ = write!(out, "{row:08X} ");

    let mut ascii = String::with_capacity(columns as usize);
    for column in 0..columns {
        let address = row + column;
        out.push(' ');
        if column > 0 && column % 8 == 0 {
            out.push(' ');
        }

        if address < start || address >= endex {
            out.push_str("  ");
            ascii.push(' ');
            continue;
        }
        match memory.peek(address) {
            Some(byte) => {
                let _ = write!(out, "{byte:02X}");
                ascii.push(if (0x20..=0x7E).contains(&byte) { byte as char } else { '.' });
            }
            None => {
                out.push_str("--");
                ascii.push(' ');
            }
        }
    }

    let _ = write!(out, "  |{ascii}|");
    out.push('\n');
}
