//! Column compaction after removals: blocks fall toward the far (bottom) edge.

use crate::grid::{Cell, Grid};

/// One block that moved during compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fall {
    pub col: usize,
    pub from_row: usize,
    pub to_row: usize,
}

impl Fall {
    /// Rows travelled (always toward the far edge).
    #[inline]
    pub fn distance(&self) -> usize {
        self.to_row - self.from_row
    }
}

/// Pack every column toward the last row, keeping the vertical order of blocks.
/// Returns the blocks that moved.
pub fn resolve(grid: &mut Grid) -> Vec<Fall> {
    let rows = grid.rows();
    let mut falls = Vec::new();
    for col in 0..grid.cols() {
        // Walk bottom-up; `write` is the next free slot from the bottom.
        let mut write = rows;
        for read in (0..rows).rev() {
            let cell = grid.get(read, col);
            if cell.is_empty() {
                continue;
            }
            write -= 1;
            if write != read {
                grid.set(write, col, cell);
                grid.set(read, col, Cell::Empty);
                falls.push(Fall {
                    col,
                    from_row: read,
                    to_row: write,
                });
            }
        }
    }
    falls
}

/// True if no empty cell sits below an occupied one in any column.
#[cfg(test)]
pub fn is_compact(grid: &Grid) -> bool {
    (0..grid.cols()).all(|col| {
        let mut seen_block = false;
        (0..grid.rows()).all(|row| {
            let empty = grid.get(row, col).is_empty();
            seen_block |= !empty;
            !(seen_block && empty)
        })
    })
}
