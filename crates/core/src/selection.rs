//! Rectangular selections in display coordinates.
//!
//! Rows are indices into a table's display order, columns are indices into
//! its column registry. Conversion to row ids happens at the boundary.

use serde::{Deserialize, Serialize};

/// A (row, col) position in display coordinates.
pub type GridPos = (usize, usize);

/// Rectangular range spanned by an anchor and an end cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub anchor: GridPos,
    pub end: GridPos,
}

impl CellRange {
    pub fn new(anchor: GridPos, end: GridPos) -> Self {
        Self { anchor, end }
    }

    /// A range covering one cell.
    pub fn single(pos: GridPos) -> Self {
        Self { anchor: pos, end: pos }
    }

    /// Top-left corner.
    pub fn min(&self) -> GridPos {
        (self.anchor.0.min(self.end.0), self.anchor.1.min(self.end.1))
    }

    /// Bottom-right corner.
    pub fn max(&self) -> GridPos {
        (self.anchor.0.max(self.end.0), self.anchor.1.max(self.end.1))
    }

    pub fn row_count(&self) -> usize {
        self.max().0 - self.min().0 + 1
    }

    pub fn col_count(&self) -> usize {
        self.max().1 - self.min().1 + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.anchor == self.end
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        let (min_row, min_col) = self.min();
        let (max_row, max_col) = self.max();
        pos.0 >= min_row && pos.0 <= max_row && pos.1 >= min_col && pos.1 <= max_col
    }

    /// Row indices covered, top to bottom.
    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.min().0..=self.max().0
    }

    /// Column indices covered, left to right.
    pub fn cols(&self) -> std::ops::RangeInclusive<usize> {
        self.min().1..=self.max().1
    }
}
