//! Grid store: cells in rows, row 0 at the boundary (top). Shifting drops the top row and
//! appends a new one at the bottom.

use std::collections::VecDeque;

/// Single cell: empty or a block of colour `1..=num_colors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Block(u8),
}

impl Cell {
    #[inline]
    pub fn color(self) -> Option<u8> {
        match self {
            Self::Empty => None,
            Self::Block(c) => Some(c),
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

/// Fixed-size rows of `T`. Shared by the cell grid and the per-cell animation layer so
/// both shift the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct Rows<T> {
    cols: usize,
    /// rows[r][c]; rows[0] is the boundary row.
    rows: VecDeque<Vec<T>>,
}

impl<T: Clone + Default> Rows<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            rows: (0..rows).map(|_| vec![T::default(); cols]).collect(),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Panics on out-of-range coordinates.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &T {
        self.check(row, col);
        &self.rows[row][col]
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        self.check(row, col);
        &mut self.rows[row][col]
    }

    #[inline]
    pub fn try_get(&self, row: usize, col: usize) -> Option<&T> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn row(&self, row: usize) -> &[T] {
        self.check(row, 0);
        &self.rows[row]
    }

    /// Drop row 0 and append `new_row` at the far edge.
    pub fn shift_push(&mut self, new_row: Vec<T>) {
        assert_eq!(
            new_row.len(),
            self.cols,
            "spawned row has {} cells, grid has {} columns",
            new_row.len(),
            self.cols
        );
        self.rows.pop_front();
        self.rows.push_back(new_row);
    }

    pub fn fill(&mut self, value: T) {
        for row in &mut self.rows {
            row.fill(value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, v)| (r, c, v)))
    }

    #[inline]
    fn check(&self, row: usize, col: usize) {
        assert!(
            row < self.rows.len() && col < self.cols,
            "grid access ({row}, {col}) out of range {}x{}",
            self.rows.len(),
            self.cols
        );
    }
}

/// The logical game grid. Authoritative for colours and adjacency.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: Rows<Cell>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cells: Rows::new(rows, cols),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    #[inline]
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows() && col < self.cols()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Cell {
        *self.cells.get(row, col)
    }

    #[inline]
    pub fn try_get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.try_get(row, col).copied()
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        *self.cells.get_mut(row, col) = cell;
    }

    /// Remove the boundary row and append `new_row(cols)` at the bottom.
    pub fn shift_and_spawn<F>(&mut self, new_row: F)
    where
        F: FnOnce(usize) -> Vec<Cell>,
    {
        let row = new_row(self.cols());
        self.cells.shift_push(row);
    }

    pub fn fill_row(&mut self, row: usize, cells: Vec<Cell>) {
        assert_eq!(cells.len(), self.cols());
        for (col, cell) in cells.into_iter().enumerate() {
            self.set(row, col, cell);
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
    }

    pub fn is_row_occupied(&self, row: usize) -> bool {
        self.cells.row(row).iter().any(|c| !c.is_empty())
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|(_, _, c)| !c.is_empty()).count()
    }

    #[cfg(test)]
    pub fn row(&self, row: usize) -> &[Cell] {
        self.cells.row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(rows: usize, cols: usize) -> Grid {
        let mut g = Grid::new(rows, cols);
        for r in 0..rows {
            g.fill_row(r, vec![Cell::Block(r as u8 + 1); cols]);
        }
        g
    }

    #[test]
    fn test_new_grid_is_empty() {
        let g = Grid::new(5, 3);
        assert_eq!((g.rows(), g.cols()), (5, 3));
        assert_eq!(g.occupied_count(), 0);
    }

    #[test]
    fn test_set_get() {
        let mut g = Grid::new(3, 3);
        g.set(1, 2, Cell::Block(4));
        assert_eq!(g.get(1, 2), Cell::Block(4));
        assert_eq!(g.get(2, 1), Cell::Empty);
        assert_eq!(g.try_get(3, 0), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_panics() {
        let g = Grid::new(3, 3);
        let _ = g.get(0, 3);
    }

    #[test]
    fn test_shift_drops_boundary_row_and_keeps_order() {
        let mut g = numbered(4, 2);
        g.shift_and_spawn(|cols| vec![Cell::Block(9); cols]);
        let firsts: Vec<Cell> = (0..4).map(|r| g.get(r, 0)).collect();
        assert_eq!(
            firsts,
            vec![Cell::Block(2), Cell::Block(3), Cell::Block(4), Cell::Block(9)]
        );
    }

    #[test]
    fn test_shift_k_times_matches_drop_k_append_k() {
        let mut g = numbered(5, 3);
        let original = g.clone();
        for i in 0..3u8 {
            g.shift_and_spawn(|cols| vec![Cell::Block(10 + i); cols]);
        }
        for r in 0..2 {
            assert_eq!(g.row(r), original.row(r + 3));
        }
        for (i, r) in (2..5).enumerate() {
            assert_eq!(g.row(r), vec![Cell::Block(10 + i as u8); 3].as_slice());
        }
    }

    #[test]
    fn test_row_occupancy() {
        let mut g = Grid::new(3, 3);
        assert!(!g.is_row_occupied(0));
        g.set(0, 1, Cell::Block(1));
        assert!(g.is_row_occupied(0));
        g.clear();
        assert!(!g.is_row_occupied(0));
    }

    #[test]
    fn test_rows_layer_shifts_like_grid() {
        let mut layer: Rows<f32> = Rows::new(3, 2);
        *layer.get_mut(2, 1) = -1.5;
        layer.shift_push(vec![0.0; 2]);
        assert_eq!(*layer.get(1, 1), -1.5);
        assert_eq!(*layer.get(2, 1), 0.0);
    }
}
