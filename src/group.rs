//! Connected same-colour groups (4-neighbour flood fill).

use crate::grid::{Cell, Grid};

const NEIGHBOURS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// All cells reachable from `(row, col)` through 4-adjacent cells of the seed's colour.
/// Empty seed yields an empty group. The result is sorted (row-major) so it does not
/// depend on traversal order.
pub fn collect_group(grid: &Grid, row: usize, col: usize) -> Vec<(usize, usize)> {
    let color = match grid.get(row, col) {
        Cell::Block(c) => c,
        Cell::Empty => return Vec::new(),
    };
    let cols = grid.cols();
    let mut visited = vec![false; grid.rows() * cols];
    let mut stack = vec![(row, col)];
    visited[row * cols + col] = true;
    let mut group = Vec::new();

    while let Some((r, c)) = stack.pop() {
        group.push((r, c));
        for (dr, dc) in NEIGHBOURS_4 {
            let (Some(nr), Some(nc)) = (r.checked_add_signed(dr), c.checked_add_signed(dc)) else {
                continue;
            };
            if grid.try_get(nr, nc) != Some(Cell::Block(color)) || visited[nr * cols + nc] {
                continue;
            }
            visited[nr * cols + nc] = true;
            stack.push((nr, nc));
        }
    }
    group.sort_unstable();
    group
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a grid from rows of digits; '.' is empty.
    fn grid_from(lines: &[&str]) -> Grid {
        let cols = lines[0].len();
        let mut g = Grid::new(lines.len(), cols);
        for (r, line) in lines.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                if let Some(d) = ch.to_digit(10) {
                    g.set(r, c, Cell::Block(d as u8));
                }
            }
        }
        g
    }

    #[test]
    fn test_empty_seed_gives_empty_group() {
        let g = grid_from(&["1.", "11"]);
        assert!(collect_group(&g, 0, 1).is_empty());
    }

    #[test]
    fn test_single_cell_group() {
        let g = grid_from(&["12", "21"]);
        assert_eq!(collect_group(&g, 0, 0), vec![(0, 0)]);
    }

    #[test]
    fn test_diagonals_do_not_connect() {
        let g = grid_from(&["1.", ".1"]);
        assert_eq!(collect_group(&g, 0, 0).len(), 1);
    }

    #[test]
    fn test_ring_region_with_hole_is_visited_once() {
        let g = grid_from(&["111", "121", "111"]);
        let group = collect_group(&g, 0, 0);
        assert_eq!(group.len(), 8);
        assert!(!group.contains(&(1, 1)));
    }

    #[test]
    fn test_same_region_from_any_seed() {
        let g = grid_from(&["1122", "2112", "2211", "1111"]);
        let from_a = collect_group(&g, 0, 0);
        for &(r, c) in &from_a {
            assert_eq!(collect_group(&g, r, c), from_a);
        }
        assert_eq!(from_a.len(), 10);
    }

    #[test]
    fn test_other_colours_block_path() {
        let g = grid_from(&["131", "131", "111"]);
        assert_eq!(collect_group(&g, 0, 0).len(), 7);
        assert_eq!(collect_group(&g, 0, 1).len(), 2);
    }
}
