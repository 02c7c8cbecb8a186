//! Presentation offsets for cells that fell: eased from a start offset back to rest.
//! Never touches the logical grid.

use crate::config::EngineConfig;
use crate::grid::Rows;

/// A cell easing toward its resting position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub start_offset: f32,
    /// 0..=1
    pub progress: f32,
    /// Seconds for the whole ease.
    pub duration: f32,
}

impl Motion {
    /// Displayed offset at the current progress.
    #[inline]
    pub fn offset(&self) -> f32 {
        self.start_offset * (1.0 - ease_out_cubic(self.progress))
    }
}

#[inline]
pub fn ease_out_cubic(p: f32) -> f32 {
    let p = p.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(3)
}

#[derive(Debug, Clone)]
pub struct Animator {
    motions: Rows<Option<Motion>>,
    cell_height: f32,
    secs_per_cell: f32,
    min_secs: f32,
    active: usize,
}

impl Animator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            motions: Rows::new(config.total_rows(), config.cols),
            cell_height: config.cell_height,
            secs_per_cell: config.fall_secs_per_cell,
            min_secs: config.min_fall_secs,
            active: 0,
        }
    }

    /// Longer falls take longer, never less than the minimum.
    pub fn duration_for(&self, start_offset: f32) -> f32 {
        let cells = start_offset.abs() / self.cell_height;
        (cells * self.secs_per_cell).max(self.min_secs)
    }

    /// Start easing the cell at `(row, col)` from `start_offset`. If the cell was already
    /// moving, the new ease starts from where it is currently drawn.
    pub fn launch(&mut self, row: usize, col: usize, start_offset: f32) {
        let was_moving = self.motions.get(row, col).is_some();
        let start = start_offset + self.offset(row, col);
        if start == 0.0 {
            if was_moving {
                self.active -= 1;
            }
            *self.motions.get_mut(row, col) = None;
            return;
        }
        if !was_moving {
            self.active += 1;
        }
        let duration = self.duration_for(start);
        *self.motions.get_mut(row, col) = Some(Motion {
            start_offset: start,
            progress: 0.0,
            duration,
        });
    }

    /// Move a running motion along with its cell (used when gravity relocates a block).
    pub fn take(&mut self, row: usize, col: usize) -> Option<Motion> {
        let taken = self.motions.get_mut(row, col).take();
        if taken.is_some() {
            self.active -= 1;
        }
        taken
    }

    /// Step every running motion by `dt` seconds; settled cells snap to zero and are dropped.
    pub fn advance(&mut self, dt: f32) {
        if self.active == 0 || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let (rows, cols) = (self.motions.rows(), self.motions.cols());
        for row in 0..rows {
            for col in 0..cols {
                let slot = self.motions.get_mut(row, col);
                let done = match slot.as_mut() {
                    Some(motion) => {
                        motion.progress += dt / motion.duration;
                        motion.progress >= 1.0
                    }
                    None => false,
                };
                if done {
                    *slot = None;
                    self.active -= 1;
                }
            }
        }
    }

    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> f32 {
        self.motions.get(row, col).map(|m| m.offset()).unwrap_or(0.0)
    }

    #[cfg(test)]
    pub fn motion(&self, row: usize, col: usize) -> Option<Motion> {
        *self.motions.get(row, col)
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.active == 0
    }

    /// Shift in lockstep with the grid so offsets stay attached to their cells.
    pub fn shift(&mut self) {
        let leaving = self.motions.row(0).iter().filter(|m| m.is_some()).count();
        self.active -= leaving;
        let cols = self.motions.cols();
        self.motions.shift_push(vec![None; cols]);
    }

    pub fn clear(&mut self) {
        self.motions.fill(None);
        self.active = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animator() -> Animator {
        let cfg = EngineConfig {
            rows: 4,
            buffer_rows: 0,
            cols: 2,
            cell_height: 1.0,
            fall_secs_per_cell: 0.1,
            min_fall_secs: 0.15,
            ..EngineConfig::default()
        };
        Animator::new(&cfg)
    }

    #[test]
    fn test_ease_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-6);
    }

    #[test]
    fn test_duration_scales_with_distance_with_floor() {
        let a = animator();
        assert_eq!(a.duration_for(-1.0), 0.15);
        assert!((a.duration_for(-3.0) - 0.3).abs() < 1e-6);
        assert!(a.duration_for(-6.0) > a.duration_for(-3.0));
    }

    #[test]
    fn test_offset_relaxes_to_exact_zero() {
        let mut a = animator();
        a.launch(3, 0, -2.0);
        assert_eq!(a.offset(3, 0), -2.0);
        a.advance(0.05);
        let mid = a.offset(3, 0);
        assert!(mid > -2.0 && mid < 0.0);
        a.advance(1.0);
        assert_eq!(a.offset(3, 0), 0.0);
        assert!(a.motion(3, 0).is_none());
        assert!(a.is_settled());
        // settled cells are not reprocessed
        a.advance(1.0);
        assert_eq!(a.offset(3, 0), 0.0);
    }

    #[test]
    fn test_relaunch_continues_from_drawn_offset() {
        let mut a = animator();
        a.launch(2, 1, -1.0);
        a.advance(0.05);
        let drawn = a.offset(2, 1);
        a.launch(2, 1, -1.0);
        assert!((a.offset(2, 1) - (drawn - 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_shift_keeps_offsets_attached() {
        let mut a = animator();
        a.launch(3, 1, -1.0);
        a.launch(0, 0, -1.0);
        a.shift();
        assert_eq!(a.offset(2, 1), -1.0);
        assert_eq!(a.offset(3, 1), 0.0);
        // boundary-row motion left with its row
        assert_eq!(a.offset(0, 0), 0.0);
        a.advance(5.0);
        assert!(a.is_settled());
    }

    #[test]
    fn test_zero_launch_is_noop() {
        let mut a = animator();
        a.launch(1, 1, 0.0);
        assert!(a.is_settled());
        assert!(a.motion(1, 1).is_none());
    }
}
