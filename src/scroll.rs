//! Scroll/spawn scheduler: continuous sub-cell progress toward the next row shift.

use crate::config::EngineConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    initial_speed: f32,
    ramp_rate: f32,
    max_speed: f32,
    boost_factor: f32,
    cell_height: f32,
    /// Seconds of play (not scaled by boost).
    elapsed: f32,
    /// Progress toward the next shift, in offset units.
    accumulator: f32,
    boosted: bool,
}

impl Scheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            initial_speed: config.initial_speed,
            ramp_rate: config.speed_ramp_rate,
            max_speed: config.max_speed,
            boost_factor: config.boost_factor,
            cell_height: config.cell_height,
            elapsed: 0.0,
            accumulator: 0.0,
            boosted: false,
        }
    }

    /// Ramped speed in cells per second, without boost.
    pub fn base_speed(&self) -> f32 {
        (self.initial_speed + self.ramp_rate * self.elapsed).min(self.max_speed)
    }

    /// Speed currently applied to the accumulator.
    pub fn speed(&self) -> f32 {
        if self.boosted {
            self.base_speed() * self.boost_factor
        } else {
            self.base_speed()
        }
    }

    pub fn set_boost(&mut self, enabled: bool) {
        self.boosted = enabled;
    }

    #[inline]
    pub fn is_boosted(&self) -> bool {
        self.boosted
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Sub-cell scroll position in `[0, cell_height)` once all pending shifts are taken.
    #[inline]
    pub fn offset(&self) -> f32 {
        self.accumulator
    }

    /// Add one frame of progress. Non-finite or negative deltas count as zero.
    pub fn advance(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        // Rate is sampled at the start of the frame; the ramp is far slower than a frame.
        let progress = self.speed() * self.cell_height * dt;
        self.elapsed += dt;
        self.accumulator += progress;
    }

    /// Consume one full cell of progress. Call until it returns false.
    pub fn take_shift(&mut self) -> bool {
        if self.accumulator >= self.cell_height {
            self.accumulator -= self.cell_height;
            true
        } else {
            false
        }
    }

    /// Drop any whole cells still pending (used when a shift ends the game mid-frame).
    pub fn discard_pending(&mut self) {
        self.accumulator %= self.cell_height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig {
            initial_speed: 1.0,
            speed_ramp_rate: 0.5,
            max_speed: 3.0,
            boost_factor: 4.0,
            cell_height: 2.0,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_speed_ramps_and_caps() {
        let mut s = Scheduler::new(&config());
        assert_eq!(s.base_speed(), 1.0);
        let mut last = s.base_speed();
        for _ in 0..100 {
            s.advance(0.1);
            while s.take_shift() {}
            assert!(s.base_speed() >= last);
            last = s.base_speed();
        }
        assert_eq!(s.base_speed(), 3.0);
    }

    #[test]
    fn test_one_cell_per_cell_height_of_progress() {
        let mut s = Scheduler::new(&config());
        s.advance(0.5);
        assert!(!s.take_shift());
        assert!((s.offset() - 1.0).abs() < 1e-6);
        s.advance(0.5);
        assert!(s.take_shift());
        assert!(!s.take_shift());
        assert!(s.offset() < 2.0);
    }

    #[test]
    fn test_large_delta_yields_multiple_shifts() {
        let mut s = Scheduler::new(&config());
        // 1.0 cells/s * 2.0 units * 3.5 s = 7 units = 3 cells + 1 unit
        s.advance(3.5);
        let mut shifts = 0;
        while s.take_shift() {
            shifts += 1;
        }
        assert_eq!(shifts, 3);
        assert!((s.offset() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_boost_is_idempotent_and_restores_ramped_speed() {
        let mut s = Scheduler::new(&config());
        s.advance(2.0);
        while s.take_shift() {}
        let ramped = s.speed();
        assert!(ramped > 1.0);
        s.set_boost(true);
        s.set_boost(true);
        assert_eq!(s.speed(), ramped * 4.0);
        s.set_boost(false);
        assert_eq!(s.speed(), ramped);
    }

    #[test]
    fn test_boost_keeps_accumulated_progress() {
        let mut s = Scheduler::new(&config());
        s.advance(0.25);
        let before = s.offset();
        s.set_boost(true);
        assert_eq!(s.offset(), before);
        s.set_boost(false);
        assert_eq!(s.offset(), before);
    }

    #[test]
    fn test_bad_delta_is_ignored() {
        let mut s = Scheduler::new(&config());
        s.advance(-1.0);
        s.advance(f32::NAN);
        assert_eq!(s.offset(), 0.0);
        assert_eq!(s.elapsed(), 0.0);
    }

    #[test]
    fn test_discard_pending_keeps_fraction() {
        let mut s = Scheduler::new(&config());
        s.advance(2.5);
        assert!(s.take_shift());
        s.discard_pending();
        assert!(!s.take_shift());
        assert!((s.offset() - 1.0).abs() < 1e-5);
    }
}
