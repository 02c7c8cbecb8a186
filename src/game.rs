//! Engine: owns grid, scheduler, animation and score for one game. The front-end drives it
//! with `tick`, `handle_activation` and `set_boost` and reads it back for drawing.

use crate::anim::Animator;
use crate::config::{ConfigError, EngineConfig};
use crate::grid::{Cell, Grid};
use crate::gravity;
use crate::group::collect_group;
use crate::scroll::Scheduler;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Points per removed block before bonus.
const POINTS_PER_BLOCK: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    GameOver,
}

/// Output signal for the UI (toast), not part of game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotableEvent {
    LargeClear { size: usize, bonus: u64, points: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub lifecycle: Lifecycle,
    /// Row shifts processed this frame.
    pub shifts: u32,
    pub events: Vec<NotableEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Removed {
        size: usize,
        points: u64,
        event: Option<NotableEvent>,
    },
    /// Empty cell, group too small, or game over.
    NoRemoval,
}

impl Activation {
    #[inline]
    pub fn removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

/// What the renderer needs for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellVisual {
    pub color: Option<u8>,
    /// Additive on the vertical axis; negative means drawn closer to row 0.
    pub offset: f32,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("cell ({row}, {col}) is outside the grid")]
    OutOfRange { row: usize, col: usize },
}

/// Per-game counters for the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub clears: u32,
    pub blocks_cleared: u64,
    pub largest_group: usize,
    pub rows_spawned: u64,
}

/// Bonus for a group of `n`: zero below `threshold`, else `floor((n - threshold + 1)^2 * factor)`.
pub fn bonus(n: usize, threshold: usize, factor: f32) -> u64 {
    if n < threshold {
        return 0;
    }
    let k = (n - threshold + 1) as f64;
    (k * k * f64::from(factor)).floor() as u64
}

/// `(bonus, total points)` for removing a group of `n`.
pub fn points_for(n: usize, config: &EngineConfig) -> (u64, u64) {
    let b = bonus(n, config.score_bonus_threshold, config.score_bonus_factor);
    (b, n as u64 * POINTS_PER_BLOCK + b)
}

fn random_row(rng: &mut StdRng, cols: usize, num_colors: u8) -> Vec<Cell> {
    (0..cols)
        .map(|_| Cell::Block(rng.gen_range(1..=num_colors)))
        .collect()
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    grid: Grid,
    anim: Animator,
    scheduler: Scheduler,
    rng: StdRng,
    score: u64,
    lifecycle: Lifecycle,
    pending_events: Vec<NotableEvent>,
    stats: Stats,
}

impl Engine {
    /// Validate `config` and start a new game with an entropy-seeded generator.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic engine: the same seed spawns the same rows.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut engine = Self {
            grid: Grid::new(config.total_rows(), config.cols),
            anim: Animator::new(&config),
            scheduler: Scheduler::new(&config),
            config,
            rng,
            score: 0,
            lifecycle: Lifecycle::Active,
            pending_events: Vec::new(),
            stats: Stats::default(),
        };
        engine.new_game();
        Ok(engine)
    }

    /// Start over. With `Some(config)` the new configuration is validated first; on error the
    /// running game is left untouched.
    pub fn reset(&mut self, config: Option<EngineConfig>) -> Result<(), ConfigError> {
        if let Some(config) = config {
            config.validate()?;
            self.grid = Grid::new(config.total_rows(), config.cols);
            self.anim = Animator::new(&config);
            self.config = config;
        }
        self.new_game();
        Ok(())
    }

    fn new_game(&mut self) {
        let (rows, cols, colors) = (self.config.rows, self.config.cols, self.config.num_colors);
        self.grid.clear();
        for i in 0..self.config.seed_rows {
            let row = random_row(&mut self.rng, cols, colors);
            self.grid.fill_row(rows - 1 - i, row);
        }
        for r in rows..self.config.total_rows() {
            let row = random_row(&mut self.rng, cols, colors);
            self.grid.fill_row(r, row);
        }
        self.anim.clear();
        self.scheduler = Scheduler::new(&self.config);
        self.score = 0;
        self.lifecycle = Lifecycle::Active;
        self.pending_events.clear();
        self.stats = Stats::default();
        info!(
            "new game: {}x{} (+{} buffer), {} colours, min group {}",
            cols, rows, self.config.buffer_rows, colors, self.config.min_group_size
        );
    }

    /// Advance scroll, spawn and animation by one frame of `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut shifts = 0;
        if self.lifecycle == Lifecycle::Active {
            self.scheduler.advance(dt);
            while self.scheduler.take_shift() {
                self.shift_and_spawn();
                shifts += 1;
                if self.grid.is_row_occupied(0) {
                    self.lifecycle = Lifecycle::GameOver;
                    self.scheduler.discard_pending();
                    info!(
                        "game over: score {}, {} clears, {:.1}s",
                        self.score,
                        self.stats.clears,
                        self.scheduler.elapsed()
                    );
                    break;
                }
            }
            if self.lifecycle == Lifecycle::Active {
                self.anim.advance(dt);
            }
        }
        TickReport {
            lifecycle: self.lifecycle,
            shifts,
            events: std::mem::take(&mut self.pending_events),
        }
    }

    fn shift_and_spawn(&mut self) {
        let (rng, colors) = (&mut self.rng, self.config.num_colors);
        self.grid
            .shift_and_spawn(|cols| random_row(rng, cols, colors));
        self.anim.shift();
        self.stats.rows_spawned += 1;
        debug!(
            "row shift #{} at {:.2} cells/s",
            self.stats.rows_spawned,
            self.scheduler.speed()
        );
    }

    /// Try to remove the group at `(row, col)`.
    pub fn handle_activation(&mut self, row: usize, col: usize) -> Result<Activation, EngineError> {
        if self.lifecycle == Lifecycle::GameOver {
            return Ok(Activation::NoRemoval);
        }
        if !self.grid.in_bounds(row, col) {
            warn!("activation at ({row}, {col}) outside {}x{}", self.grid.rows(), self.grid.cols());
            return Err(EngineError::OutOfRange { row, col });
        }
        let group = collect_group(&self.grid, row, col);
        if group.is_empty() || group.len() < self.config.min_group_size {
            return Ok(Activation::NoRemoval);
        }

        for &(r, c) in &group {
            self.grid.set(r, c, Cell::Empty);
            self.anim.take(r, c);
        }
        let cell_height = self.config.cell_height;
        for fall in gravity::resolve(&mut self.grid) {
            let carried = self
                .anim
                .take(fall.from_row, fall.col)
                .map(|m| m.offset())
                .unwrap_or(0.0);
            let start = -(fall.distance() as f32) * cell_height + carried;
            self.anim.launch(fall.to_row, fall.col, start);
        }

        let size = group.len();
        let (bonus, points) = points_for(size, &self.config);
        self.score += points;
        self.stats.clears += 1;
        self.stats.blocks_cleared += size as u64;
        self.stats.largest_group = self.stats.largest_group.max(size);
        debug!("removed {size} blocks at ({row}, {col}) for {points}");

        let event = (size >= self.config.large_clear_size).then(|| {
            info!("large clear: {size} blocks, +{points} (bonus {bonus})");
            NotableEvent::LargeClear {
                size,
                bonus,
                points,
            }
        });
        if let Some(e) = event {
            self.pending_events.push(e);
        }
        Ok(Activation::Removed {
            size,
            points,
            event,
        })
    }

    /// Boost is a level, not a toggle: repeated calls with the same value do nothing new.
    pub fn set_boost(&mut self, enabled: bool) {
        if self.scheduler.is_boosted() != enabled {
            debug!("boost {}", if enabled { "on" } else { "off" });
        }
        self.scheduler.set_boost(enabled);
    }

    #[inline]
    pub fn is_boosted(&self) -> bool {
        self.scheduler.is_boosted()
    }

    /// Panics if `(row, col)` is outside the grid.
    pub fn cell_visual(&self, row: usize, col: usize) -> CellVisual {
        CellVisual {
            color: self.grid.get(row, col).color(),
            offset: self.anim.offset(row, col),
        }
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Sub-cell scroll progress; every row is drawn this much closer to row 0.
    #[inline]
    pub fn scroll_offset(&self) -> f32 {
        self.scheduler.offset()
    }

    /// Current effective speed in cells per second.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.scheduler.speed()
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.scheduler.elapsed()
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// True while any fall is still easing in.
    #[inline]
    pub fn is_animating(&self) -> bool {
        !self.anim.is_settled()
    }

    #[cfg(test)]
    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variant;

    fn small_config(cols: usize, rows: usize) -> EngineConfig {
        EngineConfig {
            cols,
            rows,
            buffer_rows: 0,
            num_colors: 3,
            min_group_size: 2,
            seed_rows: 0,
            initial_speed: 1.0,
            speed_ramp_rate: 0.0,
            max_speed: 1.0,
            ..EngineConfig::default()
        }
    }

    fn fill(engine: &mut Engine, lines: &[&str]) {
        let g = engine.grid_mut();
        g.clear();
        for (r, line) in lines.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                if let Some(d) = ch.to_digit(10) {
                    g.set(r, c, Cell::Block(d as u8));
                }
            }
        }
    }

    #[test]
    fn test_bonus_formulas() {
        assert_eq!(bonus(3, 4, 5.0), 0);
        assert_eq!(bonus(4, 4, 5.0), 5);
        assert_eq!(bonus(16, 4, 5.0), 845);
        // (n - 2)^2 * 2 from three blocks
        assert_eq!(bonus(2, 3, 2.0), 0);
        assert_eq!(bonus(3, 3, 2.0), 2);
        assert_eq!(bonus(7, 3, 2.0), 50);
    }

    #[test]
    fn test_full_single_colour_board_scores_1005() {
        let cfg = EngineConfig {
            num_colors: 2,
            ..small_config(4, 4)
        };
        let mut e = Engine::with_seed(cfg, 1).unwrap();
        fill(&mut e, &["1111", "1111", "1111", "1111"]);
        let result = e.handle_activation(2, 1).unwrap();
        assert_eq!(
            result,
            Activation::Removed {
                size: 16,
                points: 1005,
                event: None
            }
        );
        assert_eq!(e.score(), 1005);
        assert_eq!(e.grid().occupied_count(), 0);
    }

    #[test]
    fn test_empty_cell_is_noop() {
        let mut e = Engine::with_seed(small_config(4, 4), 1).unwrap();
        fill(&mut e, &["....", "....", "11..", "12.."]);
        let before = e.grid().clone();
        assert_eq!(e.handle_activation(0, 0).unwrap(), Activation::NoRemoval);
        assert_eq!(e.score(), 0);
        assert_eq!(e.grid(), &before);
    }

    #[test]
    fn test_group_below_minimum_leaves_grid_unchanged() {
        let cfg = EngineConfig {
            min_group_size: 3,
            ..small_config(4, 4)
        };
        let mut e = Engine::with_seed(cfg, 1).unwrap();
        fill(&mut e, &["....", "....", "11..", "23.."]);
        let before = e.grid().clone();
        assert_eq!(e.handle_activation(2, 0).unwrap(), Activation::NoRemoval);
        assert_eq!(e.grid(), &before);
        assert_eq!(e.score(), 0);
    }

    #[test]
    fn test_removal_applies_gravity_and_animates() {
        let mut e = Engine::with_seed(small_config(3, 4), 1).unwrap();
        fill(&mut e, &["2..", "3..", "11.", "12."]);
        let result = e.handle_activation(3, 0).unwrap();
        assert_eq!(
            result,
            Activation::Removed {
                size: 3,
                points: 30,
                event: None
            }
        );
        assert!(gravity::is_compact(e.grid()));
        assert_eq!(e.grid().get(3, 0), Cell::Block(3));
        assert_eq!(e.grid().get(2, 0), Cell::Block(2));
        assert_eq!(e.grid().get(3, 1), Cell::Block(2));
        // both blocks in column 0 fell two rows
        assert_eq!(e.cell_visual(3, 0).offset, -2.0);
        assert_eq!(e.cell_visual(2, 0).offset, -2.0);
        assert_eq!(e.cell_visual(3, 1).offset, 0.0);
        assert!(e.is_animating());
        // animation never changes logical cells
        let logical = e.grid().clone();
        for _ in 0..20 {
            e.anim.advance(0.1);
        }
        assert_eq!(e.grid(), &logical);
        assert_eq!(e.cell_visual(3, 0).offset, 0.0);
        assert!(!e.is_animating());
    }

    #[test]
    fn test_tick_relaxes_fall_offsets() {
        let cfg = EngineConfig {
            initial_speed: 0.1,
            max_speed: 0.1,
            ..small_config(3, 4)
        };
        let mut e = Engine::with_seed(cfg, 1).unwrap();
        fill(&mut e, &["2..", "3..", "11.", "12."]);
        e.handle_activation(3, 0).unwrap();
        assert_eq!(e.cell_visual(3, 0).offset, -2.0);

        let report = e.tick(0.05);
        assert_eq!(report.shifts, 0);
        let mid = e.cell_visual(3, 0).offset;
        assert!(mid > -2.0 && mid < 0.0, "offset {mid}");
        for _ in 0..9 {
            e.tick(0.05);
        }
        assert_eq!(e.cell_visual(3, 0).offset, 0.0);
        assert_eq!(e.cell_visual(2, 0).offset, 0.0);
        assert!(!e.is_animating());
        assert_eq!(e.grid().get(3, 0), Cell::Block(3));
    }

    #[test]
    fn test_offsets_freeze_after_game_over() {
        let mut e = Engine::with_seed(small_config(3, 4), 1).unwrap();
        fill(&mut e, &["...", "2.3", "112", "123"]);
        e.handle_activation(2, 0).unwrap();
        assert_eq!(e.cell_visual(3, 0).offset, -2.0);

        // the full third column reaches row 0 on the first shift
        let report = e.tick(1.0);
        assert_eq!(report.shifts, 1);
        assert_eq!(report.lifecycle, Lifecycle::GameOver);
        // the falling block moved up with its row and kept its offset
        assert_eq!(e.grid().get(2, 0), Cell::Block(2));
        assert_eq!(e.cell_visual(2, 0).offset, -2.0);
        e.tick(5.0);
        assert_eq!(e.cell_visual(2, 0).offset, -2.0);
        assert!(e.is_animating());
    }

    #[test]
    fn test_score_never_decreases() {
        let cfg = EngineConfig {
            seed_rows: 6,
            ..small_config(6, 6)
        };
        let mut e = Engine::with_seed(cfg, 3).unwrap();
        assert_eq!(e.grid().occupied_count(), 36);
        let mut last = 0;
        for r in 0..6 {
            for c in 0..6 {
                e.handle_activation(r, c).unwrap();
                assert!(e.score() >= last);
                last = e.score();
            }
        }
    }

    #[test]
    fn test_large_clear_emits_event_once() {
        let cfg = EngineConfig {
            num_colors: 2,
            large_clear_size: 20,
            ..small_config(5, 4)
        };
        let mut e = Engine::with_seed(cfg, 1).unwrap();
        fill(&mut e, &["11111", "11111", "11111", "11111"]);
        let (bonus, points) = points_for(20, e.config());
        let expected = NotableEvent::LargeClear {
            size: 20,
            bonus,
            points,
        };
        let result = e.handle_activation(0, 0).unwrap();
        assert_eq!(
            result,
            Activation::Removed {
                size: 20,
                points,
                event: Some(expected)
            }
        );
        assert_eq!(e.tick(0.0).events, vec![expected]);
        assert!(e.tick(0.0).events.is_empty());
    }

    #[test]
    fn test_out_of_range_activation_is_error() {
        let mut e = Engine::with_seed(small_config(4, 4), 1).unwrap();
        assert_eq!(
            e.handle_activation(4, 0),
            Err(EngineError::OutOfRange { row: 4, col: 0 })
        );
    }

    #[test]
    fn test_shift_into_boundary_row_ends_game() {
        let mut e = Engine::with_seed(small_config(3, 4), 1).unwrap();
        fill(&mut e, &["...", "1..", "12.", "123"]);
        let report = e.tick(1.0);
        assert_eq!(report.shifts, 1);
        assert_eq!(report.lifecycle, Lifecycle::GameOver);
        assert_eq!(e.lifecycle(), Lifecycle::GameOver);

        // frozen until reset
        let frozen = e.grid().clone();
        let score = e.score();
        assert_eq!(e.tick(5.0).shifts, 0);
        assert_eq!(e.handle_activation(2, 0).unwrap(), Activation::NoRemoval);
        assert_eq!(e.grid(), &frozen);
        assert_eq!(e.score(), score);

        e.reset(None).unwrap();
        assert_eq!(e.lifecycle(), Lifecycle::Active);
        assert_eq!(e.score(), 0);
        assert_eq!(e.scroll_offset(), 0.0);
    }

    #[test]
    fn test_catch_up_checks_game_over_after_each_shift() {
        let mut e = Engine::with_seed(small_config(2, 5), 1).unwrap();
        fill(&mut e, &["..", "..", "1.", "..", ".."]);
        // three cells of progress, but the block reaches row 0 after the second
        let report = e.tick(3.0);
        assert_eq!(report.shifts, 2);
        assert_eq!(report.lifecycle, Lifecycle::GameOver);
        assert!(e.scroll_offset() < e.config().cell_height);
    }

    #[test]
    fn test_shifts_keep_structure() {
        let mut e = Engine::with_seed(small_config(3, 6), 9).unwrap();
        fill(&mut e, &["...", "...", "...", "1..", "12.", "123"]);
        let before = e.grid().clone();
        let report = e.tick(2.0);
        assert_eq!(report.shifts, 2);
        assert_eq!(report.lifecycle, Lifecycle::Active);
        for r in 0..4 {
            assert_eq!(e.grid().row(r), before.row(r + 2));
        }
        for r in 4..6 {
            assert!(e.grid().row(r).iter().all(|c| matches!(c, Cell::Block(1..=3))));
        }
    }

    #[test]
    fn test_shift_carries_fall_offsets() {
        let mut e = Engine::with_seed(small_config(2, 6), 1).unwrap();
        fill(&mut e, &["..", "..", "..", "2.", "11", "21"]);
        e.handle_activation(4, 0).unwrap();
        // column 0: the 2 at row 3 fell one row onto the 2 at row 5
        assert_eq!(e.grid().get(4, 0), Cell::Block(2));
        let offset = e.cell_visual(4, 0).offset;
        assert_eq!(offset, -1.0);
        e.scheduler.advance(1.0);
        assert!(e.scheduler.take_shift());
        e.shift_and_spawn();
        assert_eq!(e.grid().get(3, 0), Cell::Block(2));
        assert_eq!(e.cell_visual(3, 0).offset, offset);
        assert_eq!(e.cell_visual(4, 0).offset, 0.0);
    }

    #[test]
    fn test_boost_speeds_up_and_restores() {
        let cfg = EngineConfig {
            speed_ramp_rate: 0.1,
            max_speed: 10.0,
            boost_factor: 3.0,
            ..small_config(3, 30)
        };
        let mut e = Engine::with_seed(cfg, 1).unwrap();
        e.tick(2.0);
        let ramped = e.speed();
        e.set_boost(true);
        e.set_boost(true);
        assert!(e.is_boosted());
        assert!((e.speed() - ramped * 3.0).abs() < 1e-6);
        e.set_boost(false);
        assert_eq!(e.speed(), ramped);
        assert!(ramped > 1.0);
    }

    #[test]
    fn test_new_game_seeds_bottom_and_buffer_rows() {
        let cfg = EngineConfig::for_variant(Variant::Classic);
        let e = Engine::with_seed(cfg.clone(), 42).unwrap();
        let grid = e.grid();
        assert_eq!(grid.rows(), cfg.total_rows());
        for r in 0..cfg.total_rows() {
            let seeded = r >= cfg.rows - cfg.seed_rows;
            assert_eq!(grid.is_row_occupied(r), seeded, "row {r}");
            for &cell in grid.row(r) {
                if let Cell::Block(c) = cell {
                    assert!((1..=cfg.num_colors).contains(&c));
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_game() {
        let cfg = EngineConfig::for_variant(Variant::Rush);
        let a = Engine::with_seed(cfg.clone(), 5).unwrap();
        let b = Engine::with_seed(cfg, 5).unwrap();
        assert_eq!(a.grid(), b.grid());
    }

    #[test]
    fn test_reset_with_bad_config_keeps_game() {
        let mut e = Engine::with_seed(small_config(4, 4), 1).unwrap();
        fill(&mut e, &["....", "....", "....", "11.."]);
        e.handle_activation(3, 0).unwrap();
        let bad = EngineConfig {
            num_colors: 9,
            ..small_config(4, 4)
        };
        assert_eq!(e.reset(Some(bad)), Err(ConfigError::InvalidColors(9)));
        assert_eq!(e.score(), 20);

        e.reset(Some(small_config(6, 8))).unwrap();
        assert_eq!((e.grid().rows(), e.grid().cols()), (8, 6));
        assert_eq!(e.score(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let cfg = EngineConfig {
            rows: 1,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(cfg),
            Err(ConfigError::InvalidDimensions { .. })
        ));
    }
}
