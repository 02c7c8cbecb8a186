//! Engine configuration: grid size, palette, speed curve, scoring and animation tuning.

use clap::ValueEnum;
use thiserror::Error;

/// Largest palette the renderer knows colours for.
pub const MAX_COLORS: u8 = 7;
/// Smallest grid that still plays (groups need a neighbour, the stack needs room to rise).
pub const MIN_COLS: usize = 2;
pub const MIN_ROWS: usize = 2;

/// Tuned presets. The game logic is identical; only the numbers differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Variant {
    /// Pairs clear, slow rise, big quadratic bonus from 4 blocks.
    #[default]
    Classic,
    /// Triples clear, faster ramp, strong boost, gentler bonus from 3 blocks.
    Rush,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid must be at least 2x2, got {cols}x{rows}")]
    InvalidDimensions { cols: usize, rows: usize },
    #[error("number of colours must be in 2..=7, got {0}")]
    InvalidColors(u8),
    #[error("minimum group size must be at least 1, got {0}")]
    InvalidGroupSize(usize),
    #[error("invalid speed curve: {0}")]
    InvalidSpeed(&'static str),
    #[error("boost factor must be finite and >= 1, got {0}")]
    InvalidBoost(f32),
    #[error("invalid bonus: {0}")]
    InvalidBonus(&'static str),
    #[error("seed rows ({seed_rows}) exceed visible rows ({rows})")]
    InvalidSeedRows { seed_rows: usize, rows: usize },
    #[error("buffer rows must be 0 or 1, got {0}")]
    InvalidBufferRows(usize),
    #[error("invalid animation tuning: {0}")]
    InvalidAnimation(&'static str),
}

/// Everything the engine needs to run one game. Speeds are in cells per second.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub cols: usize,
    /// Visible rows; row 0 is the boundary row.
    pub rows: usize,
    /// Off-screen rows below the visible field that scroll in (0 or 1).
    pub buffer_rows: usize,
    pub num_colors: u8,
    pub min_group_size: usize,
    /// Visible bottom rows filled on a new game.
    pub seed_rows: usize,
    pub initial_speed: f32,
    /// Speed gained per second of play.
    pub speed_ramp_rate: f32,
    /// Ceiling of the ramped speed (the shift interval never drops below `1 / max_speed`).
    pub max_speed: f32,
    pub boost_factor: f32,
    pub score_bonus_threshold: usize,
    pub score_bonus_factor: f32,
    /// Group size at which a notable event is emitted.
    pub large_clear_size: usize,
    /// Height of one cell in offset units.
    pub cell_height: f32,
    /// Fall animation time per cell of distance.
    pub fall_secs_per_cell: f32,
    pub min_fall_secs: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_variant(Variant::Classic)
    }
}

impl EngineConfig {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Classic => Self {
                cols: 16,
                rows: 20,
                buffer_rows: 1,
                num_colors: 5,
                min_group_size: 2,
                seed_rows: 4,
                // 0.0625 * 0.35 cells/s at start, +0.0625 * 0.0075 per second.
                initial_speed: 0.021_875,
                speed_ramp_rate: 0.000_468_75,
                max_speed: 1.5,
                boost_factor: 2.4,
                score_bonus_threshold: 4,
                score_bonus_factor: 5.0,
                large_clear_size: 20,
                cell_height: 1.0,
                fall_secs_per_cell: 0.07,
                min_fall_secs: 0.12,
            },
            Variant::Rush => Self {
                cols: 12,
                rows: 18,
                buffer_rows: 1,
                num_colors: 4,
                min_group_size: 3,
                seed_rows: 5,
                initial_speed: 0.12,
                speed_ramp_rate: 0.004,
                max_speed: 2.5,
                boost_factor: 20.0,
                score_bonus_threshold: 3,
                score_bonus_factor: 2.0,
                large_clear_size: 20,
                cell_height: 1.0,
                fall_secs_per_cell: 0.05,
                min_fall_secs: 0.1,
            },
        }
    }

    /// Rows stored in the grid, including the buffer row.
    #[inline]
    pub fn total_rows(&self) -> usize {
        self.rows + self.buffer_rows
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cols < MIN_COLS || self.rows < MIN_ROWS {
            return Err(ConfigError::InvalidDimensions {
                cols: self.cols,
                rows: self.rows,
            });
        }
        if !(2..=MAX_COLORS).contains(&self.num_colors) {
            return Err(ConfigError::InvalidColors(self.num_colors));
        }
        if self.min_group_size == 0 {
            return Err(ConfigError::InvalidGroupSize(self.min_group_size));
        }
        if self.buffer_rows > 1 {
            return Err(ConfigError::InvalidBufferRows(self.buffer_rows));
        }
        if self.seed_rows > self.rows {
            return Err(ConfigError::InvalidSeedRows {
                seed_rows: self.seed_rows,
                rows: self.rows,
            });
        }
        if !(self.initial_speed.is_finite() && self.initial_speed > 0.0) {
            return Err(ConfigError::InvalidSpeed("initial speed must be positive"));
        }
        if !(self.speed_ramp_rate.is_finite() && self.speed_ramp_rate >= 0.0) {
            return Err(ConfigError::InvalidSpeed("ramp rate must be non-negative"));
        }
        if !(self.max_speed.is_finite() && self.max_speed >= self.initial_speed) {
            return Err(ConfigError::InvalidSpeed("max speed must be >= initial speed"));
        }
        if !(self.boost_factor.is_finite() && self.boost_factor >= 1.0) {
            return Err(ConfigError::InvalidBoost(self.boost_factor));
        }
        if self.score_bonus_threshold == 0 {
            return Err(ConfigError::InvalidBonus("threshold must be at least 1"));
        }
        if !(self.score_bonus_factor.is_finite() && self.score_bonus_factor >= 0.0) {
            return Err(ConfigError::InvalidBonus("factor must be non-negative"));
        }
        if !(self.cell_height.is_finite() && self.cell_height > 0.0) {
            return Err(ConfigError::InvalidAnimation("cell height must be positive"));
        }
        if !(self.fall_secs_per_cell.is_finite() && self.fall_secs_per_cell >= 0.0) {
            return Err(ConfigError::InvalidAnimation("fall time per cell must be non-negative"));
        }
        if !(self.min_fall_secs.is_finite() && self.min_fall_secs > 0.0) {
            return Err(ConfigError::InvalidAnimation("minimum fall time must be positive"));
        }
        Ok(())
    }
}
