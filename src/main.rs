//! Blockrise: a rising-blocks match-and-clear arcade game in the terminal.

mod anim;
mod app;
mod config;
mod game;
mod gravity;
mod grid;
mod group;
mod input;
mod scroll;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use config::{EngineConfig, Variant};
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let mut app = App::new(args, theme)?;
    app.run()?;
    Ok(())
}

/// The terminal belongs to the game, so logs only go to `--log-file`.
fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    log::info!("blockrise {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}

/// Rising-blocks match-and-clear game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockrise",
    version,
    about = "Rising-blocks match-and-clear game in the terminal. Clear groups of same-coloured blocks before the stack reaches the top.",
    long_about = "Blockrise is a terminal arcade game. Coloured blocks rise from the bottom. \
        Click (or move the cursor and press Enter on) a group of touching blocks of one colour \
        to clear it; blocks above fall into the gap. Bigger groups score quadratically more. \
        The game ends when a block reaches the top row.\n\n\
        CONTROLS:\n  Mouse click  Clear group      Arrows / hjkl  Move cursor\n  Enter / x    Clear group      Space          Boost (hold, or toggle)\n  P            Pause            N / R          New game\n  Q / Esc      Menu / quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme). Set RUST_LOG with --log-file for diagnostics."
)]
pub struct Args {
    /// Rule preset: classic (pairs clear, slow rise) or rush (triples clear, fast ramp).
    #[arg(short, long, default_value = "classic")]
    pub variant: Variant,

    /// Board width in columns.
    #[arg(long, value_name = "COLS", value_parser = clap::value_parser!(u16).range(8..=30))]
    pub width: Option<u16>,

    /// Board height in visible rows.
    #[arg(long, value_name = "ROWS", value_parser = clap::value_parser!(u16).range(10..=30))]
    pub height: Option<u16>,

    /// Number of block colours.
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u8).range(2..=7))]
    pub colors: Option<u8>,

    /// Smallest group that can be cleared.
    #[arg(long, value_name = "N")]
    pub min_group: Option<usize>,

    /// Filled rows at the start of a game.
    #[arg(long, value_name = "N")]
    pub seed_rows: Option<usize>,

    /// Random seed for reproducible games.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Speed multiplier while boosting.
    #[arg(long, value_name = "FACTOR")]
    pub boost: Option<f32>,

    /// Starting rise speed in rows per second.
    #[arg(long, value_name = "ROWS_PER_SEC")]
    pub speed: Option<f32>,

    /// Speed gained per second of play.
    #[arg(long, value_name = "RATE")]
    pub ramp: Option<f32>,

    /// Rise speed ceiling.
    #[arg(long, value_name = "ROWS_PER_SEC")]
    pub max_speed: Option<f32>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the built-in colours if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Write logs here (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Preset for `variant` with command-line overrides applied. `colors` (from the menu) wins
    /// over `--colors`.
    pub fn engine_config(&self, variant: Variant, colors: Option<u8>) -> EngineConfig {
        let mut cfg = EngineConfig::for_variant(variant);
        if let Some(w) = self.width {
            cfg.cols = usize::from(w);
        }
        if let Some(h) = self.height {
            cfg.rows = usize::from(h);
        }
        if let Some(n) = colors.or(self.colors) {
            cfg.num_colors = n;
        }
        if let Some(n) = self.min_group {
            cfg.min_group_size = n;
        }
        if let Some(n) = self.seed_rows {
            cfg.seed_rows = n;
        }
        if let Some(b) = self.boost {
            cfg.boost_factor = b;
        }
        if let Some(s) = self.speed {
            cfg.initial_speed = s;
        }
        if let Some(r) = self.ramp {
            cfg.speed_ramp_rate = r;
        }
        if let Some(m) = self.max_speed {
            cfg.max_speed = m;
        }
        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
