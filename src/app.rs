//! App: terminal init, main loop, frame timing, key and mouse handling.

use crate::Args;
use crate::config::{MAX_COLORS, Variant};
use crate::game::{Engine, Lifecycle, NotableEvent};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::{Context, Result};
use crossterm::event::{
    self, Event, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use log::{debug, error, info};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// How long a large-clear toast stays up.
const TOAST_MS: u32 = 2200;
const MIN_COLORS_MENU: u8 = 2;
/// Frame deltas above this are clamped so a stall does not fast-forward the stack.
const MAX_FRAME_SECS: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Colors,
    Variant,
    Start,
}

impl MenuTab {
    fn next(self) -> Self {
        match self {
            Self::Colors => Self::Variant,
            Self::Variant => Self::Start,
            Self::Start => Self::Colors,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Colors => Self::Start,
            Self::Variant => Self::Colors,
            Self::Start => Self::Variant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_colors: u8,
    pub selected_variant: Variant,
    pub animation_start: Instant,
}

impl MenuState {
    pub fn new(variant: Variant, colors: u8) -> Self {
        Self {
            current_tab: MenuTab::Start,
            selected_colors: colors.clamp(MIN_COLORS_MENU, MAX_COLORS),
            selected_variant: variant,
            animation_start: Instant::now(),
        }
    }

    /// Left/right on the current tab.
    fn change(&mut self, forward: bool) {
        match self.current_tab {
            MenuTab::Colors => {
                self.selected_colors = match (forward, self.selected_colors) {
                    (true, MAX_COLORS) => MIN_COLORS_MENU,
                    (true, n) => n + 1,
                    (false, MIN_COLORS_MENU) => MAX_COLORS,
                    (false, n) => n - 1,
                };
            }
            MenuTab::Variant => {
                self.selected_variant = match self.selected_variant {
                    Variant::Classic => Variant::Rush,
                    Variant::Rush => Variant::Classic,
                };
            }
            MenuTab::Start => {}
        }
    }
}

/// Short-lived message over the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub text: String,
    pub age_ms: u32,
}

impl Toast {
    fn for_event(event: &NotableEvent) -> Self {
        match event {
            NotableEvent::LargeClear {
                size,
                bonus,
                points,
            } => {
                debug!("large clear toast: {size} blocks, bonus {bonus}");
                Self {
                    text: format!("+{points} ({size} removed)"),
                    age_ms: 0,
                }
            }
        }
    }
}

/// Age `toast` by `ms`, dropping it once expired.
fn tick_toast(toast: &mut Option<Toast>, ms: u32) {
    if let Some(t) = toast {
        t.age_ms = t.age_ms.saturating_add(ms);
        if t.age_ms >= TOAST_MS {
            *toast = None;
        }
    }
}

/// Without key release events, holding Space auto-repeats presses. Presses closer together than
/// this count as one hold.
const BOOST_REPEAT_GAP: Duration = Duration::from_millis(650);

/// Swallows auto-repeated Space presses in toggle mode.
#[derive(Debug, Default)]
struct RepeatFilter {
    last_press: Option<Instant>,
}

impl RepeatFilter {
    /// True for a fresh press, false for a repeat of one still held.
    fn accept(&mut self, now: Instant) -> bool {
        let fresh = self
            .last_press
            .is_none_or(|t| now.saturating_duration_since(t) >= BOOST_REPEAT_GAP);
        self.last_press = Some(now);
        fresh
    }

    fn reset(&mut self) {
        self.last_press = None;
    }
}

/// Move `cursor` by `delta`, staying on the visible rows.
fn move_cursor(cursor: (usize, usize), delta: (isize, isize), rows: usize, cols: usize) -> (usize, usize) {
    let clamp = |v: usize, d: isize, len: usize| {
        v.saturating_add_signed(d).min(len.saturating_sub(1))
    };
    (clamp(cursor.0, delta.0, rows), clamp(cursor.1, delta.1, cols))
}

pub struct App {
    args: Args,
    theme: Theme,
    engine: Engine,
    screen: Screen,
    paused: bool,
    cursor: (usize, usize),
    /// Space is held (release events available) rather than toggled.
    hold_boost: bool,
    toast: Option<Toast>,
    boost_repeat: RepeatFilter,
    /// Inner board rect from the last draw, for mouse hit-testing.
    board: Rect,
    last_frame: Instant,
    /// TachyonFX fade over the board once the game ends.
    game_over_effect: Option<Effect>,
    game_over_effect_process_time: Option<Instant>,
    menu_state: MenuState,
}

impl App {
    pub fn new(args: Args, theme: Theme) -> Result<Self> {
        let config = args.engine_config(args.variant, None);
        let menu_state = MenuState::new(args.variant, config.num_colors);
        let engine = match args.seed {
            Some(seed) => Engine::with_seed(config, seed),
            None => Engine::new(config),
        }
        .context("invalid game configuration")?;
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let cursor = bottom_centre(&engine);
        Ok(Self {
            args,
            theme,
            engine,
            screen,
            paused: false,
            cursor,
            hold_boost: false,
            toast: None,
            boost_repeat: RepeatFilter::default(),
            board: Rect::default(),
            last_frame: Instant::now(),
            game_over_effect: None,
            game_over_effect_process_time: None,
            menu_state,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
                KeyboardEnhancementFlags,
                PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)
            .context("enter alternate screen")?;

        // Release events let Space work as a held boost.
        self.hold_boost = supports_keyboard_enhancement().unwrap_or(false);
        if self.hold_boost {
            let _ = execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            );
        }
        info!(
            "terminal ready, boost is {}",
            if self.hold_boost { "held" } else { "toggled" }
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        if self.hold_boost {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(
            std::io::stdout(),
            DisableFocusChange,
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.clamp(10.0, 240.0));
        self.last_frame = Instant::now();
        loop {
            let now = Instant::now();
            let dt = now.duration_since(self.last_frame);
            self.last_frame = now;

            if self.screen == Screen::Playing && !self.paused {
                self.tick(dt.as_secs_f32().min(MAX_FRAME_SECS));
            }
            tick_toast(&mut self.toast, dt.as_millis().min(u32::MAX as u128) as u32);

            let completed = terminal.draw(|f| {
                let view = crate::ui::View {
                    screen: self.screen,
                    engine: &self.engine,
                    theme: &self.theme,
                    paused: self.paused,
                    cursor: self.cursor,
                    toast: self.toast.as_ref(),
                    menu: &self.menu_state,
                    now,
                    hold_boost: self.hold_boost,
                };
                crate::ui::draw(
                    f,
                    &view,
                    &mut self.game_over_effect,
                    &mut self.game_over_effect_process_time,
                )
            })?;
            self.board = crate::ui::board_rect(completed.area, &self.engine);

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let keep_going = match event::read()? {
                        Event::Key(key) => self.on_key(key),
                        Event::Mouse(mouse) => {
                            self.on_mouse(mouse);
                            true
                        }
                        Event::FocusLost => {
                            self.on_focus_lost();
                            true
                        }
                        _ => true,
                    };
                    if !keep_going {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// No release event will arrive for a Space held while another window has focus.
    fn on_focus_lost(&mut self) {
        if self.hold_boost {
            self.engine.set_boost(false);
        }
        self.boost_repeat.reset();
    }

    fn tick(&mut self, dt: f32) {
        let report = self.engine.tick(dt);
        for event in &report.events {
            self.toast = Some(Toast::for_event(event));
        }
        if report.lifecycle == Lifecycle::GameOver {
            self.engine.set_boost(false);
            self.screen = Screen::GameOver;
            self.game_over_effect = None;
            self.game_over_effect_process_time = None;
        }
    }

    /// Returns false when the app should exit.
    fn on_key(&mut self, key: KeyEvent) -> bool {
        let action = key_to_action(key);
        match key.kind {
            KeyEventKind::Release => {
                if action == Action::Boost && self.hold_boost {
                    self.engine.set_boost(false);
                }
                return true;
            }
            // Only cursor movement auto-repeats.
            KeyEventKind::Repeat if action.cursor_delta().is_none() => return true,
            _ => {}
        }

        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return false,
                Action::CursorUp => self.menu_state.current_tab = self.menu_state.current_tab.prev(),
                Action::CursorDown => {
                    self.menu_state.current_tab = self.menu_state.current_tab.next()
                }
                Action::CursorLeft => self.menu_state.change(false),
                Action::CursorRight => self.menu_state.change(true),
                Action::Activate | Action::Boost | Action::NewGame => self.start_from_menu(),
                _ => {}
            },
            Screen::Playing if self.paused => match action {
                Action::Pause => self.paused = false,
                Action::NewGame => self.new_game(),
                Action::Quit => self.to_menu(),
                _ => {}
            },
            Screen::Playing => match action {
                Action::Quit => self.to_menu(),
                Action::Pause => {
                    self.engine.set_boost(false);
                    self.paused = true;
                }
                Action::NewGame => self.new_game(),
                Action::Activate => self.activate(self.cursor.0, self.cursor.1),
                Action::Boost if self.hold_boost => self.engine.set_boost(true),
                Action::Boost => {
                    if self.boost_repeat.accept(Instant::now()) {
                        let on = !self.engine.is_boosted();
                        self.engine.set_boost(on);
                    }
                }
                a => {
                    if let Some(delta) = a.cursor_delta() {
                        let cfg = self.engine.config();
                        self.cursor = move_cursor(self.cursor, delta, cfg.rows, cfg.cols);
                    }
                }
            },
            Screen::GameOver => match action {
                Action::NewGame | Action::Activate => self.new_game(),
                Action::Quit => self.to_menu(),
                _ => {}
            },
        }
        true
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        if self.screen != Screen::Playing || self.paused {
            return;
        }
        let MouseEvent {
            kind, column, row, ..
        } = mouse;
        if kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let cfg = self.engine.config();
        let scroll_cells = self.engine.scroll_offset() / cfg.cell_height;
        if let Some((r, c)) = crate::ui::cell_at(
            self.board,
            scroll_cells,
            cfg.total_rows(),
            cfg.cols,
            column,
            row,
        ) {
            self.cursor = (r.min(cfg.rows.saturating_sub(1)), c);
            self.activate(r, c);
        }
    }

    fn activate(&mut self, row: usize, col: usize) {
        match self.engine.handle_activation(row, col) {
            Ok(activation) if activation.removed() => {
                debug!(
                    "activation at ({row}, {col}): {activation:?}, falling: {}",
                    self.engine.is_animating()
                )
            }
            Ok(_) => {}
            Err(e) => debug!("activation ignored: {e}"),
        }
    }

    fn start_from_menu(&mut self) {
        if self.menu_state.current_tab != MenuTab::Start {
            self.menu_state.current_tab = MenuTab::Start;
            return;
        }
        let config = self
            .args
            .engine_config(self.menu_state.selected_variant, Some(self.menu_state.selected_colors));
        if let Err(e) = self.engine.reset(Some(config)) {
            error!("cannot start game: {e}");
            return;
        }
        self.enter_play();
    }

    fn new_game(&mut self) {
        if let Err(e) = self.engine.reset(None) {
            error!("cannot restart game: {e}");
            return;
        }
        self.enter_play();
    }

    fn enter_play(&mut self) {
        self.screen = Screen::Playing;
        self.paused = false;
        self.toast = None;
        self.cursor = bottom_centre(&self.engine);
        self.game_over_effect = None;
        self.game_over_effect_process_time = None;
    }

    fn to_menu(&mut self) {
        self.engine.set_boost(false);
        self.paused = false;
        self.toast = None;
        self.menu_state.animation_start = Instant::now();
        self.screen = Screen::Menu;
    }
}

fn bottom_centre(engine: &Engine) -> (usize, usize) {
    let cfg = engine.config();
    (cfg.rows.saturating_sub(1), cfg.cols / 2)
}
