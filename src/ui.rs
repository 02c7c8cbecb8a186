//! Layout and drawing: menu, board, sidebar, toast, pause and game-over overlays. Also maps
//! terminal positions back to grid cells for mouse input.

use crate::anim::ease_out_cubic;
use crate::app::{MenuState, MenuTab, Screen, Toast};
use crate::config::Variant;
use crate::game::{Engine, Lifecycle};
use crate::theme::{Theme, shade};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal columns per grid cell.
pub const CELL_COLS: u16 = 2;
/// Vertical pixels per grid cell. Each terminal row holds two pixels (▀).
pub const CELL_PX: u16 = 2;

const SIDEBAR_WIDTH: u16 = 24;
/// Game-over dimming fade.
const GAME_OVER_FADE_MS: u32 = 800;
const MENU_SLIDE_MS: u32 = 500;

/// Everything the renderer reads for one frame.
pub struct View<'a> {
    pub screen: Screen,
    pub engine: &'a Engine,
    pub theme: &'a Theme,
    pub paused: bool,
    pub cursor: (usize, usize),
    pub toast: Option<&'a Toast>,
    pub menu: &'a MenuState,
    pub now: Instant,
    /// True when Space must be held (key release events available), false when it toggles.
    pub hold_boost: bool,
}

/// Board size in terminal cells, border included.
fn board_outer_size(engine: &Engine) -> (u16, u16) {
    let cfg = engine.config();
    let w = cfg.cols as u16 * CELL_COLS;
    let h = cfg.rows as u16 * CELL_PX / 2;
    (w + 2, h + 2)
}

/// (board outer, board inner, sidebar), centred in `area`.
fn layout(area: Rect, engine: &Engine) -> (Rect, Rect, Rect) {
    let (bw, bh) = board_outer_size(engine);
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    let outer = Rect {
        x,
        y,
        width: bw.min(area.width),
        height: bh.min(area.height),
    };
    let inner = Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    };
    let sidebar = Rect {
        x: outer.x + outer.width,
        y: outer.y,
        width: SIDEBAR_WIDTH.min(area.width.saturating_sub(outer.width)),
        height: outer.height,
    };
    (outer, inner, sidebar)
}

/// Inner board rect for the given frame area; matches what `draw` uses.
pub fn board_rect(area: Rect, engine: &Engine) -> Rect {
    layout(area, engine).1
}

/// Grid cell under terminal position `(column, row)`. `scroll_cells` is the sub-cell scroll
/// progress in cells; rows are drawn that far toward row 0.
pub fn cell_at(
    board: Rect,
    scroll_cells: f32,
    total_rows: usize,
    cols: usize,
    column: u16,
    row: u16,
) -> Option<(usize, usize)> {
    if column < board.x
        || row < board.y
        || column >= board.x + board.width
        || row >= board.y + board.height
    {
        return None;
    }
    let col = ((column - board.x) / CELL_COLS) as usize;
    // Middle of the terminal cell, in pixels.
    let y_px = f32::from(row - board.y) * 2.0 + 1.0;
    let grid_row = ((y_px + scroll_cells * f32::from(CELL_PX)) / f32::from(CELL_PX)).floor();
    if grid_row < 0.0 {
        return None;
    }
    let grid_row = grid_row as usize;
    (col < cols && grid_row < total_rows).then_some((grid_row, col))
}

pub fn draw(
    frame: &mut Frame,
    view: &View,
    game_over_effect: &mut Option<Effect>,
    effect_process_time: &mut Option<Instant>,
) {
    let area = frame.area();
    frame.buffer_mut().set_style(area, Style::default().bg(view.theme.bg));
    match view.screen {
        Screen::Menu => draw_menu(frame, view, area),
        Screen::Playing => {
            draw_game(frame, view, area);
            if view.paused {
                draw_pause_overlay(frame, view, area);
            }
        }
        Screen::GameOver => {
            draw_game(frame, view, area);
            apply_game_over_effect(frame, view, area, game_over_effect, effect_process_time);
            draw_game_over(frame, view, area);
        }
    }
}

fn draw_game(frame: &mut Frame, view: &View, area: Rect) {
    let (outer, inner, sidebar) = layout(area, view.engine);
    let theme = view.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Blockrise ", Style::default().fg(theme.title)));
    block.render(outer, frame.buffer_mut());
    draw_board(frame, view, inner);
    draw_sidebar(frame, view, sidebar);
    if let Some(toast) = view.toast {
        draw_toast(frame, theme, inner, toast);
    }
}

/// Paint blocks into a pixel buffer at `row - scroll + offset`, then emit half-blocks.
fn draw_board(frame: &mut Frame, view: &View, board: Rect) {
    let engine = view.engine;
    let theme = view.theme;
    let cfg = engine.config();
    let cell_h = cfg.cell_height;
    let (w_px, h_px) = (
        (cfg.cols as u16 * CELL_COLS) as usize,
        (cfg.rows as u16 * CELL_PX) as usize,
    );
    let mut pixels: Vec<Option<Color>> = vec![None; w_px * h_px];
    let scroll_cells = engine.scroll_offset() / cell_h;
    let show_cursor = engine.lifecycle() == Lifecycle::Active && !view.paused;

    for row in 0..engine.grid().rows() {
        for col in 0..cfg.cols {
            let visual = engine.cell_visual(row, col);
            let is_cursor = show_cursor && (row, col) == view.cursor;
            let base = match (visual.color, is_cursor) {
                (Some(id), true) => shade(theme.block_color(id), 1.35),
                (Some(id), false) => theme.block_color(id),
                (None, true) => theme.inactive_fg,
                (None, false) => continue,
            };
            let y = (row as f32 - scroll_cells + visual.offset / cell_h) * f32::from(CELL_PX);
            let y0 = y.round() as i32;
            for dy in 0..CELL_PX as i32 {
                let py = y0 + dy;
                if py < 0 || py >= h_px as i32 {
                    continue;
                }
                // Lit top edge, shaded bottom edge.
                let color = match dy {
                    0 => shade(base, 1.1),
                    d if d == CELL_PX as i32 - 1 => shade(base, 0.8),
                    _ => base,
                };
                let x0 = col * CELL_COLS as usize;
                for px in x0..x0 + CELL_COLS as usize {
                    pixels[py as usize * w_px + px] = Some(color);
                }
            }
        }
    }

    let buf = frame.buffer_mut();
    for ty in 0..h_px / 2 {
        for x in 0..w_px {
            let top = pixels[(ty * 2) * w_px + x].unwrap_or(theme.bg);
            let bot = pixels[(ty * 2 + 1) * w_px + x].unwrap_or(theme.bg);
            let (rx, ry) = (board.x + x as u16, board.y + ty as u16);
            if rx < board.x + board.width && ry < board.y + board.height {
                buf[(rx, ry)]
                    .set_symbol("▀")
                    .set_style(Style::default().fg(top).bg(bot));
            }
        }
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let engine = view.engine;
    let theme = view.theme;
    let cfg = engine.config();
    let stats = engine.stats();
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Score and stats
            Constraint::Length(4), // Speed gauge
            Constraint::Length(3), // Palette strip
            Constraint::Min(0),    // Controls
        ])
        .split(area);

    let secs = engine.elapsed() as u64;
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let lines = vec![
        stat("Score:   ", engine.score().to_string()),
        stat("Time:    ", format!("{:02}:{:02}", secs / 60, secs % 60)),
        stat("Clears:  ", stats.clears.to_string()),
        stat("Cleared: ", stats.blocks_cleared.to_string()),
        stat("Largest: ", stats.largest_group.to_string()),
        stat("Board:   ", engine.grid().occupied_count().to_string()),
    ];
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).border_style(border_style))
        .render(chunks[0], frame.buffer_mut());

    let speed_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(
            if engine.is_boosted() { " Speed  BOOST " } else { " Speed " },
            title_style,
        ));
    let speed_inner = speed_block.inner(chunks[1]);
    speed_block.render(chunks[1], frame.buffer_mut());
    let ratio = f64::from(engine.speed() / (cfg.max_speed * cfg.boost_factor)).clamp(0.0, 1.0);
    let bar_color = if engine.is_boosted() {
        Color::Red
    } else if ratio > 0.3 {
        Color::Yellow
    } else {
        Color::Green
    };
    let speed_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(speed_inner);
    Paragraph::new(Line::from(Span::styled(
        format!("{:.3} rows/s", engine.speed()),
        fg_style,
    )))
    .render(speed_rows[0], frame.buffer_mut());
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(bar_color))
        .render(speed_rows[1], frame.buffer_mut());

    let palette_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(
            format!(" Colours  min {} ", cfg.min_group_size),
            title_style,
        ));
    let strip = palette_block.inner(chunks[2]);
    palette_block.render(chunks[2], frame.buffer_mut());
    for id in 1..=cfg.num_colors {
        let x = strip.x + u16::from(id - 1) * 2;
        if x + 1 < strip.x + strip.width {
            let c = theme.block_color(id);
            frame
                .buffer_mut()
                .set_string(x, strip.y, "██", Style::default().fg(c).bg(theme.bg));
        }
    }

    let boost_hint = if view.hold_boost {
        "Space (hold) boost"
    } else {
        "Space  toggle boost"
    };
    let help = vec![
        Line::from(Span::styled("Click   clear group", dim_style)),
        Line::from(Span::styled("←↑↓→    move cursor", dim_style)),
        Line::from(Span::styled("Enter   clear group", dim_style)),
        Line::from(Span::styled(boost_hint, dim_style)),
        Line::from(Span::styled("P pause  N new game", dim_style)),
        Line::from(Span::styled("Q menu", dim_style)),
    ];
    Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL).border_style(border_style))
        .render(chunks[3], frame.buffer_mut());
}

fn draw_toast(frame: &mut Frame, theme: &Theme, board: Rect, toast: &Toast) {
    let text = format!(" {} ", toast.text);
    let w = (text.chars().count() as u16).min(board.width);
    let x = board.x + board.width.saturating_sub(w) / 2;
    // Drift up over its lifetime.
    let rise = (toast.age_ms / 400) as u16;
    let y = board.y + (board.height / 3).saturating_sub(rise);
    let style = Style::default()
        .fg(Color::Black)
        .bg(theme.title)
        .add_modifier(Modifier::BOLD);
    frame.buffer_mut().set_stringn(x, y, &text, w as usize, style);
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, view: &View, area: Rect) {
    let popup = centered(area, 28, 5);
    let theme = view.theme;
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P Resume   Q Menu ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

/// Dim the board once the game ends (TachyonFX fade, created on first use).
fn apply_game_over_effect(
    frame: &mut Frame,
    view: &View,
    area: Rect,
    effect: &mut Option<Effect>,
    process_time: &mut Option<Instant>,
) {
    let (outer, _, _) = layout(area, view.engine);
    let delta = process_time
        .map(|t| view.now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *process_time = Some(view.now);

    if effect.is_none() {
        let fg = shade(view.theme.bg, 1.8);
        let bg = shade(view.theme.bg, 1.3);
        *effect = Some(
            fx::fade_to(fg, bg, (GAME_OVER_FADE_MS, Interpolation::QuadOut)).with_area(outer),
        );
    }
    if let Some(effect) = effect {
        frame.render_effect(effect, outer, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_game_over(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let engine = view.engine;
    let stats = engine.stats();
    let popup = centered(area, 30, 11);
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Final score: {} ", engine.score()), fg)),
        Line::from(Span::styled(
            format!(" Clears: {}  Largest: {} ", stats.clears, stats.largest_group),
            fg,
        )),
        Line::from(Span::styled(format!(" Rows risen: {} ", stats.rows_spawned), fg)),
        Line::from(""),
        Line::from(Span::styled(" N New game    Q Menu ", fg)),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Blockrise ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_menu(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let menu = view.menu;
    let popup = centered(area, 48, 18);

    let highlight = Style::default()
        .fg(Color::Black)
        .bg(theme.title)
        .add_modifier(Modifier::BOLD);
    let selected = Style::default().fg(theme.title).add_modifier(Modifier::BOLD);
    let normal = Style::default().fg(theme.main_fg);
    let tab_style = |tab: MenuTab, is_selected: bool| {
        if menu.current_tab == tab && is_selected {
            highlight
        } else if is_selected {
            selected
        } else {
            normal
        }
    };

    let title = Line::from(vec![
        Span::styled(
            " Block",
            Style::default()
                .fg(theme.block_color(1))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "rise ",
            Style::default()
                .fg(theme.block_color(3))
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    let mut colour_spans = vec![Span::styled(
        format!(" {} ", menu.selected_colors),
        tab_style(MenuTab::Colors, true),
    )];
    colour_spans.push(Span::from("  "));
    for id in 1..=menu.selected_colors {
        let c = theme.block_color(id);
        colour_spans.push(Span::styled("█", Style::default().fg(c)));
    }

    let variants = [(Variant::Classic, " CLASSIC "), (Variant::Rush, " RUSH ")];
    let mut variant_spans = Vec::new();
    for (i, (v, label)) in variants.iter().enumerate() {
        if i > 0 {
            variant_spans.push(Span::from("  "));
        }
        variant_spans.push(Span::styled(
            *label,
            tab_style(MenuTab::Variant, menu.selected_variant == *v),
        ));
    }

    let start = Span::styled(" [ START ] ", tab_style(MenuTab::Start, true));
    let dim = Style::default().fg(theme.div_line);
    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(" ─ COLOURS ─ ", dim)),
        Line::from(colour_spans),
        Line::from(""),
        Line::from(Span::styled(" ─ VARIANT ─ ", dim)),
        Line::from(variant_spans),
        Line::from(""),
        Line::from(start),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", Style::default().fg(theme.block_color(3))),
            Span::from("SELECT   "),
            Span::styled(" ↔ ", Style::default().fg(theme.block_color(3))),
            Span::from("CHANGE   "),
            Span::styled(" ENTER ", Style::default().fg(theme.block_color(3))),
            Span::from("PLAY"),
        ]),
        Line::from(""),
        Line::from(Span::styled(" [Q] QUIT ", Style::default().fg(theme.block_color(1)))),
    ];

    // Slide in from below.
    let elapsed = view.now.saturating_duration_since(menu.animation_start).as_millis() as u32;
    let t = (elapsed as f32 / MENU_SLIDE_MS as f32).min(1.0);
    let lift = ((1.0 - ease_out_cubic(t)) * 10.0) as u16;
    let mut slid = popup;
    slid.y = (slid.y + lift).min(area.y + area.height.saturating_sub(slid.height));

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(slid, frame.buffer_mut());
}
