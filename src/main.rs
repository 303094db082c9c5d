mod components;
mod cone;
mod game;
mod level;
mod monster;
mod player;
mod settings;

use anyhow::Context;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use crossterm::{ExecutableCommand, QueueableCommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, Stdout, Write};
use std::thread;
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthStr;

use crate::components::Dir;
use crate::cone::{Frame, Pixel, Viewport};
use crate::game::{FrameInput, Game};
use crate::level::{LevelGrid, Tile};
use crate::settings::Settings;

/// Terminal columns used per grid cell.
const CELL_W: usize = 2;
const HALF_BLOCK: &str = "▀";
/// How long a direction stays held after its last press or repeat event.
const INPUT_HOLD_MS: u64 = 160;

/// Two vertical pixel samples shown by one terminal column.
#[derive(Clone, Copy, PartialEq)]
struct Cell {
    top: Color,
    bottom: Color,
}

/// Terminals only report presses and repeats, so a direction counts as held
/// while its last event is recent enough.
#[derive(Default)]
struct HeldKeys {
    last_seen: [Option<Instant>; 4],
}

impl HeldKeys {
    fn press(&mut self, dir: Dir, now: Instant) {
        self.last_seen[dir.index()] = Some(now);
    }

    fn active(&self, now: Instant) -> [bool; 4] {
        let hold = Duration::from_millis(INPUT_HOLD_MS);
        self.last_seen
            .map(|seen| seen.is_some_and(|t| now.saturating_duration_since(t) <= hold))
    }
}

struct Renderer {
    last: Vec<Cell>,
    last_hud: String,
    last_title: String,
    last_game_over: bool,
    needs_full: bool,
    origin_x: u16,
    origin_y: u16,
}

impl Renderer {
    fn new(width: usize, height: usize) -> Self {
        Self {
            last: vec![
                Cell {
                    top: Color::Reset,
                    bottom: Color::Reset,
                };
                width * height * CELL_W
            ],
            last_hud: String::new(),
            last_title: String::new(),
            last_game_over: false,
            needs_full: true,
            origin_x: 0,
            origin_y: 1,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let _log_guard = init_logging(&settings)?;
    tracing::info!(?settings, "starting flashlight");

    let viewport = settings.viewport();
    let grid = match &settings.level_file {
        Some(path) => LevelGrid::load(path, viewport.grid_width(), viewport.grid_height())
            .context("failed to load level")?,
        None => LevelGrid::generate(settings.pattern, viewport.grid_width(), viewport.grid_height()),
    };
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let game = Game::new(&settings, grid, &mut rng);

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableMouseCapture)?;
    stdout.execute(Hide)?;

    let result = run(&mut stdout, game, settings.fps);

    stdout.execute(Show)?;
    stdout.execute(DisableMouseCapture)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    if let Err(err) = &result {
        tracing::error!("{err:#}");
    }
    tracing::info!("exiting");
    result
}

/// Raw mode owns the terminal, so log lines go to a daily file instead.
fn init_logging(settings: &Settings) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(&settings.log_dir)
        .with_context(|| format!("failed to create log dir {}", settings.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&settings.log_dir, "flashlight.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(non_blocking)
        .init();
    Ok(guard)
}

fn run(stdout: &mut Stdout, mut game: Game, fps: u64) -> anyhow::Result<()> {
    let viewport = *game.viewport();
    let mut renderer = Renderer::new(viewport.grid_width(), viewport.grid_height());
    let frame_time = Duration::from_micros(1_000_000 / fps.max(1));
    let mut last_frame = Instant::now();
    let mut keys = HeldKeys::default();

    loop {
        let frame_start = Instant::now();
        let mut input = FrameInput::default();
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) => {
                    if handle_key(key, &mut input, &mut keys, Instant::now()) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(pixel) = mouse_to_pixel(&mouse, &renderer, &viewport) {
                        input.mouse = Some(pixel);
                    }
                }
                Event::Resize(_, _) => renderer.needs_full = true,
                _ => {}
            }
        }
        input.held = keys.active(Instant::now());

        let dt = last_frame.elapsed().as_secs_f32();
        last_frame = Instant::now();
        let outcome = game.update(&input, dt);
        if outcome.damage > 0 {
            tracing::debug!(
                damage = outcome.damage,
                health = game.player.health,
                "player hit"
            );
        }
        if outcome.chased {
            tracing::trace!(visible = outcome.visible_monsters, "monsters moved");
        }
        render(stdout, &game, &mut renderer)?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame_time {
            thread::sleep(frame_time - elapsed);
        }
    }
}

/// Records a key press into `input` and `keys`; returns true when the player quits.
fn handle_key(key: KeyEvent, input: &mut FrameInput, keys: &mut HeldKeys, now: Instant) -> bool {
    match key.kind {
        KeyEventKind::Press | KeyEventKind::Repeat => {}
        _ => return false,
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Right | KeyCode::Char('d' | 'D') => keys.press(Dir::Right, now),
        KeyCode::Left | KeyCode::Char('a' | 'A') => keys.press(Dir::Left, now),
        KeyCode::Up | KeyCode::Char('w' | 'W') => keys.press(Dir::Up, now),
        KeyCode::Down | KeyCode::Char('s' | 'S') => keys.press(Dir::Down, now),
        KeyCode::Char('[') => input.rotate -= 1,
        KeyCode::Char(']') => input.rotate += 1,
        KeyCode::Char('m') => input.toggle_aim = !input.toggle_aim,
        _ => {}
    }
    false
}

/// Maps a terminal cell to the screen pixel at the centre of the area it shows.
fn mouse_to_pixel(mouse: &MouseEvent, renderer: &Renderer, viewport: &Viewport) -> Option<(i32, i32)> {
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Down(_) => {}
        _ => return None,
    }
    let col = mouse.column as i32 - renderer.origin_x as i32;
    let row = mouse.row as i32 - renderer.origin_y as i32;
    let cell_px = viewport.cell_px as i32;
    let cell_w = CELL_W as i32;
    let cell_x = col.div_euclid(cell_w);
    let sub = col.rem_euclid(cell_w);
    let x = cell_x * cell_px + (2 * sub + 1) * cell_px / (2 * cell_w);
    let y = row * cell_px + cell_px / 2;
    Some((x, y))
}

fn render(stdout: &mut Stdout, game: &Game, renderer: &mut Renderer) -> anyhow::Result<()> {
    let viewport = game.viewport();
    let grid_w = viewport.grid_width();
    let grid_h = viewport.grid_height();
    let needed_h = u16::try_from(grid_h + 2).context("board too tall for a terminal")?;
    let needed_w = u16::try_from(grid_w * CELL_W).context("board too wide for a terminal")?;

    let title = game.title();
    if title != renderer.last_title {
        stdout.queue(SetTitle(&title))?;
        renderer.last_title = title;
    }

    stdout.queue(MoveTo(0, 0))?;

    let (term_w, term_h) = terminal::size()?;
    if term_w < needed_w || term_h < needed_h {
        stdout.queue(Clear(ClearType::All))?;
        let msg = format!(
            "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
            needed_w, needed_h, term_w, term_h
        );
        stdout.queue(Print(msg))?;
        stdout.flush()?;
        renderer.needs_full = true;
        return Ok(());
    }

    let origin_x = (term_w - needed_w) / 2;
    let origin_y = (term_h - needed_h) / 2 + 1;
    if origin_x != renderer.origin_x || origin_y != renderer.origin_y {
        renderer.origin_x = origin_x;
        renderer.origin_y = origin_y;
        renderer.needs_full = true;
    }
    if renderer.needs_full {
        stdout.queue(Clear(ClearType::All))?;
    }

    let hud = format!(
        "Pos: ({}, {})  Health: {}  Aim: {}  (arrows/wasd move, [ ] turn, m aim, q quit)",
        game.player.pos.x,
        game.player.pos.y,
        game.player.health,
        game.aim.label()
    );
    if renderer.needs_full || hud != renderer.last_hud {
        stdout.queue(MoveTo(renderer.origin_x, renderer.origin_y - 1))?;
        stdout.queue(SetForegroundColor(Color::White))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        stdout.queue(Print(fit_width(&hud, needed_w as usize)))?;
        stdout.queue(ResetColor)?;
        renderer.last_hud = hud;
    }

    let frame = game.frame();
    for y in 0..grid_h {
        for x in 0..grid_w {
            for sub in 0..CELL_W {
                let cell = sample_cell(frame, viewport, x, y, sub);
                let idx = (y * grid_w + x) * CELL_W + sub;
                if renderer.needs_full || cell != renderer.last[idx] {
                    renderer.last[idx] = cell;
                    draw_cell(stdout, renderer, x * CELL_W + sub, y, cell)?;
                }
            }
        }
    }

    let game_over = game.is_over();
    if renderer.needs_full || game_over != renderer.last_game_over {
        stdout.queue(MoveTo(renderer.origin_x, renderer.origin_y + grid_h as u16))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        if game_over {
            stdout.queue(SetForegroundColor(Color::Red))?;
            stdout.queue(Print("GAME OVER"))?;
            stdout.queue(ResetColor)?;
        }
        renderer.last_game_over = game_over;
    }
    renderer.needs_full = false;

    stdout.flush()?;
    Ok(())
}

fn sample_cell(frame: &Frame, viewport: &Viewport, x: usize, y: usize, sub: usize) -> Cell {
    let cell_px = viewport.cell_px;
    let px = x * cell_px + (2 * sub + 1) * cell_px / (2 * CELL_W);
    let top = y * cell_px + cell_px / 4;
    let bottom = y * cell_px + (3 * cell_px) / 4;
    Cell {
        top: pixel_color(frame.get(px, top)),
        bottom: pixel_color(frame.get(px, bottom)),
    }
}

fn pixel_color(pixel: Option<Pixel>) -> Color {
    match pixel {
        Some(Pixel::Player) => Color::Red,
        Some(Pixel::Monster) => Color::Green,
        Some(Pixel::Lit(Tile::Wall)) => Color::White,
        Some(Pixel::Lit(Tile::Floor)) => Color::Grey,
        Some(Pixel::Dark) | None => Color::Black,
    }
}

fn draw_cell(stdout: &mut Stdout, renderer: &Renderer, col: usize, row: usize, cell: Cell) -> io::Result<()> {
    let x_pos = renderer.origin_x + col as u16;
    let y_pos = renderer.origin_y + row as u16;
    stdout.queue(MoveTo(x_pos, y_pos))?;
    stdout.queue(SetForegroundColor(cell.top))?;
    stdout.queue(SetBackgroundColor(cell.bottom))?;
    stdout.queue(Print(HALF_BLOCK))?;
    stdout.queue(ResetColor)?;
    Ok(())
}

/// Truncates `text` to at most `width` display columns.
fn fit_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        let mut next = out.clone();
        next.push(ch);
        if UnicodeWidthStr::width(next.as_str()) > width {
            break;
        }
        out = next;
    }
    out
}
