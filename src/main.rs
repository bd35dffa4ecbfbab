use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use pollution_map::app::App;
use pollution_map::config::MapConfig;
use pollution_map::data::{self, SourceFetcher};
use pollution_map::logging::{init_logging, LOG_FILE};
use pollution_map::switcher::SwitcherMode;
use pollution_map::ui::{self, SwitcherHit};
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Terminal map of NO₂, PM2.5 and PM10 pollution layers over Germany
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (defaults to ~/.pollution-map/config.ini)
    #[arg(long, env = "POLLUTION_MAP_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding Natural Earth outlines and the feature file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Feature collection location, relative to the data dir or an http(s) URL
    #[arg(long)]
    features: Option<String>,

    /// Where pollution-map.log is written
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Lay the layer switcher out without group headers
    #[arg(long)]
    flat_switcher: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = init_logging(&args.log_dir, LOG_FILE)
        .with_context(|| format!("cannot write logs to {}", args.log_dir.display()))?;

    let mut config = match &args.config {
        Some(path) => MapConfig::load_from(path)?,
        None => MapConfig::load()?,
    };
    if let Some(dir) = args.data_dir {
        config.data.data_dir = dir;
    }
    if let Some(features) = args.features {
        config.data.features = features;
    }
    if args.flat_switcher {
        config.switcher.mode = SwitcherMode::Flat;
    }
    info!(?config, "configuration loaded");

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &config);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(e) = &result {
        warn!(error = %e, "exiting with error");
    }
    result
}

/// Handle mouse events for the switcher, panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent, area: Rect) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => {
            match ui::switcher_hit(area, app, mouse.column, mouse.row) {
                Some(SwitcherHit::Open) => app.switcher.open(),
                Some(SwitcherHit::Close) => app.switcher.close(),
                Some(SwitcherHit::Row(idx)) => app.click_row(idx),
                Some(SwitcherHit::Panel) => {}
                None => app.last_mouse = Some((mouse.column, mouse.row)),
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        MouseEventKind::Moved => {
            let over = ui::switcher_hit(area, app, mouse.column, mouse.row).is_some();
            app.hover_switcher(over);
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: &MapConfig) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, size.width as usize, size.height as usize, Instant::now())?;

    let data_dir = config.data.data_dir.clone();
    if data_dir.exists() {
        data::load_base_outlines(&mut app.map_renderer, &data_dir)?;
    }
    if !app.map_renderer.has_data() {
        data::generate_germany_outline(&mut app.map_renderer);
    }

    let fetcher = SourceFetcher::new(data_dir).context("cannot build the HTTP client")?;
    app.start_feature_fetch(|| Box::new(fetcher.clone()));

    loop {
        app.poll_features();
        app.prepare_frame();
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            // Layer switcher
                            KeyCode::Char('t') | KeyCode::Char('T') => app.switcher.toggle_open(),
                            KeyCode::Tab => app.move_cursor(true),
                            KeyCode::BackTab => app.move_cursor(false),
                            KeyCode::Char(' ') | KeyCode::Enter => app.activate_cursor(),

                            // Outline toggles
                            KeyCode::Char('s') | KeyCode::Char('S') => {
                                app.map_renderer.toggle_states();
                            }
                            KeyCode::Char('e') | KeyCode::Char('E') => {
                                app.map_renderer.toggle_feature_edges();
                            }

                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    let area = Rect::new(0, 0, size.width, size.height);
                    handle_mouse(&mut app, mouse, area);
                }
                Event::Resize(width, height) => {
                    app.resize(width as usize, height as usize);
                }
                _ => {}
            }
        }

        let now = Instant::now();
        app.tick(now);
        if app.size_refresh_due(now) {
            let size = terminal.size()?;
            app.resize(size.width as usize, size.height as usize);
            terminal.clear()?;
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
