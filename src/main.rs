//! pianola - A terminal piano with a one-take recorder.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --soundfont piano.sf2
//! cargo run -- --silent            # no audio device needed
//! ```
//!
//! Press `?` for help with keyboard shortcuts.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use pianola::audio::{AudioEngine, SilentEngine, SoundEngine};
use pianola::config::Config;
use pianola::{ui, App};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::fs::File;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Longest wait for terminal events between redraws.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Terminal piano with a one-take recorder.
#[derive(Parser, Debug)]
#[command(name = "pianola", version, about)]
struct Cli {
    /// SoundFont (.sf2) used for synthesis
    #[arg(short, long)]
    soundfont: Option<PathBuf>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial General MIDI program (0-127)
    #[arg(short, long)]
    program: Option<u8>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run without opening an audio device
    #[arg(long)]
    silent: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = cli.soundfont {
        config.soundfont = Some(path);
    }
    if let Some(program) = cli.program {
        config.program = program;
    }
    if let Some(path) = cli.log_file {
        config.log_file = Some(path);
    }
    let config = config.validate().context("Invalid configuration")?;

    init_logging(&config)?;

    let engine = build_engine(&config, cli.silent);

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;
    let reports_releases = supports_keyboard_enhancement().unwrap_or(false);
    if reports_releases {
        execute!(
            terminal.backend_mut(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .context("Failed to enable key release reporting")?;
    }
    info!(reports_releases, "terminal ready");

    let mut app = App::new(&config, engine, reports_releases);
    if !reports_releases {
        app.set_status("Terminal does not report key releases; keys release after a pause");
    }

    let result = run_app(&mut terminal, &mut app);

    app.release_all_notes();
    restore_terminal(&mut terminal, reports_releases).context("Failed to restore terminal")?;

    result
}

/// Logs go to the configured file, or stderr. `RUST_LOG` overrides the default level.
fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match &config.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Opens the audio engine, falling back to silence when it is unavailable.
fn build_engine(config: &Config, silent: bool) -> Box<dyn SoundEngine> {
    if silent {
        info!("running without audio");
        return Box::new(SilentEngine);
    }
    let Some(path) = &config.soundfont else {
        warn!("no soundfont configured, running without audio");
        return Box::new(SilentEngine);
    };
    match AudioEngine::new(path, config.velocity, config.tempo) {
        Ok(engine) => Box::new(engine),
        Err(err) => {
            warn!(soundfont = %path.display(), error = %format!("{:#}", err), "audio unavailable, running without sound");
            Box::new(SilentEngine)
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )
    .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    reports_releases: bool,
) -> Result<()> {
    if reports_releases {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("Failed to restore keyboard mode")?;
    }
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.update(app.now_ms());

        terminal.draw(|frame| ui::render(frame, app))?;

        // Wake up no later than the next playback cue
        let timeout = app
            .recorder()
            .next_deadline()
            .map_or(FRAME_INTERVAL, |deadline| {
                Duration::from_millis(deadline.saturating_sub(app.now_ms())).min(FRAME_INTERVAL)
            });
        if event::poll(timeout)? {
            let now = app.now_ms();
            match event::read()? {
                Event::Key(key) => app.handle_key(key, now),
                Event::Mouse(mouse) => app.handle_mouse(mouse, now),
                Event::FocusLost => app.release_all_notes(),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
