mod app;
mod components;
mod config;
mod editor;
mod error;
mod event;
mod handler;
mod import;
mod logging;
mod session;
mod theme;
mod tree;
mod tui;
mod ui;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::app::App;
use crate::components::diagram::viewport_for;
use crate::config::AppConfig;
use crate::editor::flatten::to_pretty_json;
use crate::editor::persist::{save_with, FileSink};
use crate::error::AppError;
use crate::event::{Event, EventHandler};
use crate::session::Session;
use crate::tui::{initial_diagram_area, install_panic_hook, Tui};

/// A terminal family-tree browser and bulk editor.
#[derive(Parser, Debug)]
#[command(name = "ftree", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Family document to open (JSON)
    file: Option<PathBuf>,

    /// Path to a config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable mouse capture
    #[arg(long, global = true)]
    no_mouse: bool,

    /// Color scheme: dark, light or custom
    #[arg(long, global = true)]
    theme: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse the tree diagram
    View {
        file: Option<PathBuf>,
        /// Write saves here instead of over the opened file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Open straight into the table editor
    Table {
        file: Option<PathBuf>,
        /// Write saves here instead of over the opened file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Convert an indented ASCII tree drawing to a JSON document
    Import {
        input: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Partial config built from CLI flags.
fn cli_overrides(cli: &Cli) -> AppConfig {
    let mut overrides = AppConfig::default();
    if cli.no_mouse {
        overrides.general.mouse = Some(false);
    }
    if let Some(theme) = &cli.theme {
        overrides.theme.scheme = Some(theme.clone());
    }
    overrides
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();

    let overrides = cli_overrides(&cli);
    let config = AppConfig::load(cli.config.as_deref(), Some(&overrides));

    let level = logging::effective_level(config.log_level());
    let _log_guard = match logging::init(&config.log_dir(), level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: {}", e);
            None
        }
    };
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ftree starting");

    match cli.command {
        Some(Command::Import { input, output }) => run_import(&input, output.as_deref()),
        Some(Command::View { file, out }) => {
            run_tui(&config, file.or(cli.file), out, false).await
        }
        Some(Command::Table { file, out }) => {
            run_tui(&config, file.or(cli.file), out, true).await
        }
        None => run_tui(&config, cli.file, None, false).await,
    }
}

fn run_import(input: &Path, output: Option<&Path>) -> error::Result<()> {
    let text = std::fs::read_to_string(input)
        .map_err(|e| AppError::InvalidPath(format!("{}: {}", input.display(), e)))?;
    let document = import::parse_ascii_tree(&text)?;

    match output {
        Some(path) => {
            let receipt = save_with(&FileSink::new(path), &document)?;
            println!("{}", receipt.message);
        }
        None => println!("{}", to_pretty_json(&document)?),
    }
    Ok(())
}

async fn run_tui(
    config: &AppConfig,
    file: Option<PathBuf>,
    out: Option<PathBuf>,
    open_table: bool,
) -> error::Result<()> {
    let path = file
        .or_else(|| config.default_document().map(PathBuf::from))
        .ok_or_else(|| AppError::InvalidPath("no document given".into()))?;
    let text = std::fs::read_to_string(&path)
        .map_err(|_| AppError::InvalidPath(format!("{} does not exist", path.display())))?;

    // The first draw refines this once the details panel is known.
    let initial = viewport_for(initial_diagram_area());
    let session = Session::open(&text, config.layout_config(), initial)?;
    tracing::info!(
        path = %path.display(),
        people = session.model().len(),
        theme = config.theme_scheme(),
        "document opened"
    );

    let output_path = out
        .or_else(|| config.output_path().map(PathBuf::from))
        .unwrap_or_else(|| path.clone());
    let mouse = config.mouse_enabled();
    let mut app = App::new(session, path, theme::resolve_theme(&config.theme))
        .with_output_path(output_path)
        .with_transition(config.transition())
        .with_mouse(mouse);
    if open_table {
        app.open_table();
    }

    install_panic_hook();

    let mut tui = Tui::new(mouse)?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    app.set_event_sender(events.sender());

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(&mut app, mouse),
            Event::Tick => app.clear_expired_status(),
            // the next draw picks up the new size
            Event::Resize => {}
            Event::Deferred(token) => app.handle_deferred(token),
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    tracing::info!("ftree exiting");
    Ok(())
}
