use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tracing::{error, info};

use muni_map::app::App;
use muni_map::config::AppConfig;
use muni_map::data::DataPaths;
use muni_map::{input, telemetry, ui};

#[derive(Debug, Parser)]
#[command(name = "muni-map", version, about)]
struct Cli {
    /// TOML config file (default: ./muni-map.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Attribute table JSON
    #[arg(long)]
    attributes: Option<PathBuf>,

    /// Municipality boundaries GeoJSON
    #[arg(long)]
    geometry: Option<PathBuf>,

    /// Initially selected municipality; an empty string starts with none
    #[arg(long)]
    select: Option<String>,

    /// Where log lines are written
    #[arg(long, default_value = "muni-map.log")]
    log_file: PathBuf,
}

impl Cli {
    fn apply(self, config: &mut AppConfig) {
        if let Some(path) = self.attributes {
            config.data.attributes = path;
        }
        if let Some(path) = self.geometry {
            config.data.geometry = path;
        }
        if let Some(name) = self.select {
            config.data.default_selection = name;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init(&cli.log_file)
        .with_context(|| format!("opening log file {}", cli.log_file.display()))?;

    let mut config = AppConfig::resolve(cli.config.as_deref()).context("loading config")?;
    cli.apply(&mut config);

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture).context("enabling mouse capture")?;

    // Run the app
    let result = run(&mut terminal, &config);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(e) = &result {
        error!(error = %e, "exiting with error");
    }
    result
}

fn run(terminal: &mut DefaultTerminal, config: &AppConfig) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, size.width, size.height);

    app.start_loading(DataPaths {
        attributes: config.data.attributes.clone(),
        geometry: config.data.geometry.clone(),
        basemap: config.basemap.outline.clone(),
    });

    loop {
        app.poll_load();

        // Only draw when something changed
        if app.take_redraw() {
            terminal.draw(|frame| ui::render(frame, &app))?;
        }

        // Poll faster while the loader is running
        let timeout = if app.is_loading() {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(250)
        };

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => input::handle_key(&mut app, key),
                Event::Mouse(mouse) => input::handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    info!("quit");
    Ok(())
}
