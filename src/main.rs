mod app;
mod autosave;
mod editor;
mod highlight;
mod logging;
mod palette;
mod project;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};
use settings::{SettingsStore, DEFAULT_SETTINGS_FILE};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "batchpad", version, about = "Batch script editor for the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Batch file to open
    file: Option<PathBuf>,

    /// Settings file
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Seconds between autosaves
    #[arg(long, default_value_t = autosave::DEFAULT_INTERVAL.as_secs())]
    autosave_interval: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the settings file in $EDITOR
    Settings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = SettingsStore::new(cli.settings);

    if let Some(Commands::Settings) = cli.command {
        return settings::open_settings_in_editor(&store);
    }

    if let Some(path) = logging::default_log_path() {
        if let Err(err) = logging::init(&path) {
            eprintln!("batchpad: logging disabled: {err:#}");
        }
    }

    app::run_app(app::AppOptions {
        settings: store,
        file: cli.file,
        autosave_interval: Duration::from_secs(cli.autosave_interval),
    })
}
