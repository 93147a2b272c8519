// Entrypoint for the CLI application.
// - Keeps `main` small: read flags and config, set up logging, then hand
//   over to the interactive menu.

use std::io;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use garmin_trail::{config::Config, console::Console, ui::main_menu};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Merge tracker activities into one GPS track and map it", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "GARMIN_TRAIL_CONFIG")]
    config: Option<PathBuf>,

    /// Elevation dataset to query
    #[arg(long)]
    dataset: Option<String>,

    /// Locations per elevation request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Elevation cache file
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Directory rendered maps are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// More log output (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dataset) = cli.dataset {
        config.elevation.dataset = dataset;
    }
    if let Some(batch_size) = cli.batch_size {
        config.elevation.batch_size = batch_size;
    }
    if let Some(cache) = cli.cache {
        config.elevation.cache_path = cache;
    }
    if let Some(dir) = cli.output_dir {
        config.output.dir = dir;
    }
    config.validate()?;

    // Blocks until the user exits.
    main_menu(config, Console::stdout())?;
    Ok(())
}
