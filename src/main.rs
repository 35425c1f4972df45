use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use covermap::config::{self, Config, load_config, load_config_from_path};
use covermap::dashboard::Dashboard;
use covermap::event::EventHandler;
use covermap::output::OutputDir;
use covermap::registry::{ChartConfigurationRegistry, FileStore};
use covermap::source::FileDataSource;
use covermap::telemetry;
use covermap::theme::ThemeMode;

#[derive(Parser)]
#[command(
    name = "covermap",
    about = "Colorized coverage treemaps and trend charts from CI coverage data"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory with trees/, overview.json, builds.json and jobs/
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory the chart options are written to
    #[arg(long)]
    out: Option<PathBuf>,

    /// Theme: light, dark, system
    #[arg(long)]
    theme: Option<String>,

    /// Render once and exit instead of reading events from stdin.
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Write JSON-lines tracing output to this file instead of stderr.
    #[arg(long)]
    log_json: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    match &cli.log_json {
        Some(path) => telemetry::init_tracing_json(path)?,
        None => telemetry::init_tracing()?,
    }

    let config = load_config_for_cli(&cli);
    let mode = ThemeMode::from_config_str(&config.general.theme);
    let storage_path = config
        .general
        .storage_path
        .clone()
        .unwrap_or_else(config::default_storage_path);
    tracing::info!(
        theme = mode.label(),
        data = %config.general.data_dir.display(),
        out = %config.general.output_dir.display(),
        storage = %storage_path.display(),
        "starting"
    );

    let registry = ChartConfigurationRegistry::with_defaults(
        Box::new(FileStore::open(&storage_path)),
        &config.dialog,
        &config.job_trends,
    );
    let mut dashboard = Dashboard::new(
        &config,
        FileDataSource::new(&config.general.data_dir),
        OutputDir::new(&config.general.output_dir),
        registry,
        mode,
    );

    if cli.once {
        dashboard.run_once().await;
    } else {
        let mut events = EventHandler::new();
        dashboard.run(&mut events).await;
    }
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(ref data) = cli.data {
        config.general.data_dir = data.clone();
    }
    if let Some(ref out) = cli.out {
        config.general.output_dir = out.clone();
    }
    if let Some(ref theme) = cli.theme {
        config.general.theme = theme.clone();
    }

    config
}
