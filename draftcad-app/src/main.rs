use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use draftcad_config::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Headless 2D drafting console working on DXF drawings.
#[derive(Debug, Parser)]
#[command(name = "draftcad", version, about)]
struct Args {
    /// Drawing to open; a missing or malformed file starts a new drawing.
    file: Option<PathBuf>,

    /// Configuration file, overriding DRAFTCAD_CONFIG and ./config/default.toml.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter directive, overriding the configured level.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,

    /// Do not echo prompts.
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_configuration(args.config.as_deref())?;
    if let Some(level) = args.log {
        config.logging.level = level;
    }
    if args.quiet {
        config.frontend.echo_prompts = false;
    }
    init_logging(&config);
    info!(file = ?args.file, "starting draftcad");

    draftcad_frontend::run_console(&config, args.file.as_deref()).context("console session failed")
}

/// An explicit `--config` must load; discovered files fall back to defaults on error.
fn load_configuration(explicit: Option<&std::path::Path>) -> anyhow::Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::load(Some(path)).with_context(|| format!("loading {}", path.display()));
    }
    Ok(AppConfig::discover().unwrap_or_else(|err| {
        eprintln!("warning: {err}; using built-in defaults");
        AppConfig::default()
    }))
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        warn!("logging already initialised");
    }
}
