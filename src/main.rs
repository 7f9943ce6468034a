use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use intensity_pipeline::config::{AppConfig, CliConfig, FileConfig};
use intensity_pipeline::pipeline::Pipeline;
use intensity_pipeline::report;
use intensity_pipeline::DecadeOverridePolicy;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// CSV source files to ingest, in priority order.
    #[clap(value_parser = parse_path)]
    pub sources: Vec<PathBuf>,

    /// Directory to write the cleaned table, summaries, and reports into.
    #[clap(short, long, default_value = "output", value_parser = parse_path)]
    pub output_dir: PathBuf,

    /// How a decade-labeled source name interacts with per-row dates.
    #[clap(long, default_value = "overwrite")]
    pub decade_policy: DecadeOverridePolicy,

    /// Path to an optional TOML config file; its values override the CLI.
    #[clap(short, long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        sources: cli_args.sources,
        output_dir: cli_args.output_dir,
        decade_policy: cli_args.decade_policy,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!(
        sources = config.sources.len(),
        output_dir = %config.output_dir.display(),
        "starting pipeline run"
    );

    let pipeline = Pipeline::new(config.decade_policy);
    let run = pipeline.run(&config.sources)?;

    let written = report::write_all(&config.output_dir, &run)?;
    for path in &written {
        info!(file = %path.display(), "wrote");
    }

    if !run.verification.passed() {
        error!("verification failed; outputs were still written");
        bail!("Verification failed, see the log for the failing checks");
    }
    info!(
        rows = run.scored.len(),
        warnings = run.verification.warnings(),
        "run finished"
    );
    Ok(())
}
