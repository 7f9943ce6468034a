mod file_config;

pub use file_config::FileConfig;

use crate::pipeline::combine::DecadeOverridePolicy;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub sources: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub decade_policy: DecadeOverridePolicy,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sources: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub decade_policy: DecadeOverridePolicy,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let sources: Vec<PathBuf> = file
            .sources
            .map(|sources| sources.into_iter().map(PathBuf::from).collect())
            .unwrap_or_else(|| cli.sources.clone());
        if sources.is_empty() {
            bail!("At least one source file must be given, via arguments or the config file");
        }

        let output_dir = file
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.output_dir.clone());

        let decade_policy = match file.decade_policy {
            Some(raw) => match parse_decade_policy(&raw) {
                Some(policy) => policy,
                None => bail!("Invalid decade_policy in config file: {raw:?}"),
            },
            None => cli.decade_policy,
        };

        Ok(Self {
            sources,
            output_dir,
            decade_policy,
        })
    }
}

/// Parses a decade policy string using clap's ValueEnum trait.
fn parse_decade_policy(s: &str) -> Option<DecadeOverridePolicy> {
    DecadeOverridePolicy::from_str(s, true).ok()
}
