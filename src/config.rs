//! Command line and environment configuration.

use crate::pipeline::PipelineOptions;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Continuous attack surface discovery.
#[derive(Parser, Debug, Clone)]
#[command(name = "surfmap")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Folder holding scope.yaml
    #[arg(long, env = "CONFIG_FOLDER", default_value = "./", global = true)]
    pub config_folder: PathBuf,

    /// Folder holding program-generated data files
    #[arg(long, env = "DATA_FOLDER", default_value = "./data", global = true)]
    pub data_folder: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the discovery pipeline
    Run(RunConfig),
    /// Load and validate the scope and data files, then exit
    Validate,
}

/// Configuration for the run command.
#[derive(Parser, Debug, Clone)]
pub struct RunConfig {
    /// Concurrent HTTP probes
    #[arg(long, env = "SURFMAP_CONCURRENCY", default_value = "50")]
    pub concurrency: usize,

    /// Concurrent DNS lookups while validating permutations
    #[arg(long, env = "SURFMAP_RESOLVE_CONCURRENCY", default_value = "20")]
    pub resolve_concurrency: usize,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Maximum retries for failed enumeration requests
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Rate limit (requests per second)
    #[arg(long, env = "SURFMAP_RATE_LIMIT", default_value = "50")]
    pub rate_limit: u32,

    /// Maximum number of generated permutations
    #[arg(long, default_value = "1000")]
    pub max_permutations: usize,

    /// Stop before active probing
    #[arg(long)]
    pub skip_probe: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Custom User-Agent string
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 50,
            resolve_concurrency: 20,
            timeout: 10,
            max_retries: 3,
            rate_limit: 50,
            max_permutations: 1000,
            skip_probe: false,
            json: false,
            output: None,
            user_agent: None,
        }
    }
}

impl RunConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            probe_concurrency: self.concurrency.max(1),
            resolve_concurrency: self.resolve_concurrency.max(1),
            skip_probe: self.skip_probe,
        }
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}
