use std::path::PathBuf;

use clap::Parser;

use crate::config::Overrides;
use crate::poll::RunMode;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "trmnl-docker-monitor",
    version,
    about = "Push Docker container stats to a TRMNL webhook"
)]
pub struct Cli {
    /// TRMNL webhook URL (or set TRMNL_WEBHOOK_URL)
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Path to a JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run continuously instead of pushing once
    #[arg(long = "loop")]
    pub continuous: bool,

    /// Update interval in seconds when running with --loop [default: 30]
    #[arg(long)]
    pub interval: Option<u64>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    pub verbose: bool,

    /// Send built-in sample data instead of querying Docker
    #[arg(long)]
    pub demo: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            webhook_url: self.webhook_url.clone(),
            refresh_interval: self.interval,
        }
    }

    pub fn run_mode(&self) -> RunMode {
        if self.continuous {
            RunMode::Continuous
        } else {
            RunMode::Once
        }
    }

    /// Default log filter, used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
