use clap::Parser;
use trmnl_docker_monitor::cli::Cli;

/// Entry point for the TRMNL Docker monitor.
///
/// Pushes a single snapshot, or keeps pushing every refresh interval with
/// `--loop`. Exits with status 1 if the configuration is unusable.
///
/// # Examples
///
/// ```bash
/// TRMNL_WEBHOOK_URL=https://usetrmnl.com/api/custom_plugins/<uuid> cargo run -- --loop
/// ```
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(cli.log_filter()));

    if let Err(err) = trmnl_docker_monitor::run(cli).await {
        trmnl_docker_monitor::report_startup_error(err.as_ref(), &mut std::io::stderr());
        std::process::exit(1);
    }
}
