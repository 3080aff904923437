/// TRMNL Docker Monitor: pushes Docker container resource usage to a TRMNL
/// e-ink dashboard.
///
/// Every tick the agent lists the containers of a Docker engine, derives CPU,
/// memory and network figures for the running ones, flags those above the
/// configured thresholds and POSTs the result to a TRMNL custom plugin
/// webhook as `{"merge_variables": ...}`.
pub mod aggregator;
pub mod alert;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod host;
pub mod poll;
pub mod publisher;
pub mod sampler;
pub mod snapshot;

use tokio_util::sync::CancellationToken;

use cli::Cli;
use config::Config;
use engine::{DemoSource, DockerSource};
use error::ResultOkLogExt;
use host::SysinfoProbe;
use poll::PollLoop;
use publisher::WebhookPublisher;

/// Runs the monitor as configured by `cli`.
///
/// # Errors
///
/// Returns an error if the configuration cannot be resolved (most notably a
/// missing webhook URL) or the Docker API version is malformed. Failures
/// while the loop is running are handled inside the loop.
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(cli.config.as_deref(), cli.overrides())?;
    log::debug!(
        "Configuration: docker_host={}, show_stopped={}, sort={} {}, interval={}s",
        config.docker_host,
        config.show_stopped,
        config.sort_by,
        config.sort_order,
        config.refresh_interval.as_secs()
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

    let publisher = WebhookPublisher::new(config.webhook_url.clone());
    let host = SysinfoProbe::new();
    let mode = cli.run_mode();

    if cli.demo {
        log::info!("Demo mode: sending sample data, no Docker engine required");
        PollLoop::new(demo_config(config), DemoSource::new(), host, publisher, mode, shutdown)
            .run()
            .await;
    } else {
        let source = DockerSource::new(config.docker_host.clone(), &config.api_version)?;
        PollLoop::new(config, source, host, publisher, mode, shutdown)
            .run()
            .await;
    }

    Ok(())
}

/// Logs a fatal startup error and writes it to `out`, normally stderr.
pub fn report_startup_error(err: &dyn std::error::Error, out: &mut impl std::io::Write) {
    log::error!("{err}");
    writeln!(out, "ERROR: {err}").ok_log("failed to write startup error");
}

/// The demo preview always includes the exited fixture container.
fn demo_config(config: Config) -> Config {
    Config {
        show_stopped: true,
        ..config
    }
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    if tokio::signal::ctrl_c()
        .await
        .ok_log("failed to listen for ctrl-c")
        .is_some()
    {
        log::info!("Shutdown requested");
        shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ContainerSource;

    #[test]
    fn test_startup_error_is_printed() {
        let mut out = Vec::new();
        report_startup_error(&config::Error::MissingWebhookUrl, &mut out);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.starts_with("ERROR: webhook URL required"), "{printed}");
        assert!(printed.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_demo_mode_sends_stopped_containers() {
        let config = Config::resolve(
            config::FileConfig {
                webhook_url: Some("http://127.0.0.1:9/hook".to_owned()),
                show_stopped: Some(false),
                ..Default::default()
            },
            |_: &str| None,
            config::Overrides::default(),
        )
        .unwrap();

        let config = demo_config(config);
        assert!(config.show_stopped);

        let handles = DemoSource::new()
            .list_containers(config.show_stopped)
            .await
            .unwrap();
        assert_eq!(handles.len(), 6);
        assert!(handles.iter().any(|h| h.name == "elasticsearch" && !h.is_running()));
    }
}
