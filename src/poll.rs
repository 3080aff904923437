//! The scheduler driving collection and delivery.
//!
//! ```text
//! Idle -> Sampling -> Publishing -> Sleeping -> Sampling ...
//!                                           \-> Stopped
//! ```
//!
//! Every tick builds its snapshot from scratch, so a failed tick never
//! affects the next one. Shutdown is only observed between ticks: a sample
//! or publish in flight runs to completion or to its own timeout first.
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::engine::ContainerSource;
use crate::host::HostProbe;
use crate::publisher::Publish;
use crate::sampler::StatsSampler;
use crate::snapshot::ErrorSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// A single tick, then return.
    Once,
    /// Tick every refresh interval until cancelled.
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Sampling,
    Publishing,
    Sleeping,
    Stopped,
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A snapshot was collected and accepted by the webhook.
    Published,
    /// A snapshot was collected but could not be delivered.
    PublishFailed,
    /// The engine was unreachable and an error heartbeat was sent instead.
    Degraded { heartbeat_delivered: bool },
    /// Collection failed for another reason; nothing was published.
    Failed,
}

pub struct PollLoop<S, H, P> {
    config: Config,
    source: S,
    host: H,
    publisher: P,
    aggregator: Aggregator,
    mode: RunMode,
    shutdown: CancellationToken,
    state: LoopState,
}

impl<S, H, P> PollLoop<S, H, P>
where
    S: ContainerSource + Sync,
    H: HostProbe,
    P: Publish,
{
    pub fn new(
        config: Config,
        source: S,
        host: H,
        publisher: P,
        mode: RunMode,
        shutdown: CancellationToken,
    ) -> Self {
        let aggregator = Aggregator::new(&config, StatsSampler::default());
        Self {
            config,
            source,
            host,
            publisher,
            aggregator,
            mode,
            shutdown,
            state: LoopState::Idle,
        }
    }

    /// Replaces the sampler used for per-container readings.
    pub fn with_sampler(mut self, sampler: StatsSampler) -> Self {
        self.aggregator = Aggregator::new(&self.config, sampler);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn set_state(&mut self, state: LoopState) {
        log::trace!("poll loop: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Collects one snapshot and publishes it.
    ///
    /// If the engine cannot be reached an [`ErrorSnapshot`] is published in
    /// its place. No error escapes a tick.
    pub async fn tick(&mut self) -> TickOutcome {
        self.set_state(LoopState::Sampling);
        log::debug!("Collecting container data");

        let collected = self.aggregator.collect(&self.source, &mut self.host).await;
        match collected {
            Ok(snapshot) => {
                log::debug!("Found {} containers", snapshot.containers().len());
                self.set_state(LoopState::Publishing);
                if self.publisher.publish(&snapshot).await {
                    log::info!(
                        "Pushed snapshot with {} containers",
                        snapshot.containers().len()
                    );
                    TickOutcome::Published
                } else {
                    log::warn!("Snapshot was not delivered, retrying next tick");
                    TickOutcome::PublishFailed
                }
            }
            Err(err) if err.is_connectivity() => {
                log::error!("docker engine unreachable, sending heartbeat: error={err}");
                self.set_state(LoopState::Publishing);
                let heartbeat = ErrorSnapshot::new(format!("Docker connection failed: {err}"));
                TickOutcome::Degraded {
                    heartbeat_delivered: self.publisher.publish(&heartbeat).await,
                }
            }
            Err(err) => {
                log::error!("failed collecting snapshot: error={err}");
                TickOutcome::Failed
            }
        }
    }

    /// Runs ticks until the run mode or the shutdown token ends the loop.
    pub async fn run(&mut self) {
        let interval = self.config.refresh_interval;
        loop {
            let outcome = self.tick().await;
            log::debug!("Tick finished: {outcome:?}");

            if self.mode == RunMode::Once {
                break;
            }

            self.set_state(LoopState::Sleeping);
            if !self.sleep(interval).await {
                log::info!("Shutdown requested, exiting");
                break;
            }
        }
        self.set_state(LoopState::Stopped);
    }

    /// Waits for `interval`; returns `false` if shutdown was requested first.
    async fn sleep(&self, interval: Duration) -> bool {
        log::debug!("Waiting {} seconds", interval.as_secs_f64());
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(interval) => true,
        }
    }
}
