//! Derives CPU, memory and network figures for a running container.
//!
//! CPU counters reported by the engine are cumulative, so a percentage needs
//! two readings. [`StatsSampler`] takes them a short, fixed delay apart and
//! computes
//!
//! ```text
//! cpu%    = cpu_delta / system_delta * num_cpus * 100
//! memory% = usage / limit * 100
//! ```
//!
//! The CPU percentage is not clamped: on a multi-core host a busy container
//! legitimately exceeds 100%.
use std::time::Duration;

use crate::engine::{ContainerHandle, ContainerSource, RawUsage, SamplingError};

/// Delay between the two readings of a container.
pub const DEFAULT_SAMPLE_DELAY: Duration = Duration::from_millis(100);

/// Derived resource usage of one container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_usage_bytes: u64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
}

impl ContainerMetrics {
    /// Metrics reported for stopped containers and failed samples.
    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// CPU percentage from counter deltas.
///
/// Returns `0.0` unless the host counter advanced (`system_delta > 0`) and the
/// container counter did not go backwards (`cpu_delta >= 0`).
pub fn cpu_percent(cpu_delta: i128, system_delta: i128, num_cpus: u32) -> f64 {
    if system_delta > 0 && cpu_delta >= 0 {
        (cpu_delta as f64 / system_delta as f64) * f64::from(num_cpus) * 100.0
    } else {
        0.0
    }
}

/// Memory percentage of the limit, `0.0` without a limit.
pub fn memory_percent(usage: u64, limit: u64) -> f64 {
    if limit > 0 {
        usage as f64 / limit as f64 * 100.0
    } else {
        0.0
    }
}

/// Computes metrics from two successive readings of the same container.
///
/// Memory and network figures come from the later reading.
pub fn compute_metrics(first: &RawUsage, second: &RawUsage) -> ContainerMetrics {
    let cpu_delta = i128::from(second.total_cpu_usage) - i128::from(first.total_cpu_usage);
    let system_delta = i128::from(second.system_cpu_usage) - i128::from(first.system_cpu_usage);
    let network = second.network_totals();

    ContainerMetrics {
        cpu_percent: cpu_percent(cpu_delta, system_delta, second.num_cpus()),
        memory_percent: memory_percent(second.memory_usage, second.memory_limit),
        memory_usage_bytes: second.memory_usage,
        network_rx_bytes: network.rx_bytes,
        network_tx_bytes: network.tx_bytes,
    }
}

/// Takes paired readings and turns them into [`ContainerMetrics`].
#[derive(Debug, Clone, Copy)]
pub struct StatsSampler {
    delay: Duration,
}

impl Default for StatsSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_DELAY)
    }
}

impl StatsSampler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Samples `handle` twice, `delay` apart.
    ///
    /// # Errors
    ///
    /// Returns the [`SamplingError`] of whichever reading failed.
    pub async fn sample<S: ContainerSource + Sync>(
        &self,
        source: &S,
        handle: &ContainerHandle,
    ) -> Result<ContainerMetrics, SamplingError> {
        let first = source.sample(handle).await?;
        tokio::time::sleep(self.delay).await;
        let second = source.sample(handle).await?;

        Ok(compute_metrics(&first, &second))
    }

    /// Like [`StatsSampler::sample`], but a failed sample yields zeroed metrics.
    ///
    /// A failure is logged as a warning and otherwise only visible as zeros.
    pub async fn sample_or_zeroed<S: ContainerSource + Sync>(
        &self,
        source: &S,
        handle: &ContainerHandle,
    ) -> ContainerMetrics {
        match self.sample(source, handle).await {
            Ok(metrics) => metrics,
            Err(err) => {
                log::warn!(
                    "failed sampling container stats, reporting zeros: container={}, error={}",
                    handle.name,
                    err
                );
                ContainerMetrics::zeroed()
            }
        }
    }
}
