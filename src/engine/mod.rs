//! Narrow view of a container engine.
//!
//! The rest of the crate only ever needs three things from an engine: the
//! list of containers, a raw resource-usage reading for one of them, and the
//! engine-wide counters. [`ContainerSource`] captures exactly that, so the
//! live Docker engine ([`DockerSource`]) and the built-in fixture
//! ([`DemoSource`]) are interchangeable.
//!
//! # Key Components
//!
//! - [`ContainerHandle`]: identity and lifecycle of one container at listing time.
//! - [`RawUsage`]: cumulative counters from a single stats reading.
//! - [`EngineInfo`]: engine version and container state counts.
mod demo;
mod docker;
mod error;

pub use demo::DemoSource;
pub use docker::DockerSource;
pub use error::{Error, Result, SamplingError};

/// Status string the engine reports for a running container.
pub const STATUS_RUNNING: &str = "running";

const SHORT_ID_LEN: usize = 12;
const SHORT_IMAGE_ID_LEN: usize = 10;

/// A container as seen when enumerating the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Full engine identifier, used for follow-up queries.
    pub id: String,
    /// First 12 characters of `id`.
    pub short_id: String,
    pub name: String,
    /// First repository tag, or the short image id for untagged images.
    pub image: String,
    /// Engine-reported state, e.g. `running` or `exited`.
    pub status: String,
    pub restart_count: u64,
    /// RFC 3339 start instant as reported by the engine.
    pub started_at: Option<String>,
}

impl ContainerHandle {
    pub fn is_running(&self) -> bool {
        self.status == STATUS_RUNNING
    }
}

/// Byte counters of one network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterfaceCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// One raw resource-usage reading for a container.
///
/// CPU values are cumulative, so a percentage can only be derived from the
/// difference between two readings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawUsage {
    /// Total CPU time consumed by the container.
    pub total_cpu_usage: u64,
    /// Total CPU time of the host, in the same unit.
    pub system_cpu_usage: u64,
    /// Number of online CPUs, if reported.
    pub online_cpus: Option<u32>,
    /// Length of the per-CPU usage array, if reported.
    pub percpu_count: Option<usize>,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub networks: Vec<InterfaceCounters>,
}

impl RawUsage {
    /// CPU count used to scale the CPU percentage.
    ///
    /// Prefers the online CPU count, then the per-CPU array length, then 1.
    pub fn num_cpus(&self) -> u32 {
        self.online_cpus
            .filter(|&n| n > 0)
            .or_else(|| {
                self.percpu_count
                    .filter(|&n| n > 0)
                    .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            })
            .unwrap_or(1)
    }

    /// Sum of rx/tx bytes over all interfaces.
    pub fn network_totals(&self) -> InterfaceCounters {
        self.networks
            .iter()
            .fold(InterfaceCounters::default(), |acc, iface| InterfaceCounters {
                rx_bytes: acc.rx_bytes.saturating_add(iface.rx_bytes),
                tx_bytes: acc.tx_bytes.saturating_add(iface.tx_bytes),
            })
    }
}

/// Engine-wide counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    pub version: String,
    pub containers_total: u64,
    pub containers_running: u64,
    pub containers_paused: u64,
    pub containers_stopped: u64,
}

/// Source of container data.
pub trait ContainerSource {
    /// Lists running containers, or all containers if `include_stopped` is set.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot be queried at all.
    fn list_containers(
        &self,
        include_stopped: bool,
    ) -> impl std::future::Future<Output = Result<Vec<ContainerHandle>>> + Send;

    /// Takes a single raw usage reading for `handle`.
    ///
    /// # Errors
    ///
    /// Fails if the reading is unavailable or incomplete. Callers treat this
    /// as a per-container problem, not an engine outage.
    fn sample(
        &self,
        handle: &ContainerHandle,
    ) -> impl std::future::Future<Output = std::result::Result<RawUsage, SamplingError>> + Send;

    /// Fetches the engine version and container state counts.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot be queried.
    fn engine_info(&self) -> impl std::future::Future<Output = Result<EngineInfo>> + Send;
}

/// Shortens a container id to its first 12 characters.
pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// Shortens an image id, keeping the `sha256:` prefix if present.
pub fn short_image_id(id: &str) -> String {
    match id.strip_prefix("sha256:") {
        Some(digest) => format!(
            "sha256:{}",
            digest.chars().take(SHORT_IMAGE_ID_LEN).collect::<String>()
        ),
        None => id.chars().take(SHORT_IMAGE_ID_LEN).collect(),
    }
}
