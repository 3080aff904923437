//! Payloads pushed to the webhook.
//!
//! Field names match the merge variables the dashboard template consumes, so
//! renaming anything here is a breaking change for the receiving side.
use chrono::Local;
use serde::Serialize;

use crate::alert::Alerts;
use crate::engine::{ContainerHandle, EngineInfo};
use crate::format::{format_bytes, round1};
use crate::host::HostUsage;
use crate::sampler::ContainerMetrics;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One container at sample time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    /// Absent for containers that are not running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    pub restart_count: u64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_usage: String,
    pub network_rx: String,
    pub network_tx: String,
    pub has_alert: bool,
    pub alert_messages: Vec<String>,
}

impl ContainerRecord {
    /// Builds a record from listing data, derived metrics and alerts.
    ///
    /// Percentages are rounded to one decimal here; alerts were evaluated on
    /// the unrounded values.
    pub fn new(
        handle: &ContainerHandle,
        uptime: Option<String>,
        metrics: ContainerMetrics,
        alerts: Alerts,
    ) -> Self {
        Self {
            id: handle.short_id.clone(),
            name: handle.name.clone(),
            image: handle.image.clone(),
            status: handle.status.clone(),
            uptime,
            restart_count: handle.restart_count,
            cpu_percent: round1(metrics.cpu_percent),
            memory_percent: round1(metrics.memory_percent),
            memory_usage: format_bytes(metrics.memory_usage_bytes),
            network_rx: format_bytes(metrics.network_rx_bytes),
            network_tx: format_bytes(metrics.network_tx_bytes),
            has_alert: alerts.has_alert(),
            alert_messages: alerts.into_messages(),
        }
    }

    /// Record for a container that is not running: zero metrics, no alerts.
    pub fn stopped(handle: &ContainerHandle) -> Self {
        Self::new(handle, None, ContainerMetrics::zeroed(), Alerts::none())
    }
}

/// Engine and host counters at sample time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub docker_version: String,
    pub containers_total: u64,
    pub containers_running: u64,
    pub containers_paused: u64,
    pub containers_stopped: u64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl SystemSnapshot {
    pub fn new(engine: EngineInfo, host: HostUsage) -> Self {
        Self {
            docker_version: engine.version,
            containers_total: engine.containers_total,
            containers_running: engine.containers_running,
            containers_paused: engine.containers_paused,
            containers_stopped: engine.containers_stopped,
            cpu_percent: host.cpu_percent,
            memory_percent: host.memory_percent,
        }
    }
}

/// Everything published for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    containers: Vec<ContainerRecord>,
    system: SystemSnapshot,
    last_update: String,
}

impl Snapshot {
    /// Creates a snapshot stamped with the current local time.
    pub fn new(containers: Vec<ContainerRecord>, system: SystemSnapshot) -> Self {
        Self {
            containers,
            system,
            last_update: local_timestamp(),
        }
    }

    pub fn containers(&self) -> &[ContainerRecord] {
        &self.containers
    }

    pub fn system(&self) -> &SystemSnapshot {
        &self.system
    }

    pub fn last_update(&self) -> &str {
        &self.last_update
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
}

/// Serializes as an empty JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EmptySystem {}

/// Heartbeat published when no live data could be collected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSnapshot {
    error: ErrorInfo,
    containers: [ContainerRecord; 0],
    system: EmptySystem,
}

impl ErrorSnapshot {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorInfo {
                message: message.into(),
            },
            containers: [],
            system: EmptySystem {},
        }
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }
}

/// Wire envelope required by the receiver: `{"merge_variables": ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub merge_variables: &'a T,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    pub fn new(merge_variables: &'a T) -> Self {
        Self { merge_variables }
    }
}

fn local_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
