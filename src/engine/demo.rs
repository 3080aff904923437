use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, Utc};

use super::{
    ContainerHandle, ContainerSource, EngineInfo, InterfaceCounters, RawUsage, Result,
    SamplingError, short_id,
};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Host CPU time that passes between two demo readings.
const SYSTEM_CPU_STEP: u64 = 1_000;

struct DemoContainer {
    id: &'static str,
    name: &'static str,
    image: &'static str,
    running: bool,
    restart_count: u64,
    uptime_hours: i64,
    /// CPU usage in tenths of a percent of one CPU.
    cpu_per_mille: u64,
    memory_usage: u64,
    /// Memory usage in tenths of a percent of the limit.
    memory_per_mille: u64,
    rx_bytes: u64,
    tx_bytes: u64,
}

const CONTAINERS: [DemoContainer; 6] = [
    DemoContainer {
        id: "abc123def456a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6",
        name: "nginx-web",
        image: "nginx:alpine",
        running: true,
        restart_count: 0,
        uptime_hours: 3 * 24 + 5,
        cpu_per_mille: 125,
        memory_usage: 256 * MIB,
        memory_per_mille: 83,
        rx_bytes: 12 * GIB / 10,
        tx_bytes: 856 * MIB,
    },
    DemoContainer {
        id: "def456ghi789b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7",
        name: "postgres-db",
        image: "postgres:15-alpine",
        running: true,
        restart_count: 0,
        uptime_hours: 7 * 24 + 12,
        cpu_per_mille: 258,
        memory_usage: 13 * GIB / 10,
        memory_per_mille: 421,
        rx_bytes: 58 * GIB / 10,
        tx_bytes: 32 * GIB / 10,
    },
    DemoContainer {
        id: "ghi789jkl012c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d8",
        name: "redis-cache",
        image: "redis:7-alpine",
        running: true,
        restart_count: 0,
        uptime_hours: 5 * 24 + 8,
        cpu_per_mille: 52,
        memory_usage: 468 * MIB,
        memory_per_mille: 156,
        rx_bytes: 21 * GIB / 10,
        tx_bytes: 18 * GIB / 10,
    },
    DemoContainer {
        id: "jkl012mno345d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d8e9",
        name: "api-backend",
        image: "node:20-alpine",
        running: true,
        restart_count: 2,
        uptime_hours: 24 + 3,
        cpu_per_mille: 853,
        memory_usage: 21 * GIB / 10,
        memory_per_mille: 689,
        rx_bytes: 892 * MIB,
        tx_bytes: 15 * GIB / 10,
    },
    DemoContainer {
        id: "mno345pqr678e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d8e9f0",
        name: "grafana",
        image: "grafana/grafana:latest",
        running: true,
        restart_count: 0,
        uptime_hours: 10 * 24 + 2,
        cpu_per_mille: 87,
        memory_usage: 672 * MIB,
        memory_per_mille: 224,
        rx_bytes: 34 * GIB / 10,
        tx_bytes: 29 * GIB / 10,
    },
    DemoContainer {
        id: "vwx234yza567f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d8e9f0a1",
        name: "elasticsearch",
        image: "elasticsearch:8.10.0",
        running: false,
        restart_count: 0,
        uptime_hours: 0,
        cpu_per_mille: 0,
        memory_usage: 0,
        memory_per_mille: 0,
        rx_bytes: 12 * GIB,
        tx_bytes: 85 * GIB / 10,
    },
];

/// Fabricated engine used for dry runs and dashboard previews.
///
/// Every reading advances the cumulative counters of a container by a fixed
/// step, so the regular delta calculation yields stable percentages.
#[derive(Debug, Default)]
pub struct DemoSource {
    readings: Mutex<HashMap<String, u64>>,
}

impl DemoSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_reading(&self, id: &str) -> u64 {
        let mut readings = self
            .readings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let reading = readings.entry(id.to_owned()).or_default();
        *reading += 1;
        *reading
    }
}

impl DemoContainer {
    fn handle(&self) -> ContainerHandle {
        let started_at = (Utc::now() - Duration::hours(self.uptime_hours)).to_rfc3339();
        ContainerHandle {
            id: self.id.to_owned(),
            short_id: short_id(self.id),
            name: self.name.to_owned(),
            image: self.image.to_owned(),
            status: if self.running { "running" } else { "exited" }.to_owned(),
            restart_count: self.restart_count,
            started_at: self.running.then_some(started_at),
        }
    }

    fn usage(&self, reading: u64) -> RawUsage {
        RawUsage {
            total_cpu_usage: reading * self.cpu_per_mille,
            system_cpu_usage: reading * SYSTEM_CPU_STEP,
            online_cpus: Some(1),
            percpu_count: Some(1),
            memory_usage: self.memory_usage,
            memory_limit: (self.memory_usage * 1_000)
                .checked_div(self.memory_per_mille)
                .unwrap_or(0),
            networks: vec![InterfaceCounters {
                rx_bytes: self.rx_bytes,
                tx_bytes: self.tx_bytes,
            }],
        }
    }
}

impl ContainerSource for DemoSource {
    async fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerHandle>> {
        Ok(CONTAINERS
            .iter()
            .filter(|container| include_stopped || container.running)
            .map(DemoContainer::handle)
            .collect())
    }

    async fn sample(
        &self,
        handle: &ContainerHandle,
    ) -> std::result::Result<RawUsage, SamplingError> {
        let container = CONTAINERS
            .iter()
            .find(|container| container.running && container.id == handle.id)
            .ok_or_else(|| SamplingError::NotFound {
                container: handle.name.clone(),
            })?;

        Ok(container.usage(self.next_reading(container.id)))
    }

    async fn engine_info(&self) -> Result<EngineInfo> {
        Ok(EngineInfo {
            version: "24.0.7".to_owned(),
            containers_total: 10,
            containers_running: 9,
            containers_paused: 0,
            containers_stopped: 1,
        })
    }
}
