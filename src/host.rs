//! Host-wide CPU and memory utilisation.
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use crate::format::round1;

/// Host utilisation at sample time, both in percent and rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

pub trait HostProbe {
    /// Measures current host utilisation.
    fn usage(&mut self) -> impl std::future::Future<Output = HostUsage> + Send;
}

/// [`HostProbe`] backed by `sysinfo`.
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new_with_specifics(
                RefreshKind::nothing()
                    .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                    .with_memory(MemoryRefreshKind::nothing().with_ram()),
            ),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoProbe {
    async fn usage(&mut self) -> HostUsage {
        // CPU usage is a delta between two refreshes at least this far apart.
        self.system.refresh_cpu_usage();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu_percent = f64::from(self.system.global_cpu_usage()).clamp(0.0, 100.0);
        let memory_percent = memory_percent(self.system.used_memory(), self.system.total_memory());
        log::trace!("host usage: cpu={cpu_percent:.1}% memory={memory_percent:.1}%");

        HostUsage {
            cpu_percent: round1(cpu_percent),
            memory_percent: round1(memory_percent),
        }
    }
}

fn memory_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
