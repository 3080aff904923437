use std::cmp::Ordering;

use crate::alert::{self, Thresholds};
use crate::config::{Config, SortKey, SortOrder};
use crate::engine::{self, ContainerSource};
use crate::format::{UNKNOWN_UPTIME, format_uptime};
use crate::host::HostProbe;
use crate::sampler::StatsSampler;
use crate::snapshot::{ContainerRecord, Snapshot, SystemSnapshot};

/// Builds one [`Snapshot`] per call from a [`ContainerSource`].
///
/// Holds no state between calls besides the settings it was created with.
#[derive(Debug, Clone)]
pub struct Aggregator {
    sampler: StatsSampler,
    show_stopped: bool,
    thresholds: Thresholds,
    sort_by: SortKey,
    sort_order: SortOrder,
}

impl Aggregator {
    pub fn new(config: &Config, sampler: StatsSampler) -> Self {
        Self {
            sampler,
            show_stopped: config.show_stopped,
            thresholds: config.thresholds,
            sort_by: config.sort_by,
            sort_order: config.sort_order,
        }
    }

    /// Collects a complete snapshot.
    ///
    /// Containers are sampled one after another. A container whose stats
    /// cannot be read is still reported, with zeroed metrics and no alerts.
    ///
    /// # Errors
    ///
    /// Fails only if the container list or the engine info cannot be fetched.
    pub async fn collect<S, H>(&self, source: &S, host: &mut H) -> engine::Result<Snapshot>
    where
        S: ContainerSource + Sync,
        H: HostProbe,
    {
        let handles = source.list_containers(self.show_stopped).await?;
        log::debug!("Found {} containers", handles.len());

        let mut records = Vec::with_capacity(handles.len());
        for handle in &handles {
            if !handle.is_running() {
                records.push(ContainerRecord::stopped(handle));
                continue;
            }

            let uptime = handle
                .started_at
                .as_deref()
                .map(format_uptime)
                .unwrap_or_else(|| UNKNOWN_UPTIME.to_owned());
            let metrics = self.sampler.sample_or_zeroed(source, handle).await;
            let alerts =
                alert::evaluate(metrics.cpu_percent, metrics.memory_percent, self.thresholds);
            if alerts.has_alert() {
                log::debug!("container {} alerts: {:?}", handle.name, alerts.messages());
            }
            records.push(ContainerRecord::new(handle, Some(uptime), metrics, alerts));
        }

        sort_records(&mut records, self.sort_by, self.sort_order);

        let engine = source.engine_info().await?;
        let host = host.usage().await;

        Ok(Snapshot::new(records, SystemSnapshot::new(engine, host)))
    }
}

/// Orders `records` by `key` in the given direction.
///
/// The sort is stable in both directions: records with equal keys keep their
/// relative order.
pub fn sort_records(records: &mut [ContainerRecord], key: SortKey, order: SortOrder) {
    let compare = |a: &ContainerRecord, b: &ContainerRecord| -> Ordering {
        match key {
            SortKey::Cpu => a.cpu_percent.total_cmp(&b.cpu_percent),
            SortKey::Memory => a.memory_percent.total_cmp(&b.memory_percent),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Status => a.status.cmp(&b.status),
        }
    };

    match order {
        SortOrder::Asc => records.sort_by(compare),
        SortOrder::Desc => records.sort_by(|a, b| compare(b, a)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ContainerHandle, EngineInfo, RawUsage, SamplingError};
    use crate::host::HostUsage;
    use crate::sampler::tests::{ScriptedSource, handle, reading};
    use std::time::Duration;

    struct FixedHost;

    impl HostProbe for FixedHost {
        async fn usage(&mut self) -> HostUsage {
            HostUsage {
                cpu_percent: 7.5,
                memory_percent: 33.3,
            }
        }
    }

    fn config(sort_by: SortKey, sort_order: SortOrder, show_stopped: bool) -> Config {
        Config {
            docker_host: "unix:///var/run/docker.sock".to_owned(),
            api_version: "1.41".to_owned(),
            show_stopped,
            thresholds: Thresholds::default(),
            sort_by,
            sort_order,
            webhook_url: "http://127.0.0.1:9/hook".to_owned(),
            refresh_interval: Duration::from_secs(30),
        }
    }

    fn aggregator(sort_by: SortKey, sort_order: SortOrder, show_stopped: bool) -> Aggregator {
        Aggregator::new(
            &config(sort_by, sort_order, show_stopped),
            StatsSampler::new(Duration::ZERO),
        )
    }

    fn record(name: &str, status: &str, cpu: f64) -> ContainerRecord {
        ContainerRecord {
            cpu_percent: cpu,
            ..ContainerRecord::stopped(&handle(name, name, status))
        }
    }

    fn names(records: &[ContainerRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_sort_cpu_descending() {
        let mut records = vec![
            record("a", "running", 10.0),
            record("b", "running", 50.0),
            record("c", "running", 30.0),
        ];
        sort_records(&mut records, SortKey::Cpu, SortOrder::Desc);
        let cpus: Vec<f64> = records.iter().map(|r| r.cpu_percent).collect();
        assert_eq!(cpus, [50.0, 30.0, 10.0]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut records = vec![
            record("first", "running", 20.0),
            record("second", "running", 20.0),
            record("top", "running", 90.0),
            record("third", "running", 20.0),
        ];
        sort_records(&mut records, SortKey::Cpu, SortOrder::Desc);
        assert_eq!(names(&records), ["top", "first", "second", "third"]);

        sort_records(&mut records, SortKey::Cpu, SortOrder::Asc);
        assert_eq!(names(&records), ["first", "second", "third", "top"]);
    }

    #[test]
    fn test_sort_by_name_and_status() {
        let mut records = vec![
            record("redis", "running", 0.0),
            record("api", "exited", 0.0),
            record("nginx", "running", 0.0),
        ];
        sort_records(&mut records, SortKey::Name, SortOrder::Asc);
        assert_eq!(names(&records), ["api", "nginx", "redis"]);

        sort_records(&mut records, SortKey::Status, SortOrder::Desc);
        assert_eq!(names(&records), ["nginx", "redis", "api"]);
    }

    fn source() -> ScriptedSource {
        ScriptedSource {
            handles: vec![
                handle("a", "alpha", "running"),
                handle("b", "broken", "running"),
                handle("c", "cold", "exited"),
                handle("d", "delta", "running"),
            ],
            ..Default::default()
        }
        .with_readings("a", vec![reading(0, 0), reading(100, 1_000)])
        .with_readings("d", vec![reading(0, 0), reading(900, 1_000)])
    }

    #[tokio::test]
    async fn test_collect_isolates_sampling_failures() {
        let snapshot = aggregator(SortKey::Cpu, SortOrder::Desc, true)
            .collect(&source(), &mut FixedHost)
            .await
            .unwrap();

        assert_eq!(names(snapshot.containers()), ["delta", "alpha", "broken", "cold"]);

        let delta = &snapshot.containers()[0];
        assert_eq!(delta.cpu_percent, 90.0);
        assert!(delta.has_alert);
        assert_eq!(delta.alert_messages, ["High CPU usage: 90.0%"]);

        let alpha = &snapshot.containers()[1];
        assert_eq!(alpha.cpu_percent, 10.0);
        assert!(!alpha.has_alert);

        let broken = &snapshot.containers()[2];
        assert_eq!(broken.status, "running");
        assert_eq!(broken.cpu_percent, 0.0);
        assert_eq!(broken.memory_percent, 0.0);
        assert!(!broken.has_alert);
        assert!(broken.alert_messages.is_empty());
        assert!(broken.uptime.is_some());

        let cold = &snapshot.containers()[3];
        assert_eq!(cold.uptime, None);
        assert!(!cold.has_alert);
    }

    #[tokio::test]
    async fn test_collect_attaches_system_counters() {
        let snapshot = aggregator(SortKey::Name, SortOrder::Asc, false)
            .collect(&source(), &mut FixedHost)
            .await
            .unwrap();

        assert_eq!(names(snapshot.containers()), ["alpha", "broken", "delta"]);
        let system = snapshot.system();
        assert_eq!(system.docker_version, "27.1.1");
        assert_eq!(system.containers_total, 4);
        assert_eq!(system.containers_running, 3);
        assert_eq!(system.containers_stopped, 1);
        assert_eq!(system.cpu_percent, 7.5);
        assert_eq!(system.memory_percent, 33.3);
    }

    #[tokio::test]
    async fn test_alert_invariant_holds_for_demo_data() {
        let snapshot = aggregator(SortKey::Cpu, SortOrder::Desc, true)
            .collect(&crate::engine::DemoSource::new(), &mut FixedHost)
            .await
            .unwrap();

        assert_eq!(snapshot.containers().len(), 6);
        for record in snapshot.containers() {
            assert_eq!(record.has_alert, !record.alert_messages.is_empty());
        }
        let top = &snapshot.containers()[0];
        assert_eq!(top.name, "api-backend");
        assert_eq!(top.cpu_percent, 85.3);
        assert_eq!(top.alert_messages, ["High CPU usage: 85.3%"]);
    }

    struct UnreachableEngine;

    impl ContainerSource for UnreachableEngine {
        async fn list_containers(&self, _: bool) -> engine::Result<Vec<ContainerHandle>> {
            Err(engine::Error::Request {
                operation: "list containers",
                source: bollard::errors::Error::DockerResponseServerError {
                    status_code: 503,
                    message: "engine down".to_owned(),
                },
            })
        }

        async fn sample(&self, handle: &ContainerHandle) -> Result<RawUsage, SamplingError> {
            Err(SamplingError::NotFound {
                container: handle.name.clone(),
            })
        }

        async fn engine_info(&self) -> engine::Result<EngineInfo> {
            unreachable!("listing fails first")
        }
    }

    #[tokio::test]
    async fn test_collect_propagates_engine_failure() {
        let err = aggregator(SortKey::Cpu, SortOrder::Desc, false)
            .collect(&UnreachableEngine, &mut FixedHost)
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
    }
}
