use std::sync::Mutex;

use bollard::models::{ContainerInspectResponse, ContainerStatsResponse, ImageInspect};
use bollard::query_parameters::{InspectContainerOptions, ListContainersOptions, StatsOptions};
use bollard::{ClientVersion, Docker};
use futures::StreamExt;

use super::{
    ContainerHandle, ContainerSource, EngineInfo, Error, InterfaceCounters, RawUsage, Result,
    SamplingError, short_id, short_image_id,
};

/// Request timeout for engine calls, in seconds.
const ENGINE_TIMEOUT_SECS: u64 = 60;

/// Live container data from a Docker engine.
///
/// The engine client is built on first use and rebuilt after a failed
/// attempt, so an engine that is down at startup, or comes up later, is
/// handled per query like any other outage.
pub struct DockerSource {
    host: String,
    version: ClientVersion,
    client: Mutex<Option<Docker>>,
}

impl DockerSource {
    /// Prepares a source for the engine at `host`.
    ///
    /// `host` is either `unix:///path/to/docker.sock` or a `tcp://`/`http://`
    /// address. `api_version` is the API version to speak, e.g. `1.41`.
    /// The engine is not contacted here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidApiVersion`] for a malformed version string.
    pub fn new(host: impl Into<String>, api_version: &str) -> Result<Self> {
        let host = host.into();
        let version = parse_api_version(api_version)?;
        log::debug!("Using docker engine at {host} (api {api_version})");

        Ok(Self {
            host,
            version,
            client: Mutex::new(None),
        })
    }

    /// Returns the engine client, connecting if there is none yet.
    fn client(&self) -> Result<Docker> {
        let mut client = self
            .client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(docker) = client.as_ref() {
            return Ok(docker.clone());
        }

        let docker = match self.host.strip_prefix("unix://") {
            Some(socket_path) => {
                Docker::connect_with_socket(socket_path, ENGINE_TIMEOUT_SECS, &self.version)
            }
            None => Docker::connect_with_http(&self.host, ENGINE_TIMEOUT_SECS, &self.version),
        }
        .map_err(|source| Error::Connect {
            host: self.host.clone(),
            source,
        })?;

        *client = Some(docker.clone());
        Ok(docker)
    }

    async fn inspect(&self, docker: &Docker, id: &str) -> Result<ContainerHandle> {
        let details = docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|source| Error::Request {
                operation: "inspect container",
                source,
            })?;

        let image = match details.image.as_deref() {
            Some(image_id) => image_label(docker, image_id).await,
            None => "unknown".to_owned(),
        };
        Ok(handle_from_inspect(id, details, image))
    }
}

/// First repository tag of the image, or its short id if it has none.
async fn image_label(docker: &Docker, image_id: &str) -> String {
    match docker.inspect_image(image_id).await {
        Ok(image) => label_from_image(&image, image_id),
        Err(err) => {
            log::debug!("failed to inspect image {image_id}: {err}");
            short_image_id(image_id)
        }
    }
}

fn label_from_image(image: &ImageInspect, image_id: &str) -> String {
    image
        .repo_tags
        .as_ref()
        .and_then(|tags| tags.first().cloned())
        .unwrap_or_else(|| short_image_id(image.id.as_deref().unwrap_or(image_id)))
}

/// Builds a handle from inspect output; `image` is the already resolved label.
fn handle_from_inspect(
    id: &str,
    details: ContainerInspectResponse,
    image: String,
) -> ContainerHandle {
    let state = details.state.unwrap_or_default();
    let name = details
        .name
        .as_deref()
        .map(|name| name.trim_start_matches('/').to_owned())
        .unwrap_or_else(|| short_id(id));

    ContainerHandle {
        id: id.to_owned(),
        short_id: short_id(id),
        name,
        image,
        status: state
            .status
            .map(|status| status.to_string())
            .unwrap_or_else(|| "unknown".to_owned()),
        restart_count: details
            .restart_count
            .and_then(|count| u64::try_from(count).ok())
            .unwrap_or(0),
        started_at: state.started_at,
    }
}

/// Extracts the counters of one stats response for container `name`.
fn raw_usage(
    stats: &ContainerStatsResponse,
    name: &str,
) -> std::result::Result<RawUsage, SamplingError> {
    let missing = |field| SamplingError::MissingField {
        container: name.to_owned(),
        field,
    };
    let cpu_stats = stats.cpu_stats.as_ref().ok_or_else(|| missing("cpu_stats"))?;
    let cpu_usage = cpu_stats
        .cpu_usage
        .as_ref()
        .ok_or_else(|| missing("cpu_stats.cpu_usage"))?;
    let memory_stats = stats
        .memory_stats
        .as_ref()
        .ok_or_else(|| missing("memory_stats"))?;

    Ok(RawUsage {
        total_cpu_usage: cpu_usage
            .total_usage
            .ok_or_else(|| missing("cpu_stats.cpu_usage.total_usage"))?,
        system_cpu_usage: cpu_stats
            .system_cpu_usage
            .ok_or_else(|| missing("cpu_stats.system_cpu_usage"))?,
        online_cpus: cpu_stats.online_cpus,
        percpu_count: cpu_usage.percpu_usage.as_ref().map(Vec::len),
        memory_usage: memory_stats.usage.unwrap_or(0),
        memory_limit: memory_stats.limit.unwrap_or(1),
        networks: stats
            .networks
            .as_ref()
            .map(|networks| {
                networks
                    .values()
                    .map(|iface| InterfaceCounters {
                        rx_bytes: iface.rx_bytes.unwrap_or(0),
                        tx_bytes: iface.tx_bytes.unwrap_or(0),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    })
}

impl ContainerSource for DockerSource {
    async fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerHandle>> {
        let docker = self.client()?;
        let options = ListContainersOptions {
            all: include_stopped,
            ..Default::default()
        };
        let summaries = docker
            .list_containers(Some(options))
            .await
            .map_err(|source| Error::Request {
                operation: "list containers",
                source,
            })?;

        let mut handles = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = summary.id.ok_or_else(|| Error::MalformedResponse {
                operation: "list containers",
                reason: "container without id".to_owned(),
            })?;
            match self.inspect(&docker, &id).await {
                Ok(handle) => handles.push(handle),
                Err(err) if err.is_not_found() => {
                    log::debug!("container {id} disappeared before it could be inspected");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(handles)
    }

    async fn sample(
        &self,
        handle: &ContainerHandle,
    ) -> std::result::Result<RawUsage, SamplingError> {
        let docker = self.client().map_err(|source| SamplingError::Unavailable {
            container: handle.name.clone(),
            source,
        })?;
        let options = StatsOptions {
            stream: false,
            ..Default::default()
        };
        let mut stats_stream = docker.stats(&handle.id, Some(options));
        let stats = stats_stream
            .next()
            .await
            .ok_or_else(|| SamplingError::StreamEnded {
                container: handle.name.clone(),
            })?
            .map_err(|source| SamplingError::Request {
                container: handle.name.clone(),
                source,
            })?;

        raw_usage(&stats, &handle.name)
    }

    async fn engine_info(&self) -> Result<EngineInfo> {
        let info = self
            .client()?
            .info()
            .await
            .map_err(|source| Error::Request {
                operation: "info",
                source,
            })?;

        Ok(EngineInfo {
            version: info.server_version.unwrap_or_else(|| "unknown".to_owned()),
            containers_total: count(info.containers),
            containers_running: count(info.containers_running),
            containers_paused: count(info.containers_paused),
            containers_stopped: count(info.containers_stopped),
        })
    }
}

fn count(value: Option<i64>) -> u64 {
    value.and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
}

/// Parses a `<major>.<minor>` API version string.
fn parse_api_version(src: &str) -> Result<ClientVersion> {
    let invalid = || Error::InvalidApiVersion(src.to_owned());
    let (major, minor) = src.trim().split_once('.').ok_or_else(invalid)?;

    Ok(ClientVersion {
        major_version: major.parse().map_err(|_| invalid())?,
        minor_version: minor.parse().map_err(|_| invalid())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{
        ContainerCpuStats, ContainerCpuUsage, ContainerMemoryStats, ContainerNetworkStats,
        ContainerState, ContainerStateStatusEnum,
    };
    use std::collections::HashMap;

    const MISSING_SOCKET: &str = "unix:///tmp/trmnl-docker-monitor-no-such.sock";

    fn stats() -> ContainerStatsResponse {
        ContainerStatsResponse {
            cpu_stats: Some(ContainerCpuStats {
                cpu_usage: Some(ContainerCpuUsage {
                    total_usage: Some(4_000),
                    percpu_usage: Some(vec![1_000, 1_000, 1_000, 1_000]),
                    ..Default::default()
                }),
                system_cpu_usage: Some(90_000),
                online_cpus: None,
                ..Default::default()
            }),
            memory_stats: Some(ContainerMemoryStats {
                usage: Some(512),
                limit: Some(2_048),
                ..Default::default()
            }),
            networks: Some(HashMap::from([
                (
                    "eth0".to_owned(),
                    ContainerNetworkStats {
                        rx_bytes: Some(1_000),
                        tx_bytes: Some(10),
                        ..Default::default()
                    },
                ),
                (
                    "eth1".to_owned(),
                    ContainerNetworkStats {
                        rx_bytes: Some(24),
                        tx_bytes: None,
                        ..Default::default()
                    },
                ),
            ])),
            ..Default::default()
        }
    }

    #[test]
    fn test_raw_usage_from_stats() {
        let raw = raw_usage(&stats(), "web").unwrap();
        assert_eq!(raw.total_cpu_usage, 4_000);
        assert_eq!(raw.system_cpu_usage, 90_000);
        assert_eq!(raw.online_cpus, None);
        assert_eq!(raw.percpu_count, Some(4));
        assert_eq!(raw.num_cpus(), 4);
        assert_eq!(raw.memory_usage, 512);
        assert_eq!(raw.memory_limit, 2_048);
        assert_eq!(
            raw.network_totals(),
            InterfaceCounters {
                rx_bytes: 1_024,
                tx_bytes: 10
            }
        );
    }

    #[test]
    fn test_raw_usage_defaults_optional_counters() {
        let mut response = stats();
        response.memory_stats = Some(ContainerMemoryStats::default());
        response.networks = None;

        let raw = raw_usage(&response, "web").unwrap();
        assert_eq!(raw.memory_usage, 0);
        assert_eq!(raw.memory_limit, 1);
        assert!(raw.networks.is_empty());
    }

    #[test]
    fn test_raw_usage_missing_fields() {
        match raw_usage(&ContainerStatsResponse::default(), "web") {
            Err(SamplingError::MissingField { container, field }) => {
                assert_eq!(container, "web");
                assert_eq!(field, "cpu_stats");
            }
            other => panic!("Expected MissingField error, got {other:?}"),
        }

        let mut response = stats();
        if let Some(cpu_stats) = response.cpu_stats.as_mut() {
            cpu_stats.system_cpu_usage = None;
        }
        match raw_usage(&response, "web") {
            Err(SamplingError::MissingField { field, .. }) => {
                assert_eq!(field, "cpu_stats.system_cpu_usage");
            }
            other => panic!("Expected MissingField error, got {other:?}"),
        }
    }

    #[test]
    fn test_handle_from_inspect() {
        let details = ContainerInspectResponse {
            name: Some("/nginx-web".to_owned()),
            restart_count: Some(2),
            state: Some(ContainerState {
                status: Some(ContainerStateStatusEnum::RUNNING),
                started_at: Some("2025-01-01T00:00:00.123456789Z".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let id = "3f4e8a1b2c9d0e7f6a5b4c3d2e1f0a9b";

        let handle = handle_from_inspect(id, details, "nginx:alpine".to_owned());
        assert_eq!(handle.id, id);
        assert_eq!(handle.short_id, "3f4e8a1b2c9d");
        assert_eq!(handle.name, "nginx-web");
        assert_eq!(handle.image, "nginx:alpine");
        assert_eq!(handle.status, "running");
        assert!(handle.is_running());
        assert_eq!(handle.restart_count, 2);
        assert_eq!(
            handle.started_at.as_deref(),
            Some("2025-01-01T00:00:00.123456789Z")
        );
    }

    #[test]
    fn test_handle_from_empty_inspect() {
        let handle = handle_from_inspect(
            "3f4e8a1b2c9d0e7f",
            ContainerInspectResponse::default(),
            "unknown".to_owned(),
        );
        assert_eq!(handle.name, "3f4e8a1b2c9d");
        assert_eq!(handle.status, "unknown");
        assert_eq!(handle.restart_count, 0);
        assert_eq!(handle.started_at, None);

        let negative = ContainerInspectResponse {
            restart_count: Some(-1),
            ..Default::default()
        };
        assert_eq!(
            handle_from_inspect("abc", negative, String::new()).restart_count,
            0
        );
    }

    #[test]
    fn test_label_prefers_first_repo_tag() {
        let tagged = ImageInspect {
            id: Some("sha256:0123456789abcdef".to_owned()),
            repo_tags: Some(vec!["redis:7-alpine".to_owned(), "redis:7".to_owned()]),
            ..Default::default()
        };
        assert_eq!(label_from_image(&tagged, "sha256:0123456789abcdef"), "redis:7-alpine");

        let untagged = ImageInspect {
            id: Some("sha256:fedcba9876543210".to_owned()),
            repo_tags: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(label_from_image(&untagged, "ignored"), "sha256:fedcba9876");

        assert_eq!(
            label_from_image(&ImageInspect::default(), "sha256:0123456789abcdef"),
            "sha256:0123456789"
        );
    }

    #[test]
    fn test_parse_api_version() {
        let version = parse_api_version("1.41").unwrap();
        assert_eq!(version.major_version, 1);
        assert_eq!(version.minor_version, 41);
    }

    #[test]
    fn test_parse_api_version_rejects_garbage() {
        for src in ["", "1", "latest", "1.x", "v1.41"] {
            let err = parse_api_version(src).unwrap_err();
            assert!(matches!(err, Error::InvalidApiVersion(ref s) if s == src));
        }
    }

    #[test]
    fn test_count_clamps_missing_and_negative() {
        assert_eq!(count(Some(7)), 7);
        assert_eq!(count(Some(-1)), 0);
        assert_eq!(count(None), 0);
    }

    #[test]
    fn test_new_rejects_invalid_api_version() {
        let err = DockerSource::new("unix:///var/run/docker.sock", "one")
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidApiVersion(_)));
    }

    #[tokio::test]
    async fn test_missing_socket_is_a_connectivity_error() {
        let source = DockerSource::new(MISSING_SOCKET, "1.41").unwrap();

        let err = source.list_containers(false).await.unwrap_err();
        assert!(matches!(err, Error::Connect { .. }), "{err}");
        assert!(err.is_connectivity());

        let err = source.engine_info().await.unwrap_err();
        assert!(err.is_connectivity());
    }
}
