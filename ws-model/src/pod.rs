use crate::config::WorkspaceConfig;
use crate::{
    ObjectMeta, COMPANION_PORT, COMPANION_PORT_NAME, LIVENESS_PATH, READINESS_PATH,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ws_core::WorkspaceId;

/// Mount point of the workspace file tree inside the companion container.
pub const PROJECT_MOUNT_PATH: &str = "/home/runner/project";
/// Mount point of the bootstrap scripts.
pub const SCRIPTS_MOUNT_PATH: &str = "/scripts";

const PROJECT_VOLUME: &str = "project-files";
const SCRIPTS_VOLUME: &str = "scripts";

/// Script entries are mounted executable.
const SCRIPTS_FILE_MODE: i32 = 0o755;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodModel {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Keeps cluster service-discovery environment out of the companion.
    pub enable_service_links: bool,
    pub containers: Vec<Container>,
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    pub image_pull_policy: String,
    pub ports: Vec<ContainerPort>,
    pub env: BTreeMap<String, String>,
    pub resources: ResourceRequirements,
    pub volume_mounts: Vec<VolumeMount>,
    pub liveness_probe: Probe,
    pub readiness_probe: Probe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub name: String,
    pub container_port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    pub requests: BTreeMap<String, String>,
    pub limits: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    pub read_only: bool,
}

/// HTTP probe with thresholds generous enough to tolerate slow runtime
/// startup inside small resource limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub http_get: HttpGetAction,
    pub failure_threshold: u32,
    pub initial_delay_seconds: u32,
    pub period_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpGetAction {
    pub path: String,
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirVolume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapVolume>,
}

/// Size is capped through the container's ephemeral-storage limit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmptyDirVolume {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapVolume {
    pub name: String,
    pub default_mode: i32,
    pub items: Vec<KeyToPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyToPath {
    pub key: String,
    pub path: String,
}

fn quantity_map(config: &WorkspaceConfig) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(cpu) = &config.cpu_limit {
        map.insert("cpu".to_string(), cpu.clone());
    }
    if let Some(memory) = &config.memory_limit {
        map.insert("memory".to_string(), memory.clone());
    }
    if let Some(disk) = &config.disk_limit {
        map.insert("ephemeral-storage".to_string(), disk.clone());
    }
    map
}

pub fn build_pod(id: &WorkspaceId, config: &WorkspaceConfig) -> PodModel {
    // Caller-supplied environment first, orchestration variables win.
    let mut env = config.environment.clone();
    env.insert("WS_COMPANION_FILES_ROOT".to_string(), PROJECT_MOUNT_PATH.to_string());
    env.insert("WS_COMPANION_WORKSPACE_ID".to_string(), id.to_string());

    let quantities = quantity_map(config);

    PodModel {
        metadata: ObjectMeta::for_workspace(id),
        spec: PodSpec {
            enable_service_links: false,
            containers: vec![Container {
                name: "companion".to_string(),
                image: config.image.clone(),
                image_pull_policy: "IfNotPresent".to_string(),
                ports: vec![ContainerPort {
                    name: COMPANION_PORT_NAME.to_string(),
                    container_port: COMPANION_PORT,
                    protocol: "TCP".to_string(),
                }],
                env,
                resources: ResourceRequirements {
                    requests: quantities.clone(),
                    limits: quantities,
                },
                volume_mounts: vec![
                    VolumeMount {
                        name: PROJECT_VOLUME.to_string(),
                        mount_path: PROJECT_MOUNT_PATH.to_string(),
                        read_only: false,
                    },
                    VolumeMount {
                        name: SCRIPTS_VOLUME.to_string(),
                        mount_path: SCRIPTS_MOUNT_PATH.to_string(),
                        read_only: true,
                    },
                ],
                liveness_probe: Probe {
                    http_get: HttpGetAction {
                        path: LIVENESS_PATH.to_string(),
                        port: COMPANION_PORT_NAME.to_string(),
                    },
                    failure_threshold: 10,
                    initial_delay_seconds: 1,
                    period_seconds: 1,
                },
                readiness_probe: Probe {
                    http_get: HttpGetAction {
                        path: READINESS_PATH.to_string(),
                        port: COMPANION_PORT_NAME.to_string(),
                    },
                    failure_threshold: 20,
                    initial_delay_seconds: 1,
                    period_seconds: 1,
                },
            }],
            volumes: vec![
                Volume {
                    name: PROJECT_VOLUME.to_string(),
                    empty_dir: Some(EmptyDirVolume::default()),
                    config_map: None,
                },
                Volume {
                    name: SCRIPTS_VOLUME.to_string(),
                    empty_dir: None,
                    config_map: Some(ConfigMapVolume {
                        name: crate::resource_name(id),
                        default_mode: SCRIPTS_FILE_MODE,
                        items: config
                            .scripts
                            .keys()
                            .map(|name| KeyToPath {
                                key: name.clone(),
                                path: name.clone(),
                            })
                            .collect(),
                    }),
                },
            ],
        },
    }
}
