//! Declarative cluster resource models for workspaces.
//!
//! Pure, deterministic construction of the per-workspace ResourceSet:
//! a companion pod, a cluster-internal service, an ingress route and a
//! config map carrying bootstrap scripts. No I/O happens here; a cluster
//! backend in `ws-controller` applies the resulting shapes.
//!
//! All collections are `BTreeMap`s so building twice from the same inputs
//! serializes byte-identically, which is what makes re-apply safe.

pub mod config;
pub mod configmap;
pub mod ingress;
pub mod labels;
pub mod pod;
pub mod service;

use serde::{Deserialize, Serialize};
use ws_core::WorkspaceId;

pub use config::WorkspaceConfig;
pub use configmap::ConfigMapModel;
pub use ingress::IngressModel;
pub use pod::PodModel;
pub use service::ServiceModel;

/// Port the companion listens on inside the pod.
pub const COMPANION_PORT: u16 = 8080;
/// Named port referenced by service and probes.
pub const COMPANION_PORT_NAME: &str = "http";
/// Probe paths served by the companion.
pub const LIVENESS_PATH: &str = "/health/live";
pub const READINESS_PATH: &str = "/health/ready";

/// All objects of one workspace share a single derived name. Kinds differ,
/// so reusing the name across kinds is unambiguous.
pub fn resource_name(id: &WorkspaceId) -> String {
    format!("ws-{id}")
}

/// Metadata shared by every modeled object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub labels: std::collections::BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub annotations: std::collections::BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn for_workspace(id: &WorkspaceId) -> Self {
        Self {
            name: resource_name(id),
            labels: labels::workspace_labels(id),
            annotations: std::collections::BTreeMap::new(),
        }
    }
}

/// The group of cluster objects realizing one workspace, correlated purely
/// by shared labels so reconciliation can re-derive the set by label query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSet {
    pub pod: PodModel,
    pub service: ServiceModel,
    pub ingress: IngressModel,
    pub config_map: ConfigMapModel,
}

/// Build the complete ResourceSet for a workspace. Idempotent: the same
/// inputs always yield the same specification.
pub fn build_resource_set(id: &WorkspaceId, config: &WorkspaceConfig) -> ResourceSet {
    ResourceSet {
        pod: pod::build_pod(id, config),
        service: service::build_service(id),
        ingress: ingress::build_ingress(id, config),
        config_map: configmap::build_config_map(id, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{workspace_labels, LABEL_WORKSPACE_ID};

    fn test_config() -> WorkspaceConfig {
        WorkspaceConfig {
            image: "companion:latest".into(),
            scripts: [("run".to_string(), "#!/bin/sh\nexit 0\n".to_string())].into(),
            ..WorkspaceConfig::default()
        }
    }

    #[test]
    fn building_twice_is_byte_identical() {
        let id = WorkspaceId::parse("abc123").unwrap();
        let config = test_config();

        let a = serde_json::to_vec(&build_resource_set(&id, &config)).unwrap();
        let b = serde_json::to_vec(&build_resource_set(&id, &config)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_object_carries_the_workspace_labels() {
        let id = WorkspaceId::parse("abc123").unwrap();
        let set = build_resource_set(&id, &test_config());
        let expected = workspace_labels(&id);

        assert_eq!(set.pod.metadata.labels, expected);
        assert_eq!(set.service.metadata.labels, expected);
        assert_eq!(set.ingress.metadata.labels, expected);
        assert_eq!(set.config_map.metadata.labels, expected);
        assert_eq!(expected.get(LABEL_WORKSPACE_ID).unwrap(), "abc123");
    }
}
