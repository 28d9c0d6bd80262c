use crate::labels::workspace_labels;
use crate::{ObjectMeta, COMPANION_PORT, COMPANION_PORT_NAME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ws_core::WorkspaceId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceModel {
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub name: String,
    pub port: u16,
    pub target_port: String,
}

/// Cluster-internal service in front of the companion pod, selected by the
/// shared workspace labels.
pub fn build_service(id: &WorkspaceId) -> ServiceModel {
    ServiceModel {
        metadata: ObjectMeta::for_workspace(id),
        spec: ServiceSpec {
            selector: workspace_labels(id),
            ports: vec![ServicePort {
                name: COMPANION_PORT_NAME.to_string(),
                port: COMPANION_PORT,
                target_port: COMPANION_PORT_NAME.to_string(),
            }],
        },
    }
}
