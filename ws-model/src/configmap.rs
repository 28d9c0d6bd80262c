use crate::config::WorkspaceConfig;
use crate::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ws_core::WorkspaceId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapModel {
    pub metadata: ObjectMeta,
    pub data: BTreeMap<String, String>,
}

/// Config map carrying the named bootstrap script bodies, mounted
/// read-only into the companion pod.
pub fn build_config_map(id: &WorkspaceId, config: &WorkspaceConfig) -> ConfigMapModel {
    ConfigMapModel {
        metadata: ObjectMeta::for_workspace(id),
        data: config.scripts.clone(),
    }
}
