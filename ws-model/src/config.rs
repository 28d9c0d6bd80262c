use std::collections::BTreeMap;
use std::time::Duration;
use ws_core::WorkspaceId;

/// Placeholder replaced with the workspace identifier when expanding the
/// base URL template.
pub const BASE_URL_ID_PLACEHOLDER: &str = "{workspace-id}";

/// Everything needed to provision one workspace. Supplied once at
/// provisioning time and immutable thereafter.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Companion image reference.
    pub image: String,

    /// Optional resource limits, in cluster quantity notation ("500m",
    /// "1Gi"). Applied as both request and limit.
    pub cpu_limit: Option<String>,
    pub memory_limit: Option<String>,
    pub disk_limit: Option<String>,

    /// Template for the externally routable base URL, containing
    /// `{workspace-id}`.
    pub base_url_template: String,

    /// Named bootstrap scripts, mounted read-only into the pod.
    pub scripts: BTreeMap<String, String>,

    /// Extra environment for the companion container. Orchestration
    /// variables set by the builder take precedence.
    pub environment: BTreeMap<String, String>,

    /// Zero-activity duration after which a workspace is torn down.
    pub idle_threshold: Duration,

    /// How often the idle sweep runs. Must be shorter than the threshold
    /// for timely teardown.
    pub idle_check_interval: Duration,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            image: "ghcr.io/workspaces/companion:latest".to_string(),
            cpu_limit: Some("1".to_string()),
            memory_limit: Some("1Gi".to_string()),
            disk_limit: Some("2Gi".to_string()),
            base_url_template: format!("http://workspaces.localhost/{BASE_URL_ID_PLACEHOLDER}"),
            scripts: BTreeMap::new(),
            environment: BTreeMap::new(),
            idle_threshold: Duration::from_secs(5 * 60),
            idle_check_interval: Duration::from_secs(30),
        }
    }
}

impl WorkspaceConfig {
    /// Expand the base URL template for one workspace.
    pub fn base_url(&self, id: &WorkspaceId) -> String {
        self.base_url_template
            .replace(BASE_URL_ID_PLACEHOLDER, &crate::resource_name(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_expands_identifier() {
        let config = WorkspaceConfig {
            base_url_template: "https://ws.example.com/{workspace-id}".to_string(),
            ..WorkspaceConfig::default()
        };
        let id = WorkspaceId::parse("abc123").unwrap();
        assert_eq!(config.base_url(&id), "https://ws.example.com/ws-abc123");
    }
}
