use crate::config::WorkspaceConfig;
use crate::{ObjectMeta, COMPANION_PORT_NAME};
use serde::{Deserialize, Serialize};
use ws_core::WorkspaceId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressModel {
    pub metadata: ObjectMeta,
    pub spec: IngressSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    pub rules: Vec<IngressRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub paths: Vec<HttpIngressPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpIngressPath {
    pub path: String,
    pub path_type: String,
    pub service_name: String,
    pub service_port: String,
}

/// Ingress rule routing the workspace-scoped path prefix to the service
/// root. The capture-group path plus the rewrite annotation strip the
/// prefix, so one shared ingress controller can host arbitrarily many
/// workspaces.
pub fn build_ingress(id: &WorkspaceId, config: &WorkspaceConfig) -> IngressModel {
    let base_url = config.base_url(id);
    let (host, path) = split_base_url(&base_url);

    let mut metadata = ObjectMeta::for_workspace(id);
    metadata.annotations.insert(
        "nginx.ingress.kubernetes.io/rewrite-target".to_string(),
        "/$2".to_string(),
    );
    metadata.annotations.insert(
        "nginx.ingress.kubernetes.io/proxy-body-size".to_string(),
        "10m".to_string(),
    );

    IngressModel {
        metadata,
        spec: IngressSpec {
            rules: vec![IngressRule {
                host,
                paths: vec![HttpIngressPath {
                    path: format!("{path}(/|$)(.*)"),
                    path_type: "Prefix".to_string(),
                    service_name: crate::resource_name(id),
                    service_port: COMPANION_PORT_NAME.to_string(),
                }],
            }],
        },
    }
}

/// Split an expanded base URL into ingress host and path prefix. The
/// trailing slash is dropped so the capture-group suffix matches both the
/// bare prefix and nested paths.
fn split_base_url(base_url: &str) -> (Option<String>, String) {
    let without_scheme = base_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base_url);
    match without_scheme.split_once('/') {
        Some((host, path)) => (
            Some(host.to_string()),
            format!("/{}", path.trim_end_matches('/')),
        ),
        None => (Some(without_scheme.to_string()), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_prefix_is_rewritten_to_service_root() {
        let id = WorkspaceId::parse("abc123").unwrap();
        let config = WorkspaceConfig {
            base_url_template: "https://ws.example.com/code/{workspace-id}".to_string(),
            ..WorkspaceConfig::default()
        };

        let ingress = build_ingress(&id, &config);
        let rule = &ingress.spec.rules[0];
        assert_eq!(rule.host.as_deref(), Some("ws.example.com"));
        assert_eq!(rule.paths[0].path, "/code/ws-abc123(/|$)(.*)");
        assert_eq!(
            ingress
                .metadata
                .annotations
                .get("nginx.ingress.kubernetes.io/rewrite-target")
                .unwrap(),
            "/$2"
        );
    }
}
