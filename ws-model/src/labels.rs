use std::collections::BTreeMap;
use ws_core::WorkspaceId;

/// Label identifying the subsystem component an object belongs to.
pub const LABEL_COMPONENT: &str = "component";
/// Label carrying the owning workspace identifier.
pub const LABEL_WORKSPACE_ID: &str = "workspace-id";

/// Component value used for all companion-side objects.
pub const COMPONENT_COMPANION: &str = "workspace-companion";

/// The label set stamped on every object of a workspace's ResourceSet.
/// Objects are correlated only through these labels, never by direct
/// reference, so losing one object does not corrupt the rest.
pub fn workspace_labels(id: &WorkspaceId) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_COMPONENT.to_string(), COMPONENT_COMPANION.to_string()),
        (LABEL_WORKSPACE_ID.to_string(), id.to_string()),
    ])
}
