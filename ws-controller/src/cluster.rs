use async_trait::async_trait;
use ws_core::{Result, WorkspaceId};
use ws_model::ResourceSet;

/// Abstraction over the cluster API.
///
/// Implementations translate the declarative [`ResourceSet`] shapes into
/// whatever API version the cluster speaks. Objects are always addressed
/// through the shared workspace labels, never by stored references.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// Create or replace every object in the set. Re-applying an identical
    /// set must be a no-op.
    async fn apply(&self, set: &ResourceSet) -> Result<()>;

    /// Delete every object carrying the identifier's labels. Absent
    /// objects are ignored, so double deletion is a no-op.
    async fn delete_labeled(&self, id: &WorkspaceId) -> Result<()>;

    /// Whether the workspace pod reports ready.
    async fn pod_ready(&self, id: &WorkspaceId) -> Result<bool>;

    /// Identifiers of all workspaces currently present, derived by label
    /// query.
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceId>>;
}
