use crate::cluster::ClusterBackend;
use crate::config::ControllerConfig;
use crate::probe::CompanionProbe;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};
use ws_core::token::TokenIssuer;
use ws_core::{Result, WorkspaceId, WsError};
use ws_model::{build_resource_set, WorkspaceConfig};

/// Lifecycle states of a registered workspace. `Deleted` is represented by
/// absence from the registry; no state ever re-enters `Provisioning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceStatus {
    Provisioning,
    Ready,
    Terminating,
}

/// Routable handle to a provisioned workspace, handed to callers.
#[derive(Debug, Clone)]
pub struct WorkspaceRef {
    pub id: WorkspaceId,
    pub base_url: String,
    /// Absent when the authority runs without a keypair (open access).
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    status: WorkspaceStatus,
    base_url: String,
}

/// Creates, observes and deletes workspaces.
pub struct LifecycleController {
    cluster: Arc<dyn ClusterBackend>,
    probe: Arc<dyn CompanionProbe>,
    config: ControllerConfig,
    issuer: Option<TokenIssuer>,
    registry: RwLock<HashMap<WorkspaceId, RegistryEntry>>,
}

impl LifecycleController {
    pub fn new(
        cluster: Arc<dyn ClusterBackend>,
        probe: Arc<dyn CompanionProbe>,
        config: ControllerConfig,
    ) -> Self {
        let issuer = match &config.jwt_secret {
            Some(secret) => Some(TokenIssuer::new(secret, config.token_ttl)),
            None => {
                warn!(
                    "no WORKSPACE_JWT_SECRET configured; workspace auth is DISABLED \
                     and every companion accepts unauthenticated requests"
                );
                None
            }
        };
        Self {
            cluster,
            probe,
            config,
            issuer,
            registry: RwLock::new(HashMap::new()),
        }
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterBackend> {
        &self.cluster
    }

    pub fn probe(&self) -> &Arc<dyn CompanionProbe> {
        &self.probe
    }

    /// Token the control plane itself uses when talking to a companion.
    pub fn system_token(&self, id: &WorkspaceId) -> Option<String> {
        self.issuer
            .as_ref()
            .and_then(|issuer| issuer.issue_system(id).ok())
    }

    pub fn status(&self, id: &WorkspaceId) -> Option<WorkspaceStatus> {
        self.registry
            .read()
            .expect("registry lock poisoned")
            .get(id)
            .map(|entry| entry.status)
    }

    /// Allocate a fresh identifier and provision a workspace for it.
    pub async fn create(
        &self,
        workspace: &WorkspaceConfig,
        subject: &str,
    ) -> Result<WorkspaceRef> {
        self.create_with_id(WorkspaceId::random(), workspace, subject)
            .await
    }

    /// Provision a workspace under a caller-chosen identifier. If that
    /// identifier is already provisioned, the existing reference is
    /// returned instead of creating anything.
    pub async fn create_with_id(
        &self,
        id: WorkspaceId,
        workspace: &WorkspaceConfig,
        subject: &str,
    ) -> Result<WorkspaceRef> {
        let base_url = workspace.base_url(&id);

        {
            let mut registry = self.registry.write().expect("registry lock poisoned");
            if let Some(entry) = registry.get(&id) {
                if entry.status == WorkspaceStatus::Ready {
                    debug!(%id, "workspace already exists, returning existing reference");
                    return self.make_ref(&id, entry.base_url.clone(), subject);
                }
                return Err(WsError::Provisioning(format!(
                    "workspace {id} is currently {:?}",
                    entry.status
                )));
            }
            registry.insert(
                id.clone(),
                RegistryEntry {
                    status: WorkspaceStatus::Provisioning,
                    base_url: base_url.clone(),
                },
            );
        }

        info!(%id, "provisioning workspace");
        match self.provision(&id, workspace, &base_url).await {
            Ok(()) => {
                self.set_status(&id, WorkspaceStatus::Ready);
                info!(%id, %base_url, "workspace ready");
                self.make_ref(&id, base_url, subject)
            }
            Err(e) => {
                // Tear down whatever was partially applied; the workspace
                // is left absent.
                warn!(%id, error = %e, "provisioning failed, cleaning up");
                if let Err(cleanup) = self.cluster.delete_labeled(&id).await {
                    warn!(%id, error = %cleanup, "cleanup after failed provisioning also failed");
                }
                self.remove_entry(&id);
                Err(e)
            }
        }
    }

    async fn provision(
        &self,
        id: &WorkspaceId,
        workspace: &WorkspaceConfig,
        base_url: &str,
    ) -> Result<()> {
        // The companion enforces tokens only when it knows the shared
        // secret; without one it falls back to open access.
        let mut workspace = workspace.clone();
        if let Some(secret) = &self.config.jwt_secret {
            workspace
                .environment
                .insert("WS_COMPANION_JWT_SECRET".to_string(), secret.clone());
        }
        let set = build_resource_set(id, &workspace);
        self.apply_with_retry(&set, id).await?;
        self.await_ready(id, base_url).await
    }

    /// Apply the resource set with bounded, doubling backoff.
    async fn apply_with_retry(&self, set: &ws_model::ResourceSet, id: &WorkspaceId) -> Result<()> {
        let mut backoff = self.config.apply_backoff;
        let mut last_error = None;
        for attempt in 1..=self.config.apply_attempts {
            match self.cluster.apply(set).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(%id, attempt, error = %e, "apply failed");
                    last_error = Some(e);
                    if attempt < self.config.apply_attempts {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        Err(WsError::Provisioning(format!(
            "could not apply resources for {id} after {} attempts: {}",
            self.config.apply_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Block until the pod reports ready and the companion answers its
    /// liveness endpoint, or the ready timeout elapses.
    async fn await_ready(&self, id: &WorkspaceId, base_url: &str) -> Result<()> {
        let deadline = Instant::now() + self.config.ready_timeout;
        let token = self.system_token(id);
        loop {
            let pod_ready = self.cluster.pod_ready(id).await.unwrap_or(false);
            if pod_ready && self.probe.is_live(base_url, token.as_deref()).await {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(WsError::Provisioning(format!(
                    "workspace {id} did not become ready within {:?}",
                    self.config.ready_timeout
                )));
            }
            tokio::time::sleep(self.config.ready_poll_interval).await;
        }
    }

    /// Delete every object of the workspace. Safe to call on a partially
    /// created or already deleted workspace.
    pub async fn delete(&self, id: &WorkspaceId) -> Result<()> {
        self.set_status(id, WorkspaceStatus::Terminating);
        let result = self.cluster.delete_labeled(id).await;
        // The entry goes away once the delete call has been issued; the
        // sweep re-discovers leftovers by label query and retries.
        self.remove_entry(id);
        match result {
            Ok(()) => {
                info!(%id, "workspace deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(WsError::Teardown(format!("deleting {id}: {e}"))),
        }
    }

    fn make_ref(&self, id: &WorkspaceId, base_url: String, subject: &str) -> Result<WorkspaceRef> {
        let auth_token = match &self.issuer {
            Some(issuer) => Some(issuer.issue(id, subject)?),
            None => None,
        };
        Ok(WorkspaceRef {
            id: id.clone(),
            base_url,
            auth_token,
        })
    }

    fn set_status(&self, id: &WorkspaceId, status: WorkspaceStatus) {
        if let Some(entry) = self
            .registry
            .write()
            .expect("registry lock poisoned")
            .get_mut(id)
        {
            entry.status = status;
        }
    }

    fn remove_entry(&self, id: &WorkspaceId) {
        self.registry
            .write()
            .expect("registry lock poisoned")
            .remove(id);
    }
}
