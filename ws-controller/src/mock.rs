//! In-memory cluster and probe implementations for tests.

use crate::cluster::ClusterBackend;
use crate::probe::CompanionProbe;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use ws_core::{Result, WorkspaceId, WsError};
use ws_model::ResourceSet;

/// Cluster backend that stores applied resource sets in a map. Optionally
/// fails the first N apply calls to exercise the retry path.
#[derive(Default)]
pub struct MockCluster {
    objects: Mutex<HashMap<WorkspaceId, ResourceSet>>,
    failing_applies: AtomicU32,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` apply calls fail.
    pub fn fail_next_applies(&self, n: u32) {
        self.failing_applies.store(n, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &WorkspaceId) -> bool {
        self.objects.lock().unwrap().contains_key(id)
    }

    pub fn applied_set(&self, id: &WorkspaceId) -> Option<ResourceSet> {
        self.objects.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl ClusterBackend for MockCluster {
    async fn apply(&self, set: &ResourceSet) -> Result<()> {
        let remaining = self.failing_applies.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_applies.store(remaining - 1, Ordering::SeqCst);
            return Err(WsError::Provisioning("injected apply failure".into()));
        }
        let id = WorkspaceId::parse(
            set.pod
                .metadata
                .labels
                .get(ws_model::labels::LABEL_WORKSPACE_ID)
                .expect("resource set without workspace-id label"),
        )?;
        self.objects.lock().unwrap().insert(id, set.clone());
        Ok(())
    }

    async fn delete_labeled(&self, id: &WorkspaceId) -> Result<()> {
        self.objects.lock().unwrap().remove(id);
        Ok(())
    }

    async fn pod_ready(&self, id: &WorkspaceId) -> Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(id))
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceId>> {
        Ok(self.objects.lock().unwrap().keys().cloned().collect())
    }
}

/// Probe returning scripted connection counts per base URL.
pub struct MockProbe {
    connections: Mutex<HashMap<String, u64>>,
    live: Mutex<bool>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            live: Mutex::new(true),
        }
    }

    pub fn set_live(&self, live: bool) {
        *self.live.lock().unwrap() = live;
    }

    pub fn set_connections(&self, base_url: &str, n: u64) {
        self.connections
            .lock()
            .unwrap()
            .insert(base_url.to_string(), n);
    }
}

#[async_trait]
impl CompanionProbe for MockProbe {
    async fn is_live(&self, _base_url: &str, _token: Option<&str>) -> bool {
        *self.live.lock().unwrap()
    }

    async fn open_connections(&self, base_url: &str, _token: Option<&str>) -> Result<u64> {
        self.connections
            .lock()
            .unwrap()
            .get(base_url)
            .copied()
            .ok_or_else(|| WsError::Teardown(format!("no scripted activity for {base_url}")))
    }
}
