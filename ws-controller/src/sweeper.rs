use crate::lifecycle::{LifecycleController, WorkspaceStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info};
use ws_core::WorkspaceId;
use ws_model::WorkspaceConfig;

/// Recurring idle sweep. Ticks at the configured check interval and tears
/// down workspaces whose companion has reported zero open connections for
/// at least the idle threshold. Terminates cleanly when `shutdown` flips
/// to `true`.
pub async fn run_idle_sweeper(
    controller: Arc<LifecycleController>,
    workspace: WorkspaceConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(workspace.idle_check_interval);
    // First tick fires immediately; skip it so fresh workspaces get a full
    // check interval before the first measurement.
    interval.tick().await;

    info!(
        interval = ?workspace.idle_check_interval,
        threshold = ?workspace.idle_threshold,
        "idle sweeper running"
    );

    let mut idle_since: HashMap<WorkspaceId, Instant> = HashMap::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                sweep_idle(&controller, &workspace, &mut idle_since, Instant::now()).await;
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("idle sweeper stopping");
                    return;
                }
            }
        }
    }
}

/// One sweep over all workspaces known to the cluster. Individual
/// workspace failures are logged and skipped; the sweep itself never
/// aborts. `idle_since` carries the first-seen-idle instants between
/// sweeps and is rebuilt on every call, so workspaces with renewed
/// activity lose their idle mark.
pub async fn sweep_idle(
    controller: &LifecycleController,
    workspace: &WorkspaceConfig,
    idle_since: &mut HashMap<WorkspaceId, Instant>,
    now: Instant,
) {
    let ids = match controller.cluster().list_workspaces().await {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, "could not list workspaces, skipping sweep");
            return;
        }
    };

    let mut still_idle: HashMap<WorkspaceId, Instant> = HashMap::new();

    for id in ids {
        // Workspaces still provisioning have no meaningful activity signal.
        if controller.status(&id) == Some(WorkspaceStatus::Provisioning) {
            continue;
        }

        let base_url = workspace.base_url(&id);
        let token = controller.system_token(&id);
        let connections = match controller
            .probe()
            .open_connections(&base_url, token.as_deref())
            .await
        {
            Ok(n) => n,
            Err(e) => {
                // Possibly starting up or shutting down; ignore this round.
                debug!(%id, error = %e, "workspace activity unavailable, skipping");
                continue;
            }
        };

        if connections > 0 {
            continue;
        }

        let first_idle = idle_since.get(&id).copied().unwrap_or(now);
        let idle_for = now.saturating_duration_since(first_idle);
        if idle_for >= workspace.idle_threshold {
            info!(%id, ?idle_for, "idle threshold exceeded, deleting workspace");
            if let Err(e) = controller.delete(&id).await {
                // Retried on the next sweep; double deletion is a no-op.
                error!(%id, error = %e, "idle teardown failed");
            }
        } else {
            debug!(%id, ?idle_for, "workspace idle, below threshold");
            still_idle.insert(id, first_idle);
        }
    }

    *idle_since = still_idle;
}
