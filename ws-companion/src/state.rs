use std::sync::Arc;

use crate::activity::ActivityCounter;
use crate::auth::{auth_mode, AuthMode};
use crate::config::Config;
use crate::files::FileStore;
use crate::process::ProcessManager;
use ws_core::Result;

/// Shared handler state. Cheap to clone; all fields are handles.
#[derive(Clone)]
pub struct AppState {
    pub files: Arc<FileStore>,
    pub processes: Arc<ProcessManager>,
    pub activity: Arc<ActivityCounter>,
    pub auth: AuthMode,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let files = Arc::new(FileStore::new(config.files_root.clone())?);
        let processes = Arc::new(ProcessManager::new(config.files_root.clone()));
        Ok(Self {
            files,
            processes,
            activity: ActivityCounter::new(),
            auth: auth_mode(config),
        })
    }
}
