use std::path::PathBuf;

/// Companion settings, loaded from `WS_COMPANION_*` environment variables
/// set by the pod model.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,

    /// Root of the workspace file tree. All file operations are confined
    /// to this directory.
    pub files_root: PathBuf,

    /// Shared token secret. Auth is only enabled when both the secret and
    /// the workspace id are present.
    pub jwt_secret: Option<String>,

    /// Identifier of the workspace this companion serves; the expected
    /// token audience.
    pub workspace_id: Option<String>,
}

fn default_bind_addr() -> String {
    std::env::var("WS_COMPANION_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

fn default_files_root() -> PathBuf {
    std::env::var("WS_COMPANION_FILES_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./project"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            files_root: default_files_root(),
            jwt_secret: std::env::var("WS_COMPANION_JWT_SECRET").ok(),
            workspace_id: std::env::var("WS_COMPANION_WORKSPACE_ID").ok(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
