use thiserror::Error;

pub type Result<T> = std::result::Result<T, WsError>;

/// Error taxonomy shared across the subsystem.
///
/// Client-facing layers map these onto HTTP status codes; the lifecycle
/// controller never exposes raw cluster error text, it classifies into one
/// of these variants first.
#[derive(Error, Debug)]
pub enum WsError {
    /// A client-supplied path failed normalization or would escape the
    /// workspace root.
    #[error("invalid path: {0}")]
    PathValidation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A structurally impossible file operation, e.g. creating a file where
    /// a directory is required.
    #[error("conflict: {0}")]
    StructuralConflict(String),

    /// Cluster API failure after the retry budget is exhausted. The
    /// workspace is left absent.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// Delete-side failure. Logged and retried on the next sweep, never
    /// surfaced to callers.
    #[error("teardown failed: {0}")]
    Teardown(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("process error: {0}")]
    Process(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WsError {
    pub fn not_found(what: impl Into<String>) -> Self {
        WsError::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WsError::NotFound(_))
    }
}
