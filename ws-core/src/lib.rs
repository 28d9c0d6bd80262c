//! Shared foundation for the workspace subsystem.
//!
//! Holds the error taxonomy, workspace identifiers and the token authority
//! used by both the control plane (`ws-controller`) and the in-workspace
//! runtime (`ws-companion`).

pub mod error;
pub mod id;
pub mod token;

pub use error::{Result, WsError};
pub use id::WorkspaceId;
