//! Companion runtime that serves the file and process APIs inside one
//! workspace.
//!
//! A single binary per workspace: it owns the project file tree, spawns
//! pseudo-terminal processes, bridges them over websockets and reports the
//! connection activity the control plane uses for idle detection.

pub mod activity;
pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod files;
pub mod process;
pub mod routes;
pub mod state;
pub mod watch;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_app;
pub use state::AppState;
