//! Control-plane side of the workspace subsystem.
//!
//! Creates, observes and deletes the cluster resources of a workspace and
//! runs the idle sweep that tears down unused workspaces. Talks to the
//! cluster through the [`cluster::ClusterBackend`] trait and to companions
//! through the [`probe::CompanionProbe`] trait, so tests run against the
//! in-memory implementations in [`mock`].

pub mod cluster;
pub mod config;
pub mod lifecycle;
pub mod mock;
pub mod probe;
pub mod sweeper;

pub use cluster::ClusterBackend;
pub use config::ControllerConfig;
pub use lifecycle::{LifecycleController, WorkspaceRef, WorkspaceStatus};
pub use probe::{CompanionProbe, HttpCompanionProbe};
pub use sweeper::run_idle_sweeper;
