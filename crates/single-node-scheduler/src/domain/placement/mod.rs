//! Single-node placement engine.
//!
//! The main components are:
//! - [`NodeIdentity`]: the name of the one node pods are placed on
//! - [`BindingExecutor`]: idempotent bind calls with outcome classification
//! - [`ReconciliationSweeper`]: catch-up over every unscheduled pod
//! - [`PodEventWatcher`]: binds pods as their events arrive
//! - [`NodeEventWatcher`]: keeps the identity current and re-sweeps on node changes

pub mod binder;
pub mod error;
#[cfg(test)]
pub(crate) mod mock;
pub mod node_identity;
pub mod node_watcher;
pub mod pod_watcher;
pub mod retry;
pub mod sweeper;
pub mod traits;
pub mod types;

pub use binder::BindingExecutor;
pub use error::BindError;
pub use error::ConflictDetail;
pub use error::GatewayError;
pub use error::PlacementError;
pub use node_identity::NodeIdentity;
pub use node_watcher::NodeEventWatcher;
pub use pod_watcher::PodEventWatcher;
pub use retry::RetryPolicy;
pub use sweeper::ReconciliationSweeper;
pub use traits::ClusterGateway;
pub use traits::EventStream;
