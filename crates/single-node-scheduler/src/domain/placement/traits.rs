//! The cluster API surface the placement engine depends on

use error_stack::Report;
use futures::stream::BoxStream;

use super::error::BindError;
use super::error::GatewayError;
use super::types::ClusterEvent;
use super::types::NodeInfo;
use super::types::PodInfo;
use super::types::PodRef;

/// A live watch subscription.
///
/// The stream ending, or yielding an error, means the subscription is gone
/// and has to be re-established by the caller.
pub type EventStream<T> = BoxStream<'static, Result<ClusterEvent<T>, Report<GatewayError>>>;

/// List, watch and bind primitives of the cluster control plane.
#[async_trait::async_trait]
pub trait ClusterGateway: Send + Sync {
    /// List every node in the cluster.
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, Report<GatewayError>>;

    /// Subscribe to node lifecycle events.
    fn watch_nodes(&self) -> EventStream<NodeInfo>;

    /// List pods that are pending and have no node assignment.
    async fn list_unscheduled_pods(&self) -> Result<Vec<PodInfo>, Report<GatewayError>>;

    /// Subscribe to pod lifecycle events across all namespaces.
    fn watch_pods(&self) -> EventStream<PodInfo>;

    /// Assign `pod` to `node_name`.
    ///
    /// # Errors
    ///
    /// - [`BindError::AlreadyBound`] if the server reports a conflict, with a
    ///   [`ConflictDetail`](super::error::ConflictDetail) attached when available
    /// - [`BindError::Rejected`] for any other failure
    async fn bind_pod(&self, pod: &PodRef, node_name: &str) -> Result<(), Report<BindError>>;
}
