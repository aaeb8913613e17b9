//! Tracks the name of the single node pods are placed on.

use std::sync::Arc;

use arc_swap::ArcSwap;
use error_stack::Report;
use error_stack::ResultExt;
use tracing::info;

use super::error::PlacementError;
use super::traits::ClusterGateway;

/// The current node name, swapped atomically on update.
///
/// One writer (the node watcher), many readers. Readers always see a
/// complete name.
#[derive(Debug)]
pub struct NodeIdentity {
    name: ArcSwap<String>,
}

impl NodeIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: ArcSwap::from_pointee(name.into()),
        }
    }

    /// Find the node to schedule onto.
    ///
    /// # Errors
    ///
    /// - [`PlacementError::DiscoveryFailed`] if nodes cannot be listed
    /// - [`PlacementError::ClusterTopology`] unless exactly one node exists
    pub async fn discover(gateway: &dyn ClusterGateway) -> Result<Self, Report<PlacementError>> {
        let nodes = gateway
            .list_nodes()
            .await
            .change_context(PlacementError::DiscoveryFailed)?;

        match nodes.as_slice() {
            [node] => {
                info!(node = %node.name, "Discovered scheduling target node");
                Ok(Self::new(node.name.clone()))
            }
            _ => Err(Report::new(PlacementError::ClusterTopology {
                node_count: nodes.len(),
            })),
        }
    }

    /// Most recently known node name.
    pub fn current(&self) -> Arc<String> {
        self.name.load_full()
    }

    /// Replace the tracked name. Empty names are ignored.
    ///
    /// Returns `true` if the name changed.
    pub fn update(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        let previous = self.name.swap(Arc::new(name.to_string()));
        if previous.as_str() != name {
            info!(from = %previous, to = %name, "Node identity changed");
            true
        } else {
            false
        }
    }
}
