//! Follows the node watch stream to keep the node identity current.

use std::sync::Arc;

use error_stack::Report;
use futures::StreamExt;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::error::GatewayError;
use super::node_identity::NodeIdentity;
use super::retry::RetryPolicy;
use super::sweeper::ReconciliationSweeper;
use super::traits::ClusterGateway;
use super::types::ClusterEvent;
use super::types::NodeInfo;

/// How a node subscription finished without a stream error.
#[derive(Debug, PartialEq, Eq)]
enum WatchEnd {
    /// The server closed the stream.
    Closed,
    /// Shutdown was requested while a triggered sweep was waiting.
    Cancelled,
}

/// Watches node events, updates [`NodeIdentity`] and re-sweeps pods after each event.
pub struct NodeEventWatcher {
    gateway: Arc<dyn ClusterGateway>,
    identity: Arc<NodeIdentity>,
    sweeper: Arc<ReconciliationSweeper>,
    retry_policy: RetryPolicy,
}

impl NodeEventWatcher {
    pub fn new(
        gateway: Arc<dyn ClusterGateway>,
        identity: Arc<NodeIdentity>,
        sweeper: Arc<ReconciliationSweeper>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            gateway,
            identity,
            sweeper,
            retry_policy,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn run(&self, cancellation_token: CancellationToken) {
        info!("Starting node watcher");

        loop {
            select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    info!("Node watcher shutdown requested");
                    break;
                }
                result = self.watch_nodes(&cancellation_token) => {
                    match result {
                        Ok(WatchEnd::Closed) => warn!("Node watch stream ended, resubscribing"),
                        Ok(WatchEnd::Cancelled) => {
                            info!("Node watcher shutdown requested");
                            break;
                        }
                        Err(e) => error!("Node watch failed: {e:?}"),
                    }
                }
            }

            if !self.retry_policy.wait(&cancellation_token).await {
                info!("Node watcher shutdown requested");
                break;
            }
        }
    }

    /// Consume one subscription until it ends.
    ///
    /// Each node event is followed by a sweep that is retried until it
    /// completes, so events are handled strictly one after another.
    async fn watch_nodes(
        &self,
        cancellation_token: &CancellationToken,
    ) -> Result<WatchEnd, Report<GatewayError>> {
        let mut stream = self.gateway.watch_nodes();

        while let Some(event) = stream.next().await {
            let event = event?;
            if !self.handle_event(&event) {
                continue;
            }

            info!("Node changed, relisting pods");
            if self.sweeper.sweep_after_delay(cancellation_token).await.is_none() {
                return Ok(WatchEnd::Cancelled);
            }
        }

        Ok(WatchEnd::Closed)
    }

    /// Apply a node event to the tracked identity.
    ///
    /// Returns `false` for events that carry no node and need no sweep.
    pub fn handle_event(&self, event: &ClusterEvent<NodeInfo>) -> bool {
        let kind = event.kind();
        let node = match event {
            ClusterEvent::Added(node)
            | ClusterEvent::Modified(node)
            | ClusterEvent::Deleted(node) => node,
            ClusterEvent::Other => return false,
        };

        info!(
            node = %node.name,
            %kind,
            conditions = %format_conditions(node),
            "Node event"
        );

        if matches!(event, ClusterEvent::Added(_) | ClusterEvent::Modified(_)) {
            self.identity.update(&node.name);
        }

        true
    }
}

fn format_conditions(node: &NodeInfo) -> String {
    node.conditions
        .iter()
        .map(|condition| format!("{}={}", condition.type_, condition.status))
        .collect::<Vec<_>>()
        .join(",")
}
