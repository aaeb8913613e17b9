//! Binds pods as they show up on the pod watch stream.

use std::sync::Arc;

use error_stack::Report;
use futures::StreamExt;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::binder::BindingExecutor;
use super::error::GatewayError;
use super::node_identity::NodeIdentity;
use super::retry::RetryPolicy;
use super::traits::ClusterGateway;
use super::types::BindingOutcome;
use super::types::ClusterEvent;
use super::types::PodInfo;

/// Watches pod lifecycle events and binds newly unscheduled pods.
///
/// The subscription is long-lived; when it ends the watcher waits one retry
/// delay and subscribes again, until cancelled.
pub struct PodEventWatcher {
    gateway: Arc<dyn ClusterGateway>,
    identity: Arc<NodeIdentity>,
    executor: Arc<BindingExecutor>,
    retry_policy: RetryPolicy,
}

impl PodEventWatcher {
    pub fn new(
        gateway: Arc<dyn ClusterGateway>,
        identity: Arc<NodeIdentity>,
        executor: Arc<BindingExecutor>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            gateway,
            identity,
            executor,
            retry_policy,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn run(&self, cancellation_token: CancellationToken) {
        info!("Starting pod watcher");

        loop {
            select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    info!("Pod watcher shutdown requested");
                    break;
                }
                result = self.watch_pods() => {
                    match result {
                        Ok(()) => warn!("Pod watch stream ended, resubscribing"),
                        Err(e) => error!("Pod watch failed: {e:?}"),
                    }
                }
            }

            if !self.retry_policy.wait(&cancellation_token).await {
                info!("Pod watcher shutdown requested");
                break;
            }
        }
    }

    /// Consume one subscription until it ends.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::WatchFailed`] if the stream reports an error
    async fn watch_pods(&self) -> Result<(), Report<GatewayError>> {
        let mut stream = self.gateway.watch_pods();

        while let Some(event) = stream.next().await {
            self.handle_event(event?).await;
        }

        Ok(())
    }

    /// Act on a single pod event.
    ///
    /// Returns the binding outcome, or `None` if the event needed no binding.
    pub async fn handle_event(&self, event: ClusterEvent<PodInfo>) -> Option<BindingOutcome> {
        let kind = event.kind();
        let pod = match event {
            ClusterEvent::Added(pod) | ClusterEvent::Modified(pod) => pod,
            ClusterEvent::Deleted(_) | ClusterEvent::Other => {
                debug!(%kind, "Ignoring pod event");
                return None;
            }
        };

        info!(
            namespace = %pod.pod.namespace,
            name = %pod.pod.name,
            node_name = pod.assigned_node().unwrap_or_default(),
            %kind,
            "Pod event"
        );

        if pod.assigned_node().is_some() {
            return None;
        }

        Some(self.executor.reconcile(&pod, &self.identity).await)
    }
}
