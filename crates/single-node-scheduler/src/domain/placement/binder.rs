//! Idempotent pod-to-node binding.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::error;
use tracing::info;

use super::error::BindError;
use super::error::ConflictDetail;
use super::node_identity::NodeIdentity;
use super::traits::ClusterGateway;
use super::types::BindingOutcome;
use super::types::BindingRequest;
use super::types::PodInfo;

/// Running totals of binding outcomes.
///
/// Failed bindings are retried forever by later sweeps and events, so these
/// counters are the only signal of a pod that never gets placed.
#[derive(Debug, Default)]
pub struct BindingStats {
    bound: AtomicU64,
    already_bound: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`BindingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingStatsSnapshot {
    pub bound: u64,
    pub already_bound: u64,
    pub failed: u64,
}

impl BindingStats {
    fn record(&self, outcome: &BindingOutcome) {
        let counter = match outcome {
            BindingOutcome::Success => &self.bound,
            BindingOutcome::AlreadyBound => &self.already_bound,
            BindingOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BindingStatsSnapshot {
        BindingStatsSnapshot {
            bound: self.bound.load(Ordering::Relaxed),
            already_bound: self.already_bound.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Issues bind calls and classifies what happened.
pub struct BindingExecutor {
    gateway: Arc<dyn ClusterGateway>,
    stats: BindingStats,
}

impl BindingExecutor {
    pub fn new(gateway: Arc<dyn ClusterGateway>) -> Self {
        Self {
            gateway,
            stats: BindingStats::default(),
        }
    }

    pub fn stats(&self) -> BindingStatsSnapshot {
        self.stats.snapshot()
    }

    /// Bind an observed pod to the node currently tracked by `identity`.
    ///
    /// Pods that already carry a node assignment are skipped without calling
    /// the API. The node name is read at call time, not earlier.
    pub async fn reconcile(&self, pod: &PodInfo, identity: &NodeIdentity) -> BindingOutcome {
        if let Some(node) = pod.assigned_node() {
            info!(
                namespace = %pod.pod.namespace,
                name = %pod.pod.name,
                node,
                "Pod already has a node, skipping"
            );
            let outcome = BindingOutcome::AlreadyBound;
            self.stats.record(&outcome);
            return outcome;
        }

        let request = BindingRequest {
            pod: pod.pod.clone(),
            node_name: identity.current().to_string(),
        };
        self.bind(request).await
    }

    /// Issue the bind call for `request`.
    ///
    /// An already-bound response is treated as success by another path and
    /// is not retried. Other failures are logged and left for the next sweep
    /// or event.
    pub async fn bind(&self, request: BindingRequest) -> BindingOutcome {
        let BindingRequest { pod, node_name } = request;

        info!(
            namespace = %pod.namespace,
            name = %pod.name,
            node = %node_name,
            "Binding pod to node"
        );

        let outcome = match self.gateway.bind_pod(&pod, &node_name).await {
            Ok(()) => BindingOutcome::Success,
            Err(report) => match report.current_context() {
                BindError::AlreadyBound => {
                    match report.downcast_ref::<ConflictDetail>() {
                        Some(conflict) => info!(
                            namespace = %pod.namespace,
                            name = %pod.name,
                            reason = %conflict.reason,
                            detail = %conflict.message,
                            "Bind conflict, leaving pod as is"
                        ),
                        None => info!(
                            namespace = %pod.namespace,
                            name = %pod.name,
                            "Pod was bound by another path"
                        ),
                    }
                    BindingOutcome::AlreadyBound
                }
                BindError::Rejected { .. } => {
                    error!(
                        namespace = %pod.namespace,
                        name = %pod.name,
                        node = %node_name,
                        error = ?report,
                        "Failed to bind pod"
                    );
                    BindingOutcome::Failed(report.current_context().to_string())
                }
            },
        };

        self.stats.record(&outcome);
        outcome
    }
}
