//! Catch-up sweep over every pod still waiting for a node.

use std::sync::Arc;

use error_stack::Report;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::binder::BindingExecutor;
use super::error::GatewayError;
use super::node_identity::NodeIdentity;
use super::retry::RetryPolicy;
use super::traits::ClusterGateway;
use super::types::BindingOutcome;

/// Counts of what a completed sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub listed: usize,
    pub bound: usize,
    pub already_bound: usize,
    pub failed: usize,
}

impl SweepSummary {
    fn record(&mut self, outcome: &BindingOutcome) {
        match outcome {
            BindingOutcome::Success => self.bound += 1,
            BindingOutcome::AlreadyBound => self.already_bound += 1,
            BindingOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Lists unscheduled pods and binds each of them.
///
/// Covers pods that went pending before a watch stream was established.
pub struct ReconciliationSweeper {
    gateway: Arc<dyn ClusterGateway>,
    identity: Arc<NodeIdentity>,
    executor: Arc<BindingExecutor>,
    retry_policy: RetryPolicy,
}

impl ReconciliationSweeper {
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

    /// Run one sweep.
    ///
    /// Per-pod bind failures do not fail the sweep; only the list call can.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ListFailed`] if pods cannot be listed
    pub async fn sweep(&self) -> Result<SweepSummary, Report<GatewayError>> {
        let pods = self.gateway.list_unscheduled_pods().await?;

        info!(count = pods.len(), "Sweeping unscheduled pods");

        let mut summary = SweepSummary {
            listed: pods.len(),
            ..Default::default()
        };

        for pod in &pods {
            // Identity is read per pod; it may change during a long sweep.
            let outcome = self.executor.reconcile(pod, &self.identity).await;
            summary.record(&outcome);
        }

        let totals = self.executor.stats();
        info!(
            listed = summary.listed,
            bound = summary.bound,
            already_bound = summary.already_bound,
            failed = summary.failed,
            total_bound = totals.bound,
            total_already_bound = totals.already_bound,
            total_failed = totals.failed,
            "Sweep completed"
        );

        Ok(summary)
    }

    /// Sweep, retrying after the policy delay until one sweep completes.
    ///
    /// Returns `None` if cancelled first.
    pub async fn sweep_until_success(
        &self,
        cancellation_token: &CancellationToken,
    ) -> Option<SweepSummary> {
        self.retry_policy
            .retry_until_ok(cancellation_token, "sweep", || self.sweep())
            .await
    }

    /// Wait one policy delay, then sweep until success.
    ///
    /// Used after node events so the node has a moment to settle.
    pub async fn sweep_after_delay(
        &self,
        cancellation_token: &CancellationToken,
    ) -> Option<SweepSummary> {
        if !self.retry_policy.wait(cancellation_token).await {
            return None;
        }
        self.sweep_until_success(cancellation_token).await
    }
}
