use std::sync::Arc;

use anyhow::Result;

use crate::app::core::Application;
use crate::app::services::ApplicationServices;
use crate::config::DaemonArgs;
use crate::domain::placement::BindingExecutor;
use crate::domain::placement::ClusterGateway;
use crate::domain::placement::NodeEventWatcher;
use crate::domain::placement::NodeIdentity;
use crate::domain::placement::PodEventWatcher;
use crate::domain::placement::ReconciliationSweeper;
use crate::infrastructure::k8s::KubeGateway;

/// Application builder
pub struct ApplicationBuilder {
    daemon_args: DaemonArgs,
}

impl ApplicationBuilder {
    pub fn new(daemon_args: DaemonArgs) -> Self {
        Self { daemon_args }
    }

    /// Connect to the cluster, discover the node and wire the placement engine.
    ///
    /// Fails if the API is unreachable or the cluster does not have exactly one node.
    pub async fn build(self) -> Result<Application> {
        tracing::info!("Building application components...");

        let gateway = KubeGateway::connect(self.daemon_args.kubeconfig.as_deref())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Kubernetes: {e:?}"))?;
        let gateway: Arc<dyn ClusterGateway> = Arc::new(gateway);

        let services = build_services(gateway, &self.daemon_args).await?;

        Ok(Application::new(services, self.daemon_args))
    }
}

/// Discover the node through `gateway` and build every placement component on top of it.
pub(crate) async fn build_services(
    gateway: Arc<dyn ClusterGateway>,
    daemon_args: &DaemonArgs,
) -> Result<ApplicationServices> {
    let identity = Arc::new(
        NodeIdentity::discover(gateway.as_ref())
            .await
            .map_err(|e| anyhow::anyhow!("Node discovery failed: {e:?}"))?,
    );

    let retry_policy = daemon_args.retry_policy();
    let executor = Arc::new(BindingExecutor::new(gateway.clone()));
    let sweeper = Arc::new(ReconciliationSweeper::new(
        gateway.clone(),
        identity.clone(),
        executor.clone(),
        retry_policy,
    ));
    let pod_watcher = Arc::new(PodEventWatcher::new(
        gateway.clone(),
        identity.clone(),
        executor.clone(),
        retry_policy,
    ));
    let node_watcher = Arc::new(NodeEventWatcher::new(
        gateway.clone(),
        identity.clone(),
        sweeper.clone(),
        retry_policy,
    ));

    Ok(ApplicationServices {
        identity,
        executor,
        sweeper,
        pod_watcher,
        node_watcher,
    })
}
