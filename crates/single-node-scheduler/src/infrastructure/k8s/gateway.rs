use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use error_stack::Report;
use error_stack::ResultExt;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Binding;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::ListParams;
use kube::api::PostParams;
use kube::api::WatchEvent;
use kube::api::WatchParams;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Api;
use kube::Client;
use kube::Config;
use kube::Resource;
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::types::node_info;
use super::types::pod_info;
use super::types::UNSCHEDULED_POD_SELECTOR;
use crate::domain::placement::types::ClusterEvent;
use crate::domain::placement::types::NodeInfo;
use crate::domain::placement::types::PodInfo;
use crate::domain::placement::types::PodRef;
use crate::domain::placement::BindError;
use crate::domain::placement::ClusterGateway;
use crate::domain::placement::ConflictDetail;
use crate::domain::placement::EventStream;
use crate::domain::placement::GatewayError;

/// Resource version meaning "any": the server replays current state as `Added` events.
const ANY_VERSION: &str = "0";
/// Server-side watch timeout, kept under the default 5 minute idle cutoff.
const WATCH_TIMEOUT_SECS: u32 = 290;

/// Cluster gateway backed by the Kubernetes API.
///
/// Watches resume from the last resource version seen for each resource
/// kind, so a resubscription does not replay events already delivered.
pub struct KubeGateway {
    client: Client,
    node_version: Arc<ArcSwap<String>>,
    pod_version: Arc<ArcSwap<String>>,
}

impl KubeGateway {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            node_version: Arc::new(ArcSwap::from_pointee(ANY_VERSION.to_string())),
            pod_version: Arc::new(ArcSwap::from_pointee(ANY_VERSION.to_string())),
        }
    }

    /// Build a gateway from an explicit kubeconfig file, or infer the
    /// configuration: `$KUBECONFIG` or `~/.kube/config` first, then the
    /// in-cluster service account.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, Report<GatewayError>> {
        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).change_context_lazy(|| {
                    connection_failed(format!("cannot read kubeconfig {}", path.display()))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .change_context_lazy(|| {
                        connection_failed(format!("invalid kubeconfig {}", path.display()))
                    })?
            }
            None => Config::infer()
                .await
                .change_context(connection_failed("no kubeconfig or in-cluster config found"))?,
        };

        let cluster_url = config.cluster_url.to_string();
        let client = Client::try_from(config).change_context_lazy(|| {
            connection_failed(format!("cannot build client for {cluster_url}"))
        })?;

        info!(%cluster_url, "Kubernetes client ready");
        Ok(Self::new(client))
    }
}

fn connection_failed(message: impl Into<String>) -> GatewayError {
    GatewayError::ConnectionFailed {
        message: message.into(),
    }
}

fn watch_failed(resource: &str, message: impl Into<String>) -> Report<GatewayError> {
    Report::new(GatewayError::WatchFailed {
        resource: resource.to_string(),
        message: message.into(),
    })
}

/// Open a watch on `api` starting at the remembered version and convert its events.
fn watch_stream<K, T>(
    api: Api<K>,
    resource: &'static str,
    version: Arc<ArcSwap<String>>,
    convert: fn(K) -> Option<T>,
) -> EventStream<T>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    T: Send + 'static,
{
    async_stream::stream! {
        let from = version.load_full();
        debug!(resource, resource_version = %from, "Subscribing to watch");

        let params = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);
        let events = match api.watch(&params, from.as_str()).await {
            Ok(events) => events,
            Err(e) => {
                yield Err(watch_failed(resource, format!("failed to subscribe: {e}")));
                return;
            }
        };
        let mut events = std::pin::pin!(events);

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(watch_failed(resource, format!("watch stream error: {e}")));
                    return;
                }
            };

            let wrap: fn(T) -> ClusterEvent<T> = match &event {
                WatchEvent::Added(_) => ClusterEvent::Added,
                WatchEvent::Modified(_) => ClusterEvent::Modified,
                WatchEvent::Deleted(_) => ClusterEvent::Deleted,
                WatchEvent::Bookmark(bookmark) => {
                    version.store(Arc::new(bookmark.metadata.resource_version.clone()));
                    yield Ok(ClusterEvent::Other);
                    continue;
                }
                WatchEvent::Error(response) => {
                    if response.code == 410 {
                        warn!(resource, "Watch resource version expired, restarting from current state");
                        version.store(Arc::new(ANY_VERSION.to_string()));
                    }
                    yield Err(watch_failed(resource, format!("{response:?}")));
                    return;
                }
            };

            let object = match event {
                WatchEvent::Added(object)
                | WatchEvent::Modified(object)
                | WatchEvent::Deleted(object) => object,
                WatchEvent::Bookmark(_) | WatchEvent::Error(_) => continue,
            };

            if let Some(resource_version) = object.resource_version() {
                version.store(Arc::new(resource_version));
            }

            yield Ok(convert(object).map_or(ClusterEvent::Other, wrap));
        }
    }
    .boxed()
}

#[async_trait::async_trait]
impl ClusterGateway for KubeGateway {
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, Report<GatewayError>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api
            .list(&ListParams::default())
            .await
            .change_context(GatewayError::ListFailed {
                resource: "nodes".to_string(),
                message: "Kubernetes API error".to_string(),
            })?;

        Ok(nodes.items.into_iter().filter_map(node_info).collect())
    }

    fn watch_nodes(&self) -> EventStream<NodeInfo> {
        watch_stream(
            Api::<Node>::all(self.client.clone()),
            "nodes",
            self.node_version.clone(),
            node_info,
        )
    }

    async fn list_unscheduled_pods(&self) -> Result<Vec<PodInfo>, Report<GatewayError>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let pods = api
            .list(&ListParams::default().fields(UNSCHEDULED_POD_SELECTOR))
            .await
            .change_context(GatewayError::ListFailed {
                resource: "pods".to_string(),
                message: "Kubernetes API error".to_string(),
            })?;

        Ok(pods
            .items
            .into_iter()
            .filter_map(pod_info)
            .filter(|pod| pod.assigned_node().is_none())
            .collect())
    }

    fn watch_pods(&self) -> EventStream<PodInfo> {
        watch_stream(
            Api::<Pod>::all(self.client.clone()),
            "pods",
            self.pod_version.clone(),
            pod_info,
        )
    }

    async fn bind_pod(&self, pod: &PodRef, node_name: &str) -> Result<(), Report<BindError>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &pod.namespace);
        let data = serde_json::to_vec(&binding(pod, node_name)).change_context(
            BindError::Rejected {
                message: "failed to encode binding".to_string(),
            },
        )?;

        match api
            .create_subresource::<serde_json::Value>(
                "binding",
                &pod.name,
                &PostParams::default(),
                data,
            )
            .await
        {
            Ok(_) => Ok(()),
            // Also returned for a UID precondition mismatch after the pod was
            // recreated; the new pod arrives as its own event.
            Err(kube::Error::Api(response)) if response.code == 409 => {
                let conflict = ConflictDetail {
                    reason: response.reason,
                    message: response.message,
                };
                Err(Report::new(BindError::AlreadyBound).attach_printable(conflict))
            }
            Err(e) => Err(Report::new(BindError::Rejected {
                message: e.to_string(),
            })),
        }
    }
}

fn binding(pod: &PodRef, node_name: &str) -> Binding {
    Binding {
        metadata: ObjectMeta {
            name: Some(pod.name.clone()),
            namespace: Some(pod.namespace.clone()),
            uid: Some(pod.uid.clone()).filter(|uid| !uid.is_empty()),
            ..Default::default()
        },
        target: ObjectReference {
            api_version: Some("v1".to_string()),
            kind: Some("Node".to_string()),
            name: Some(node_name.to_string()),
            ..Default::default()
        },
    }
}
