//! In-memory gateway for exercising the placement engine without a cluster.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use error_stack::Report;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::error::BindError;
use super::error::ConflictDetail;
use super::error::GatewayError;
use super::traits::ClusterGateway;
use super::traits::EventStream;
use super::types::ClusterEvent;
use super::types::NodeInfo;
use super::types::PodInfo;
use super::types::PodRef;

pub type EventSender<T> = mpsc::UnboundedSender<Result<ClusterEvent<T>, Report<GatewayError>>>;
type EventReceiver<T> = mpsc::UnboundedReceiver<Result<ClusterEvent<T>, Report<GatewayError>>>;

/// Scripted cluster state.
///
/// Watch subscriptions are served from queued channels; when none is queued
/// the subscription stays open and silent.
#[derive(Default)]
pub struct MockGateway {
    nodes: Mutex<Vec<NodeInfo>>,
    pods: Mutex<BTreeMap<(String, String), PodInfo>>,
    node_list_failures: AtomicUsize,
    pod_list_failures: AtomicUsize,
    pod_list_calls: AtomicUsize,
    bind_calls: Mutex<Vec<(PodRef, String)>>,
    bind_rejection: Mutex<Option<String>>,
    node_streams: Mutex<VecDeque<EventReceiver<NodeInfo>>>,
    pod_streams: Mutex<VecDeque<EventReceiver<PodInfo>>>,
    node_subscriptions: AtomicUsize,
    pod_subscriptions: AtomicUsize,
    after_first_bind: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl MockGateway {
    pub fn new(nodes: Vec<NodeInfo>) -> Self {
        Self {
            nodes: Mutex::new(nodes),
            ..Default::default()
        }
    }

    /// Add a pending, unassigned pod and return it as a watcher would see it.
    pub fn add_pending_pod(&self, namespace: &str, name: &str) -> PodInfo {
        let pod = PodInfo {
            pod: PodRef {
                namespace: namespace.to_string(),
                name: name.to_string(),
                uid: format!("uid-{namespace}-{name}"),
            },
            node_name: None,
            phase: Some("Pending".to_string()),
        };
        self.pods
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), pod.clone());
        pod
    }

    pub fn node_of(&self, namespace: &str, name: &str) -> Option<String> {
        self.pods
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|pod| pod.node_name.clone())
    }

    /// Make the next `count` node list calls fail.
    pub fn fail_node_lists(&self, count: usize) {
        self.node_list_failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` unscheduled pod list calls fail.
    pub fn fail_pod_lists(&self, count: usize) {
        self.pod_list_failures.store(count, Ordering::SeqCst);
    }

    pub fn pod_list_calls(&self) -> usize {
        self.pod_list_calls.load(Ordering::SeqCst)
    }

    /// Reject every following bind call with `message`.
    pub fn reject_binds(&self, message: &str) {
        *self.bind_rejection.lock().unwrap() = Some(message.to_string());
    }

    pub fn accept_binds(&self) {
        *self.bind_rejection.lock().unwrap() = None;
    }

    /// Run `hook` once, right after the next bind call succeeds.
    pub fn after_first_bind(&self, hook: impl FnOnce() + Send + 'static) {
        *self.after_first_bind.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn bind_calls(&self) -> Vec<(PodRef, String)> {
        self.bind_calls.lock().unwrap().clone()
    }

    /// Number of bind calls that changed cluster state.
    pub fn successful_binds(&self) -> usize {
        let pods = self.pods.lock().unwrap();
        pods.values().filter(|pod| pod.node_name.is_some()).count()
    }

    /// Queue a node watch subscription; dropping the sender ends the stream.
    pub fn node_stream(&self) -> EventSender<NodeInfo> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.node_streams.lock().unwrap().push_back(rx);
        tx
    }

    /// Queue a pod watch subscription; dropping the sender ends the stream.
    pub fn pod_stream(&self) -> EventSender<PodInfo> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.pod_streams.lock().unwrap().push_back(rx);
        tx
    }

    pub fn node_subscriptions(&self) -> usize {
        self.node_subscriptions.load(Ordering::SeqCst)
    }

    pub fn pod_subscriptions(&self) -> usize {
        self.pod_subscriptions.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn serve<T: Send + 'static>(queue: &Mutex<VecDeque<EventReceiver<T>>>) -> EventStream<T> {
        match queue.lock().unwrap().pop_front() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => futures::stream::pending().boxed(),
        }
    }
}

#[async_trait::async_trait]
impl ClusterGateway for MockGateway {
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, Report<GatewayError>> {
        if Self::take_failure(&self.node_list_failures) {
            return Err(Report::new(GatewayError::ListFailed {
                resource: "nodes".to_string(),
                message: "injected failure".to_string(),
            }));
        }
        Ok(self.nodes.lock().unwrap().clone())
    }

    fn watch_nodes(&self) -> EventStream<NodeInfo> {
        self.node_subscriptions.fetch_add(1, Ordering::SeqCst);
        Self::serve(&self.node_streams)
    }

    async fn list_unscheduled_pods(&self) -> Result<Vec<PodInfo>, Report<GatewayError>> {
        self.pod_list_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.pod_list_failures) {
            return Err(Report::new(GatewayError::ListFailed {
                resource: "pods".to_string(),
                message: "injected failure".to_string(),
            }));
        }
        Ok(self
            .pods
            .lock()
            .unwrap()
            .values()
            .filter(|pod| pod.assigned_node().is_none())
            .cloned()
            .collect())
    }

    fn watch_pods(&self) -> EventStream<PodInfo> {
        self.pod_subscriptions.fetch_add(1, Ordering::SeqCst);
        Self::serve(&self.pod_streams)
    }

    async fn bind_pod(&self, pod: &PodRef, node_name: &str) -> Result<(), Report<BindError>> {
        self.bind_calls
            .lock()
            .unwrap()
            .push((pod.clone(), node_name.to_string()));

        if let Some(message) = self.bind_rejection.lock().unwrap().clone() {
            return Err(Report::new(BindError::Rejected { message }));
        }

        let mut pods = self.pods.lock().unwrap();
        let stored = pods
            .get_mut(&(pod.namespace.clone(), pod.name.clone()))
            .ok_or_else(|| {
                Report::new(BindError::Rejected {
                    message: format!("pod {pod} not found"),
                })
            })?;

        if let Some(assigned) = stored.assigned_node() {
            return Err(
                Report::new(BindError::AlreadyBound).attach_printable(ConflictDetail {
                    reason: "Conflict".to_string(),
                    message: format!("pod {pod} is already assigned to node {assigned}"),
                }),
            );
        }
        stored.node_name = Some(node_name.to_string());
        drop(pods);

        if let Some(hook) = self.after_first_bind.lock().unwrap().take() {
            hook();
        }
        Ok(())
    }
}
