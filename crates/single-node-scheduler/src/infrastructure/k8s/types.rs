use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::Pod;

use crate::domain::placement::types::NodeCondition;
use crate::domain::placement::types::NodeInfo;
use crate::domain::placement::types::PodInfo;
use crate::domain::placement::types::PodRef;

/// Field selector for pods still waiting for a node.
pub const UNSCHEDULED_POD_SELECTOR: &str = "status.phase=Pending,spec.nodeName=";

/// Convert a pod object, or `None` if it has no name.
pub fn pod_info(pod: Pod) -> Option<PodInfo> {
    let metadata = pod.metadata;
    let name = metadata.name.filter(|name| !name.is_empty())?;

    Some(PodInfo {
        pod: PodRef {
            namespace: metadata.namespace.unwrap_or_else(|| "default".to_string()),
            name,
            uid: metadata.uid.unwrap_or_default(),
        },
        node_name: pod.spec.and_then(|spec| spec.node_name),
        phase: pod.status.and_then(|status| status.phase),
    })
}

/// Convert a node object, or `None` if it has no name.
pub fn node_info(node: Node) -> Option<NodeInfo> {
    let name = node.metadata.name.filter(|name| !name.is_empty())?;

    let conditions = node
        .status
        .and_then(|status| status.conditions)
        .unwrap_or_default()
        .into_iter()
        .map(|condition| NodeCondition {
            type_: condition.type_,
            status: condition.status,
        })
        .collect();

    Some(NodeInfo { name, conditions })
}
