//! Placement data types shared by the identity tracker, executor, sweeper and watchers.

use std::fmt;

/// Kind of change delivered by a watch stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Other,
}

/// A single event from a watch stream, tagged with its change kind.
///
/// Bookmarks and payloads that cannot be read as the expected resource
/// arrive as [`ClusterEvent::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterEvent<T> {
    Added(T),
    Modified(T),
    Deleted(T),
    Other,
}

impl<T> ClusterEvent<T> {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Added(_) => ChangeKind::Added,
            Self::Modified(_) => ChangeKind::Modified,
            Self::Deleted(_) => ChangeKind::Deleted,
            Self::Other => ChangeKind::Other,
        }
    }
}

/// A single node condition, e.g. `Ready=True`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCondition {
    pub type_: String,
    pub status: String,
}

/// What the scheduler knows about a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    /// Observed for logging only.
    pub conditions: Vec<NodeCondition>,
}

impl NodeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
        }
    }
}

/// Identity of a pod awaiting placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A pod as observed through a list or watch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodInfo {
    pub pod: PodRef,
    /// Assigned node, `None` while unscheduled.
    pub node_name: Option<String>,
    pub phase: Option<String>,
}

impl PodInfo {
    /// Returns the assigned node name, treating an empty string as unassigned.
    pub fn assigned_node(&self) -> Option<&str> {
        self.node_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// A pod paired with the node it should be bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRequest {
    pub pod: PodRef,
    pub node_name: String,
}

/// Result of a single binding attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingOutcome {
    /// The bind call went through.
    Success,
    /// The pod already had a node, either observed before calling or reported by the API.
    AlreadyBound,
    /// Any other failure; the pod is left for the next sweep or event.
    Failed(String),
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    fn pod_with_node(node_name: Option<&str>) -> PodInfo {
        PodInfo {
            pod: PodRef {
                namespace: "ns1".to_string(),
                name: "p1".to_string(),
                uid: "uid-1".to_string(),
            },
            node_name: node_name.map(str::to_string),
            phase: Some("Pending".to_string()),
        }
    }

    #[test]
    fn empty_node_name_is_unassigned() {
        assert_eq!(pod_with_node(None).assigned_node(), None);
        assert_eq!(pod_with_node(Some("")).assigned_node(), None);
        assert_eq!(pod_with_node(Some("node-a")).assigned_node(), Some("node-a"));
    }

    #[test]
    fn event_kind_matches_variant() {
        assert_eq!(ClusterEvent::Added(1).kind(), ChangeKind::Added);
        assert_eq!(ClusterEvent::Modified(1).kind(), ChangeKind::Modified);
        assert_eq!(ClusterEvent::Deleted(1).kind(), ChangeKind::Deleted);
        assert_eq!(ClusterEvent::<u8>::Other.kind(), ChangeKind::Other);
    }

    #[test]
    fn pod_ref_displays_as_namespaced_name() {
        assert_eq!(pod_with_node(None).pod.to_string(), "ns1/p1");
    }
}
