//! Error types for placement operations

use core::error::Error;

/// Failures talking to the cluster API for list and watch calls.
#[derive(Debug, derive_more::Display)]
pub enum GatewayError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Failed to list {resource}: {message}")]
    ListFailed { resource: String, message: String },
    #[display("Failed to watch {resource}: {message}")]
    WatchFailed { resource: String, message: String },
}

impl Error for GatewayError {}

/// Failures reported by a bind call.
#[derive(Debug, PartialEq, Eq, derive_more::Display)]
pub enum BindError {
    /// The pod already carries a node assignment.
    #[display("Pod is already bound to a node")]
    AlreadyBound,
    #[display("Binding rejected: {message}")]
    Rejected { message: String },
}

impl Error for BindError {}

/// Reason and message the API server gave for a conflicting bind.
///
/// A conflict covers both a pod that already has a node and a pod whose
/// UID no longer matches, so the detail is kept for the log line.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{reason}: {message}")]
pub struct ConflictDetail {
    pub reason: String,
    pub message: String,
}

/// Fatal startup errors.
#[derive(Debug, derive_more::Display)]
pub enum PlacementError {
    #[display("single node scheduler requires exactly one node, found {node_count}")]
    ClusterTopology { node_count: usize },
    #[display("Failed to discover cluster nodes")]
    DiscoveryFailed,
}

impl Error for PlacementError {}
