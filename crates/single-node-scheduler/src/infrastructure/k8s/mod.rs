//! Kubernetes implementation of the cluster gateway.
//!
//! - [`KubeGateway`]: list, watch and bind through the Kubernetes API
//! - [`types`]: conversion from `k8s-openapi` objects to placement types

pub mod gateway;
pub mod types;

pub use gateway::KubeGateway;
