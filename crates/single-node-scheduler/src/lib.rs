pub mod app;
pub mod config;
mod domain;
mod infrastructure;

pub use domain::placement;
pub use infrastructure::k8s;
