use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::domain::placement::RetryPolicy;

#[derive(Parser, Clone, Debug)]
pub struct DaemonArgs {
    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        env = "SCHEDULER_RETRY_DELAY_SECS",
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds to wait before retrying a failed sweep or resubscribing a watch"
    )]
    pub retry_delay_secs: u64,

    #[arg(
        long,
        env = "SCHEDULER_LOG_PATH",
        value_hint = clap::ValueHint::FilePath,
        help = "Also write logs to this file, rotated daily, e.g. /logs/scheduler.log"
    )]
    pub log_path: Option<PathBuf>,
}

impl DaemonArgs {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_secs(self.retry_delay_secs))
    }
}

#[derive(Parser, Clone, Debug)]
pub struct DiscoverArgs {
    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,
}
