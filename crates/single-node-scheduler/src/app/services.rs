use std::sync::Arc;

use crate::domain::placement::BindingExecutor;
use crate::domain::placement::NodeEventWatcher;
use crate::domain::placement::NodeIdentity;
use crate::domain::placement::PodEventWatcher;
use crate::domain::placement::ReconciliationSweeper;

/// Application dependencies - simple struct with Arc-wrapped services
pub struct ApplicationServices {
    pub identity: Arc<NodeIdentity>,
    pub executor: Arc<BindingExecutor>,
    pub sweeper: Arc<ReconciliationSweeper>,
    pub pod_watcher: Arc<PodEventWatcher>,
    pub node_watcher: Arc<NodeEventWatcher>,
}
