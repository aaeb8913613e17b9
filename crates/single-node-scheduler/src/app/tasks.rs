use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app::core::Application;

/// How long tasks get to stop after cancellation.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Task manager, responsible for starting and managing all background tasks
pub struct Tasks {
    /// Loops that should run until shutdown.
    pub tasks: Vec<JoinHandle<()>>,
    /// The startup sweep, which finishes on its own.
    startup_sweep: Option<JoinHandle<()>>,
    cancellation_token: CancellationToken,
}

impl Default for Tasks {
    fn default() -> Self {
        Self::new()
    }
}

impl Tasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            startup_sweep: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start the node watcher, the pod watcher and the startup sweep
    pub fn spawn_all_tasks(&mut self, app: &Application) {
        let node_watcher_task = self.spawn_node_watcher_task(app);
        self.tasks.push(node_watcher_task);

        let pod_watcher_task = self.spawn_pod_watcher_task(app);
        self.tasks.push(pod_watcher_task);

        self.startup_sweep = Some(self.spawn_startup_sweep_task(app));
    }

    /// wait for tasks to complete or receive shutdown signal
    pub async fn wait_for_completion(&mut self) -> Result<()> {
        self.wait_until(shutdown_signal()).await
    }

    /// Wait for `shutdown` to resolve or for a long-running task to exit.
    pub async fn wait_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        if self.tasks.is_empty() {
            shutdown.await?;
            self.shutdown().await;
            return Ok(());
        }

        tokio::select! {
            result = shutdown => {
                result?;
                tracing::info!("Shutdown signal received, cancelling all tasks");
                self.shutdown().await;
            }
            // Wait for any task to complete unexpectedly
            result = futures::future::select_all(&mut self.tasks) => {
                let (result, _index, _remaining) = result;
                self.cancellation_token.cancel();
                if let Err(e) = result {
                    tracing::error!("Task completed with error: {e}");
                    return Err(e.into());
                }
                tracing::warn!("Task completed unexpectedly");
            }
        }

        Ok(())
    }

    async fn shutdown(&mut self) {
        self.cancellation_token.cancel();

        let tasks = self.tasks.iter_mut().chain(self.startup_sweep.as_mut());
        tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            tracing::warn!("Task shutdown timed out after {:?}", SHUTDOWN_TIMEOUT);
        });
    }

    fn spawn_node_watcher_task(&self, app: &Application) -> JoinHandle<()> {
        let token = self.cancellation_token.clone();
        let node_watcher = app.services().node_watcher.clone();
        tokio::spawn(async move {
            tracing::info!("Starting node watcher task");
            node_watcher.run(token).await;
            tracing::info!("Node watcher task completed");
        })
    }

    fn spawn_pod_watcher_task(&self, app: &Application) -> JoinHandle<()> {
        let token = self.cancellation_token.clone();
        let pod_watcher = app.services().pod_watcher.clone();
        tokio::spawn(async move {
            tracing::info!("Starting pod watcher task");
            pod_watcher.run(token).await;
            tracing::info!("Pod watcher task completed");
        })
    }

    fn spawn_startup_sweep_task(&self, app: &Application) -> JoinHandle<()> {
        let token = self.cancellation_token.clone();
        let sweeper = app.services().sweeper.clone();
        tokio::spawn(async move {
            tracing::info!("Starting startup sweep task");
            match sweeper.sweep_until_success(&token).await {
                Some(summary) => tracing::info!(?summary, "Startup sweep completed"),
                None => tracing::info!("Startup sweep cancelled"),
            }
        })
    }
}

/// Resolves on SIGTERM or SIGINT (Ctrl+C elsewhere).
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::signal;
        use tokio::signal::unix::SignalKind;

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }

    Ok(())
}
