use anyhow::Result;
use clap::Parser;
use single_node_scheduler::app::ApplicationBuilder;
use single_node_scheduler::config::Cli;
use single_node_scheduler::config::Commands;
use single_node_scheduler::config::DaemonArgs;
use single_node_scheduler::config::DiscoverArgs;
use single_node_scheduler::k8s::KubeGateway;
use single_node_scheduler::placement::NodeIdentity;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon(daemon_args) => run_daemon(*daemon_args).await,
        Commands::Discover(discover_args) => run_discover(discover_args).await,
    }
}

async fn run_daemon(daemon_args: DaemonArgs) -> Result<()> {
    let _guard = utils::logging::init(daemon_args.log_path.as_deref())?;

    tracing::info!("Starting single node scheduler {}", &**version::VERSION);

    let app = ApplicationBuilder::new(daemon_args).build().await?;

    app.run().await?;

    Ok(())
}

async fn run_discover(discover_args: DiscoverArgs) -> Result<()> {
    let _guard = utils::logging::init(None)?;

    let gateway = KubeGateway::connect(discover_args.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to Kubernetes: {e:?}"))?;

    let identity = NodeIdentity::discover(&gateway)
        .await
        .map_err(|e| anyhow::anyhow!("Node discovery failed: {e:?}"))?;

    println!("{}", identity.current());
    Ok(())
}
