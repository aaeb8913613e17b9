use clap::Parser;
use clap::Subcommand;
use utils::version;

use crate::config::daemon::DaemonArgs;
use crate::config::daemon::DiscoverArgs;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduler daemon
    Daemon(Box<DaemonArgs>),
    /// Check that the cluster has exactly one node and print its name
    Discover(DiscoverArgs),
}
