pub mod deployment;
pub mod manifest_config;

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "car-registry")]
#[command(about = "Set up a car registration contract and serve its state over HTTP")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Validate the manifest and print the calls it would submit
    Plan {
        /// Path to the manifest TOML file
        #[arg(short, long, default_value = "car-registration.toml")]
        config: String,
    },
    /// Deploy the contract and submit every manifest call not yet journaled
    Deploy(DeployArgs),
    /// Start the read-only HTTP gateway
    Serve(ServeArgs),
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    /// Path to the manifest TOML file
    #[arg(short, long, default_value = "car-registration.toml")]
    pub config: String,

    /// Override network.rpc_url from the manifest
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Override deployment.directory from the manifest
    #[arg(long)]
    pub deployment_dir: Option<String>,

    /// Run against a local ledger snapshot instead of a node
    #[arg(long)]
    pub local_state: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Manifest TOML file providing deployment and gateway defaults
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub deployment_dir: Option<String>,

    /// Deployment future id, `<module>#<contract>`
    #[arg(long)]
    pub future_id: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Serve reads from a local ledger snapshot
    #[arg(long)]
    pub local_state: Option<String>,
}
