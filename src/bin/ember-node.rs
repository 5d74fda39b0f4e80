#![forbid(unsafe_code)]
//! Emberchain node entry point: loads configuration, builds the engine
//! and serves the HTTP API.

use clap::Parser;
use tracing::info;

use emberchain::api::run_api_server;
use emberchain::config::load_config;
use emberchain::node::Node;

#[derive(Parser, Debug)]
#[command(name = "ember-node", about = "Run an Emberchain ledger node")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Override the API port from the configuration
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = load_config(&args.config)?;
    let port = args.port.unwrap_or(config.network.api_port);

    let node = Node::from_config(&config)?;
    info!(
        node_id = %node.node_id().await,
        difficulty_target = %config.chain.difficulty_target,
        "starting Emberchain node"
    );

    run_api_server(node, port).await
}
