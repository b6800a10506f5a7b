//! Ragline API server
//!
//! HTTP front end for asynchronous chat RAG and document ingestion jobs.

use clap::Parser;
use ragline_config::ApplicationConfig;
use tracing::info;

#[derive(Parser)]
#[command(name = "ragline-api", about = "Asynchronous RAG job service")]
struct Args {
    /// Override the configured server listen address
    #[arg(long = "listen-addr")]
    listen_addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ragline_common::initialize_environment();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = ApplicationConfig::from_env()?;
    if let Some(addr) = args.listen_addr {
        config.server.listen_addr = addr;
    }

    info!(addr = %config.server.listen_addr, "starting ragline api server");
    ragline_api::bootstrap::run(config).await
}
