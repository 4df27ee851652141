use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use roster::account::CredentialStore;
use roster::config::RosterConfig;
use roster::directory::AccountDirectory;
use roster::rpc::{guard::SessionGuard, RpcServer};
use roster::storage::Storage;
use roster::token::TokenIssuer;

#[derive(Parser)]
#[command(name = "roster", about = "Account-directory service")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "roster.toml")]
    config: String,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mut config = RosterConfig::load_or_default(&cli.config);
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    if let Err(err) = run(config).await {
        error!(%err, "server exited with error");
        std::process::exit(1);
    }
}

async fn run(config: RosterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let secret = config.auth.secret_bytes()?;

    let storage = Arc::new(Storage::open(&config.server.db_path)?);
    let store = Arc::new(CredentialStore::open(Some(storage))?);
    info!(accounts = store.count()?, "credential store ready");

    let issuer = TokenIssuer::new(secret, config.auth.token_ttl_ms());
    let directory = Arc::new(AccountDirectory::new(store.clone(), issuer.clone()));
    let guard = Arc::new(SessionGuard::new(issuer, store));

    let bind_addr = format!("{}:{}", config.server.bind_addr, config.server.port);
    RpcServer::new(directory, guard, bind_addr).start().await?;
    Ok(())
}
