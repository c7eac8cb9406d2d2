use clap::{Args, Parser, Subcommand};
use pingcrm::{
    client::CacheStore,
    config::ClientConfig,
    resources::{Account, Contact, Organization, User},
    ApiError, Client, ConfigError
};
use std::{process::ExitCode, sync::Arc};
use tracing_subscriber::EnvFilter;

mod commands;
mod input;

use commands::Action;

/// Manage the accounts, users, organizations and contacts of a PingCRM instance.
///
/// The API is configured through the environment: PINGCRM_API_URL, PINGCRM_REQUEST_TIMEOUT_MS,
/// PINGCRM_GC_GRACE_MS and PINGCRM_PAGE_SIZE. Set RUST_LOG to see what the client does.
#[derive(Parser)]
#[command(name = "pingcrm", version)]
struct Cli {
    #[command(subcommand)]
    entity: Entity
}

#[derive(Subcommand)]
enum Entity {
    Accounts(EntityArgs),
    Users(EntityArgs),
    Organizations(EntityArgs),
    Contacts(EntityArgs)
}

#[derive(Args)]
struct EntityArgs {
    #[command(subcommand)]
    action: Action
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid input: {0}")]
    Input(String),
    /// The input was rejected and the reasons were already printed.
    #[error("rejected while {0}")]
    Rejected(&'static str)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let store = Arc::new(CacheStore::new(config.store_options()));
    let client = Client::builder(config, store)
        .with_default_exchanges()
        .build();

    match cli.entity {
        Entity::Accounts(args) => commands::run::<Account, _>(&client, args.action).await,
        Entity::Users(args) => commands::run::<User, _>(&client, args.action).await,
        Entity::Organizations(args) => commands::run::<Organization, _>(&client, args.action).await,
        Entity::Contacts(args) => commands::run::<Contact, _>(&client, args.action).await
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pingcrm: error: {}", err);
            ExitCode::FAILURE
        }
    }
}
