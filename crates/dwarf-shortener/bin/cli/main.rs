mod cli;

use crate::cli::{Command, CreateArgs, LogFormatArg, StorageBackendArg, CLI};
use clap::Parser;
use dwarf_core::{CreateParams, ExpirationPolicy, Repository, SequenceSource, ShortCode, Shortener};
use dwarf_shortener::generator::store::StoreGenerator;
use dwarf_shortener::ShortenerService;
use dwarf_storage::{InMemoryRepository, SqliteRepository};
use jiff::Timestamp;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        storage_backend = %config.storage,
        allocation_attempts = config.allocation_attempts,
        "starting dwarf"
    );

    match config.storage {
        StorageBackendArg::Sqlite => {
            let repository = SqliteRepository::connect(&config.database_url).await?;
            run(Arc::new(repository), config).await
        }
        StorageBackendArg::InMemory => run(Arc::new(InMemoryRepository::new()), config).await,
    }
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn run<R>(repository: Arc<R>, config: CLI) -> Result<(), Box<dyn std::error::Error>>
where
    R: Repository + SequenceSource,
{
    let generator = StoreGenerator::new(Arc::clone(&repository));
    let service = ShortenerService::with_shared_repository(Arc::clone(&repository), generator)
        .with_max_allocation_attempts(config.allocation_attempts);

    match config.command {
        Command::Create(args) => {
            let code = service.create(create_params(args)).await?;
            println!("{}", code.to_url(&config.base_url));
        }
        Command::Resolve { code, passphrase } => {
            let url = service.resolve(&code, passphrase.as_deref()).await?;
            println!("{}", url);
        }
        Command::Delete { code } => {
            if service.delete(&code).await? {
                println!("deleted {}", code);
            } else {
                println!("{} did not exist", code);
            }
        }
        Command::Inspect { code } => {
            let code = ShortCode::parse(&code)?;
            let record = repository
                .get(&code)
                .await?
                .ok_or_else(|| format!("{} not found", code))?;
            let verdict = record.verdict(Timestamp::now());
            let report = serde_json::json!({
                "code": code,
                "record": record,
                "verdict": verdict,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn create_params(args: CreateArgs) -> CreateParams {
    let expiration = match (args.expires_at, args.expires_in) {
        (Some(timestamp), _) => ExpirationPolicy::AtTimestamp(timestamp),
        (None, Some(duration)) => ExpirationPolicy::AfterDuration(duration),
        (None, None) => ExpirationPolicy::Never,
    };

    CreateParams::builder()
        .url(args.url)
        .code(args.code)
        .expiration(expiration)
        .uses(args.uses)
        .passphrase(args.passphrase)
        .build()
}
