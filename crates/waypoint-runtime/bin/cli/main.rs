mod cli;

use crate::cli::{Command, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use waypoint_core::DurableStore;
use waypoint_runtime::UrlRuntime;
use waypoint_storage::{InMemoryStore, MySqlStore, RedisStore};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = CLI::parse();
    waypoint_telemetry::init(config.log_format)?;

    info!(storage_backend = %config.storage, "opening store");

    let found = match config.storage {
        StorageBackendArg::InMemory => run(&config, InMemoryStore::new()).await?,
        StorageBackendArg::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .context("redis url is required when storage backend is redis")?;
            let store = match &config.redis_key_prefix {
                Some(prefix) => RedisStore::connect_with_prefix(redis_url, prefix.as_str()).await,
                None => RedisStore::connect(redis_url).await,
            }
            .context("failed to connect to redis")?;
            run(&config, store).await?
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(mysql_dsn)
                .await
                .context("failed to connect to mysql")?;
            run(&config, store).await?
        }
    };

    Ok(if found { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Runs the requested command through a fresh runtime. Returns `false` when
/// a `get` finds nothing.
async fn run<S: DurableStore>(config: &CLI, store: S) -> anyhow::Result<bool> {
    let runtime = UrlRuntime::start(store, config.runtime_config());
    let key = config.command.key();

    let outcome = match &config.command {
        Command::Set { url, .. } => runtime
            .set_url(&key, url)
            .await
            .with_context(|| format!("failed to set '{key}'"))
            .map(|()| true),
        Command::Get { .. } => match runtime.get_url(&key).await {
            Ok(Some(url)) => {
                println!("{url}");
                Ok(true)
            }
            Ok(None) => {
                eprintln!("no url for '{key}'");
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("failed to get '{key}'")),
        },
    };

    runtime.shutdown().await;
    outcome
}
