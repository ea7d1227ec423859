mod cli;
mod commands;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// Browser-heavy checks spike allocations; mimalloc returns memory to the OS
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use nfchecker_core::config::AppConfig;
use nfchecker_core::Identity;
use nfchecker_store::MemoryStore;

use crate::cli::{Cli, Commands, LogsAction, PoolAction};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    // Environment variable overrides for operational tuning
    if let Ok(v) = std::env::var("DATA_DIR") {
        config.general.data_dir = v;
    }
    if let Ok(v) = std::env::var("CHECK_CONCURRENCY") {
        if let Some(n) = v.parse::<usize>().ok().filter(|&n| n > 0 && n <= 16) {
            config.checker.max_concurrency = n;
        }
    }
    if let Ok(v) = std::env::var("REFRESH_INTERVAL_SECS") {
        if let Ok(n) = v.parse::<u64>() {
            config.refresh.interval_seconds = n;
        }
    }
    if let Ok(v) = std::env::var("TARGET_BASE_URL") {
        config.target.base_url = v;
    }

    let store = Arc::new(MemoryStore::open(std::path::Path::new(
        &config.general.data_dir,
    ))?);

    // CLI invocations act as the local operator; the real access-key
    // service sits in front of deployments that need per-user identities.
    let operator = Identity {
        id: "local-operator".to_string(),
        label: "Operator".to_string(),
        is_master: true,
    };

    match cli.command {
        Commands::Check {
            text,
            file,
            format,
            progress,
        } => {
            commands::check::run(config, store, &operator, text, file, &format, progress).await?;
        }
        Commands::Job { id, summary } => {
            commands::check::show_job(store, &id, summary).await?;
        }
        Commands::History { limit } => {
            commands::check::history(store, &operator, limit).await?;
        }
        Commands::Logs { action } => match action {
            LogsAction::List { limit } => commands::logs::list(store, limit).await?,
            LogsAction::Delete { id } => commands::logs::delete(store, &operator, &id).await?,
            LogsAction::Clear => commands::logs::clear(store, &operator).await?,
        },
        Commands::Pool { action } => match action {
            PoolAction::Add { text, file, format } => {
                commands::pool::add(config, store, &operator, text, file, &format).await?;
            }
            PoolAction::List { all } => commands::pool::list(config, store, &operator, all).await?,
            PoolAction::Remove { id } => commands::pool::remove(store, &operator, &id).await?,
            PoolAction::Limit { count } => commands::pool::set_limit(store, &operator, count).await?,
            PoolAction::Refresh => commands::pool::refresh(config, store, &operator).await?,
        },
        Commands::Watch => {
            commands::watch::run(config, store).await?;
        }
        Commands::TvCode { cookie_id, code } => {
            commands::tv_code::run(config, store, &cookie_id, &code).await?;
        }
    }

    Ok(())
}
