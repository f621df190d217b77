use std::sync::Arc;

use clap::Parser;
use metrics_keeper::{
    Repository,
    audit::AuditDispatcher,
    config::{Config, StorageConfig, build_audit, build_repository, read_config_file},
    storage::snapshot::save_snapshot,
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults to in-memory storage)
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("metrics_keeper", LevelFilter::TRACE),
        ("keeper_hub", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };

    let repo = build_repository(&config).await?;
    repo.ping().await?;

    let audit = match &config.audit {
        Some(audit) => build_audit(audit)?,
        None => None,
    };

    info!("storage ready");
    if audit.is_some() {
        info!("audit sink ready; events are emitted by callers after successful writes");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    shutdown(&config, repo, audit).await;

    Ok(())
}

async fn shutdown(config: &Config, repo: Arc<dyn Repository>, audit: Option<AuditDispatcher>) {
    if let Some(audit) = audit {
        debug!("draining audit queue ({} events)", audit.len());
        audit.close().await;
    }

    let in_memory = !matches!(config.storage, Some(StorageConfig::Sqlite { .. }));
    if let Some(snapshot) = config.snapshot.as_ref().filter(|_| in_memory) {
        if let Err(e) = save_snapshot(repo.as_ref(), &snapshot.path).await {
            error!("final snapshot save failed: {e}");
        }
    }
}
