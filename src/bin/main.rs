//! CLI entry point (spec.md §6). Loads the YAML config, applies the
//! CLI's numeric overrides, wires up logging, and runs either a single
//! live/bounded ingest (`run`, the default) or a bounded backfill that
//! may fan out across workers (`backfill`, C12).

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use ledger_lake_ingest::checkpoint_store::CheckpointStore;
use ledger_lake_ingest::config::Config;
use ledger_lake_ingest::coordinator::Coordinator;
use ledger_lake_ingest::partition;
use ledger_lake_ingest::source::grpc::GrpcLedgerSource;
use ledger_lake_ingest::source::manager::SourceManager;
use ledger_lake_ingest::storage::{connect_postgres, Catalog, Writer};

#[derive(Parser, Debug)]
#[command(name = "ledger-lake-ingest", about = "Stellar ledger-close-meta ingestion into a partitioned lake")]
struct Cli {
    #[arg(long, env = "LLI_CONFIG", default_value = "config.yaml")]
    config: String,

    #[arg(long)]
    start_ledger: Option<u32>,

    #[arg(long)]
    end_ledger: Option<u32>,

    #[arg(long)]
    num_workers: Option<usize>,

    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Live or bounded ingest from the configured hot (and optional cold) source. Default.
    Run,
    /// Bounded backfill of `[start_ledger, end_ledger)`, optionally split across `num_workers`.
    Backfill,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "fatal error, exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(&cli.config)?;
    if let Some(start) = cli.start_ledger {
        config.source.start_ledger = start;
    }
    if let Some(end) = cli.end_ledger {
        config.source.end_ledger = end;
    }
    if let Some(num_workers) = cli.num_workers {
        config.storage.num_workers = num_workers;
    }
    config.validate()?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
            signal_cancel.cancel();
        }
    });

    match cli.command.unwrap_or(Cmd::Run) {
        Cmd::Run => run_single(config, cancel).await,
        Cmd::Backfill => run_backfill(config, cancel).await,
    }
}

async fn run_single(config: Config, cancel: CancellationToken) -> anyhow::Result<()> {
    let catalog = Catalog::bootstrap(&config.storage, config.quality.enabled)?;
    let postgres = connect_postgres(&config.storage).await?;
    let writer = Writer::new(catalog, postgres, &config.storage, config.quality.clone());
    let checkpoint_store = CheckpointStore::new(config.checkpoint.file_path.clone());

    let start_ledger = config.source.start_ledger;
    let stats = match config.source.cold_endpoint.clone() {
        Some(cold_endpoint) => {
            let hot = Arc::new(GrpcLedgerSource::new(config.source.endpoint.clone(), config.source.end_ledger));
            let cold = Arc::new(GrpcLedgerSource::new(cold_endpoint, config.source.end_ledger));
            let source = SourceManager::new(hot, Some(cold), config.source.fallback_enabled);
            let mut coordinator = Coordinator::new(source, writer, checkpoint_store, &config).await?;
            let resume_from = coordinator.resume_point().max(start_ledger);
            coordinator.run(resume_from, cancel).await?
        }
        None => {
            let source = GrpcLedgerSource::new(config.source.endpoint.clone(), config.source.end_ledger);
            let mut coordinator = Coordinator::new(source, writer, checkpoint_store, &config).await?;
            let resume_from = coordinator.resume_point().max(start_ledger);
            coordinator.run(resume_from, cancel).await?
        }
    };

    tracing::info!(
        ledgers = stats.ledgers_ingested,
        decode_errors = stats.decode_errors,
        flushes = stats.flushes_committed,
        retries = stats.flush_retries,
        "ingestion stopped"
    );
    Ok(())
}

async fn run_backfill(config: Config, _cancel: CancellationToken) -> anyhow::Result<()> {
    if config.source.end_ledger == 0 {
        anyhow::bail!("backfill requires a non-zero --end-ledger / source.end_ledger");
    }
    let config = Arc::new(config);
    partition::run_parallel_backfill(
        Arc::clone(&config),
        config.source.start_ledger,
        config.source.end_ledger,
    )
    .await?;
    Ok(())
}
