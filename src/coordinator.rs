//! Coordinator / run loop (C11, spec.md §4.10). The single owner of the
//! 19+2 buffers: pulls one ledger at a time from the active source,
//! decodes and extracts it, enqueues the rows, consults the flush
//! planner, and executes whatever flush it decides on before pulling
//! the next ledger — this is the backpressure mechanism spec.md §5
//! describes ("no new ledgers are pulled" while a flush is running).
//!
//! A periodic tick drives the timeout-flush side of the planner even
//! when the source is idle; a cancellation token drains with one final
//! forced flush and an fsync'd checkpoint before returning.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::buffer::BufferSet;
use crate::checkpoint_store::CheckpointStore;
use crate::config::Config;
use crate::decode;
use crate::error::{IngestError, Result};
use crate::extract;
use crate::model::CheckpointRecord;
use crate::planner::{FlushDecision, FlushPlanner};
use crate::source::{LedgerSource, RawLedger};
use crate::storage::Writer;

const TICK_INTERVAL: Duration = Duration::from_secs(5);
const RETRY_BASE_BACKOFF: Duration = Duration::from_millis(500);
const RETRY_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Cumulative counters surfaced in the coordinator's periodic progress
/// logs and returned to `main` on exit (spec.md §7: "structured logs
/// keyed by `ledger_sequence`... metric counters per error kind").
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub ledgers_ingested: u64,
    pub decode_errors: u64,
    pub flushes_committed: u64,
    pub flush_retries: u64,
}

pub struct Coordinator<S> {
    source: S,
    writer: Writer,
    checkpoint_store: CheckpointStore,
    checkpoint: CheckpointRecord,
    buffers: BufferSet,
    planner: FlushPlanner,
    partition_width: u32,
    end_ledger: u32,
    max_retries: u32,
    stats: RunStats,
}

impl<S: LedgerSource> Coordinator<S> {
    pub async fn new(source: S, writer: Writer, checkpoint_store: CheckpointStore, config: &Config) -> Result<Self> {
        let checkpoint = checkpoint_store.load().await?;
        Ok(Self {
            source,
            writer,
            checkpoint_store,
            checkpoint,
            buffers: BufferSet::new(&config.storage),
            planner: FlushPlanner::new(&config.storage),
            partition_width: config.storage.partition_width,
            end_ledger: config.source.end_ledger,
            max_retries: config.storage.max_retries,
            stats: RunStats::default(),
        })
    }

    /// `checkpoint.last_ledger + 1`, unless the caller (CLI `--start-ledger`
    /// or a backfill sub-range) overrides it (spec.md §4.8).
    pub fn resume_point(&self) -> u32 {
        self.checkpoint.last_ledger + 1
    }

    /// Runs until `cancel` fires, the source reaches a clean end-of-stream,
    /// or `end_ledger` (when non-zero) is reached. Returns the final run
    /// stats; a fatal flush error is returned as `Err` after the coordinator
    /// has already attempted to drain what it could.
    pub async fn run(&mut self, start_ledger: u32, cancel: CancellationToken) -> Result<RunStats> {
        let mut after_sequence = start_ledger.saturating_sub(1);
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // first tick fires immediately; discard it

        loop {
            if self.end_ledger != 0 && after_sequence >= self.end_ledger {
                tracing::info!(end_ledger = self.end_ledger, "reached configured end ledger");
                self.flush_with_retry(FlushDecision::Full).await?;
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!("cancellation received, draining with a final flush");
                    if let Err(err) = self.flush_with_retry(FlushDecision::Full).await {
                        tracing::error!(%err, "final flush failed during shutdown, exiting anyway");
                    }
                    break;
                }

                _ = ticker.tick() => {
                    let decision = self.planner.decide(&self.buffers);
                    if decision != FlushDecision::Wait {
                        self.flush_with_retry(decision).await?;
                    }
                }

                next = self.source.next_ledger(after_sequence) => {
                    match next? {
                        Some(raw) => {
                            after_sequence = raw.sequence;
                            self.ingest_one(raw).await;
                            let decision = self.planner.decide(&self.buffers);
                            if decision != FlushDecision::Wait {
                                self.flush_with_retry(decision).await?;
                            }
                        }
                        None => {
                            tracing::info!("source reached end of stream, final flush");
                            self.flush_with_retry(FlushDecision::Full).await?;
                            break;
                        }
                    }
                }
            }
        }

        Ok(self.stats.clone())
    }

    async fn ingest_one(&mut self, raw: RawLedger) {
        let sequence = raw.sequence;
        match decode::decode_ledger(&raw.xdr_bytes) {
            Ok(ledger) => {
                let batch = extract::extract_all(&ledger, self.partition_width);
                self.buffers.ingest(batch, sequence);
            }
            Err(err) => {
                // spec.md §7 DecodeError: log with sequence, skip to next
                // ledger, increment decode_errors, never advance checkpoint.
                tracing::error!(ledger_sequence = sequence, error = %err, "decode error, skipping ledger");
                self.stats.decode_errors += 1;
            }
        }
    }

    /// Executes one flush with exponential backoff retry (spec.md §7
    /// FlushError: "retry up to `max_retries`... on exhaustion, return
    /// error to run loop"). A successful flush that drained every buffer
    /// advances the checkpoint and notifies the source manager so a
    /// BACKFILL run can transition back to HOT (spec.md §4.7).
    async fn flush_with_retry(&mut self, decision: FlushDecision) -> Result<()> {
        let mut backoff = RETRY_BASE_BACKOFF;
        let mut attempt = 0;
        loop {
            match self.writer.flush(&mut self.buffers, &decision).await {
                Ok(stats) => {
                    self.stats.flushes_committed += 1;
                    if let (Some(max_ledger), Some(hash)) = (stats.max_ledger, &stats.last_ledger_hash) {
                        self.stats.ledgers_ingested += stats.ledgers_flushed as u64;
                        self.checkpoint.advance(
                            max_ledger,
                            hash.clone(),
                            self.partition_width,
                            stats.ledgers_flushed as u64,
                            stats.transactions_flushed as u64,
                            stats.operations_flushed as u64,
                        );
                        if let Err(err) = self.checkpoint_store.save(&self.checkpoint).await {
                            // spec.md §7 CheckpointWriteError: warn, retry next
                            // flush, never blocks ingestion.
                            tracing::warn!(%err, "checkpoint write failed, will retry on next flush");
                        }
                        self.source.on_checkpoint_advance(max_ledger).await;
                    }
                    return Ok(());
                }
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    self.stats.flush_retries += 1;
                    tracing::warn!(attempt, max_retries = self.max_retries, %err, "flush failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(RETRY_MAX_BACKOFF);
                }
                Err(err) => {
                    tracing::error!(%err, "flush exhausted retries, shutting down");
                    return Err(IngestError::Flush(anyhow::anyhow!(
                        "flush exhausted {} retries: {err}",
                        self.max_retries
                    )));
                }
            }
        }
    }
}
