//! Worker partitioner (C12, spec.md §4.11, optional). For a bounded
//! `[start, end)` backfill with `num_workers > 1`, splits the range into
//! N contiguous sub-ranges and runs one full ingester instance (C1-C10)
//! per sub-range against its own checkpoint file, sharing only the
//! catalog (spec.md §5: "Workers are independent instances of C1-C10
//! sharing only the catalog"). The first worker error cancels every
//! sibling; the caller sees first-error-wins (spec.md §4.11).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::checkpoint_store::CheckpointStore;
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::{IngestError, Result};
use crate::source::grpc::GrpcLedgerSource;
use crate::storage::{connect_postgres, Catalog, Writer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRange {
    pub start: u32,
    pub end: u32,
}

/// Splits `[start, end)` into `num_workers` contiguous sub-ranges; the
/// last worker absorbs any remainder (spec.md §4.11).
pub fn split_range(start: u32, end: u32, num_workers: usize) -> Result<Vec<SubRange>> {
    if num_workers == 0 {
        return Err(IngestError::Partition("num_workers must be at least 1".into()));
    }
    if end <= start {
        return Err(IngestError::Partition(format!(
            "backfill range must be non-empty: [{start}, {end})"
        )));
    }

    let total = (end - start) as u64;
    let workers = num_workers as u64;
    let base = total / workers;
    let remainder = total % workers;

    let mut ranges = Vec::with_capacity(num_workers);
    let mut cursor = start as u64;
    for i in 0..workers {
        let width = base + if i == workers - 1 { remainder } else { 0 };
        let sub_start = cursor;
        let sub_end = cursor + width;
        ranges.push(SubRange {
            start: sub_start as u32,
            end: sub_end as u32,
        });
        cursor = sub_end;
    }
    Ok(ranges)
}

/// Runs one bounded ingester instance per sub-range, in parallel. The
/// caller must have already validated `config.storage.num_workers > 1`
/// requires a multi-writer (server-backed) catalog — `Config::validate`
/// enforces that invariant at startup, before this is ever called.
pub async fn run_parallel_backfill(config: Arc<Config>, start: u32, end: u32) -> Result<()> {
    let ranges = split_range(start, end, config.storage.num_workers)?;
    let cancel = CancellationToken::new();

    let mut handles = Vec::with_capacity(ranges.len());
    for (index, range) in ranges.into_iter().enumerate() {
        let config = Arc::clone(&config);
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            let result = run_one_worker(index, range, &config, cancel.clone()).await;
            if result.is_err() {
                // first-error-wins: cancel every sibling worker's context.
                cancel.cancel();
            }
            (index, result)
        }));
    }

    let mut first_error: Option<IngestError> = None;
    for handle in handles {
        let (index, result) = handle
            .await
            .map_err(|e| IngestError::Partition(format!("worker task panicked: {e}")))?;
        if let Err(err) = result {
            tracing::error!(worker = index, %err, "backfill worker failed");
            if first_error.is_none() {
                first_error = Some(IngestError::Partition(format!(
                    "worker {index} failed: {err}"
                )));
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn run_one_worker(
    index: usize,
    range: SubRange,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    tracing::info!(worker = index, start = range.start, end = range.end, "starting backfill worker");

    let source = GrpcLedgerSource::new(config.source.endpoint.clone(), range.end);
    let catalog = Catalog::bootstrap(&config.storage, config.quality.enabled)?;
    let postgres = connect_postgres(&config.storage).await?;
    let writer = Writer::new(catalog, postgres, &config.storage, config.quality.clone());
    let checkpoint_store = CheckpointStore::new(worker_checkpoint_path(&config.checkpoint.file_path, index));

    let mut coordinator = Coordinator::new(source, writer, checkpoint_store, config).await?;
    let resume_from = coordinator.resume_point().max(range.start);
    coordinator.run(resume_from, cancel).await?;
    Ok(())
}

/// Each worker owns its own checkpoint file keyed by sub-range (spec.md
/// §5): `checkpoint.json` -> `checkpoint.worker-0.json`.
fn worker_checkpoint_path(base: &str, index: usize) -> PathBuf {
    let path = Path::new(base);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("checkpoint");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let file_name = format!("{stem}.worker-{index}.{ext}");
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_evenly_when_divisible() {
        let ranges = split_range(1000, 1100, 4).unwrap();
        assert_eq!(
            ranges,
            vec![
                SubRange { start: 1000, end: 1025 },
                SubRange { start: 1025, end: 1050 },
                SubRange { start: 1050, end: 1075 },
                SubRange { start: 1075, end: 1100 },
            ]
        );
    }

    #[test]
    fn last_worker_absorbs_remainder() {
        let ranges = split_range(0, 10, 3).unwrap();
        assert_eq!(
            ranges,
            vec![
                SubRange { start: 0, end: 3 },
                SubRange { start: 3, end: 6 },
                SubRange { start: 6, end: 10 },
            ]
        );
    }

    #[test]
    fn rejects_empty_range() {
        assert!(split_range(100, 100, 2).is_err());
    }

    #[test]
    fn worker_checkpoint_paths_are_keyed_by_index() {
        assert_eq!(
            worker_checkpoint_path("/data/checkpoint.json", 2),
            PathBuf::from("/data/checkpoint.worker-2.json")
        );
    }
}
