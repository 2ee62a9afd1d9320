//! Scenario tests mirroring spec.md §8's S1-S8 walkthroughs, at whatever
//! layer can exercise them without a live catalog: the buffer/planner
//! pair for the flush triggers (S4/S5), and [`MockLedgerSource`] for the
//! pull-model and gap-detection contracts (S6/S7). Decode/extract
//! correctness (S1-S3), checkpoint persistence (S6's on-disk half), the
//! hot/cold state machine (S7's transition logic), and parameter
//! chunking (S8) each have focused unit tests next to the code they
//! cover.

use std::collections::HashMap;
use std::time::Duration;

use crate::buffer::BufferSet;
use crate::config::{CheckpointConfig, Config, ObjectStoreConfig, QualityConfig, StorageConfig};
use crate::extract::ExtractedBatch;
use crate::model::rows::{LedgerRow, TransactionRow};
use crate::model::table::TableId;
use crate::planner::{FlushDecision, FlushPlanner};
use crate::source::LedgerSource;
use crate::test::testutils::MockLedgerSource;

fn storage_config(batch_size: usize, commit_interval_seconds: u64) -> StorageConfig {
    StorageConfig {
        catalog_uri: "mem.db".to_string(),
        data_path: "/tmp/ledger-lake-ingest-test".to_string(),
        catalog_name: "stellar".to_string(),
        schema_name: "public".to_string(),
        object_store: ObjectStoreConfig {
            key_id: None,
            secret: None,
            region: None,
            endpoint: None,
            url_style: None,
        },
        batch_size,
        batch_size_overrides: HashMap::new(),
        commit_interval_seconds,
        num_workers: 1,
        partition_width: 100_000,
        param_limit: 65_535,
        flush_deadline_seconds: 900,
        max_retries: 5,
        postgres_dsn: None,
    }
}

fn one_ledger_batch(sequence: u32) -> ExtractedBatch {
    let mut batch = ExtractedBatch::default();
    batch.ledgers.push(LedgerRow {
        sequence,
        ledger_hash: format!("hash-{sequence}"),
        previous_ledger_hash: format!("hash-{}", sequence.saturating_sub(1)),
        closed_at: 1_700_000_000 + sequence as i64,
        protocol_version: 21,
        total_coins: 0,
        fee_pool: 0,
        base_fee: 100,
        base_reserve: 5_000_000,
        max_tx_set_size: 1000,
        transaction_count: 1,
        successful_tx_count: 1,
        failed_tx_count: 0,
        operation_count: 1,
        tx_set_operation_count: 1,
        bucket_list_size: None,
        live_soroban_state_size: None,
        fee_write_1kb: None,
        ledger_range: sequence / 100_000,
    });
    batch.transactions.push(TransactionRow {
        transaction_hash: format!("tx-{sequence}"),
        ledger_sequence: sequence,
        index_in_ledger: 0,
        successful: true,
        source_account: "GABC".to_string(),
        fee_charged: 100,
        operation_count: 1,
        memo_type: "none".to_string(),
        memo: None,
        closed_at: 1_700_000_000 + sequence as i64,
        ledger_range: sequence / 100_000,
    });
    batch
}

/// S4: one table crosses its own batch-size threshold before the others
/// -- the planner must select only that table, leaving the rest
/// buffered (spec.md §4.4 "selective flush").
#[test]
fn selective_flush_targets_only_the_table_over_threshold() {
    let mut overrides = HashMap::new();
    overrides.insert(TableId::Ledgers, 2);
    let storage = StorageConfig {
        batch_size_overrides: overrides,
        ..storage_config(1000, 3600)
    };
    let planner = FlushPlanner::new(&storage);
    let mut buffers = BufferSet::new(&storage);

    buffers.ingest(one_ledger_batch(1), 1);
    assert_eq!(planner.decide(&buffers), FlushDecision::Wait);

    buffers.ingest(one_ledger_batch(2), 2);
    match planner.decide(&buffers) {
        FlushDecision::Selective(tables) => {
            assert_eq!(tables, vec![TableId::Ledgers]);
        }
        other => panic!("expected a selective flush, got {other:?}"),
    }
}

/// S5: nothing crosses a per-table threshold, but the commit-interval
/// timeout elapses -- the planner escalates to a full flush regardless
/// of how few rows are buffered (spec.md §4.4 "timeout flush").
#[test]
fn timeout_elapsing_forces_a_full_flush_even_under_threshold() {
    let storage = storage_config(1_000_000, 0);
    let planner = FlushPlanner::new(&storage);
    let mut buffers = BufferSet::new(&storage);

    buffers.ingest(one_ledger_batch(1), 1);
    std::thread::sleep(Duration::from_millis(5));

    assert_eq!(planner.decide(&buffers), FlushDecision::Full);
}

/// A planner with no buffered rows never fires, timeout or not.
#[test]
fn empty_buffers_never_trigger_a_flush() {
    let storage = storage_config(1, 0);
    let planner = FlushPlanner::new(&storage);
    let buffers = BufferSet::new(&storage);
    assert_eq!(planner.decide(&buffers), FlushDecision::Wait);
}

/// `mark_flushed` resets the age/range tracking a completed flush
/// consumed, so a subsequent ledger starts a fresh timeout window
/// instead of inheriting the first-ever row's age.
#[test]
fn mark_flushed_resets_oldest_row_and_range_tracking() {
    let storage = storage_config(1_000_000, 3600);
    let mut buffers = BufferSet::new(&storage);
    buffers.ingest(one_ledger_batch(10), 10);
    buffers.ingest(one_ledger_batch(11), 11);
    assert_eq!(buffers.min_ledger, Some(10));
    assert_eq!(buffers.max_ledger, Some(11));

    buffers.ledgers.drain();
    buffers.transactions.drain();
    buffers.mark_flushed();

    assert_eq!(buffers.min_ledger, None);
    assert_eq!(buffers.max_ledger, None);
    assert!(buffers.oldest_row_at.is_none());
}

/// S7 (pull-model half): a gap in the hot tier surfaces as `Ok(None)`
/// from `next_ledger` for the missing sequence, the same clean signal a
/// true end-of-stream produces -- callers distinguish the two only by
/// whether `max_ledger` is still ahead of what they asked for, which is
/// exactly what [`crate::source::manager::SourceManager`] checks.
#[tokio::test]
async fn mock_source_surfaces_a_gap_as_a_clean_none() {
    let source = MockLedgerSource::new([1, 2, 3, 5, 6]).with_gap([4]);

    let after_3 = source.next_ledger(3).await.unwrap();
    assert_eq!(after_3.map(|r| r.sequence), Some(5));

    assert_eq!(source.max_ledger().await, Some(6));
    assert_eq!(source.call_count(), 1);
}

/// Resuming past the end of the fixture is a clean `None`, matching a
/// live source that has nothing newer than `after_sequence` yet.
#[tokio::test]
async fn mock_source_returns_none_past_its_last_ledger() {
    let source = MockLedgerSource::new([100, 101, 102]);
    let next = source.next_ledger(102).await.unwrap();
    assert!(next.is_none());
}

/// Config validation: a single-file catalog with `num_workers > 1` is
/// rejected before any worker is spawned (spec.md §9's single-writer
/// catalog constraint, enforced ahead of C12).
#[test]
fn multi_worker_with_single_file_catalog_is_rejected() {
    let config = Config {
        source: crate::config::SourceConfig {
            endpoint: "http://localhost:1".to_string(),
            network_passphrase: "Test SDF Network ; September 2015".to_string(),
            start_ledger: 0,
            end_ledger: 0,
            cold_endpoint: None,
            fallback_enabled: true,
        },
        storage: StorageConfig {
            num_workers: 2,
            ..storage_config(1000, 5)
        },
        quality: QualityConfig::default(),
        checkpoint: CheckpointConfig {
            file_path: "/tmp/ledger-lake-ingest-test/checkpoint.json".to_string(),
        },
    };
    assert!(config.validate().is_err());
}
