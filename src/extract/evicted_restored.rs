//! Evicted-key and restored-key append-only extractors (spec.md §3.2,
//! §4.3). Eviction is a ledger-level event (`evictedTemporaryLedgerKeys`
//! / `evictedPersistentLedgerEntries`); restoration is attributed to the
//! `restore_footprint` operation whose changes brought the key back.

use stellar_xdr::curr::OperationBody;

use crate::decode::{ChangeOp, DecodedLedger};
use crate::extract::key_encoding::{key_type_name, key_xdr_base64};
use crate::model::rows::{EvictedKeyRow, RestoredKeyRow};
use crate::model::table::ledger_range;

pub fn extract_evicted_keys(ledger: &DecodedLedger, partition_width: u32) -> Vec<EvictedKeyRow> {
    let range = ledger_range(ledger.header.sequence, partition_width);
    ledger
        .evicted_keys
        .iter()
        .enumerate()
        .map(|(sub_index, key)| EvictedKeyRow {
            ledger_sequence: ledger.header.sequence,
            sub_index: sub_index as u32,
            key_xdr_base64: key_xdr_base64(key),
            key_type: key_type_name(key).to_string(),
            closed_at: ledger.header.close_time,
            ledger_range: range,
        })
        .collect()
}

pub fn extract_restored_keys(ledger: &DecodedLedger, partition_width: u32) -> Vec<RestoredKeyRow> {
    let range = ledger_range(ledger.header.sequence, partition_width);
    let mut out = Vec::new();

    for tx in &ledger.transactions {
        for op in &tx.operations {
            if !matches!(op.body, OperationBody::RestoreFootprint(_)) {
                continue;
            }
            let mut sub_index = 0u32;
            for change in &op.changes {
                if change.op == ChangeOp::Removed {
                    continue;
                }
                out.push(RestoredKeyRow {
                    ledger_sequence: ledger.header.sequence,
                    transaction_hash: tx.hash.clone(),
                    operation_index: op.index,
                    sub_index,
                    key_xdr_base64: key_xdr_base64(&change.key),
                    key_type: key_type_name(&change.key).to_string(),
                    closed_at: ledger.header.close_time,
                    ledger_range: range,
                });
                sub_index += 1;
            }
        }
    }
    out
}
