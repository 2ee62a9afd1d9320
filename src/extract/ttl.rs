//! TTL current-state extractor (spec.md §3.2, §4.3). Deletions are
//! suppressed: a TTL entry disappearing just means its keyed entry was
//! evicted or removed, tracked separately by the evicted/restored tables.

use stellar_xdr::curr::{LedgerEntryData, LedgerKey};

use crate::decode::{ChangeOp, DecodedLedger, LedgerChangeEntry};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::rows::TtlCurrentRow;
use crate::model::table::ledger_range;

fn ttl_key(change: &LedgerChangeEntry) -> Option<String> {
    match &change.key {
        LedgerKey::Ttl(t) => Some(hex::encode(t.key_hash.0)),
        _ => None,
    }
}

pub fn extract_ttl(ledger: &DecodedLedger, partition_width: u32) -> Vec<TtlCurrentRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, ttl_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            if change.op == ChangeOp::Removed {
                return None;
            }
            let key_hash = ttl_key(change)?;
            let LedgerEntryData::Ttl(t) = &change.entry.as_ref()?.data else {
                return None;
            };
            Some(TtlCurrentRow {
                key_hash,
                ledger_sequence: ledger.header.sequence,
                live_until_ledger_seq: t.live_until_ledger_seq,
                closed_at: ledger.header.close_time,
                ledger_range: range,
            })
        })
        .collect()
}
