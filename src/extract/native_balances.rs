//! Native-balance current-state extractor (spec.md §3.2, §4.3): a narrow
//! upsert projection of the account snapshot stream, carrying only the
//! XLM balance so consumers that don't need the full account history can
//! join against a single-row-per-account table.

use stellar_xdr::curr::{LedgerEntryData, LedgerKey};

use crate::decode::{ChangeOp, DecodedLedger, LedgerChangeEntry};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::asset::account_id_to_strkey;
use crate::model::rows::NativeBalanceCurrentRow;
use crate::model::table::ledger_range;

fn account_key(change: &LedgerChangeEntry) -> Option<String> {
    match &change.key {
        LedgerKey::Account(a) => Some(account_id_to_strkey(&a.account_id)),
        _ => None,
    }
}

pub fn extract_native_balances(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> Vec<NativeBalanceCurrentRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, account_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            if change.op == ChangeOp::Removed {
                return None;
            }
            let account_id = account_key(change)?;
            let LedgerEntryData::Account(a) = &change.entry.as_ref()?.data else {
                return None;
            };
            Some(NativeBalanceCurrentRow {
                account_id,
                ledger_sequence: ledger.header.sequence,
                balance: a.balance,
                last_modified_ledger: change.last_modified_ledger_seq,
                closed_at: ledger.header.close_time,
                ledger_range: range,
            })
        })
        .collect()
}
