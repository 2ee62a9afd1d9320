//! Contract-code current-state extractor (spec.md §3.2, §4.3). Wasm
//! bytes themselves are not stored, only size, matching the lake's
//! "metadata, not blob store" shape.

use stellar_xdr::curr::{LedgerEntryData, LedgerKey};

use crate::decode::{ChangeOp, DecodedLedger, LedgerChangeEntry};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::rows::ContractCodeCurrentRow;
use crate::model::table::ledger_range;

fn code_key(change: &LedgerChangeEntry) -> Option<String> {
    match &change.key {
        LedgerKey::ContractCode(c) => Some(hex::encode(c.hash.0)),
        _ => None,
    }
}

pub fn extract_contract_code(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> Vec<ContractCodeCurrentRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, code_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            let contract_code_hash = code_key(change)?;

            if change.op == ChangeOp::Removed {
                return Some(ContractCodeCurrentRow {
                    contract_code_hash,
                    ledger_sequence: ledger.header.sequence,
                    code_size_bytes: 0,
                    last_modified_ledger: ledger.header.sequence,
                    deleted: true,
                    closed_at: ledger.header.close_time,
                    ledger_range: range,
                });
            }

            let LedgerEntryData::ContractCode(c) = &change.entry.as_ref()?.data else {
                return None;
            };
            Some(ContractCodeCurrentRow {
                contract_code_hash,
                ledger_sequence: ledger.header.sequence,
                code_size_bytes: c.code.len() as u32,
                last_modified_ledger: change.last_modified_ledger_seq,
                deleted: false,
                closed_at: ledger.header.close_time,
                ledger_range: range,
            })
        })
        .collect()
}
