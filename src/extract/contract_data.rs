//! Contract-data current-state extractor (spec.md §3.2, §4.3). Keyed on
//! `(contract, key, durability)`; both the key and value are carried as
//! base64 XDR with a best-effort decoded JSON companion.

use base64::Engine;
use stellar_xdr::curr::{ContractDataDurability, LedgerEntryData, LedgerKey, Limits, WriteXdr};

use crate::decode::{ChangeOp, DecodedLedger, LedgerChangeEntry};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::sql_value::{sc_address_to_strkey, scval_decoded_json};
use crate::model::rows::ContractDataCurrentRow;
use crate::model::table::ledger_range;

fn durability_str(d: ContractDataDurability) -> &'static str {
    match d {
        ContractDataDurability::Temporary => "temporary",
        ContractDataDurability::Persistent => "persistent",
    }
}

fn scval_base64(value: &stellar_xdr::curr::ScVal) -> String {
    value
        .to_xdr(Limits::none())
        .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
        .unwrap_or_default()
}

fn data_key(change: &LedgerChangeEntry) -> Option<(String, String, &'static str)> {
    match &change.key {
        LedgerKey::ContractData(c) => Some((
            sc_address_to_strkey(&c.contract),
            scval_base64(&c.key),
            durability_str(c.durability),
        )),
        _ => None,
    }
}

pub fn extract_contract_data(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> Vec<ContractDataCurrentRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, data_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            let (contract_id, key_xdr_base64, durability) = data_key(change)?;

            if change.op == ChangeOp::Removed {
                return Some(ContractDataCurrentRow {
                    contract_id,
                    key_xdr_base64,
                    key_decoded_json: "null".to_string(),
                    durability: durability.to_string(),
                    ledger_sequence: ledger.header.sequence,
                    value_xdr_base64: String::new(),
                    value_decoded_json: "null".to_string(),
                    last_modified_ledger: ledger.header.sequence,
                    deleted: true,
                    closed_at: ledger.header.close_time,
                    ledger_range: range,
                });
            }

            let entry = change.entry.as_ref()?;
            let LedgerEntryData::ContractData(c) = &entry.data else {
                return None;
            };
            Some(ContractDataCurrentRow {
                contract_id,
                key_xdr_base64,
                key_decoded_json: scval_decoded_json(&c.key),
                durability: durability.to_string(),
                ledger_sequence: ledger.header.sequence,
                value_xdr_base64: scval_base64(&c.val),
                value_decoded_json: scval_decoded_json(&c.val),
                last_modified_ledger: change.last_modified_ledger_seq,
                deleted: false,
                closed_at: ledger.header.close_time,
                ledger_range: range,
            })
        })
        .collect()
}
