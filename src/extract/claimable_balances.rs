//! Claimable-balance current-state extractor (spec.md §3.2, §4.3). No
//! history kept; deletes are suppressed per `WritePolicy::CurrentOnly`
//! once the row has been upserted with `deleted = true` (spec.md §4.7).

use stellar_xdr::curr::{LedgerEntryData, LedgerKey};

use crate::decode::{ChangeOp, DecodedLedger, LedgerChangeEntry};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::asset::{encode_asset, entry_sponsor};
use crate::model::rows::ClaimableBalanceCurrentRow;
use crate::model::table::ledger_range;

fn balance_key(change: &LedgerChangeEntry) -> Option<String> {
    match &change.key {
        LedgerKey::ClaimableBalance(c) => Some(balance_id_to_hex(&c.balance_id)),
        _ => None,
    }
}

fn balance_id_to_hex(id: &stellar_xdr::curr::ClaimableBalanceId) -> String {
    let stellar_xdr::curr::ClaimableBalanceId::ClaimableBalanceIdTypeV0(hash) = id;
    hex::encode(hash.0)
}

pub fn extract_claimable_balances(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> Vec<ClaimableBalanceCurrentRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, balance_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            let balance_id = balance_key(change)?;

            if change.op == ChangeOp::Removed {
                return Some(ClaimableBalanceCurrentRow {
                    balance_id,
                    ledger_sequence: ledger.header.sequence,
                    claimants_json: "[]".to_string(),
                    asset_type: String::new(),
                    asset_code: None,
                    asset_issuer: None,
                    amount: 0,
                    sponsor: None,
                    last_modified_ledger: ledger.header.sequence,
                    deleted: true,
                    closed_at: ledger.header.close_time,
                    ledger_range: range,
                });
            }

            let entry = change.entry.as_ref()?;
            let LedgerEntryData::ClaimableBalance(c) = &entry.data else {
                return None;
            };
            let asset = encode_asset(&c.asset);
            let claimants: Vec<serde_json::Value> = c
                .claimants
                .iter()
                .map(|claimant| {
                    let stellar_xdr::curr::Claimant::ClaimantTypeV0(v0) = claimant;
                    serde_json::json!({
                        "destination": crate::model::asset::account_id_to_strkey(&v0.destination),
                        "predicate": format!("{:?}", v0.predicate),
                    })
                })
                .collect();

            Some(ClaimableBalanceCurrentRow {
                balance_id,
                ledger_sequence: ledger.header.sequence,
                claimants_json: serde_json::Value::Array(claimants).to_string(),
                asset_type: asset.asset_type.to_string(),
                asset_code: asset.asset_code,
                asset_issuer: asset.asset_issuer,
                amount: c.amount,
                sponsor: entry_sponsor(entry),
                last_modified_ledger: change.last_modified_ledger_seq,
                deleted: false,
                closed_at: ledger.header.close_time,
                ledger_range: range,
            })
        })
        .collect()
}
