//! Offer snapshot extractor (spec.md §3.2, §4.3).

use stellar_xdr::curr::{LedgerEntryData, LedgerKey};

use crate::decode::{ChangeOp, DecodedLedger, LedgerChangeEntry};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::asset::encode_asset;
use crate::model::rows::OfferSnapshotRow;
use crate::model::table::ledger_range;

fn offer_key(change: &LedgerChangeEntry) -> Option<i64> {
    match &change.key {
        LedgerKey::Offer(o) => Some(o.offer_id),
        _ => None,
    }
}

pub fn extract_offers(ledger: &DecodedLedger, partition_width: u32) -> Vec<OfferSnapshotRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, offer_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            let LedgerKey::Offer(key) = &change.key else {
                return None;
            };

            if change.op == ChangeOp::Removed {
                return Some(OfferSnapshotRow {
                    offer_id: key.offer_id,
                    ledger_sequence: ledger.header.sequence,
                    seller_id: crate::model::asset::account_id_to_strkey(&key.seller_id),
                    selling_asset_type: String::new(),
                    selling_asset_code: None,
                    selling_asset_issuer: None,
                    buying_asset_type: String::new(),
                    buying_asset_code: None,
                    buying_asset_issuer: None,
                    amount: 0,
                    price_n: 0,
                    price_d: 0,
                    flags: 0,
                    last_modified_ledger: ledger.header.sequence,
                    deleted: true,
                    closed_at: ledger.header.close_time,
                    valid_to: None,
                    ledger_range: range,
                });
            }

            let LedgerEntryData::Offer(o) = &change.entry.as_ref()?.data else {
                return None;
            };
            let selling = encode_asset(&o.selling);
            let buying = encode_asset(&o.buying);
            Some(OfferSnapshotRow {
                offer_id: o.offer_id,
                ledger_sequence: ledger.header.sequence,
                seller_id: crate::model::asset::account_id_to_strkey(&o.seller_id),
                selling_asset_type: selling.asset_type.to_string(),
                selling_asset_code: selling.asset_code,
                selling_asset_issuer: selling.asset_issuer,
                buying_asset_type: buying.asset_type.to_string(),
                buying_asset_code: buying.asset_code,
                buying_asset_issuer: buying.asset_issuer,
                amount: o.amount,
                price_n: o.price.n,
                price_d: o.price.d,
                flags: o.flags,
                last_modified_ledger: change.last_modified_ledger_seq,
                deleted: false,
                closed_at: ledger.header.close_time,
                valid_to: None,
                ledger_range: range,
            })
        })
        .collect()
}
