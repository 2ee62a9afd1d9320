//! Liquidity-pool current-state extractor (spec.md §3.2, §4.3).

use stellar_xdr::curr::{LedgerEntryData, LedgerKey, LiquidityPoolBody};

use crate::decode::{ChangeOp, DecodedLedger, LedgerChangeEntry};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::asset::encode_asset;
use crate::model::rows::LiquidityPoolCurrentRow;
use crate::model::table::ledger_range;

fn pool_key(change: &LedgerChangeEntry) -> Option<String> {
    match &change.key {
        LedgerKey::LiquidityPool(p) => Some(hex::encode(p.liquidity_pool_id.0)),
        _ => None,
    }
}

pub fn extract_liquidity_pools(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> Vec<LiquidityPoolCurrentRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, pool_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            let pool_id = pool_key(change)?;

            if change.op == ChangeOp::Removed {
                return Some(LiquidityPoolCurrentRow {
                    pool_id,
                    ledger_sequence: ledger.header.sequence,
                    fee_bp: 0,
                    asset_a_type: String::new(),
                    asset_a_code: None,
                    asset_a_issuer: None,
                    asset_b_type: String::new(),
                    asset_b_code: None,
                    asset_b_issuer: None,
                    reserve_a: 0,
                    reserve_b: 0,
                    total_shares: 0,
                    pool_share_count: 0,
                    last_modified_ledger: ledger.header.sequence,
                    deleted: true,
                    closed_at: ledger.header.close_time,
                    ledger_range: range,
                });
            }

            let LedgerEntryData::LiquidityPool(p) = &change.entry.as_ref()?.data else {
                return None;
            };
            let LiquidityPoolBody::LiquidityPoolConstantProduct(body) = &p.body;
            let asset_a = encode_asset(&body.params.asset_a);
            let asset_b = encode_asset(&body.params.asset_b);

            Some(LiquidityPoolCurrentRow {
                pool_id,
                ledger_sequence: ledger.header.sequence,
                fee_bp: body.params.fee as u32,
                asset_a_type: asset_a.asset_type.to_string(),
                asset_a_code: asset_a.asset_code,
                asset_a_issuer: asset_a.asset_issuer,
                asset_b_type: asset_b.asset_type.to_string(),
                asset_b_code: asset_b.asset_code,
                asset_b_issuer: asset_b.asset_issuer,
                reserve_a: body.reserve_a,
                reserve_b: body.reserve_b,
                total_shares: body.total_pool_shares,
                pool_share_count: body.pool_shares_trust_line_count,
                last_modified_ledger: change.last_modified_ledger_seq,
                deleted: false,
                closed_at: ledger.header.close_time,
                ledger_range: range,
            })
        })
        .collect()
}
