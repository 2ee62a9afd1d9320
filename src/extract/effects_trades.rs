//! Effects and trades append-only extractors (spec.md §3.2, §4.3).
//!
//! Trades are read off the `ClaimAtom` list carried in the operation
//! results of offer-matching and path-payment operations; the traded
//! price is the realized ratio (`amount_bought / amount_sold`), not the
//! resting offer's listed price.
//!
//! Effects are a coarse, operation-type-keyed projection rather than a
//! full replica of a block explorer's effect taxonomy: one effect per
//! operation, carrying its type and a details blob, which is what
//! spec.md §3.2 asks for without mandating an exact effect catalog.

use stellar_xdr::curr::{ClaimAtom, OperationBody, OperationResultTr};

use crate::decode::DecodedLedger;
use crate::extract::ledger_tx_op::operation_type_name;
use crate::model::asset::{account_id_to_strkey, encode_asset, encode_pool_share};
use crate::model::rows::{EffectRow, TradeRow};
use crate::model::table::ledger_range;

fn claim_atoms(result: &OperationResultTr) -> Vec<&ClaimAtom> {
    use OperationResultTr::*;
    match result {
        ManageSellOffer(r) | CreatePassiveSellOffer(r) => match r {
            stellar_xdr::curr::ManageSellOfferResult::Success(s) => s.offers_claimed.iter().collect(),
            _ => vec![],
        },
        ManageBuyOffer(r) => match r {
            stellar_xdr::curr::ManageBuyOfferResult::Success(s) => s.offers_claimed.iter().collect(),
            _ => vec![],
        },
        PathPaymentStrictReceive(r) => match r {
            stellar_xdr::curr::PathPaymentStrictReceiveResult::Success(s) => s.offers.iter().collect(),
            _ => vec![],
        },
        PathPaymentStrictSend(r) => match r {
            stellar_xdr::curr::PathPaymentStrictSendResult::Success(s) => s.offers.iter().collect(),
            _ => vec![],
        },
        _ => vec![],
    }
}

fn trade_sides(atom: &ClaimAtom) -> Option<(String, String, i64, String, i64)> {
    match atom {
        ClaimAtom::V0(a) => Some((
            stellar_strkey::ed25519::PublicKey(a.seller_ed25519.0).to_string(),
            encode_asset(&a.asset_sold).asset_type.to_string(),
            a.amount_sold,
            encode_asset(&a.asset_bought).asset_type.to_string(),
            a.amount_bought,
        )),
        ClaimAtom::OrderBook(a) => Some((
            account_id_to_strkey(&a.seller_id),
            encode_asset(&a.asset_sold).asset_type.to_string(),
            a.amount_sold,
            encode_asset(&a.asset_bought).asset_type.to_string(),
            a.amount_bought,
        )),
        ClaimAtom::LiquidityPool(a) => Some((
            encode_pool_share(hex::encode(a.liquidity_pool_id.0)).asset_code.unwrap_or_default(),
            encode_asset(&a.asset_sold).asset_type.to_string(),
            a.amount_sold,
            encode_asset(&a.asset_bought).asset_type.to_string(),
            a.amount_bought,
        )),
    }
}

fn full_asset(atom: &ClaimAtom, sold: bool) -> crate::model::asset::EncodedAsset {
    match atom {
        ClaimAtom::V0(a) => encode_asset(if sold { &a.asset_sold } else { &a.asset_bought }),
        ClaimAtom::OrderBook(a) => encode_asset(if sold { &a.asset_sold } else { &a.asset_bought }),
        ClaimAtom::LiquidityPool(a) => encode_asset(if sold { &a.asset_sold } else { &a.asset_bought }),
    }
}

pub fn extract_trades(ledger: &DecodedLedger, partition_width: u32) -> Vec<TradeRow> {
    let range = ledger_range(ledger.header.sequence, partition_width);
    let mut out = Vec::new();

    for tx in &ledger.transactions {
        for op in &tx.operations {
            let Some(result) = &op.result else { continue };
            let atoms = claim_atoms(result);
            for (sub_index, atom) in atoms.iter().enumerate() {
                let Some((seller, _, amount_sold, _, amount_bought)) = trade_sides(atom) else {
                    continue;
                };
                let sold_asset = full_asset(atom, true);
                let bought_asset = full_asset(atom, false);
                let counter_account = op
                    .source_account
                    .clone()
                    .unwrap_or_else(|| tx.source_account.clone());

                out.push(TradeRow {
                    ledger_sequence: ledger.header.sequence,
                    transaction_hash: tx.hash.clone(),
                    operation_index: op.index,
                    sub_index: sub_index as u32,
                    base_account: seller,
                    base_asset_type: sold_asset.asset_type.to_string(),
                    base_asset_code: sold_asset.asset_code,
                    base_asset_issuer: sold_asset.asset_issuer,
                    base_amount: amount_sold.to_string(),
                    counter_account,
                    counter_asset_type: bought_asset.asset_type.to_string(),
                    counter_asset_code: bought_asset.asset_code,
                    counter_asset_issuer: bought_asset.asset_issuer,
                    counter_amount: amount_bought.to_string(),
                    price_n: amount_bought,
                    price_d: amount_sold.max(1),
                    closed_at: ledger.header.close_time,
                    ledger_range: range,
                });
            }
        }
    }
    out
}

pub fn extract_effects(ledger: &DecodedLedger, partition_width: u32) -> Vec<EffectRow> {
    let range = ledger_range(ledger.header.sequence, partition_width);
    let mut out = Vec::new();

    for tx in &ledger.transactions {
        for op in &tx.operations {
            let account = op
                .source_account
                .clone()
                .or_else(|| Some(tx.source_account.clone()));
            out.push(EffectRow {
                ledger_sequence: ledger.header.sequence,
                transaction_hash: tx.hash.clone(),
                operation_index: op.index,
                sub_index: 0,
                effect_type: effect_type_for(&op.body).to_string(),
                account,
                details_json: serde_json::json!({
                    "operation_type": operation_type_name(&op.body),
                })
                .to_string(),
                closed_at: ledger.header.close_time,
                ledger_range: range,
            });
        }
    }
    out
}

fn effect_type_for(body: &OperationBody) -> &'static str {
    match body {
        OperationBody::CreateAccount(_) => "account_created",
        OperationBody::Payment(_) => "account_credited",
        OperationBody::AccountMerge(_) => "account_removed",
        OperationBody::ManageSellOffer(_)
        | OperationBody::ManageBuyOffer(_)
        | OperationBody::CreatePassiveSellOffer(_) => "offer_updated",
        OperationBody::ChangeTrust(_) => "trustline_updated",
        OperationBody::SetOptions(_) => "account_options_updated",
        OperationBody::CreateClaimableBalance(_) => "claimable_balance_created",
        OperationBody::ClaimClaimableBalance(_) => "claimable_balance_claimed",
        OperationBody::LiquidityPoolDeposit(_) => "liquidity_pool_deposited",
        OperationBody::LiquidityPoolWithdraw(_) => "liquidity_pool_withdrew",
        OperationBody::InvokeHostFunction(_) => "contract_invoked",
        _ => "operation_applied",
    }
}
