//! Ledger, transaction and operation extractors (spec.md §3.2, §4.2).

use stellar_xdr::curr::OperationBody;

use crate::decode::DecodedLedger;
use crate::model::rows::{LedgerRow, OperationRow, TransactionRow};
use crate::model::table::ledger_range;

pub fn extract_ledger(ledger: &DecodedLedger, partition_width: u32) -> LedgerRow {
    let successful_tx_count = ledger.transactions.iter().filter(|t| t.successful).count() as u32;
    let failed_tx_count = ledger.transactions.len() as u32 - successful_tx_count;

    // §4.2: V0 has no post-apply results, count every operation as executed;
    // V1/V2 count executed ops only for successful txs with results present.
    let operation_count: u32 = ledger
        .transactions
        .iter()
        .map(|t| {
            if !t.op_results_present {
                t.operations.len() as u32
            } else if t.successful {
                t.operations.len() as u32
            } else {
                0
            }
        })
        .sum();
    let tx_set_operation_count: u32 = ledger.transactions.iter().map(|t| t.operations.len() as u32).sum();

    LedgerRow {
        sequence: ledger.header.sequence,
        ledger_hash: ledger.header.hash.clone(),
        previous_ledger_hash: ledger.header.previous_hash.clone(),
        closed_at: ledger.header.close_time,
        protocol_version: ledger.header.protocol_version,
        total_coins: ledger.header.total_coins,
        fee_pool: ledger.header.fee_pool,
        base_fee: ledger.header.base_fee,
        base_reserve: ledger.header.base_reserve,
        max_tx_set_size: ledger.header.max_tx_set_size,
        transaction_count: ledger.transactions.len() as u32,
        successful_tx_count,
        failed_tx_count,
        operation_count,
        tx_set_operation_count,
        bucket_list_size: ledger.bucket_list_size,
        live_soroban_state_size: ledger.live_soroban_state_size,
        fee_write_1kb: ledger.fee_write_1kb,
        ledger_range: ledger_range(ledger.header.sequence, partition_width),
    }
}

pub fn extract_transactions(ledger: &DecodedLedger, partition_width: u32) -> Vec<TransactionRow> {
    ledger
        .transactions
        .iter()
        .map(|tx| TransactionRow {
            transaction_hash: tx.hash.clone(),
            ledger_sequence: ledger.header.sequence,
            index_in_ledger: tx.index_in_ledger,
            successful: tx.successful,
            source_account: tx.source_account.clone(),
            fee_charged: tx.fee_charged,
            operation_count: tx.operations.len() as u32,
            memo_type: tx.memo_type.to_string(),
            memo: tx.memo.clone(),
            closed_at: ledger.header.close_time,
            ledger_range: ledger_range(ledger.header.sequence, partition_width),
        })
        .collect()
}

pub fn extract_operations(ledger: &DecodedLedger, partition_width: u32) -> Vec<OperationRow> {
    let range = ledger_range(ledger.header.sequence, partition_width);
    let mut out = Vec::new();
    for tx in &ledger.transactions {
        for op in &tx.operations {
            out.push(OperationRow {
                transaction_hash: tx.hash.clone(),
                operation_index: op.index,
                ledger_sequence: ledger.header.sequence,
                operation_type: operation_type_name(&op.body).to_string(),
                source_account: op.source_account.clone().or_else(|| Some(tx.source_account.clone())),
                details_json: serde_json::json!({ "type": operation_type_name(&op.body) }).to_string(),
                successful: tx.successful,
                closed_at: ledger.header.close_time,
                ledger_range: range,
            });
        }
    }
    out
}

pub fn operation_type_name(body: &OperationBody) -> &'static str {
    match body {
        OperationBody::CreateAccount(_) => "create_account",
        OperationBody::Payment(_) => "payment",
        OperationBody::PathPaymentStrictReceive(_) => "path_payment_strict_receive",
        OperationBody::PathPaymentStrictSend(_) => "path_payment_strict_send",
        OperationBody::ManageSellOffer(_) => "manage_sell_offer",
        OperationBody::CreatePassiveSellOffer(_) => "create_passive_sell_offer",
        OperationBody::ManageBuyOffer(_) => "manage_buy_offer",
        OperationBody::SetOptions(_) => "set_options",
        OperationBody::ChangeTrust(_) => "change_trust",
        OperationBody::AllowTrust(_) => "allow_trust",
        OperationBody::AccountMerge(_) => "account_merge",
        OperationBody::Inflation => "inflation",
        OperationBody::ManageData(_) => "manage_data",
        OperationBody::BumpSequence(_) => "bump_sequence",
        OperationBody::CreateClaimableBalance(_) => "create_claimable_balance",
        OperationBody::ClaimClaimableBalance(_) => "claim_claimable_balance",
        OperationBody::BeginSponsoringFutureReserves(_) => "begin_sponsoring_future_reserves",
        OperationBody::EndSponsoringFutureReserves => "end_sponsoring_future_reserves",
        OperationBody::RevokeSponsorship(_) => "revoke_sponsorship",
        OperationBody::Clawback(_) => "clawback",
        OperationBody::ClawbackClaimableBalance(_) => "clawback_claimable_balance",
        OperationBody::SetTrustLineFlags(_) => "set_trust_line_flags",
        OperationBody::LiquidityPoolDeposit(_) => "liquidity_pool_deposit",
        OperationBody::LiquidityPoolWithdraw(_) => "liquidity_pool_withdraw",
        OperationBody::InvokeHostFunction(_) => "invoke_host_function",
        OperationBody::ExtendFootprintTtl(_) => "extend_footprint_ttl",
        OperationBody::RestoreFootprint(_) => "restore_footprint",
    }
}
