//! Per-table extractors (C3, spec.md §3.2, §4.3). Every extractor is a
//! pure function of a single decoded ledger plus the configured
//! partition width; `extract_all` fans a ledger out to all nineteen.

mod accounts;
mod call_graph;
mod claimable_balances;
mod config_settings;
mod contract_code;
mod contract_data;
mod contract_events;
pub mod dedup;
mod effects_trades;
mod evicted_restored;
mod key_encoding;
mod ledger_tx_op;
mod liquidity_pools;
mod native_balances;
mod offers;
mod trustlines;
mod ttl;

use crate::decode::DecodedLedger;
use crate::model::rows::{
    AccountSignerSnapshotRow, AccountSnapshotRow, CallAncestryRow, CallEdgeRow,
    ClaimableBalanceCurrentRow, ConfigSettingCurrentRow, ContractCodeCurrentRow,
    ContractDataCurrentRow, ContractEventRow, EffectRow, EvictedKeyRow, LedgerRow,
    LiquidityPoolCurrentRow, NativeBalanceCurrentRow, OfferSnapshotRow, OperationRow,
    RestoredKeyRow, TradeRow, TransactionRow, TrustlineSnapshotRow, TtlCurrentRow,
};

/// One extracted row set per logical table (spec.md §1), ready to hand
/// to the buffer set (C4).
#[derive(Debug, Default)]
pub struct ExtractedBatch {
    pub ledgers: Vec<LedgerRow>,
    pub transactions: Vec<TransactionRow>,
    pub operations: Vec<OperationRow>,
    pub effects: Vec<EffectRow>,
    pub trades: Vec<TradeRow>,
    pub accounts: Vec<AccountSnapshotRow>,
    pub trustlines: Vec<TrustlineSnapshotRow>,
    pub offers: Vec<OfferSnapshotRow>,
    pub account_signers: Vec<AccountSignerSnapshotRow>,
    pub claimable_balances: Vec<ClaimableBalanceCurrentRow>,
    pub liquidity_pools: Vec<LiquidityPoolCurrentRow>,
    pub native_balances: Vec<NativeBalanceCurrentRow>,
    pub contract_data: Vec<ContractDataCurrentRow>,
    pub contract_code: Vec<ContractCodeCurrentRow>,
    pub contract_events: Vec<ContractEventRow>,
    pub ttl: Vec<TtlCurrentRow>,
    pub config_settings: Vec<ConfigSettingCurrentRow>,
    pub restored_keys: Vec<RestoredKeyRow>,
    pub evicted_keys: Vec<EvictedKeyRow>,
    pub call_edges: Vec<CallEdgeRow>,
    pub call_ancestry: Vec<CallAncestryRow>,
}

impl ExtractedBatch {
    pub fn ledger_count(&self) -> usize {
        self.ledgers.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }
}

pub fn extract_all(ledger: &DecodedLedger, partition_width: u32) -> ExtractedBatch {
    let (call_edges, call_ancestry) = call_graph::extract_call_graph(ledger, partition_width);

    ExtractedBatch {
        ledgers: vec![ledger_tx_op::extract_ledger(ledger, partition_width)],
        transactions: ledger_tx_op::extract_transactions(ledger, partition_width),
        operations: ledger_tx_op::extract_operations(ledger, partition_width),
        effects: effects_trades::extract_effects(ledger, partition_width),
        trades: effects_trades::extract_trades(ledger, partition_width),
        accounts: accounts::extract_accounts(ledger, partition_width),
        trustlines: trustlines::extract_trustlines(ledger, partition_width),
        offers: offers::extract_offers(ledger, partition_width),
        account_signers: accounts::extract_account_signers(ledger, partition_width),
        claimable_balances: claimable_balances::extract_claimable_balances(ledger, partition_width),
        liquidity_pools: liquidity_pools::extract_liquidity_pools(ledger, partition_width),
        native_balances: native_balances::extract_native_balances(ledger, partition_width),
        contract_data: contract_data::extract_contract_data(ledger, partition_width),
        contract_code: contract_code::extract_contract_code(ledger, partition_width),
        contract_events: contract_events::extract_contract_events(ledger, partition_width),
        ttl: ttl::extract_ttl(ledger, partition_width),
        config_settings: config_settings::extract_config_settings(ledger, partition_width),
        restored_keys: evicted_restored::extract_restored_keys(ledger, partition_width),
        evicted_keys: evicted_restored::extract_evicted_keys(ledger, partition_width),
        call_edges,
        call_ancestry,
    }
}
