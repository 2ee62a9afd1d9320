//! Flat row records produced by the extractors (spec.md §3.2). Field
//! sets are the "at least" shape the spec lists explicitly, plus the
//! columns a complete implementation needs to satisfy the invariants in
//! §8 (keys, `ledger_range`, `deleted` markers).

use serde::{Deserialize, Serialize};

/// `sequence` unique; conservation invariants checked by extractors at
/// build time (spec.md §8 invariant 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub sequence: u32,
    pub ledger_hash: String,
    pub previous_ledger_hash: String,
    pub closed_at: i64,
    pub protocol_version: u32,
    pub total_coins: i64,
    pub fee_pool: i64,
    pub base_fee: u32,
    pub base_reserve: u32,
    pub max_tx_set_size: u32,
    pub transaction_count: u32,
    pub successful_tx_count: u32,
    pub failed_tx_count: u32,
    pub operation_count: u32,
    pub tx_set_operation_count: u32,
    pub bucket_list_size: Option<u64>,
    pub live_soroban_state_size: Option<u64>,
    pub fee_write_1kb: Option<i64>,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub transaction_hash: String,
    pub ledger_sequence: u32,
    pub index_in_ledger: u32,
    pub successful: bool,
    pub source_account: String,
    pub fee_charged: i64,
    pub operation_count: u32,
    pub memo_type: String,
    pub memo: Option<String>,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRow {
    pub transaction_hash: String,
    pub operation_index: u32,
    pub ledger_sequence: u32,
    pub operation_type: String,
    pub source_account: Option<String>,
    pub details_json: String,
    pub successful: bool,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRow {
    pub ledger_sequence: u32,
    pub transaction_hash: String,
    pub operation_index: u32,
    pub sub_index: u32,
    pub effect_type: String,
    pub account: Option<String>,
    pub details_json: String,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    pub ledger_sequence: u32,
    pub transaction_hash: String,
    pub operation_index: u32,
    pub sub_index: u32,
    pub base_account: String,
    pub base_asset_type: String,
    pub base_asset_code: Option<String>,
    pub base_asset_issuer: Option<String>,
    pub base_amount: String,
    pub counter_account: String,
    pub counter_asset_type: String,
    pub counter_asset_code: Option<String>,
    pub counter_asset_issuer: Option<String>,
    pub counter_amount: String,
    pub price_n: i64,
    pub price_d: i64,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshotRow {
    pub account_id: String,
    pub ledger_sequence: u32,
    pub balance: i64,
    pub sequence_number: i64,
    pub num_subentries: u32,
    pub inflation_dest: Option<String>,
    pub home_domain: Option<String>,
    pub master_weight: i32,
    pub threshold_low: i32,
    pub threshold_medium: i32,
    pub threshold_high: i32,
    pub flags: u32,
    pub last_modified_ledger: u32,
    pub deleted: bool,
    pub closed_at: i64,
    pub valid_to: Option<i64>,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustlineSnapshotRow {
    pub account_id: String,
    pub asset_type: String,
    pub asset_code: Option<String>,
    pub asset_issuer: Option<String>,
    pub ledger_sequence: u32,
    pub balance: i64,
    pub limit: i64,
    pub flags: u32,
    pub last_modified_ledger: u32,
    pub deleted: bool,
    pub closed_at: i64,
    pub valid_to: Option<i64>,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSnapshotRow {
    pub offer_id: i64,
    pub ledger_sequence: u32,
    pub seller_id: String,
    pub selling_asset_type: String,
    pub selling_asset_code: Option<String>,
    pub selling_asset_issuer: Option<String>,
    pub buying_asset_type: String,
    pub buying_asset_code: Option<String>,
    pub buying_asset_issuer: Option<String>,
    pub amount: i64,
    pub price_n: i32,
    pub price_d: i32,
    pub flags: u32,
    pub last_modified_ledger: u32,
    pub deleted: bool,
    pub closed_at: i64,
    pub valid_to: Option<i64>,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSignerSnapshotRow {
    pub account_id: String,
    pub signer_key: String,
    pub ledger_sequence: u32,
    pub weight: i32,
    pub last_modified_ledger: u32,
    pub deleted: bool,
    pub closed_at: i64,
    pub valid_to: Option<i64>,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimableBalanceCurrentRow {
    pub balance_id: String,
    pub ledger_sequence: u32,
    pub claimants_json: String,
    pub asset_type: String,
    pub asset_code: Option<String>,
    pub asset_issuer: Option<String>,
    pub amount: i64,
    pub sponsor: Option<String>,
    pub last_modified_ledger: u32,
    pub deleted: bool,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPoolCurrentRow {
    pub pool_id: String,
    pub ledger_sequence: u32,
    pub fee_bp: u32,
    pub asset_a_type: String,
    pub asset_a_code: Option<String>,
    pub asset_a_issuer: Option<String>,
    pub asset_b_type: String,
    pub asset_b_code: Option<String>,
    pub asset_b_issuer: Option<String>,
    pub reserve_a: i64,
    pub reserve_b: i64,
    pub total_shares: i64,
    pub pool_share_count: i64,
    pub last_modified_ledger: u32,
    pub deleted: bool,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeBalanceCurrentRow {
    pub account_id: String,
    pub ledger_sequence: u32,
    pub balance: i64,
    pub last_modified_ledger: u32,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDataCurrentRow {
    pub contract_id: String,
    pub key_xdr_base64: String,
    pub key_decoded_json: String,
    pub durability: String,
    pub ledger_sequence: u32,
    pub value_xdr_base64: String,
    pub value_decoded_json: String,
    pub last_modified_ledger: u32,
    pub deleted: bool,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCodeCurrentRow {
    pub contract_code_hash: String,
    pub ledger_sequence: u32,
    pub code_size_bytes: u32,
    pub last_modified_ledger: u32,
    pub deleted: bool,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtlCurrentRow {
    pub key_hash: String,
    pub ledger_sequence: u32,
    pub live_until_ledger_seq: u32,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSettingCurrentRow {
    pub config_setting_id: String,
    pub ledger_sequence: u32,
    pub value_json: String,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEventRow {
    pub ledger_sequence: u32,
    pub transaction_hash: String,
    pub operation_index: u32,
    pub sub_index: u32,
    pub contract_id: Option<String>,
    pub event_type: String,
    pub topics_xdr_base64: Vec<String>,
    pub topics_decoded_json: String,
    pub data_xdr_base64: String,
    pub data_decoded_json: String,
    pub in_successful_tx: bool,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvictedKeyRow {
    pub ledger_sequence: u32,
    pub sub_index: u32,
    pub key_xdr_base64: String,
    pub key_type: String,
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoredKeyRow {
    pub ledger_sequence: u32,
    pub transaction_hash: String,
    pub operation_index: u32,
    pub sub_index: u32,
    pub key_xdr_base64: String,
    pub key_type: String,
    pub closed_at: i64,
    pub ledger_range: u32,
}

/// Call-graph edge, spec.md §4.3 "Call-graph extractor": deduplicated on
/// `(from, to, function, depth)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEdgeRow {
    pub ledger_sequence: u32,
    pub transaction_hash: String,
    pub operation_index: u32,
    pub from_contract: String,
    pub to_contract: String,
    pub function: String,
    pub depth: u32,
    pub invocation_order: u32,
    pub source: &'static str, // "diagnostic_events" | "auth_tree"
    pub closed_at: i64,
    pub ledger_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAncestryRow {
    pub ledger_sequence: u32,
    pub transaction_hash: String,
    pub operation_index: u32,
    pub root_contract: String,
    pub child_contract: String,
    pub path_depth: u32,
    pub full_path_json: String,
    pub closed_at: i64,
    pub ledger_range: u32,
}
