//! Physical table schemas (C7, spec.md §4.6). One entry per physical
//! table the catalog bootstrapper creates; column order and names match
//! `storage::rows_sql`'s `TableRow::COLUMNS` exactly so a row's
//! `to_values()` output binds positionally against the column list here.

use crate::model::table::TableId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColType {
    BigInt,
    Text,
    Bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColType,
}

const fn c(name: &'static str, ty: ColType) -> Column {
    Column { name, ty }
}

use ColType::*;

/// `(physical_table_name, columns, partition_column)`. `partition_column`
/// is `None` for the checkpoint/quality tables that don't range-partition.
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub partition_column: Option<&'static str>,
}

macro_rules! table {
    ($name:literal, partitioned_by $part:literal, [$($col:literal : $ty:ident),+ $(,)?]) => {
        TableDef {
            name: $name,
            columns: &[$(c($col, $ty)),+],
            partition_column: Some($part),
        }
    };
}

pub const LEDGERS: TableDef = table!("ledgers", partitioned_by "sequence", [
    "sequence": BigInt, "ledger_hash": Text, "previous_ledger_hash": Text, "closed_at": BigInt,
    "protocol_version": BigInt, "total_coins": BigInt, "fee_pool": BigInt, "base_fee": BigInt,
    "base_reserve": BigInt, "max_tx_set_size": BigInt, "transaction_count": BigInt,
    "successful_tx_count": BigInt, "failed_tx_count": BigInt, "operation_count": BigInt,
    "tx_set_operation_count": BigInt, "bucket_list_size": BigInt, "live_soroban_state_size": BigInt,
    "fee_write_1kb": BigInt, "ledger_range": BigInt,
]);

pub const TRANSACTIONS: TableDef = table!("transactions", partitioned_by "ledger_sequence", [
    "transaction_hash": Text, "ledger_sequence": BigInt, "index_in_ledger": BigInt,
    "successful": Bool, "source_account": Text, "fee_charged": BigInt, "operation_count": BigInt,
    "memo_type": Text, "memo": Text, "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const OPERATIONS: TableDef = table!("operations", partitioned_by "ledger_sequence", [
    "transaction_hash": Text, "operation_index": BigInt, "ledger_sequence": BigInt,
    "operation_type": Text, "source_account": Text, "details_json": Text, "successful": Bool,
    "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const EFFECTS: TableDef = table!("effects", partitioned_by "ledger_sequence", [
    "ledger_sequence": BigInt, "transaction_hash": Text, "operation_index": BigInt,
    "sub_index": BigInt, "effect_type": Text, "account": Text, "details_json": Text,
    "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const TRADES: TableDef = table!("trades", partitioned_by "ledger_sequence", [
    "ledger_sequence": BigInt, "transaction_hash": Text, "operation_index": BigInt,
    "sub_index": BigInt, "base_account": Text, "base_asset_type": Text, "base_asset_code": Text,
    "base_asset_issuer": Text, "base_amount": Text, "counter_account": Text,
    "counter_asset_type": Text, "counter_asset_code": Text, "counter_asset_issuer": Text,
    "counter_amount": Text, "price_n": BigInt, "price_d": BigInt, "closed_at": BigInt,
    "ledger_range": BigInt,
]);

const ACCOUNT_SNAPSHOT_COLUMNS: &[Column] = &[
    c("account_id", Text), c("ledger_sequence", BigInt), c("balance", BigInt),
    c("sequence_number", BigInt), c("num_subentries", BigInt), c("inflation_dest", Text),
    c("home_domain", Text), c("master_weight", BigInt), c("threshold_low", BigInt),
    c("threshold_medium", BigInt), c("threshold_high", BigInt), c("flags", BigInt),
    c("last_modified_ledger", BigInt), c("deleted", Bool), c("closed_at", BigInt),
    c("valid_to", BigInt), c("ledger_range", BigInt),
];
pub const ACCOUNTS: TableDef = TableDef { name: "accounts", columns: ACCOUNT_SNAPSHOT_COLUMNS, partition_column: Some("ledger_sequence") };
pub const ACCOUNTS_CURRENT: TableDef = TableDef { name: "accounts_current", columns: ACCOUNT_SNAPSHOT_COLUMNS, partition_column: None };

const TRUSTLINE_SNAPSHOT_COLUMNS: &[Column] = &[
    c("account_id", Text), c("asset_type", Text), c("asset_code", Text), c("asset_issuer", Text),
    c("ledger_sequence", BigInt), c("balance", BigInt), c("limit", BigInt), c("flags", BigInt),
    c("last_modified_ledger", BigInt), c("deleted", Bool), c("closed_at", BigInt),
    c("valid_to", BigInt), c("ledger_range", BigInt),
];
pub const TRUSTLINES: TableDef = TableDef { name: "trustlines", columns: TRUSTLINE_SNAPSHOT_COLUMNS, partition_column: Some("ledger_sequence") };
pub const TRUSTLINES_CURRENT: TableDef = TableDef { name: "trustlines_current", columns: TRUSTLINE_SNAPSHOT_COLUMNS, partition_column: None };

const OFFER_SNAPSHOT_COLUMNS: &[Column] = &[
    c("offer_id", BigInt), c("ledger_sequence", BigInt), c("seller_id", Text),
    c("selling_asset_type", Text), c("selling_asset_code", Text), c("selling_asset_issuer", Text),
    c("buying_asset_type", Text), c("buying_asset_code", Text), c("buying_asset_issuer", Text),
    c("amount", BigInt), c("price_n", BigInt), c("price_d", BigInt), c("flags", BigInt),
    c("last_modified_ledger", BigInt), c("deleted", Bool), c("closed_at", BigInt),
    c("valid_to", BigInt), c("ledger_range", BigInt),
];
pub const OFFERS: TableDef = TableDef { name: "offers", columns: OFFER_SNAPSHOT_COLUMNS, partition_column: Some("ledger_sequence") };
pub const OFFERS_CURRENT: TableDef = TableDef { name: "offers_current", columns: OFFER_SNAPSHOT_COLUMNS, partition_column: None };

pub const ACCOUNT_SIGNERS: TableDef = table!("account_signers", partitioned_by "ledger_sequence", [
    "account_id": Text, "signer_key": Text, "ledger_sequence": BigInt, "weight": BigInt,
    "last_modified_ledger": BigInt, "deleted": Bool, "closed_at": BigInt, "valid_to": BigInt,
    "ledger_range": BigInt,
]);

pub const CLAIMABLE_BALANCES_CURRENT: TableDef = table!("claimable_balances_current", partitioned_by "ledger_sequence", [
    "balance_id": Text, "ledger_sequence": BigInt, "claimants_json": Text, "asset_type": Text,
    "asset_code": Text, "asset_issuer": Text, "amount": BigInt, "sponsor": Text,
    "last_modified_ledger": BigInt, "deleted": Bool, "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const LIQUIDITY_POOLS_CURRENT: TableDef = table!("liquidity_pools_current", partitioned_by "ledger_sequence", [
    "pool_id": Text, "ledger_sequence": BigInt, "fee_bp": BigInt, "asset_a_type": Text,
    "asset_a_code": Text, "asset_a_issuer": Text, "asset_b_type": Text, "asset_b_code": Text,
    "asset_b_issuer": Text, "reserve_a": BigInt, "reserve_b": BigInt, "total_shares": BigInt,
    "pool_share_count": BigInt, "last_modified_ledger": BigInt, "deleted": Bool,
    "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const NATIVE_BALANCES_CURRENT: TableDef = table!("native_balances_current", partitioned_by "ledger_sequence", [
    "account_id": Text, "ledger_sequence": BigInt, "balance": BigInt,
    "last_modified_ledger": BigInt, "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const CONTRACT_DATA_CURRENT: TableDef = table!("contract_data_current", partitioned_by "ledger_sequence", [
    "contract_id": Text, "key_xdr_base64": Text, "key_decoded_json": Text, "durability": Text,
    "ledger_sequence": BigInt, "value_xdr_base64": Text, "value_decoded_json": Text,
    "last_modified_ledger": BigInt, "deleted": Bool, "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const CONTRACT_CODE_CURRENT: TableDef = table!("contract_code_current", partitioned_by "ledger_sequence", [
    "contract_code_hash": Text, "ledger_sequence": BigInt, "code_size_bytes": BigInt,
    "last_modified_ledger": BigInt, "deleted": Bool, "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const TTL_CURRENT: TableDef = table!("ttl_current", partitioned_by "ledger_sequence", [
    "key_hash": Text, "ledger_sequence": BigInt, "live_until_ledger_seq": BigInt,
    "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const CONFIG_SETTINGS_CURRENT: TableDef = table!("config_settings_current", partitioned_by "ledger_sequence", [
    "config_setting_id": Text, "ledger_sequence": BigInt, "value_json": Text, "closed_at": BigInt,
    "ledger_range": BigInt,
]);

pub const CONTRACT_EVENTS: TableDef = table!("contract_events", partitioned_by "ledger_sequence", [
    "ledger_sequence": BigInt, "transaction_hash": Text, "operation_index": BigInt,
    "sub_index": BigInt, "contract_id": Text, "event_type": Text, "topics_xdr_base64": Text,
    "topics_decoded_json": Text, "data_xdr_base64": Text, "data_decoded_json": Text,
    "in_successful_tx": Bool, "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const EVICTED_KEYS: TableDef = table!("evicted_keys", partitioned_by "ledger_sequence", [
    "ledger_sequence": BigInt, "sub_index": BigInt, "key_xdr_base64": Text, "key_type": Text,
    "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const RESTORED_KEYS: TableDef = table!("restored_keys", partitioned_by "ledger_sequence", [
    "ledger_sequence": BigInt, "transaction_hash": Text, "operation_index": BigInt,
    "sub_index": BigInt, "key_xdr_base64": Text, "key_type": Text, "closed_at": BigInt,
    "ledger_range": BigInt,
]);

pub const CALL_EDGES: TableDef = table!("call_edges", partitioned_by "ledger_sequence", [
    "ledger_sequence": BigInt, "transaction_hash": Text, "operation_index": BigInt,
    "from_contract": Text, "to_contract": Text, "function": Text, "depth": BigInt,
    "invocation_order": BigInt, "source": Text, "closed_at": BigInt, "ledger_range": BigInt,
]);

pub const CALL_ANCESTRY: TableDef = table!("call_ancestry", partitioned_by "ledger_sequence", [
    "ledger_sequence": BigInt, "transaction_hash": Text, "operation_index": BigInt,
    "root_contract": Text, "child_contract": Text, "path_depth": BigInt, "full_path_json": Text,
    "closed_at": BigInt, "ledger_range": BigInt,
]);

/// `_meta_quality` row emitted per flush per table when `quality.enabled`
/// (spec.md §9 "Quality checks").
pub const META_QUALITY: TableDef = TableDef {
    name: "_meta_quality",
    columns: &[
        c("flushed_at", BigInt), c("table_name", Text), c("row_count", BigInt),
        c("uniqueness_violations", BigInt), c("null_rate_violations", Text),
    ],
    partition_column: None,
};

/// Every physical table the bootstrapper must create, in creation order.
pub const ALL_PHYSICAL_TABLES: &[&TableDef] = &[
    &LEDGERS, &TRANSACTIONS, &OPERATIONS, &EFFECTS, &TRADES,
    &ACCOUNTS, &ACCOUNTS_CURRENT, &TRUSTLINES, &TRUSTLINES_CURRENT, &OFFERS, &OFFERS_CURRENT,
    &ACCOUNT_SIGNERS,
    &CLAIMABLE_BALANCES_CURRENT, &LIQUIDITY_POOLS_CURRENT, &NATIVE_BALANCES_CURRENT,
    &CONTRACT_DATA_CURRENT, &CONTRACT_CODE_CURRENT, &TTL_CURRENT, &CONFIG_SETTINGS_CURRENT,
    &CONTRACT_EVENTS, &EVICTED_KEYS, &RESTORED_KEYS,
    &CALL_EDGES, &CALL_ANCESTRY,
];

/// Natural/business key for a physical table, used both as the `UNIQUE`
/// constraint the bootstrapper adds and as the `ON CONFLICT` target the
/// writer binds against. `None` means the table takes plain `INSERT`s
/// with no conflict target at all.
///
/// The SCD-2 history tables (`accounts`, `trustlines`, `offers`,
/// `account_signers`) key on business-key + `ledger_sequence` (spec.md
/// §3.2: "key + `ledger_sequence` unique"), not just the business key —
/// a table can legitimately hold many versions of the same key, one per
/// `ledger_sequence`. Without this, reprocessing a ledger after a
/// `CheckpointWriteError` (spec.md §7: the commit already happened, the
/// checkpoint write failed, the coordinator resumes from the unchanged
/// `last_ledger + 1`) would append a duplicate version of every snapshot
/// touched by that ledger, breaking the `(key, ledger_sequence)`
/// resume-idempotence spec.md §8 invariant 5 relies on.
pub fn unique_key_columns(physical_table_name: &str) -> Option<&'static [&'static str]> {
    match physical_table_name {
        "effects" => Some(&["ledger_sequence", "transaction_hash", "operation_index", "sub_index"]),
        "trades" => Some(&["ledger_sequence", "transaction_hash", "operation_index", "sub_index"]),
        "contract_events" => Some(&["ledger_sequence", "transaction_hash", "operation_index", "sub_index"]),
        "evicted_keys" => Some(&["ledger_sequence", "sub_index"]),
        "restored_keys" => Some(&["ledger_sequence", "transaction_hash", "operation_index", "sub_index"]),
        "ledgers" => Some(&["sequence"]),
        "transactions" => Some(&["transaction_hash"]),
        "operations" => Some(&["transaction_hash", "operation_index"]),
        "accounts" => Some(&["account_id", "ledger_sequence"]),
        "accounts_current" => Some(&["account_id"]),
        "trustlines" => Some(&["account_id", "asset_type", "asset_code", "asset_issuer", "ledger_sequence"]),
        "trustlines_current" => Some(&["account_id", "asset_type", "asset_code", "asset_issuer"]),
        "offers" => Some(&["offer_id", "ledger_sequence"]),
        "offers_current" => Some(&["offer_id"]),
        "account_signers" => Some(&["account_id", "signer_key", "ledger_sequence"]),
        "claimable_balances_current" => Some(&["balance_id"]),
        "liquidity_pools_current" => Some(&["pool_id"]),
        "native_balances_current" => Some(&["account_id"]),
        "contract_data_current" => Some(&["contract_id", "key_xdr_base64"]),
        "contract_code_current" => Some(&["contract_code_hash"]),
        "ttl_current" => Some(&["key_hash"]),
        "config_settings_current" => Some(&["config_setting_id"]),
        _ => None,
    }
}

/// Business key for the upsert-by-key twin of a table (the bare table for
/// `CurrentOnly`, the `_current` table for `SnapshotWithCurrent`). `None`
/// for append-only tables, which have no upsert target.
pub fn upsert_key_columns(table: TableId) -> Option<&'static [&'static str]> {
    use TableId::*;
    match table {
        Accounts => Some(&["account_id"]),
        Trustlines => Some(&["account_id", "asset_type", "asset_code", "asset_issuer"]),
        Offers => Some(&["offer_id"]),
        ClaimableBalances => Some(&["balance_id"]),
        LiquidityPools => Some(&["pool_id"]),
        NativeBalances => Some(&["account_id"]),
        ContractData => Some(&["contract_id", "key_xdr_base64"]),
        ContractCode => Some(&["contract_code_hash"]),
        Ttl => Some(&["key_hash"]),
        ConfigSettings => Some(&["config_setting_id"]),
        _ => None,
    }
}

/// Physical tables a given logical `TableId` writes to within one flush,
/// paired with their schema (mirrors `TableId::physical_tables`).
pub fn physical_defs(table: TableId) -> &'static [&'static TableDef] {
    use TableId::*;
    match table {
        Ledgers => &[&LEDGERS],
        Transactions => &[&TRANSACTIONS],
        Operations => &[&OPERATIONS],
        Effects => &[&EFFECTS],
        Trades => &[&TRADES],
        Accounts => &[&ACCOUNTS, &ACCOUNTS_CURRENT],
        Trustlines => &[&TRUSTLINES, &TRUSTLINES_CURRENT],
        Offers => &[&OFFERS, &OFFERS_CURRENT],
        AccountSigners => &[&ACCOUNT_SIGNERS],
        ClaimableBalances => &[&CLAIMABLE_BALANCES_CURRENT],
        LiquidityPools => &[&LIQUIDITY_POOLS_CURRENT],
        NativeBalances => &[&NATIVE_BALANCES_CURRENT],
        ContractData => &[&CONTRACT_DATA_CURRENT],
        ContractCode => &[&CONTRACT_CODE_CURRENT],
        ContractEvents => &[&CONTRACT_EVENTS],
        Ttl => &[&TTL_CURRENT],
        ConfigSettings => &[&CONFIG_SETTINGS_CURRENT],
        RestoredKeys => &[&RESTORED_KEYS],
        EvictedKeys => &[&EVICTED_KEYS],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_logical_table_maps_to_a_defined_physical_schema() {
        for &table in crate::model::table::ALL_TABLES.iter() {
            for def in physical_defs(table) {
                assert!(ALL_PHYSICAL_TABLES.iter().any(|d| d.name == def.name));
            }
        }
    }

    #[test]
    fn snapshot_and_current_twins_share_columns() {
        assert_eq!(ACCOUNTS.columns.len(), ACCOUNTS_CURRENT.columns.len());
        assert_eq!(TRUSTLINES.columns.len(), TRUSTLINES_CURRENT.columns.len());
        assert_eq!(OFFERS.columns.len(), OFFERS_CURRENT.columns.len());
    }
}
