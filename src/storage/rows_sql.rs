//! Maps every row struct in `model::rows` onto a column list + parameter
//! vector, so the sinks (duckdb/postgres) can stay generic instead of
//! hand-rolling 21 separate `INSERT` statements.

use crate::model::rows::*;
use crate::model::sql_value::SqlValue;

pub trait TableRow {
    const COLUMNS: &'static [&'static str];
    fn to_values(&self) -> Vec<SqlValue>;
}

macro_rules! impl_table_row {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl TableRow for $ty {
            const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),+];
            fn to_values(&self) -> Vec<SqlValue> {
                vec![$(self.$field.clone().into()),+]
            }
        }
    };
}

impl_table_row!(LedgerRow {
    sequence, ledger_hash, previous_ledger_hash, closed_at, protocol_version, total_coins,
    fee_pool, base_fee, base_reserve, max_tx_set_size, transaction_count, successful_tx_count,
    failed_tx_count, operation_count, tx_set_operation_count, bucket_list_size,
    live_soroban_state_size, fee_write_1kb, ledger_range,
});

impl_table_row!(TransactionRow {
    transaction_hash, ledger_sequence, index_in_ledger, successful, source_account, fee_charged,
    operation_count, memo_type, memo, closed_at, ledger_range,
});

impl_table_row!(OperationRow {
    transaction_hash, operation_index, ledger_sequence, operation_type, source_account,
    details_json, successful, closed_at, ledger_range,
});

impl_table_row!(EffectRow {
    ledger_sequence, transaction_hash, operation_index, sub_index, effect_type, account,
    details_json, closed_at, ledger_range,
});

impl_table_row!(TradeRow {
    ledger_sequence, transaction_hash, operation_index, sub_index, base_account, base_asset_type,
    base_asset_code, base_asset_issuer, base_amount, counter_account, counter_asset_type,
    counter_asset_code, counter_asset_issuer, counter_amount, price_n, price_d, closed_at,
    ledger_range,
});

impl_table_row!(AccountSnapshotRow {
    account_id, ledger_sequence, balance, sequence_number, num_subentries, inflation_dest,
    home_domain, master_weight, threshold_low, threshold_medium, threshold_high, flags,
    last_modified_ledger, deleted, closed_at, valid_to, ledger_range,
});

impl_table_row!(TrustlineSnapshotRow {
    account_id, asset_type, asset_code, asset_issuer, ledger_sequence, balance, limit, flags,
    last_modified_ledger, deleted, closed_at, valid_to, ledger_range,
});

impl_table_row!(OfferSnapshotRow {
    offer_id, ledger_sequence, seller_id, selling_asset_type, selling_asset_code,
    selling_asset_issuer, buying_asset_type, buying_asset_code, buying_asset_issuer, amount,
    price_n, price_d, flags, last_modified_ledger, deleted, closed_at, valid_to, ledger_range,
});

impl_table_row!(AccountSignerSnapshotRow {
    account_id, signer_key, ledger_sequence, weight, last_modified_ledger, deleted, closed_at,
    valid_to, ledger_range,
});

impl_table_row!(ClaimableBalanceCurrentRow {
    balance_id, ledger_sequence, claimants_json, asset_type, asset_code, asset_issuer, amount,
    sponsor, last_modified_ledger, deleted, closed_at, ledger_range,
});

impl_table_row!(LiquidityPoolCurrentRow {
    pool_id, ledger_sequence, fee_bp, asset_a_type, asset_a_code, asset_a_issuer, asset_b_type,
    asset_b_code, asset_b_issuer, reserve_a, reserve_b, total_shares, pool_share_count,
    last_modified_ledger, deleted, closed_at, ledger_range,
});

impl_table_row!(NativeBalanceCurrentRow {
    account_id, ledger_sequence, balance, last_modified_ledger, closed_at, ledger_range,
});

impl_table_row!(ContractDataCurrentRow {
    contract_id, key_xdr_base64, key_decoded_json, durability, ledger_sequence, value_xdr_base64,
    value_decoded_json, last_modified_ledger, deleted, closed_at, ledger_range,
});

impl_table_row!(ContractCodeCurrentRow {
    contract_code_hash, ledger_sequence, code_size_bytes, last_modified_ledger, deleted,
    closed_at, ledger_range,
});

impl_table_row!(TtlCurrentRow {
    key_hash, ledger_sequence, live_until_ledger_seq, closed_at, ledger_range,
});

impl_table_row!(ConfigSettingCurrentRow {
    config_setting_id, ledger_sequence, value_json, closed_at, ledger_range,
});

impl TableRow for ContractEventRow {
    const COLUMNS: &'static [&'static str] = &[
        "ledger_sequence", "transaction_hash", "operation_index", "sub_index", "contract_id",
        "event_type", "topics_xdr_base64", "topics_decoded_json", "data_xdr_base64",
        "data_decoded_json", "in_successful_tx", "closed_at", "ledger_range",
    ];
    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            self.ledger_sequence.into(),
            self.transaction_hash.clone().into(),
            self.operation_index.into(),
            self.sub_index.into(),
            self.contract_id.clone().into(),
            self.event_type.clone().into(),
            SqlValue::Json(serde_json::to_string(&self.topics_xdr_base64).unwrap_or_default()),
            SqlValue::Json(self.topics_decoded_json.clone()),
            self.data_xdr_base64.clone().into(),
            SqlValue::Json(self.data_decoded_json.clone()),
            self.in_successful_tx.into(),
            self.closed_at.into(),
            self.ledger_range.into(),
        ]
    }
}

impl_table_row!(EvictedKeyRow {
    ledger_sequence, sub_index, key_xdr_base64, key_type, closed_at, ledger_range,
});

impl_table_row!(RestoredKeyRow {
    ledger_sequence, transaction_hash, operation_index, sub_index, key_xdr_base64, key_type,
    closed_at, ledger_range,
});

impl TableRow for CallEdgeRow {
    const COLUMNS: &'static [&'static str] = &[
        "ledger_sequence", "transaction_hash", "operation_index", "from_contract", "to_contract",
        "function", "depth", "invocation_order", "source", "closed_at", "ledger_range",
    ];
    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            self.ledger_sequence.into(),
            self.transaction_hash.clone().into(),
            self.operation_index.into(),
            self.from_contract.clone().into(),
            self.to_contract.clone().into(),
            self.function.clone().into(),
            self.depth.into(),
            self.invocation_order.into(),
            self.source.into(),
            self.closed_at.into(),
            self.ledger_range.into(),
        ]
    }
}

impl_table_row!(CallAncestryRow {
    ledger_sequence, transaction_hash, operation_index, root_contract, child_contract, path_depth,
    full_path_json, closed_at, ledger_range,
});
