//! The 19 logical tables named in spec.md §1/§2, plus the physical
//! write policy each one carries (§3.2, §4.9).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    Ledgers,
    Transactions,
    Operations,
    Effects,
    Trades,
    Accounts,
    Trustlines,
    Offers,
    AccountSigners,
    ClaimableBalances,
    LiquidityPools,
    NativeBalances,
    ContractData,
    ContractCode,
    ContractEvents,
    Ttl,
    ConfigSettings,
    RestoredKeys,
    EvictedKeys,
}

pub const ALL_TABLES: [TableId; 19] = [
    TableId::Ledgers,
    TableId::Transactions,
    TableId::Operations,
    TableId::Effects,
    TableId::Trades,
    TableId::Accounts,
    TableId::Trustlines,
    TableId::Offers,
    TableId::AccountSigners,
    TableId::ClaimableBalances,
    TableId::LiquidityPools,
    TableId::NativeBalances,
    TableId::ContractData,
    TableId::ContractCode,
    TableId::ContractEvents,
    TableId::Ttl,
    TableId::ConfigSettings,
    TableId::RestoredKeys,
    TableId::EvictedKeys,
];

/// How a logical table's rows are physically materialized. See spec.md
/// §3.2 and §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Append-only, natural key is already unique (ledgers/transactions/operations).
    Plain,
    /// SCD-Type-2 history (`valid_to` back-filled) with no materialized
    /// "current" twin (account_signers).
    SnapshotOnly,
    /// SCD-Type-2 history *and* an upsert-by-key `_current` twin
    /// (accounts, trustlines, offers).
    SnapshotWithCurrent,
    /// Upsert-by-key only, no history (native_balances, claimable_balances,
    /// liquidity_pools, contract_data, contract_code, ttl, config_settings).
    CurrentOnly,
    /// Append-only with a natural composite key and `ON CONFLICT DO NOTHING`
    /// (effects, trades, contract_events, evicted_keys, restored_keys).
    EventStream,
}

impl TableId {
    pub fn as_str(self) -> &'static str {
        match self {
            TableId::Ledgers => "ledgers",
            TableId::Transactions => "transactions",
            TableId::Operations => "operations",
            TableId::Effects => "effects",
            TableId::Trades => "trades",
            TableId::Accounts => "accounts",
            TableId::Trustlines => "trustlines",
            TableId::Offers => "offers",
            TableId::AccountSigners => "account_signers",
            TableId::ClaimableBalances => "claimable_balances",
            TableId::LiquidityPools => "liquidity_pools",
            TableId::NativeBalances => "native_balances",
            TableId::ContractData => "contract_data",
            TableId::ContractCode => "contract_code",
            TableId::ContractEvents => "contract_events",
            TableId::Ttl => "ttl",
            TableId::ConfigSettings => "config_settings",
            TableId::RestoredKeys => "restored_keys",
            TableId::EvictedKeys => "evicted_keys",
        }
    }

    pub fn policy(self) -> WritePolicy {
        use TableId::*;
        match self {
            Ledgers | Transactions | Operations => WritePolicy::Plain,
            Accounts | Trustlines | Offers => WritePolicy::SnapshotWithCurrent,
            AccountSigners => WritePolicy::SnapshotOnly,
            ClaimableBalances | LiquidityPools | NativeBalances | ContractData | ContractCode
            | Ttl | ConfigSettings => WritePolicy::CurrentOnly,
            Effects | Trades | ContractEvents | EvictedKeys | RestoredKeys => {
                WritePolicy::EventStream
            }
        }
    }

    /// Physical tables this logical table writes to within one flush.
    pub fn physical_tables(self) -> &'static [&'static str] {
        match self.policy() {
            WritePolicy::SnapshotWithCurrent => match self {
                TableId::Accounts => &["accounts", "accounts_current"],
                TableId::Trustlines => &["trustlines", "trustlines_current"],
                TableId::Offers => &["offers", "offers_current"],
                _ => unreachable!(),
            },
            WritePolicy::CurrentOnly => match self {
                TableId::ClaimableBalances => &["claimable_balances_current"],
                TableId::LiquidityPools => &["liquidity_pools_current"],
                TableId::NativeBalances => &["native_balances_current"],
                TableId::ContractData => &["contract_data_current"],
                TableId::ContractCode => &["contract_code_current"],
                TableId::Ttl => &["ttl_current"],
                TableId::ConfigSettings => &["config_settings_current"],
                _ => unreachable!(),
            },
            _ => match self {
                TableId::Ledgers => &["ledgers"],
                TableId::Transactions => &["transactions"],
                TableId::Operations => &["operations"],
                TableId::AccountSigners => &["account_signers"],
                TableId::Effects => &["effects"],
                TableId::Trades => &["trades"],
                TableId::ContractEvents => &["contract_events"],
                TableId::EvictedKeys => &["evicted_keys"],
                TableId::RestoredKeys => &["restored_keys"],
                _ => unreachable!(),
            },
        }
    }

    /// Column a partitioned table ranges over (`identity(col / P)`, §4.6).
    pub fn partition_column(self) -> &'static str {
        match self {
            TableId::Transactions | TableId::Operations => "ledger_sequence",
            _ => "ledger_sequence",
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `ledger_range = floor(seq / P) * P`, spec.md §3.2/§8 invariant 7.
pub fn ledger_range(sequence: u32, partition_width: u32) -> u32 {
    (sequence / partition_width) * partition_width
}
