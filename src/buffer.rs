//! In-memory row buffers (C4, spec.md §4.4). Each logical table gets its
//! own buffer sized from `StorageConfig::batch_size_for`; the planner
//! (C5) reads `len()`/`is_empty()` to decide what to flush.

use std::time::Instant;

use crate::config::StorageConfig;
use crate::extract::ExtractedBatch;
use crate::model::rows::*;
use crate::model::table::{TableId, ALL_TABLES};

#[derive(Debug)]
pub struct RowBuffer<T> {
    rows: Vec<T>,
    capacity: usize,
}

impl<T> RowBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    pub fn push_all(&mut self, items: impl IntoIterator<Item = T>) {
        self.rows.extend(items);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn at_capacity(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.rows)
    }
}

/// Holds one buffer per logical table (spec.md §1), plus the two
/// call-graph tables that sit outside the 19-table enumeration.
#[derive(Debug)]
pub struct BufferSet {
    pub ledgers: RowBuffer<LedgerRow>,
    pub transactions: RowBuffer<TransactionRow>,
    pub operations: RowBuffer<OperationRow>,
    pub effects: RowBuffer<EffectRow>,
    pub trades: RowBuffer<TradeRow>,
    pub accounts: RowBuffer<AccountSnapshotRow>,
    pub trustlines: RowBuffer<TrustlineSnapshotRow>,
    pub offers: RowBuffer<OfferSnapshotRow>,
    pub account_signers: RowBuffer<AccountSignerSnapshotRow>,
    pub claimable_balances: RowBuffer<ClaimableBalanceCurrentRow>,
    pub liquidity_pools: RowBuffer<LiquidityPoolCurrentRow>,
    pub native_balances: RowBuffer<NativeBalanceCurrentRow>,
    pub contract_data: RowBuffer<ContractDataCurrentRow>,
    pub contract_code: RowBuffer<ContractCodeCurrentRow>,
    pub contract_events: RowBuffer<ContractEventRow>,
    pub ttl: RowBuffer<TtlCurrentRow>,
    pub config_settings: RowBuffer<ConfigSettingCurrentRow>,
    pub restored_keys: RowBuffer<RestoredKeyRow>,
    pub evicted_keys: RowBuffer<EvictedKeyRow>,
    pub call_edges: RowBuffer<CallEdgeRow>,
    pub call_ancestry: RowBuffer<CallAncestryRow>,

    /// Ledger sequence range currently buffered, used by the planner's
    /// timeout trigger and the checkpoint advance on flush.
    pub min_ledger: Option<u32>,
    pub max_ledger: Option<u32>,
    pub oldest_row_at: Option<Instant>,
}

impl BufferSet {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            ledgers: RowBuffer::new(storage.batch_size_for(TableId::Ledgers)),
            transactions: RowBuffer::new(storage.batch_size_for(TableId::Transactions)),
            operations: RowBuffer::new(storage.batch_size_for(TableId::Operations)),
            effects: RowBuffer::new(storage.batch_size_for(TableId::Effects)),
            trades: RowBuffer::new(storage.batch_size_for(TableId::Trades)),
            accounts: RowBuffer::new(storage.batch_size_for(TableId::Accounts)),
            trustlines: RowBuffer::new(storage.batch_size_for(TableId::Trustlines)),
            offers: RowBuffer::new(storage.batch_size_for(TableId::Offers)),
            account_signers: RowBuffer::new(storage.batch_size_for(TableId::AccountSigners)),
            claimable_balances: RowBuffer::new(storage.batch_size_for(TableId::ClaimableBalances)),
            liquidity_pools: RowBuffer::new(storage.batch_size_for(TableId::LiquidityPools)),
            native_balances: RowBuffer::new(storage.batch_size_for(TableId::NativeBalances)),
            contract_data: RowBuffer::new(storage.batch_size_for(TableId::ContractData)),
            contract_code: RowBuffer::new(storage.batch_size_for(TableId::ContractCode)),
            contract_events: RowBuffer::new(storage.batch_size_for(TableId::ContractEvents)),
            ttl: RowBuffer::new(storage.batch_size_for(TableId::Ttl)),
            config_settings: RowBuffer::new(storage.batch_size_for(TableId::ConfigSettings)),
            restored_keys: RowBuffer::new(storage.batch_size_for(TableId::RestoredKeys)),
            evicted_keys: RowBuffer::new(storage.batch_size_for(TableId::EvictedKeys)),
            call_edges: RowBuffer::new(storage.batch_size),
            call_ancestry: RowBuffer::new(storage.batch_size),
            min_ledger: None,
            max_ledger: None,
            oldest_row_at: None,
        }
    }

    pub fn ingest(&mut self, batch: ExtractedBatch, ledger_sequence: u32) {
        if self.oldest_row_at.is_none() && !is_batch_empty(&batch) {
            self.oldest_row_at = Some(Instant::now());
        }
        self.min_ledger = Some(self.min_ledger.map_or(ledger_sequence, |m| m.min(ledger_sequence)));
        self.max_ledger = Some(self.max_ledger.map_or(ledger_sequence, |m| m.max(ledger_sequence)));

        self.ledgers.push_all(batch.ledgers);
        self.transactions.push_all(batch.transactions);
        self.operations.push_all(batch.operations);
        self.effects.push_all(batch.effects);
        self.trades.push_all(batch.trades);
        self.accounts.push_all(batch.accounts);
        self.trustlines.push_all(batch.trustlines);
        self.offers.push_all(batch.offers);
        self.account_signers.push_all(batch.account_signers);
        self.claimable_balances.push_all(batch.claimable_balances);
        self.liquidity_pools.push_all(batch.liquidity_pools);
        self.native_balances.push_all(batch.native_balances);
        self.contract_data.push_all(batch.contract_data);
        self.contract_code.push_all(batch.contract_code);
        self.contract_events.push_all(batch.contract_events);
        self.ttl.push_all(batch.ttl);
        self.config_settings.push_all(batch.config_settings);
        self.restored_keys.push_all(batch.restored_keys);
        self.evicted_keys.push_all(batch.evicted_keys);
        self.call_edges.push_all(batch.call_edges);
        self.call_ancestry.push_all(batch.call_ancestry);
    }

    /// True once every buffer is empty — the post-flush state.
    pub fn is_fully_drained(&self) -> bool {
        self.ledgers.is_empty()
            && self.transactions.is_empty()
            && self.operations.is_empty()
            && self.effects.is_empty()
            && self.trades.is_empty()
            && self.accounts.is_empty()
            && self.trustlines.is_empty()
            && self.offers.is_empty()
            && self.account_signers.is_empty()
            && self.claimable_balances.is_empty()
            && self.liquidity_pools.is_empty()
            && self.native_balances.is_empty()
            && self.contract_data.is_empty()
            && self.contract_code.is_empty()
            && self.contract_events.is_empty()
            && self.ttl.is_empty()
            && self.config_settings.is_empty()
            && self.restored_keys.is_empty()
            && self.evicted_keys.is_empty()
            && self.call_edges.is_empty()
            && self.call_ancestry.is_empty()
    }

    pub fn mark_flushed(&mut self) {
        self.min_ledger = None;
        self.max_ledger = None;
        self.oldest_row_at = None;
    }

    /// Per-table row counts, keyed by the 19 logical tables; the two
    /// call-graph buffers are reported alongside under their own keys by
    /// the caller since they have no `TableId`.
    pub fn lengths(&self) -> Vec<(TableId, usize)> {
        ALL_TABLES
            .iter()
            .map(|&table| (table, self.len_for(table)))
            .collect()
    }

    pub fn len_for(&self, table: TableId) -> usize {
        use TableId::*;
        match table {
            Ledgers => self.ledgers.len(),
            Transactions => self.transactions.len(),
            Operations => self.operations.len(),
            Effects => self.effects.len(),
            Trades => self.trades.len(),
            Accounts => self.accounts.len(),
            Trustlines => self.trustlines.len(),
            Offers => self.offers.len(),
            AccountSigners => self.account_signers.len(),
            ClaimableBalances => self.claimable_balances.len(),
            LiquidityPools => self.liquidity_pools.len(),
            NativeBalances => self.native_balances.len(),
            ContractData => self.contract_data.len(),
            ContractCode => self.contract_code.len(),
            ContractEvents => self.contract_events.len(),
            Ttl => self.ttl.len(),
            ConfigSettings => self.config_settings.len(),
            RestoredKeys => self.restored_keys.len(),
            EvictedKeys => self.evicted_keys.len(),
        }
    }

    pub fn at_capacity_for(&self, table: TableId) -> bool {
        use TableId::*;
        match table {
            Ledgers => self.ledgers.at_capacity(),
            Transactions => self.transactions.at_capacity(),
            Operations => self.operations.at_capacity(),
            Effects => self.effects.at_capacity(),
            Trades => self.trades.at_capacity(),
            Accounts => self.accounts.at_capacity(),
            Trustlines => self.trustlines.at_capacity(),
            Offers => self.offers.at_capacity(),
            AccountSigners => self.account_signers.at_capacity(),
            ClaimableBalances => self.claimable_balances.at_capacity(),
            LiquidityPools => self.liquidity_pools.at_capacity(),
            NativeBalances => self.native_balances.at_capacity(),
            ContractData => self.contract_data.at_capacity(),
            ContractCode => self.contract_code.at_capacity(),
            ContractEvents => self.contract_events.at_capacity(),
            Ttl => self.ttl.at_capacity(),
            ConfigSettings => self.config_settings.at_capacity(),
            RestoredKeys => self.restored_keys.at_capacity(),
            EvictedKeys => self.evicted_keys.at_capacity(),
        }
    }
}

fn is_batch_empty(batch: &ExtractedBatch) -> bool {
    batch.ledgers.is_empty()
        && batch.transactions.is_empty()
        && batch.operations.is_empty()
}
