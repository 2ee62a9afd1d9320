//! Transaction executor (C6, spec.md §4.5/§4.9). Takes whatever the
//! planner decided to flush, writes it to DuckDB (the primary lake sink)
//! inside a single transaction, mirrors it to Postgres when a
//! `postgres_dsn` is configured, and runs the SCD-2 back-fill for the
//! ledger ranges the flush touched. The DuckDB commit runs on its own
//! deadline, detached from the run loop's cancellation token, so a
//! shutdown signal can never abort a commit already in flight.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use duckdb::Connection;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::buffer::BufferSet;
use crate::config::{QualityConfig, StorageConfig};
use crate::error::{IngestError, Result};
use crate::model::rows::*;
use crate::model::sql_value::SqlValue;
use crate::model::table::{ledger_range, TableId, ALL_TABLES};
use crate::planner::FlushDecision;
use crate::storage::catalog::Catalog;
use crate::storage::param_chunk::chunk_by_param_limit;
use crate::storage::rows_sql::TableRow;
use crate::storage::scd2;
use crate::storage::schema::{self, unique_key_columns, ColType, TableDef};

impl duckdb::types::ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<duckdb::types::ToSqlOutput<'_>> {
        use duckdb::types::{ToSqlOutput, Value};
        let value = match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Boolean(*b),
            SqlValue::Numeric(n) => Value::BigInt(n.parse::<i64>().unwrap_or_default()),
            SqlValue::Text(t) => Value::Text(t.clone()),
            SqlValue::Bytes(b) => Value::Blob(b.clone()),
            SqlValue::Json(j) => Value::Text(j.clone()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

#[derive(Debug, Clone, Copy)]
enum Conflict {
    None,
    DoNothing(&'static [&'static str]),
    DoUpdate(&'static [&'static str]),
}

/// A table carries `ON CONFLICT DO UPDATE` only on its upsert-by-key
/// `_current` twin; every other table with a natural key just skips a
/// duplicate row outright (spec.md §4.9: reprocessing the same ledger
/// twice must not fail or duplicate).
fn conflict_for_physical(physical_name: &str) -> Conflict {
    match unique_key_columns(physical_name) {
        None => Conflict::None,
        Some(keys) if physical_name.ends_with("_current") => Conflict::DoUpdate(keys),
        Some(keys) => Conflict::DoNothing(keys),
    }
}

fn build_insert_sql(table: &str, columns: &[&str], n_rows: usize, conflict: Conflict) -> String {
    let placeholder_row = format!("({})", vec!["?"; columns.len()].join(","));
    let values = vec![placeholder_row; n_rows].join(", ");
    let cols = columns.join(", ");
    let conflict_sql = match conflict {
        Conflict::None => String::new(),
        Conflict::DoNothing(keys) => format!(" ON CONFLICT ({}) DO NOTHING", keys.join(", ")),
        Conflict::DoUpdate(keys) => {
            let set_clause = columns
                .iter()
                .filter(|c| !keys.contains(c))
                .map(|c| format!("{c} = excluded.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(" ON CONFLICT ({}) DO UPDATE SET {}", keys.join(", "), set_clause)
        }
    };
    format!("INSERT INTO {table} ({cols}) VALUES {values}{conflict_sql}")
}

fn write_table_duckdb<T: TableRow>(
    tx: &duckdb::Transaction,
    physical_name: &str,
    rows: &[T],
    param_limit: usize,
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let columns = T::COLUMNS;
    let conflict = conflict_for_physical(physical_name);
    for chunk in chunk_by_param_limit(rows, columns.len(), param_limit) {
        let sql = build_insert_sql(physical_name, columns, chunk.len(), conflict);
        let values: Vec<SqlValue> = chunk.iter().flat_map(|r| r.to_values()).collect();
        tx.execute(&sql, duckdb::params_from_iter(values.iter()))
            .map_err(|e| IngestError::Flush(anyhow::anyhow!("insert into {physical_name}: {e}")))?;
    }
    Ok(())
}

fn push_bind_typed<'a>(
    builder: &mut sqlx::query_builder::Separated<'_, 'a, Postgres, &'static str>,
    value: &SqlValue,
    ty: ColType,
) {
    match (ty, value) {
        (ColType::BigInt, SqlValue::Numeric(n)) => {
            builder.push_bind(n.parse::<i64>().unwrap_or_default());
        }
        (ColType::BigInt, SqlValue::Null) => {
            builder.push_bind(None::<i64>);
        }
        (ColType::Bool, SqlValue::Bool(b)) => {
            builder.push_bind(*b);
        }
        (ColType::Bool, SqlValue::Null) => {
            builder.push_bind(None::<bool>);
        }
        (ColType::Text, SqlValue::Text(t)) => {
            builder.push_bind(t.clone());
        }
        (ColType::Text, SqlValue::Json(j)) => {
            builder.push_bind(j.clone());
        }
        (ColType::Text, SqlValue::Bytes(b)) => {
            builder.push_bind(hex::encode(b));
        }
        (ColType::Text, SqlValue::Null) | (_, SqlValue::Null) => {
            builder.push_bind(None::<String>);
        }
        _ => {
            builder.push_bind(None::<String>);
        }
    }
}

async fn write_table_postgres<T: TableRow>(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    def: &TableDef,
    rows: &[T],
    param_limit: usize,
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let conflict = conflict_for_physical(def.name);
    for chunk in chunk_by_param_limit(rows, def.columns.len(), param_limit) {
        let column_names: Vec<&str> = def.columns.iter().map(|c| c.name).collect();
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}) ",
            def.name,
            column_names.join(", ")
        ));
        qb.push_values(chunk.iter(), |mut b, row| {
            for (value, col) in row.to_values().iter().zip(def.columns.iter()) {
                push_bind_typed(&mut b, value, col.ty);
            }
        });
        match conflict {
            Conflict::None => {}
            Conflict::DoNothing(keys) => {
                qb.push(format!(" ON CONFLICT ({}) DO NOTHING", keys.join(", ")));
            }
            Conflict::DoUpdate(keys) => {
                let set_clause = def
                    .columns
                    .iter()
                    .map(|c| c.name)
                    .filter(|c| !keys.contains(c))
                    .map(|c| format!("{c} = excluded.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                qb.push(format!(
                    " ON CONFLICT ({}) DO UPDATE SET {}",
                    keys.join(", "),
                    set_clause
                ));
            }
        }
        qb.build()
            .execute(&mut **tx)
            .await
            .map_err(|e| IngestError::Flush(anyhow::anyhow!("postgres insert into {}: {e}", def.name)))?;
    }
    Ok(())
}

/// Drained row payload for one flush. Tables left out of a selective
/// flush simply stay as empty `Vec`s here — every write helper below is a
/// no-op on an empty slice.
#[derive(Default)]
struct DrainedBatch {
    ledgers: Vec<LedgerRow>,
    transactions: Vec<TransactionRow>,
    operations: Vec<OperationRow>,
    effects: Vec<EffectRow>,
    trades: Vec<TradeRow>,
    accounts: Vec<AccountSnapshotRow>,
    trustlines: Vec<TrustlineSnapshotRow>,
    offers: Vec<OfferSnapshotRow>,
    account_signers: Vec<AccountSignerSnapshotRow>,
    claimable_balances: Vec<ClaimableBalanceCurrentRow>,
    liquidity_pools: Vec<LiquidityPoolCurrentRow>,
    native_balances: Vec<NativeBalanceCurrentRow>,
    contract_data: Vec<ContractDataCurrentRow>,
    contract_code: Vec<ContractCodeCurrentRow>,
    contract_events: Vec<ContractEventRow>,
    ttl: Vec<TtlCurrentRow>,
    config_settings: Vec<ConfigSettingCurrentRow>,
    restored_keys: Vec<RestoredKeyRow>,
    evicted_keys: Vec<EvictedKeyRow>,
    call_edges: Vec<CallEdgeRow>,
    call_ancestry: Vec<CallAncestryRow>,
    touched_tables: Vec<TableId>,
}

impl DrainedBatch {
    fn table_counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("ledgers", self.ledgers.len()),
            ("transactions", self.transactions.len()),
            ("operations", self.operations.len()),
            ("effects", self.effects.len()),
            ("trades", self.trades.len()),
            ("accounts", self.accounts.len()),
            ("trustlines", self.trustlines.len()),
            ("offers", self.offers.len()),
            ("account_signers", self.account_signers.len()),
            ("claimable_balances", self.claimable_balances.len()),
            ("liquidity_pools", self.liquidity_pools.len()),
            ("native_balances", self.native_balances.len()),
            ("contract_data", self.contract_data.len()),
            ("contract_code", self.contract_code.len()),
            ("contract_events", self.contract_events.len()),
            ("ttl", self.ttl.len()),
            ("config_settings", self.config_settings.len()),
            ("restored_keys", self.restored_keys.len()),
            ("evicted_keys", self.evicted_keys.len()),
            ("call_edges", self.call_edges.len()),
            ("call_ancestry", self.call_ancestry.len()),
        ]
    }
}

fn tables_to_drain(decision: &FlushDecision) -> (Vec<TableId>, bool) {
    match decision {
        FlushDecision::Wait => (vec![], false),
        FlushDecision::Selective(tables) => (tables.clone(), false),
        FlushDecision::Full => (ALL_TABLES.to_vec(), true),
    }
}

fn drain_selected(buffers: &mut BufferSet, tables: &[TableId], include_call_graph: bool) -> DrainedBatch {
    let mut out = DrainedBatch::default();
    for &table in tables {
        match table {
            TableId::Ledgers => out.ledgers = buffers.ledgers.drain(),
            TableId::Transactions => out.transactions = buffers.transactions.drain(),
            TableId::Operations => out.operations = buffers.operations.drain(),
            TableId::Effects => out.effects = buffers.effects.drain(),
            TableId::Trades => out.trades = buffers.trades.drain(),
            TableId::Accounts => out.accounts = buffers.accounts.drain(),
            TableId::Trustlines => out.trustlines = buffers.trustlines.drain(),
            TableId::Offers => out.offers = buffers.offers.drain(),
            TableId::AccountSigners => out.account_signers = buffers.account_signers.drain(),
            TableId::ClaimableBalances => out.claimable_balances = buffers.claimable_balances.drain(),
            TableId::LiquidityPools => out.liquidity_pools = buffers.liquidity_pools.drain(),
            TableId::NativeBalances => out.native_balances = buffers.native_balances.drain(),
            TableId::ContractData => out.contract_data = buffers.contract_data.drain(),
            TableId::ContractCode => out.contract_code = buffers.contract_code.drain(),
            TableId::ContractEvents => out.contract_events = buffers.contract_events.drain(),
            TableId::Ttl => out.ttl = buffers.ttl.drain(),
            TableId::ConfigSettings => out.config_settings = buffers.config_settings.drain(),
            TableId::RestoredKeys => out.restored_keys = buffers.restored_keys.drain(),
            TableId::EvictedKeys => out.evicted_keys = buffers.evicted_keys.drain(),
        }
    }
    if include_call_graph {
        out.call_edges = buffers.call_edges.drain();
        out.call_ancestry = buffers.call_ancestry.drain();
    }
    out.touched_tables = tables.to_vec();
    out
}

fn write_all_duckdb(tx: &duckdb::Transaction, drained: &DrainedBatch, param_limit: usize) -> Result<()> {
    write_table_duckdb(tx, "ledgers", &drained.ledgers, param_limit)?;
    write_table_duckdb(tx, "transactions", &drained.transactions, param_limit)?;
    write_table_duckdb(tx, "operations", &drained.operations, param_limit)?;
    write_table_duckdb(tx, "effects", &drained.effects, param_limit)?;
    write_table_duckdb(tx, "trades", &drained.trades, param_limit)?;
    write_table_duckdb(tx, "accounts", &drained.accounts, param_limit)?;
    write_table_duckdb(tx, "accounts_current", &drained.accounts, param_limit)?;
    write_table_duckdb(tx, "trustlines", &drained.trustlines, param_limit)?;
    write_table_duckdb(tx, "trustlines_current", &drained.trustlines, param_limit)?;
    write_table_duckdb(tx, "offers", &drained.offers, param_limit)?;
    write_table_duckdb(tx, "offers_current", &drained.offers, param_limit)?;
    write_table_duckdb(tx, "account_signers", &drained.account_signers, param_limit)?;
    write_table_duckdb(tx, "claimable_balances_current", &drained.claimable_balances, param_limit)?;
    write_table_duckdb(tx, "liquidity_pools_current", &drained.liquidity_pools, param_limit)?;
    write_table_duckdb(tx, "native_balances_current", &drained.native_balances, param_limit)?;
    write_table_duckdb(tx, "contract_data_current", &drained.contract_data, param_limit)?;
    write_table_duckdb(tx, "contract_code_current", &drained.contract_code, param_limit)?;
    write_table_duckdb(tx, "contract_events", &drained.contract_events, param_limit)?;
    write_table_duckdb(tx, "ttl_current", &drained.ttl, param_limit)?;
    write_table_duckdb(tx, "config_settings_current", &drained.config_settings, param_limit)?;
    write_table_duckdb(tx, "restored_keys", &drained.restored_keys, param_limit)?;
    write_table_duckdb(tx, "evicted_keys", &drained.evicted_keys, param_limit)?;
    write_table_duckdb(tx, "call_edges", &drained.call_edges, param_limit)?;
    write_table_duckdb(tx, "call_ancestry", &drained.call_ancestry, param_limit)?;
    Ok(())
}

async fn write_all_postgres(pool: &PgPool, drained: &DrainedBatch, param_limit: usize) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| IngestError::Flush(anyhow::anyhow!("postgres begin: {e}")))?;

    write_table_postgres(&mut tx, &schema::LEDGERS, &drained.ledgers, param_limit).await?;
    write_table_postgres(&mut tx, &schema::TRANSACTIONS, &drained.transactions, param_limit).await?;
    write_table_postgres(&mut tx, &schema::OPERATIONS, &drained.operations, param_limit).await?;
    write_table_postgres(&mut tx, &schema::EFFECTS, &drained.effects, param_limit).await?;
    write_table_postgres(&mut tx, &schema::TRADES, &drained.trades, param_limit).await?;
    write_table_postgres(&mut tx, &schema::ACCOUNTS, &drained.accounts, param_limit).await?;
    write_table_postgres(&mut tx, &schema::ACCOUNTS_CURRENT, &drained.accounts, param_limit).await?;
    write_table_postgres(&mut tx, &schema::TRUSTLINES, &drained.trustlines, param_limit).await?;
    write_table_postgres(&mut tx, &schema::TRUSTLINES_CURRENT, &drained.trustlines, param_limit).await?;
    write_table_postgres(&mut tx, &schema::OFFERS, &drained.offers, param_limit).await?;
    write_table_postgres(&mut tx, &schema::OFFERS_CURRENT, &drained.offers, param_limit).await?;
    write_table_postgres(&mut tx, &schema::ACCOUNT_SIGNERS, &drained.account_signers, param_limit).await?;
    write_table_postgres(&mut tx, &schema::CLAIMABLE_BALANCES_CURRENT, &drained.claimable_balances, param_limit).await?;
    write_table_postgres(&mut tx, &schema::LIQUIDITY_POOLS_CURRENT, &drained.liquidity_pools, param_limit).await?;
    write_table_postgres(&mut tx, &schema::NATIVE_BALANCES_CURRENT, &drained.native_balances, param_limit).await?;
    write_table_postgres(&mut tx, &schema::CONTRACT_DATA_CURRENT, &drained.contract_data, param_limit).await?;
    write_table_postgres(&mut tx, &schema::CONTRACT_CODE_CURRENT, &drained.contract_code, param_limit).await?;
    write_table_postgres(&mut tx, &schema::CONTRACT_EVENTS, &drained.contract_events, param_limit).await?;
    write_table_postgres(&mut tx, &schema::TTL_CURRENT, &drained.ttl, param_limit).await?;
    write_table_postgres(&mut tx, &schema::CONFIG_SETTINGS_CURRENT, &drained.config_settings, param_limit).await?;
    write_table_postgres(&mut tx, &schema::RESTORED_KEYS, &drained.restored_keys, param_limit).await?;
    write_table_postgres(&mut tx, &schema::EVICTED_KEYS, &drained.evicted_keys, param_limit).await?;
    write_table_postgres(&mut tx, &schema::CALL_EDGES, &drained.call_edges, param_limit).await?;
    write_table_postgres(&mut tx, &schema::CALL_ANCESTRY, &drained.call_ancestry, param_limit).await?;

    tx.commit()
        .await
        .map_err(|e| IngestError::Flush(anyhow::anyhow!("postgres commit: {e}")))
}

fn write_quality_rows(
    tx: &duckdb::Transaction,
    drained: &DrainedBatch,
    param_limit: usize,
    flushed_at: i64,
) -> Result<()> {
    let rows: Vec<(i64, &'static str, i64)> = drained
        .table_counts()
        .into_iter()
        .filter(|&(_, count)| count > 0)
        .map(|(name, count)| (flushed_at, name, count as i64))
        .collect();
    if rows.is_empty() {
        return Ok(());
    }
    let columns = &["flushed_at", "table_name", "row_count", "uniqueness_violations", "null_rate_violations"];
    for chunk in chunk_by_param_limit(&rows, columns.len(), param_limit) {
        let sql = build_insert_sql("_meta_quality", columns, chunk.len(), Conflict::None);
        let mut values = Vec::with_capacity(chunk.len() * columns.len());
        for &(flushed_at, name, count) in chunk {
            values.push(SqlValue::Numeric(flushed_at.to_string()));
            values.push(SqlValue::Text(name.to_string()));
            values.push(SqlValue::Numeric(count.to_string()));
            values.push(SqlValue::Numeric("0".to_string()));
            values.push(SqlValue::Json("[]".to_string()));
        }
        tx.execute(&sql, duckdb::params_from_iter(values.iter()))
            .map_err(|e| IngestError::Flush(anyhow::anyhow!("writing _meta_quality: {e}")))?;
    }
    Ok(())
}

fn run_scd2_backfill(tx: &duckdb::Transaction, drained: &DrainedBatch, touched_ranges: &[u32]) -> Result<()> {
    for &table in &drained.touched_tables {
        if let Some(sql) = scd2::backfill_sql(table, touched_ranges) {
            tx.execute_batch(&sql)
                .map_err(|e| IngestError::Flush(anyhow::anyhow!("scd2 backfill for {table}: {e}")))?;
        }
    }
    Ok(())
}

fn ledger_ranges_touched(min_ledger: u32, max_ledger: u32, partition_width: u32) -> Vec<u32> {
    let mut ranges = Vec::new();
    let mut r = ledger_range(min_ledger, partition_width);
    let max_r = ledger_range(max_ledger, partition_width);
    loop {
        ranges.push(r);
        if r >= max_r {
            break;
        }
        r += partition_width;
    }
    ranges
}

#[derive(Debug, Default)]
pub struct FlushStats {
    pub ledgers_flushed: usize,
    pub transactions_flushed: usize,
    pub operations_flushed: usize,
    pub min_ledger: Option<u32>,
    pub max_ledger: Option<u32>,
    /// Hash of the highest-sequence `LedgerRow` in this flush, when the
    /// `ledgers` table was part of it. The coordinator only advances the
    /// checkpoint on a flush that includes `ledgers` (in practice, a
    /// `Full` flush, since every buffer is drained together), so this is
    /// always present when it's needed.
    pub last_ledger_hash: Option<String>,
}

/// Pushes a flush's drained rows back into the buffers they came from, so
/// a failed commit leaves the next attempt with the same payload to retry
/// (spec.md §4.5/§7: "buffers are not cleared" on `FlushError`).
fn restore_into_buffers(buffers: &mut BufferSet, drained: DrainedBatch) {
    buffers.ledgers.push_all(drained.ledgers);
    buffers.transactions.push_all(drained.transactions);
    buffers.operations.push_all(drained.operations);
    buffers.effects.push_all(drained.effects);
    buffers.trades.push_all(drained.trades);
    buffers.accounts.push_all(drained.accounts);
    buffers.trustlines.push_all(drained.trustlines);
    buffers.offers.push_all(drained.offers);
    buffers.account_signers.push_all(drained.account_signers);
    buffers.claimable_balances.push_all(drained.claimable_balances);
    buffers.liquidity_pools.push_all(drained.liquidity_pools);
    buffers.native_balances.push_all(drained.native_balances);
    buffers.contract_data.push_all(drained.contract_data);
    buffers.contract_code.push_all(drained.contract_code);
    buffers.contract_events.push_all(drained.contract_events);
    buffers.ttl.push_all(drained.ttl);
    buffers.config_settings.push_all(drained.config_settings);
    buffers.restored_keys.push_all(drained.restored_keys);
    buffers.evicted_keys.push_all(drained.evicted_keys);
    buffers.call_edges.push_all(drained.call_edges);
    buffers.call_ancestry.push_all(drained.call_ancestry);
}

pub struct Writer {
    duckdb: Arc<Mutex<Connection>>,
    postgres: Option<PgPool>,
    param_limit: usize,
    partition_width: u32,
    flush_deadline: Duration,
    quality: QualityConfig,
}

impl Writer {
    pub fn new(catalog: Catalog, postgres: Option<PgPool>, storage: &StorageConfig, quality: QualityConfig) -> Self {
        Self {
            duckdb: Arc::new(Mutex::new(catalog.conn)),
            postgres,
            param_limit: storage.param_limit,
            partition_width: storage.partition_width,
            flush_deadline: Duration::from_secs(storage.flush_deadline_seconds),
            quality,
        }
    }

    /// Writes whatever `decision` names, commits, back-fills SCD-2 history
    /// for the touched partitions, and returns counts the coordinator uses
    /// to advance the checkpoint. A `FlushDecision::Wait` is a no-op.
    pub async fn flush(&self, buffers: &mut BufferSet, decision: &FlushDecision) -> Result<FlushStats> {
        let (tables, include_call_graph) = tables_to_drain(decision);
        if tables.is_empty() && !include_call_graph {
            return Ok(FlushStats::default());
        }

        let min_ledger = buffers.min_ledger;
        let max_ledger = buffers.max_ledger;
        let touched_ranges = match (min_ledger, max_ledger) {
            (Some(min), Some(max)) => ledger_ranges_touched(min, max, self.partition_width),
            _ => vec![],
        };

        let drained = drain_selected(buffers, &tables, include_call_graph);
        let last_ledger_hash = drained
            .ledgers
            .iter()
            .max_by_key(|row| row.sequence)
            .map(|row| row.ledger_hash.clone());
        let stats = FlushStats {
            ledgers_flushed: drained.ledgers.len(),
            transactions_flushed: drained.transactions.len(),
            operations_flushed: drained.operations.len(),
            min_ledger,
            max_ledger,
            last_ledger_hash,
        };

        let duckdb = Arc::clone(&self.duckdb);
        let param_limit = self.param_limit;
        let quality_enabled = self.quality.enabled;
        let flushed_at = chrono::Utc::now().timestamp();
        let ranges_for_task = touched_ranges.clone();

        let handle = tokio::task::spawn_blocking(move || -> (DrainedBatch, Result<()>) {
            let result = (|| -> Result<()> {
                let mut conn = duckdb.lock().expect("duckdb connection mutex poisoned");
                let tx = conn
                    .transaction()
                    .map_err(|e| IngestError::Flush(anyhow::anyhow!("begin duckdb transaction: {e}")))?;
                write_all_duckdb(&tx, &drained, param_limit)?;
                if quality_enabled {
                    write_quality_rows(&tx, &drained, param_limit, flushed_at)?;
                }
                run_scd2_backfill(&tx, &drained, &ranges_for_task)?;
                tx.commit()
                    .map_err(|e| IngestError::Flush(anyhow::anyhow!("commit duckdb transaction: {e}")))?;
                Ok(())
            })();
            (drained, result)
        });

        // Detached from the run loop's cancellation token: only this
        // deadline governs whether a commit gets torn down mid-flight.
        let (drained, result) = tokio::time::timeout(self.flush_deadline, handle)
            .await
            .map_err(|_| IngestError::Flush(anyhow::anyhow!("flush exceeded deadline of {:?}", self.flush_deadline)))?
            .map_err(|e| IngestError::Flush(anyhow::anyhow!("flush task panicked: {e}")))?;

        if let Err(err) = result {
            // The duckdb transaction rolled back (or never committed); put
            // the payload back so the next attempt retries it unchanged.
            restore_into_buffers(buffers, drained);
            return Err(err);
        }

        if let Some(pool) = &self.postgres {
            // The lake write already committed and is the source of truth
            // for the checkpoint; a failed mirror write is logged, not
            // retried from buffers (spec.md §1: "and/or a relational
            // row-store" — the lake alone satisfies durability).
            if let Err(err) = write_all_postgres(pool, &drained, param_limit).await {
                tracing::error!(%err, "postgres mirror write failed after duckdb commit");
            }
        }

        // Only a `Full` flush drains every buffer; a `Selective` flush
        // leaves the planner's timeout clock running for whatever tables
        // are still waiting on their own threshold (spec.md §4.4).
        if buffers.is_fully_drained() {
            buffers.mark_flushed();
        }

        tracing::info!(
            ledgers = stats.ledgers_flushed,
            transactions = stats.transactions_flushed,
            operations = stats.operations_flushed,
            ranges = touched_ranges.len(),
            "flush committed"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn do_nothing_conflict_on_append_tables() {
        match conflict_for_physical("effects") {
            Conflict::DoNothing(keys) => assert_eq!(keys, &["ledger_sequence", "transaction_hash", "operation_index", "sub_index"]),
            other => panic!("expected DoNothing, got {other:?}"),
        }
    }

    #[test]
    fn do_update_conflict_on_current_twins() {
        match conflict_for_physical("accounts_current") {
            Conflict::DoUpdate(keys) => assert_eq!(keys, &["account_id"]),
            other => panic!("expected DoUpdate, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_history_tables_do_nothing_on_key_plus_ledger_sequence() {
        match conflict_for_physical("accounts") {
            Conflict::DoNothing(keys) => assert_eq!(keys, &["account_id", "ledger_sequence"]),
            other => panic!("expected DoNothing, got {other:?}"),
        }
    }

    #[test]
    fn insert_sql_includes_conflict_clause() {
        let sql = build_insert_sql("accounts_current", &["account_id", "balance"], 2, Conflict::DoUpdate(&["account_id"]));
        assert!(sql.contains("ON CONFLICT (account_id) DO UPDATE SET balance = excluded.balance"));
        assert!(sql.contains("VALUES (?,?), (?,?)"));
    }

    #[test]
    fn ledger_ranges_touched_spans_partitions() {
        let ranges = ledger_ranges_touched(95_000, 205_000, 100_000);
        assert_eq!(ranges, vec![0, 100_000, 200_000]);
    }
}
