//! Incremental SCD-2 back-fill (C10, spec.md §4.9): after a flush,
//! `valid_to` is back-filled for history rows whose successor within the
//! same business key is now known, scoped to the ledger-range partitions
//! touched by this flush so the scan stays bounded regardless of table
//! age.

use itertools::Itertools;

use crate::model::table::TableId;

/// `(history_table, business_key_columns)` for the four SCD-2 tables
/// (spec.md §4.9: accounts/trustlines/offers/account_signers).
pub fn scd2_key_columns(table: TableId) -> Option<&'static [&'static str]> {
    match table {
        TableId::Accounts => Some(&["account_id"]),
        TableId::Trustlines => Some(&["account_id", "asset_type", "asset_code", "asset_issuer"]),
        TableId::Offers => Some(&["offer_id"]),
        TableId::AccountSigners => Some(&["account_id", "signer_key"]),
        _ => None,
    }
}

/// Windowed `LEAD()` back-fill SQL, scoped to `ledger_ranges` plus the
/// partition immediately preceding each (spec.md §4.9's `ranges` CTE: a
/// key's previous version can sit one partition behind the version this
/// flush just wrote). DuckDB and Postgres both support `UPDATE ... FROM (cte)`.
pub fn backfill_sql(table: TableId, ledger_ranges: &[u32]) -> Option<String> {
    let keys = scd2_key_columns(table)?;
    if ledger_ranges.is_empty() {
        return None;
    }
    let table_name = table.as_str();
    let partition_by = keys.iter().join(", ");
    let scan_ranges = ledger_ranges
        .iter()
        .flat_map(|&r| [r as i64, r as i64 - 1])
        .unique()
        .map(|r| r.to_string())
        .join(", ");

    Some(format!(
        "WITH ordered AS (\n\
           SELECT rowid, ledger_sequence,\n\
                  LEAD(closed_at) OVER (PARTITION BY {partition_by} ORDER BY ledger_sequence) AS next_closed_at\n\
           FROM {table_name}\n\
           WHERE ledger_range IN ({scan_ranges})\n\
         )\n\
         UPDATE {table_name}\n\
         SET valid_to = ordered.next_closed_at\n\
         FROM ordered\n\
         WHERE {table_name}.rowid = ordered.rowid\n\
           AND {table_name}.valid_to IS NULL\n\
           AND ordered.next_closed_at IS NOT NULL"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_scd2_tables_have_no_backfill() {
        assert!(backfill_sql(TableId::Ledgers, &[0]).is_none());
        assert!(backfill_sql(TableId::ContractData, &[0]).is_none());
    }

    #[test]
    fn empty_ranges_skip_backfill() {
        assert!(backfill_sql(TableId::Accounts, &[]).is_none());
    }

    #[test]
    fn accounts_backfill_partitions_by_account_id() {
        let sql = backfill_sql(TableId::Accounts, &[0, 100_000]).unwrap();
        assert!(sql.contains("PARTITION BY account_id"));
        assert!(sql.contains("LEAD(closed_at)"));
        assert!(sql.contains("WHERE ledger_range IN (0, -1, 100000, 99999)"));
    }

    #[test]
    fn scan_ranges_include_the_preceding_partition_once() {
        let sql = backfill_sql(TableId::Offers, &[100_000]).unwrap();
        assert!(sql.contains("WHERE ledger_range IN (100000, 99999)"));
    }
}
