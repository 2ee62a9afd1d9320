//! Network config-setting current-state extractor (spec.md §3.2, §4.3).
//! These entries never disappear once created, so no `deleted` column.

use stellar_xdr::curr::{LedgerEntryData, LedgerKey};

use crate::decode::{ChangeOp, DecodedLedger, LedgerChangeEntry};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::rows::ConfigSettingCurrentRow;
use crate::model::table::ledger_range;

fn setting_key(change: &LedgerChangeEntry) -> Option<String> {
    match &change.key {
        LedgerKey::ConfigSetting(c) => Some(format!("{:?}", c.config_setting_id)),
        _ => None,
    }
}

pub fn extract_config_settings(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> Vec<ConfigSettingCurrentRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, setting_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            if change.op == ChangeOp::Removed {
                return None;
            }
            let config_setting_id = setting_key(change)?;
            let LedgerEntryData::ConfigSetting(c) = &change.entry.as_ref()?.data else {
                return None;
            };
            Some(ConfigSettingCurrentRow {
                config_setting_id,
                ledger_sequence: ledger.header.sequence,
                value_json: serde_json::json!({ "debug": format!("{c:?}") }).to_string(),
                closed_at: ledger.header.close_time,
                ledger_range: range,
            })
        })
        .collect()
}
