//! Account snapshot + account-signer snapshot extractors (spec.md §3.2,
//! §4.3). Both read the same `LedgerKey::Account` change stream; signers
//! are nested inside `AccountEntry.signers`.

use stellar_xdr::curr::{LedgerEntryData, LedgerKey, SignerKey};

use crate::decode::{ChangeOp, DecodedLedger};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::asset::account_id_to_strkey;
use crate::model::rows::{AccountSignerSnapshotRow, AccountSnapshotRow};
use crate::model::table::ledger_range;

fn account_key(change: &crate::decode::LedgerChangeEntry) -> Option<String> {
    match &change.key {
        LedgerKey::Account(a) => Some(account_id_to_strkey(&a.account_id)),
        _ => None,
    }
}

pub fn extract_accounts(ledger: &DecodedLedger, partition_width: u32) -> Vec<AccountSnapshotRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, account_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            let account_id = account_key(change)?;
            if change.op == ChangeOp::Removed {
                return Some(AccountSnapshotRow {
                    account_id,
                    ledger_sequence: ledger.header.sequence,
                    balance: 0,
                    sequence_number: 0,
                    num_subentries: 0,
                    inflation_dest: None,
                    home_domain: None,
                    master_weight: 0,
                    threshold_low: 0,
                    threshold_medium: 0,
                    threshold_high: 0,
                    flags: 0,
                    last_modified_ledger: ledger.header.sequence,
                    deleted: true,
                    closed_at: ledger.header.close_time,
                    valid_to: None,
                    ledger_range: range,
                });
            }
            let LedgerEntryData::Account(a) = &change.entry.as_ref()?.data else {
                return None;
            };
            Some(AccountSnapshotRow {
                account_id,
                ledger_sequence: ledger.header.sequence,
                balance: a.balance,
                sequence_number: a.seq_num.0,
                num_subentries: a.num_sub_entries,
                inflation_dest: a.inflation_dest.as_ref().map(account_id_to_strkey),
                home_domain: if a.home_domain.0.is_empty() {
                    None
                } else {
                    Some(a.home_domain.to_string())
                },
                master_weight: a.thresholds.0[0] as i32,
                threshold_low: a.thresholds.0[1] as i32,
                threshold_medium: a.thresholds.0[2] as i32,
                threshold_high: a.thresholds.0[3] as i32,
                flags: a.flags,
                last_modified_ledger: change.last_modified_ledger_seq,
                deleted: false,
                closed_at: ledger.header.close_time,
                valid_to: None,
                ledger_range: range,
            })
        })
        .collect()
}

pub fn extract_account_signers(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> Vec<AccountSignerSnapshotRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, account_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    let mut out = Vec::new();
    for change in deduped {
        if change.op == ChangeOp::Removed {
            continue;
        }
        let Some(account_id) = account_key(change) else {
            continue;
        };
        let Some(entry) = change.entry.as_ref() else {
            continue;
        };
        let LedgerEntryData::Account(a) = &entry.data else {
            continue;
        };
        for signer in a.signers.iter() {
            out.push(AccountSignerSnapshotRow {
                account_id: account_id.clone(),
                signer_key: signer_key_to_string(&signer.key),
                ledger_sequence: ledger.header.sequence,
                weight: signer.weight as i32,
                last_modified_ledger: change.last_modified_ledger_seq,
                deleted: false,
                closed_at: ledger.header.close_time,
                valid_to: None,
                ledger_range: range,
            });
        }
    }
    out
}

fn signer_key_to_string(key: &SignerKey) -> String {
    match key {
        SignerKey::Ed25519(uint) => stellar_strkey::ed25519::PublicKey(uint.0).to_string(),
        SignerKey::PreAuthTx(hash) => stellar_strkey::PreAuthTx(hash.0).to_string(),
        SignerKey::HashX(hash) => stellar_strkey::HashX(hash.0).to_string(),
        SignerKey::Ed25519SignedPayload(payload) => {
            hex::encode(payload.ed25519.0).to_string() + &hex::encode(&payload.payload)
        }
    }
}
