//! Trustline snapshot extractor (spec.md §3.2, §4.3). Pool-share
//! trustlines are included with `asset_type = "liquidity_pool_shares"`.

use stellar_xdr::curr::{LedgerEntryData, LedgerKey, TrustLineAsset};

use crate::decode::{ChangeOp, DecodedLedger, LedgerChangeEntry};
use crate::extract::dedup::dedup_last_by_key;
use crate::model::asset::{account_id_to_strkey, encode_asset, encode_pool_share};
use crate::model::rows::TrustlineSnapshotRow;
use crate::model::table::ledger_range;

fn trustline_key(change: &LedgerChangeEntry) -> Option<(String, String)> {
    match &change.key {
        LedgerKey::Trustline(t) => Some((
            account_id_to_strkey(&t.account_id),
            trust_asset_key(&t.asset),
        )),
        _ => None,
    }
}

fn trust_asset_key(asset: &TrustLineAsset) -> String {
    match asset {
        TrustLineAsset::Native => "native".to_string(),
        TrustLineAsset::CreditAlphanum4(a) => format!("{:?}{}", a.asset_code.0, a.issuer),
        TrustLineAsset::CreditAlphanum12(a) => format!("{:?}{}", a.asset_code.0, a.issuer),
        TrustLineAsset::PoolShare(id) => hex::encode(id.0),
    }
}

pub fn extract_trustlines(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> Vec<TrustlineSnapshotRow> {
    let changes = ledger.all_changes();
    let deduped = dedup_last_by_key(&changes, trustline_key);
    let range = ledger_range(ledger.header.sequence, partition_width);

    deduped
        .into_iter()
        .filter_map(|change| {
            let LedgerKey::Trustline(key) = &change.key else {
                return None;
            };
            let account_id = account_id_to_strkey(&key.account_id);

            if change.op == ChangeOp::Removed {
                let encoded = trust_line_asset_encoded(&key.asset);
                return Some(TrustlineSnapshotRow {
                    account_id,
                    asset_type: encoded.asset_type.to_string(),
                    asset_code: encoded.asset_code,
                    asset_issuer: encoded.asset_issuer,
                    ledger_sequence: ledger.header.sequence,
                    balance: 0,
                    limit: 0,
                    flags: 0,
                    last_modified_ledger: ledger.header.sequence,
                    deleted: true,
                    closed_at: ledger.header.close_time,
                    valid_to: None,
                    ledger_range: range,
                });
            }

            let LedgerEntryData::Trustline(t) = &change.entry.as_ref()?.data else {
                return None;
            };
            let encoded = trust_line_asset_encoded(&t.asset);
            Some(TrustlineSnapshotRow {
                account_id,
                asset_type: encoded.asset_type.to_string(),
                asset_code: encoded.asset_code,
                asset_issuer: encoded.asset_issuer,
                ledger_sequence: ledger.header.sequence,
                balance: t.balance,
                limit: t.limit,
                flags: t.flags,
                last_modified_ledger: change.last_modified_ledger_seq,
                deleted: false,
                closed_at: ledger.header.close_time,
                valid_to: None,
                ledger_range: range,
            })
        })
        .collect()
}

struct TrustAssetEncoded {
    asset_type: &'static str,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
}

fn trust_line_asset_encoded(asset: &TrustLineAsset) -> TrustAssetEncoded {
    match asset {
        TrustLineAsset::Native => TrustAssetEncoded {
            asset_type: "native",
            asset_code: None,
            asset_issuer: None,
        },
        TrustLineAsset::CreditAlphanum4(a) => {
            let encoded = encode_asset(&stellar_xdr::curr::Asset::CreditAlphanum4(
                stellar_xdr::curr::AlphaNum4 {
                    asset_code: a.asset_code.clone(),
                    issuer: a.issuer.clone(),
                },
            ));
            TrustAssetEncoded {
                asset_type: encoded.asset_type,
                asset_code: encoded.asset_code,
                asset_issuer: encoded.asset_issuer,
            }
        }
        TrustLineAsset::CreditAlphanum12(a) => {
            let encoded = encode_asset(&stellar_xdr::curr::Asset::CreditAlphanum12(
                stellar_xdr::curr::AlphaNum12 {
                    asset_code: a.asset_code.clone(),
                    issuer: a.issuer.clone(),
                },
            ));
            TrustAssetEncoded {
                asset_type: encoded.asset_type,
                asset_code: encoded.asset_code,
                asset_issuer: encoded.asset_issuer,
            }
        }
        TrustLineAsset::PoolShare(id) => {
            let encoded = encode_pool_share(hex::encode(id.0));
            TrustAssetEncoded {
                asset_type: encoded.asset_type,
                asset_code: encoded.asset_code,
                asset_issuer: encoded.asset_issuer,
            }
        }
    }
}
