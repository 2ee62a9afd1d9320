//! Asset encoding, spec.md §4.3: `Native -> ("native", NULL, NULL)`,
//! `AlphaNum4/12 -> (type, code_trimmed_of_NULs, issuer_address)`,
//! `PoolShare -> ("liquidity_pool_shares", pool_id_hex, NULL)`.

use stellar_xdr::curr::{Asset, PublicKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAsset {
    pub asset_type: &'static str,
    pub asset_code: Option<String>,
    pub asset_issuer: Option<String>,
}

pub fn encode_asset(asset: &Asset) -> EncodedAsset {
    match asset {
        Asset::Native => EncodedAsset {
            asset_type: "native",
            asset_code: None,
            asset_issuer: None,
        },
        Asset::CreditAlphanum4(a) => EncodedAsset {
            asset_type: "credit_alphanum4",
            asset_code: Some(trim_code(&a.asset_code.0)),
            asset_issuer: Some(account_id_to_strkey(&a.issuer)),
        },
        Asset::CreditAlphanum12(a) => EncodedAsset {
            asset_type: "credit_alphanum12",
            asset_code: Some(trim_code(&a.asset_code.0)),
            asset_issuer: Some(account_id_to_strkey(&a.issuer)),
        },
    }
}

/// Pool-share assets are not `Asset` variants in XDR (they appear as a
/// distinct `ChangeTrustAsset`/trustline discriminant); callers holding a
/// pool id reach for this directly.
pub fn encode_pool_share(pool_id_hex: String) -> EncodedAsset {
    EncodedAsset {
        asset_type: "liquidity_pool_shares",
        asset_code: Some(pool_id_hex),
        asset_issuer: None,
    }
}

fn trim_code(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

pub fn account_id_to_strkey(account: &stellar_xdr::curr::AccountId) -> String {
    let PublicKey::PublicKeyTypeEd25519(ref uint256) = account.0;
    stellar_strkey::ed25519::PublicKey(uint256.0).to_string()
}

/// Sponsor address carried in `LedgerEntry.ext`, shared by every
/// sponsorable entry type (spec.md §4.3 current-state extractors).
pub fn entry_sponsor(entry: &stellar_xdr::curr::LedgerEntry) -> Option<String> {
    match &entry.ext {
        stellar_xdr::curr::LedgerEntryExt::V0 => None,
        stellar_xdr::curr::LedgerEntryExt::V1(ext) => ext.sponsoring_id.as_ref().map(account_id_to_strkey),
    }
}
