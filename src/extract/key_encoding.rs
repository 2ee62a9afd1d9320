//! Shared `LedgerKey` -> (type name, base64 XDR) encoding for the
//! evicted/restored key tables (spec.md §3.2, §4.3).

use base64::Engine;
use stellar_xdr::curr::{LedgerKey, Limits, WriteXdr};

pub fn key_type_name(key: &LedgerKey) -> &'static str {
    match key {
        LedgerKey::Account(_) => "account",
        LedgerKey::Trustline(_) => "trustline",
        LedgerKey::Offer(_) => "offer",
        LedgerKey::Data(_) => "data",
        LedgerKey::ClaimableBalance(_) => "claimable_balance",
        LedgerKey::LiquidityPool(_) => "liquidity_pool",
        LedgerKey::ContractData(_) => "contract_data",
        LedgerKey::ContractCode(_) => "contract_code",
        LedgerKey::ConfigSetting(_) => "config_setting",
        LedgerKey::Ttl(_) => "ttl",
    }
}

pub fn key_xdr_base64(key: &LedgerKey) -> String {
    key.to_xdr(Limits::none())
        .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
        .unwrap_or_default()
}
