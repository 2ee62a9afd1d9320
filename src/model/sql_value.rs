//! ScVal -> storage-boundary value conversion. Grounded on the teacher's
//! `conversion.rs` (`FromScVal`/`TypeKind`), adapted from the VM-host's
//! re-exported XDR to the plain `stellar-xdr` crate and extended with a
//! JSON "decoded form" companion (spec.md §4.3 "XDR fields" rule).

use base64::Engine;
use num_bigint::BigInt;
use num_traits::FromPrimitive;
use stellar_xdr::curr::{
    Int128Parts, Int256Parts, Limits, PublicKey, ScAddress, ScVal, UInt128Parts, UInt256Parts,
    WriteXdr,
};

#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    /// Decimal-string encoded integer (stroops, or a big Soroban numeric).
    Numeric(String),
    Text(String),
    Bytes(Vec<u8>),
    Json(String),
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

macro_rules! impl_sqlvalue_numeric {
    ($($t:ty),+) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                SqlValue::Numeric(v.to_string())
            }
        })+
    };
}
impl_sqlvalue_numeric!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

pub fn i256_to_bigint(parts: &Int256Parts) -> BigInt {
    let hi = (BigInt::from_i64(parts.hi_hi).unwrap() << 64) | BigInt::from_u64(parts.hi_lo).unwrap();
    let lo = (BigInt::from_u64(parts.lo_hi).unwrap() << 64) | BigInt::from_u64(parts.lo_lo).unwrap();
    (hi << 128) | lo
}

pub fn u256_to_bigint(parts: &UInt256Parts) -> BigInt {
    let hi = (BigInt::from_u64(parts.hi_hi).unwrap() << 64) | BigInt::from_u64(parts.hi_lo).unwrap();
    let lo = (BigInt::from_u64(parts.lo_hi).unwrap() << 64) | BigInt::from_u64(parts.lo_lo).unwrap();
    (hi << 128) | lo
}

pub fn i128_to_bigint(parts: &Int128Parts) -> BigInt {
    (BigInt::from_i64(parts.hi).unwrap() << 64) | BigInt::from_u64(parts.lo).unwrap()
}

pub fn u128_to_bigint(parts: &UInt128Parts) -> BigInt {
    (BigInt::from_u64(parts.hi).unwrap() << 64) | BigInt::from_u64(parts.lo).unwrap()
}

/// Converts a single ScVal leaf to the small value set used at the
/// storage boundary. Containers (`Vec`/`Map`) are rendered as their JSON
/// form rather than recursed into a relational shape (spec.md §4.3:
/// "a decoded JSON form may accompany" the base64 XDR).
pub fn scval_to_sql(value: &ScVal) -> SqlValue {
    match value {
        ScVal::Bool(b) => SqlValue::Bool(*b),
        ScVal::Void => SqlValue::Null,
        ScVal::U32(n) => SqlValue::Numeric(n.to_string()),
        ScVal::I32(n) => SqlValue::Numeric(n.to_string()),
        ScVal::U64(n) => SqlValue::Numeric(n.to_string()),
        ScVal::I64(n) => SqlValue::Numeric(n.to_string()),
        ScVal::Timepoint(t) => SqlValue::Numeric(t.0.to_string()),
        ScVal::Duration(d) => SqlValue::Numeric(d.0.to_string()),
        ScVal::U128(parts) => SqlValue::Numeric(u128_to_bigint(parts).to_string()),
        ScVal::I128(parts) => SqlValue::Numeric(i128_to_bigint(parts).to_string()),
        ScVal::U256(parts) => SqlValue::Numeric(u256_to_bigint(parts).to_string()),
        ScVal::I256(parts) => SqlValue::Numeric(i256_to_bigint(parts).to_string()),
        ScVal::Bytes(b) => SqlValue::Bytes(b.to_vec()),
        ScVal::String(s) => SqlValue::Text(s.to_string()),
        ScVal::Symbol(s) => SqlValue::Text(s.to_string()),
        ScVal::Address(addr) => SqlValue::Text(sc_address_to_strkey(addr)),
        ScVal::Vec(v) => SqlValue::Json(
            serde_json::to_string(&scval_xdr_base64(value))
                .unwrap_or_default()
                .into(),
        ),
        ScVal::Map(_) => SqlValue::Json(scval_xdr_base64(value)),
        ScVal::Error(e) => SqlValue::Text(format!("{e:?}")),
        _ => SqlValue::Json(scval_xdr_base64(value)),
    }
}

pub fn sc_address_to_strkey(addr: &ScAddress) -> String {
    match addr {
        ScAddress::Account(id) => {
            let PublicKey::PublicKeyTypeEd25519(ref uint) = id.0;
            stellar_strkey::ed25519::PublicKey(uint.0).to_string()
        }
        ScAddress::Contract(hash) => stellar_strkey::Contract(hash.0).to_string(),
        #[allow(unreachable_patterns)]
        _ => format!("{addr:?}"),
    }
}

/// Round-trip-faithful base64 XDR for a value, used for the "decoded JSON
/// form" pairing described in spec.md §4.3.
pub fn scval_xdr_base64(value: &ScVal) -> String {
    value
        .to_xdr(Limits::none())
        .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
        .unwrap_or_default()
}

/// Best-effort human-readable JSON companion to the base64 XDR form. Not
/// a faithful schema-aware encoding, just enough to grep/inspect values
/// without decoding XDR by hand.
pub fn scval_decoded_json(value: &ScVal) -> String {
    match scval_to_sql(value) {
        SqlValue::Null => serde_json::Value::Null.to_string(),
        SqlValue::Bool(b) => serde_json::Value::Bool(b).to_string(),
        SqlValue::Numeric(n) => serde_json::Value::String(n).to_string(),
        SqlValue::Text(t) => serde_json::Value::String(t).to_string(),
        SqlValue::Bytes(b) => serde_json::Value::String(hex::encode(b)).to_string(),
        SqlValue::Json(j) => j,
    }
}
