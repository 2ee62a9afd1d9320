//! Test-only module tree (`#[cfg(test)]` in `lib.rs`), mirroring the
//! teacher's `src/test/` convention: shared fixtures under `testutils`,
//! scenario tests alongside.

pub mod testutils;
mod scenarios;
