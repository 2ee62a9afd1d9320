//! Shared fixtures for scenario tests: an in-memory [`LedgerSource`] fed
//! from a fixed `Vec<RawLedger>`, standing in for a live gRPC tier so the
//! pull-model contract (spec.md §4.1) and the hot/cold state machine
//! (§4.7) can be exercised without a network endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::source::{LedgerSource, RawLedger};

/// Replays a fixed sequence of ledgers. `next_ledger` returns the first
/// entry whose sequence is greater than `after_sequence`, or `Ok(None)`
/// once the fixture is exhausted — matching the real source's
/// end-of-stream contract.
pub struct MockLedgerSource {
    ledgers: Vec<RawLedger>,
    calls: AtomicUsize,
    /// Sequences in this set are skipped, simulating a hot-tier gap
    /// (spec.md §4.7 scenario S7).
    missing: Mutex<Vec<u32>>,
}

impl MockLedgerSource {
    pub fn new(sequences: impl IntoIterator<Item = u32>) -> Self {
        let ledgers = sequences
            .into_iter()
            .map(|sequence| RawLedger {
                sequence,
                xdr_bytes: sequence.to_le_bytes().to_vec(),
            })
            .collect();
        Self {
            ledgers,
            calls: AtomicUsize::new(0),
            missing: Mutex::new(Vec::new()),
        }
    }

    /// Makes this source behave as if `sequences` were never closed on
    /// it, so callers past them see a gap.
    pub fn with_gap(self, sequences: impl IntoIterator<Item = u32>) -> Self {
        self.missing.lock().unwrap().extend(sequences);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerSource for MockLedgerSource {
    async fn next_ledger(&self, after_sequence: u32) -> Result<Option<RawLedger>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let missing = self.missing.lock().unwrap();
        Ok(self
            .ledgers
            .iter()
            .find(|raw| raw.sequence > after_sequence && !missing.contains(&raw.sequence))
            .cloned())
    }

    async fn min_ledger(&self) -> Option<u32> {
        self.ledgers.iter().map(|r| r.sequence).min()
    }

    async fn max_ledger(&self) -> Option<u32> {
        self.ledgers.iter().map(|r| r.sequence).max()
    }
}
