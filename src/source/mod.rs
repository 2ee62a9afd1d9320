//! Raw-ledger source client (C1, spec.md §4.1) and the hot/cold source
//! manager (C9, spec.md §4.7). Both sit behind the same [`LedgerSource`]
//! trait so the coordinator (C11) never has to know which tier is
//! currently active.

pub mod grpc;
pub mod manager;

use async_trait::async_trait;

pub use manager::SourceManager;

use crate::error::Result;

/// One closed ledger as it arrives off the wire: opaque XDR bytes plus
/// the sequence number that framed them (spec.md §3.1).
#[derive(Debug, Clone)]
pub struct RawLedger {
    pub sequence: u32,
    pub xdr_bytes: Vec<u8>,
}

/// A source of raw ledgers, pulled synchronously by the run loop so that
/// an in-progress flush naturally backpressures ingestion (spec.md §5).
///
/// `next_ledger` is the pull-model expression of the "lazy sequence"
/// contract in spec.md §4.1/§6: each call advances the underlying stream
/// (opening it on first use) and returns the next ledger whose sequence
/// is `> after_sequence`, or `Ok(None)` on a clean end-of-stream.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn next_ledger(&self, after_sequence: u32) -> Result<Option<RawLedger>>;

    /// Oldest sequence this source currently has available, if known.
    /// `None` when the source hasn't reported a range yet (e.g. an empty
    /// hot tier or a cold tier that has never been queried).
    async fn min_ledger(&self) -> Option<u32>;

    /// Newest sequence this source currently has available, if known.
    async fn max_ledger(&self) -> Option<u32>;

    /// Notifies the source that the checkpoint durably advanced to
    /// `last_ledger`. A no-op for plain sources; [`SourceManager`]
    /// overrides it to drive the BACKFILL -> HOT transition.
    async fn on_checkpoint_advance(&self, _last_ledger: u32) {}
}
