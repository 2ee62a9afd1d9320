//! Error kinds named by §7 of the ingestion design: each variant's
//! handling policy lives with its call site, not here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("config error: {0}")]
    Config(String),

    #[error("catalog attach error: {0}")]
    CatalogAttach(String),

    #[error("decode error at ledger {sequence}: {source}")]
    Decode {
        sequence: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("extract error for table {table} at ledger {sequence}: {source}")]
    Extract {
        table: &'static str,
        sequence: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("flush error: {0}")]
    Flush(#[source] anyhow::Error),

    #[error("checkpoint write error: {0}")]
    CheckpointWrite(#[source] anyhow::Error),

    #[error("source error: {0}")]
    Source(#[source] anyhow::Error),

    #[error("partition error: {0}")]
    Partition(String),
}

impl IngestError {
    /// Whether this error should abort the run loop (as opposed to being
    /// logged and skipped, per §7's per-kind policy).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::Config(_) | IngestError::CatalogAttach(_) | IngestError::Partition(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
