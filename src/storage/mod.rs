//! Storage: physical schema (C7 supporting), catalog/partition
//! bootstrapper (C7), transaction executor (C6), parameter-count
//! chunking, row<->column mapping, and the incremental SCD-2 back-fill
//! (C10).

pub mod catalog;
pub mod param_chunk;
pub mod rows_sql;
pub mod scd2;
pub mod schema;
pub mod writer;

pub use catalog::Catalog;
pub use writer::{FlushStats, Writer};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::StorageConfig;
use crate::error::{IngestError, Result};

/// Connects the optional Postgres mirror sink named in `storage.postgres_dsn`
/// (spec.md §1: "and/or a relational row-store"). `None` when unconfigured,
/// in which case the lake catalog (C7) is the only sink.
pub async fn connect_postgres(storage: &StorageConfig) -> Result<Option<PgPool>> {
    match &storage.postgres_dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(dsn)
                .await
                .map_err(|e| IngestError::CatalogAttach(format!("connecting to postgres: {e}")))?;
            Ok(Some(pool))
        }
        None => Ok(None),
    }
}
