//! Catalog and partition bootstrapper (C7, spec.md §4.6). Opens the
//! DuckDB process, loads the table-format catalog extension, attaches
//! the lake catalog (retrying with an explicit `TYPE` when the first
//! plain `ATTACH` can't infer one), and creates every physical table and
//! its range partitioning if they don't already exist. Never drops or
//! alters an existing table's data, only adds what's missing, so the
//! bootstrapper is safe to run on every process start.

use duckdb::Connection;

use crate::config::{ObjectStoreConfig, StorageConfig};
use crate::error::{IngestError, Result};
use crate::storage::schema::{
    unique_key_columns, ColType, TableDef, ALL_PHYSICAL_TABLES, META_QUALITY,
};

pub struct Catalog {
    pub conn: Connection,
    pub catalog_name: String,
    pub schema_name: String,
}

impl Catalog {
    /// Opens an in-process DuckDB connection, attaches `storage.catalog_uri`
    /// under `storage.catalog_name`, and creates every physical table this
    /// crate writes to. `quality_enabled` additionally provisions the
    /// `_meta_quality` table (spec.md §9).
    pub fn bootstrap(storage: &StorageConfig, quality_enabled: bool) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| IngestError::CatalogAttach(format!("opening duckdb: {e}")))?;

        install_and_load(&conn, "ducklake")?;
        if needs_object_store(storage) {
            install_and_load(&conn, "httpfs")?;
            register_object_store_secret(&conn, &storage.object_store)?;
        }

        attach_catalog(&conn, storage)?;

        conn.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {catalog}.{schema};",
            catalog = storage.catalog_name,
            schema = storage.schema_name,
        ))
        .map_err(|e| IngestError::CatalogAttach(format!("creating schema: {e}")))?;
        conn.execute_batch(&format!("USE {}.{};", storage.catalog_name, storage.schema_name))
            .map_err(|e| IngestError::CatalogAttach(format!("switching schema: {e}")))?;

        let catalog = Self {
            conn,
            catalog_name: storage.catalog_name.clone(),
            schema_name: storage.schema_name.clone(),
        };

        for def in ALL_PHYSICAL_TABLES {
            catalog.create_table(def, storage.partition_width)?;
        }
        if quality_enabled {
            catalog.create_table(&META_QUALITY, storage.partition_width)?;
        }

        Ok(catalog)
    }

    fn create_table(&self, def: &TableDef, partition_width: u32) -> Result<()> {
        let mut columns_sql = def
            .columns
            .iter()
            .map(|col| format!("{} {}", col.name, col_type_sql(col.ty)))
            .collect::<Vec<_>>();
        if let Some(key) = unique_key_columns(def.name) {
            columns_sql.push(format!("UNIQUE ({})", key.join(", ")));
        }

        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {name} ({columns});",
                name = def.name,
                columns = columns_sql.join(", "),
            ))
            .map_err(|e| IngestError::CatalogAttach(format!("creating table {}: {e}", def.name)))?;

        if let Some(partition_column) = def.partition_column {
            // Idempotent: re-issuing SET PARTITIONED BY with the same spec
            // is a no-op on a table that already carries it.
            let result = self.conn.execute_batch(&format!(
                "ALTER TABLE {name} SET PARTITIONED BY (identity({partition_column} / {partition_width}));",
                name = def.name,
            ));
            if let Err(e) = result {
                let msg = e.to_string();
                if !msg.contains("already") {
                    return Err(IngestError::CatalogAttach(format!(
                        "partitioning table {}: {e}",
                        def.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn col_type_sql(ty: ColType) -> &'static str {
    match ty {
        ColType::BigInt => "BIGINT",
        ColType::Text => "VARCHAR",
        ColType::Bool => "BOOLEAN",
    }
}

fn install_and_load(conn: &Connection, extension: &str) -> Result<()> {
    conn.execute_batch(&format!("INSTALL {extension}; LOAD {extension};"))
        .map_err(|e| IngestError::CatalogAttach(format!("loading extension {extension}: {e}")))
}

fn needs_object_store(storage: &StorageConfig) -> bool {
    storage.catalog_uri.starts_with("s3://")
        || storage.data_path.starts_with("s3://")
        || storage.object_store.key_id.is_some()
}

fn register_object_store_secret(conn: &Connection, object_store: &ObjectStoreConfig) -> Result<()> {
    let mut fields = vec!["TYPE S3".to_string()];
    if let Some(key_id) = &object_store.key_id {
        fields.push(format!("KEY_ID '{key_id}'"));
    }
    if let Some(secret) = &object_store.secret {
        fields.push(format!("SECRET '{secret}'"));
    }
    if let Some(region) = &object_store.region {
        fields.push(format!("REGION '{region}'"));
    }
    if let Some(endpoint) = &object_store.endpoint {
        fields.push(format!("ENDPOINT '{endpoint}'"));
    }
    if let Some(url_style) = &object_store.url_style {
        fields.push(format!("URL_STYLE '{url_style}'"));
    }
    conn.execute_batch(&format!(
        "CREATE OR REPLACE SECRET ingest_object_store ({});",
        fields.join(", ")
    ))
    .map_err(|e| IngestError::CatalogAttach(format!("registering object store secret: {e}")))
}

/// Attaches `storage.catalog_uri` under `storage.catalog_name`. DuckDB can
/// infer `TYPE` from the URI scheme in most setups; when it can't, the
/// first attempt fails with a "does not exist" style error naming the
/// missing catalog type, and we retry with it set explicitly to
/// `ducklake` (spec.md §4.6).
fn attach_catalog(conn: &Connection, storage: &StorageConfig) -> Result<()> {
    let plain = format!(
        "ATTACH '{uri}' AS {name};",
        uri = storage.catalog_uri,
        name = storage.catalog_name,
    );
    if let Err(e) = conn.execute_batch(&plain) {
        let msg = e.to_string();
        if msg.contains("does not exist") || msg.contains("Unknown catalog type") {
            tracing::warn!(%msg, "plain ATTACH failed, retrying with TYPE ducklake");
            conn.execute_batch(&format!(
                "ATTACH '{uri}' AS {name} (TYPE ducklake, DATA_PATH '{data_path}');",
                uri = storage.catalog_uri,
                name = storage.catalog_name,
                data_path = storage.data_path,
            ))
            .map_err(|e| IngestError::CatalogAttach(format!("attaching catalog: {e}")))?;
        } else {
            return Err(IngestError::CatalogAttach(format!("attaching catalog: {e}")));
        }
    }
    Ok(())
}
