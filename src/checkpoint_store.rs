//! Checkpoint store (C8, spec.md §4.8/§6). File-backed JSON, written
//! atomically (`path.tmp` then rename) so a crash mid-write can never
//! leave a torn checkpoint behind.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::model::CheckpointRecord;

pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the checkpoint, returning the zero-value record (spec.md
    /// §4.8: "seeds `start_ledger := checkpoint.last_ledger + 1`") if no
    /// checkpoint file exists yet.
    pub async fn load(&self) -> Result<CheckpointRecord> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| IngestError::CheckpointWrite(e.into())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CheckpointRecord::default()),
            Err(e) => Err(IngestError::CheckpointWrite(e.into())),
        }
    }

    /// Write is atomic: write to `path.tmp` then rename (spec.md §4.8).
    /// A [`IngestError::CheckpointWriteError`] here is a warning per §7
    /// ("never blocks ingestion") — callers should log and retry on the
    /// next flush rather than treat this as fatal.
    pub async fn save(&self, record: &CheckpointRecord) -> Result<()> {
        let tmp_path = tmp_path_for(&self.path);
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| IngestError::CheckpointWrite(e.into()))?;
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| IngestError::CheckpointWrite(e.into()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| IngestError::CheckpointWrite(e.into()))?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
        let record = store.load().await.unwrap();
        assert_eq!(record, CheckpointRecord::default());
    }

    #[tokio::test]
    async fn round_trips_through_atomic_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let store = CheckpointStore::new(&path);

        let mut record = CheckpointRecord::default();
        record.advance(100_000, "abcd".into(), 100_000, 1, 5, 20);
        store.save(&record).await.unwrap();

        assert!(!tmp_path_for(&path).exists());
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, record);
    }
}
