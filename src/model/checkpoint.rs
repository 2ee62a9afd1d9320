//! Checkpoint record shape, spec.md §6 "Checkpoint file layout".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub last_ledger: u32,
    pub last_ledger_hash: String,
    pub last_ledger_range: u32,
    pub last_update_time: DateTime<Utc>,
    pub total_ledgers: u64,
    pub total_transactions: u64,
    pub total_operations: u64,
}

impl Default for CheckpointRecord {
    fn default() -> Self {
        Self {
            last_ledger: 0,
            last_ledger_hash: String::new(),
            last_ledger_range: 0,
            last_update_time: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            total_ledgers: 0,
            total_transactions: 0,
            total_operations: 0,
        }
    }
}

impl CheckpointRecord {
    /// Advances the checkpoint after a committed flush covering ledgers up
    /// to and including `last_ledger` (spec.md §8 invariant 4).
    pub fn advance(
        &mut self,
        last_ledger: u32,
        last_ledger_hash: String,
        partition_width: u32,
        ledgers_in_flush: u64,
        transactions_in_flush: u64,
        operations_in_flush: u64,
    ) {
        self.last_ledger = last_ledger;
        self.last_ledger_hash = last_ledger_hash;
        self.last_ledger_range = crate::model::table::ledger_range(last_ledger, partition_width);
        self.last_update_time = Utc::now();
        self.total_ledgers += ledgers_in_flush;
        self.total_transactions += transactions_in_flush;
        self.total_operations += operations_in_flush;
    }
}
