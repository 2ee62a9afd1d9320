//! Flush planner (C5, spec.md §4.4). Decides, after every ingested
//! ledger, whether to flush: selectively (only the tables over their own
//! threshold) or fully (every non-empty table), the latter triggered by
//! the commit-interval timeout so slow tables don't sit unflushed
//! indefinitely.

use std::time::Duration;

use crate::buffer::BufferSet;
use crate::config::StorageConfig;
use crate::model::table::{TableId, ALL_TABLES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushDecision {
    /// Nothing has crossed a threshold and the timeout hasn't elapsed.
    Wait,
    /// Flush only these tables; the rest keep buffering.
    Selective(Vec<TableId>),
    /// Flush everything currently buffered (timeout trigger).
    Full,
}

pub struct FlushPlanner {
    commit_interval: Duration,
}

impl FlushPlanner {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            commit_interval: Duration::from_secs(storage.commit_interval_seconds),
        }
    }

    pub fn decide(&self, buffers: &BufferSet) -> FlushDecision {
        if let Some(oldest) = buffers.oldest_row_at {
            if oldest.elapsed() >= self.commit_interval {
                return FlushDecision::Full;
            }
        }

        let over_threshold: Vec<TableId> = ALL_TABLES
            .into_iter()
            .filter(|&table| buffers.at_capacity_for(table))
            .collect();

        if over_threshold.is_empty() {
            FlushDecision::Wait
        } else {
            FlushDecision::Selective(over_threshold)
        }
    }
}
