pub mod asset;
pub mod checkpoint;
pub mod rows;
pub mod sql_value;
pub mod table;

pub use checkpoint::CheckpointRecord;
pub use table::{ledger_range, TableId, WritePolicy, ALL_TABLES};
