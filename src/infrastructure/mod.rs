pub mod acquirer;
pub mod event_log;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
