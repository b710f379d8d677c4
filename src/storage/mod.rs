pub mod kv_store;
pub mod progress_store;

pub use kv_store::{FileStore, KeyValueStore, MemoryStore};
pub use progress_store::{ProgressStore, StorageInfo};
