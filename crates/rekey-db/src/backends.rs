//! Store backends.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::{MemorySession, MemoryStore, TableSchema};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteSession, SqliteStore};
