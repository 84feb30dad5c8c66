//! # Rekey
//!
//! Relational fixtures that survive a change of primary keys.
//!
//! Rekey snapshots the rows of a relational store into portable fixtures and
//! loads them into another store. The destination assigns fresh primary keys;
//! every foreign key in the loaded rows is rewritten to point at the new keys,
//! through an identity map from (kind, original key) to new key.
//!
//! ## Feature Flags
//!
//! - `sqlite` (default) - SQLite store backend
//! - `yaml` - YAML fixture format
//! - `full` - All features enabled
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use rekey::prelude::*;
//! use rekey::db::backends::SqliteStore;
//!
//! let source = SqliteStore::connect("sqlite://production.db").await?;
//! let mut writer = FixtureWriter::new(&source);
//! writer
//!     .generate_all(&[EntityKind::new("course"), EntityKind::new("lecture")])
//!     .await?;
//!
//! let destination = SqliteStore::connect("sqlite://staging.db").await?;
//! let identity_map = load_fixtures(&destination, writer.records(), "id", None).await?;
//! ```

pub mod db;
pub mod seeding;

/// Convenience re-exports for common usage.
pub mod prelude {
	pub use rekey_seeding::prelude::*;
}

pub use rekey_db::{DbError, EntityKind, PrimaryKey, Value};
pub use rekey_seeding::{
	FixtureDocument, FixtureFormat, FixtureLoader, FixtureParser, FixtureRecord, FixtureWriter,
	IdentityMap, SeedingError, SeedingResult, Settings, load_fixtures,
};
