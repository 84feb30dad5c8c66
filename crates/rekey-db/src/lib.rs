//! Store layer for rekey fixtures.
//!
//! This crate holds what fixture generation and loading need from a
//! relational store, behind traits:
//!
//! - [`Value`] / [`ValueCategory`] - closed union of scalar values
//! - [`SchemaIntrospector`] - attribute names and foreign keys of an entity kind
//! - [`SourceStore`] - chunked, keyset-paginated row reads
//! - [`DestinationStore`] / [`StoreSession`] - transactional inserts returning
//!   store-assigned primary keys
//!
//! Two backends are provided: [`MemoryStore`](backends::MemoryStore) and, with
//! the `sqlite` feature (default), [`SqliteStore`](backends::SqliteStore).
//!
//! # Example
//!
//! ```ignore
//! use rekey_db::backends::SqliteStore;
//! use rekey_db::{EntityKind, SchemaIntrospector};
//!
//! let store = SqliteStore::connect("sqlite://source.db").await?;
//! let fks = store.foreign_keys_of(&EntityKind::new("lecture")).await?;
//! ```

#![warn(missing_docs)]

pub mod backends;
pub mod error;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{DbError, DbResult};
pub use schema::{ColumnInfo, EntityKind, ForeignKeyDescriptor, SchemaIntrospector};
pub use store::{DestinationStore, Row, SourceStore, StoreSession};
pub use value::{PrimaryKey, Value, ValueCategory};
