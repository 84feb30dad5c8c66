//! Store layer module.
//!
//! Values, schema introspection and store backends.
//!
//! # Examples
//!
//! ```rust,ignore
//! use rekey::db::backends::MemoryStore;
//! use rekey::db::{EntityKind, SchemaIntrospector};
//! ```

pub use rekey_db::*;
