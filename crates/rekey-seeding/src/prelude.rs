//! Convenience re-exports for common usage.
//!
//! This module provides a single import for the most commonly used items
//! from the rekey-seeding crate.
//!
//! # Example
//!
//! ```ignore
//! use rekey_seeding::prelude::*;
//!
//! // Now you have access to:
//! // - Fixture writer, loader and formats
//! // - Command types
//! // - Settings
//! // - Error types
//! ```

// Error types
pub use crate::error::{SeedingError, SeedingResult};

// Fixture types
pub use crate::fixtures::{
	DependencyGraph, FixtureDocument, FixtureFormat, FixtureLoader, FixtureParser, FixtureRecord,
	FixtureSerializer, FixtureWriter, IdentityKey, IdentityMap, Literal, LoadOptions, LoadResult,
	ValueSerializer, ValueSerializerRegistry,
};

// Fixture functions
pub use crate::fixtures::load_fixtures;

// Command types
pub use crate::commands::{
	DumpDataArgs, DumpDataCommand, DumpDataOptions, DumpResult, LoadDataArgs, LoadDataCommand,
	LoadDataOptions,
};

// Settings
pub use crate::settings::Settings;

// Store types
pub use rekey_db::{
	DestinationStore, EntityKind, PrimaryKey, Row, SourceStore, Value, ValueCategory,
};
