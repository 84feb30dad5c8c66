//! Fixture generation and identity-remapping loads for rekey.
//!
//! This crate snapshots rows of a relational store into portable fixtures and
//! replays them into another store, where primary keys are assigned afresh:
//!
//! - **Generation**: capture every row of an entity kind, in bounded chunks,
//!   as one fixture record per row
//! - **Loading**: insert records in order inside one transaction, rewriting
//!   every foreign key through an identity map of original key to new key
//! - **Commands**: `dumpdata` and `loaddata` for files on disk
//!
//! # Features
//!
//! - `json` - JSON fixture format support (enabled by default)
//! - `yaml` - YAML fixture format support
//! - `sqlite` - SQLite store backend (enabled by default)
//! - `full` - All features enabled
//!
//! # Quick Start
//!
//! ## Generating Fixtures
//!
//! ```ignore
//! use rekey_seeding::prelude::*;
//!
//! let mut writer = FixtureWriter::new(&source);
//! writer.generate(&EntityKind::new("course")).await?;
//! writer.generate(&EntityKind::new("lecture")).await?;
//! writer.save_to(Path::new("fixtures/school.json"), FixtureFormat::Json)?;
//! ```
//!
//! A fixture file (`fixtures/school.json`) looks like:
//!
//! ```json
//! {
//!   "version": 1,
//!   "primary_key": "id",
//!   "kinds": [
//!     { "name": "course", "attributes": ["title"] },
//!     { "name": "lecture", "attributes": ["course_id"],
//!       "foreign_keys": [{ "attribute": "course_id", "target": "course" }] }
//!   ],
//!   "records": [
//!     { "model": "course", "pk": 42, "fields": { "title": "Rust" } },
//!     { "model": "lecture", "pk": 7, "fields": { "course_id": 42 } }
//!   ]
//! }
//! ```
//!
//! ## Loading Fixtures
//!
//! ```ignore
//! use rekey_seeding::prelude::*;
//!
//! let document = FixtureParser::new().parse_file(Path::new("fixtures/school.json"))?;
//! let mut identity_map = IdentityMap::new();
//! let result = FixtureLoader::new(&destination)
//!     .load_document(&document, &mut identity_map)
//!     .await?;
//! println!("Loaded {} records", result.records_loaded);
//! ```
//!
//! The lecture lands with `course_id` set to whatever key the destination
//! gave the course, not `42`.
//!
//! ## Using CLI Commands
//!
//! ```ignore
//! use rekey_seeding::commands::{LoadDataCommand, LoadDataArgs, LoadDataOptions};
//!
//! let cmd = LoadDataCommand::new();
//! let args = LoadDataArgs {
//!     fixture_paths: vec!["fixtures/school.json".into()],
//! };
//! let options = LoadDataOptions::new()
//!     .with_identity_map("fixtures/identities.json")
//!     .with_verbosity(1);
//! let result = cmd.execute(&destination, args, options).await?;
//! ```
//!
//! # Architecture
//!
//! ## Fixture System
//!
//! - [`FixtureWriter`](fixtures::FixtureWriter) - Capture entity kinds from a source store
//! - [`FixtureRecord`](fixtures::FixtureRecord) - Single record with kind, original pk and fields
//! - [`FixtureDocument`](fixtures::FixtureDocument) - Ordered records plus per-kind manifests
//! - [`FixtureParser`](fixtures::FixtureParser) - Parse fixture files
//! - [`FixtureSerializer`](fixtures::FixtureSerializer) - Write fixture files
//! - [`FixtureLoader`](fixtures::FixtureLoader) - Load records, rewriting foreign keys
//! - [`IdentityMap`](fixtures::IdentityMap) - Original key to new key, per kind
//! - [`ValueSerializerRegistry`](fixtures::ValueSerializerRegistry) - Value category to literal codec
//!
//! ## Commands
//!
//! - [`DumpDataCommand`](commands::DumpDataCommand) - Export fixtures
//! - [`LoadDataCommand`](commands::LoadDataCommand) - Load fixtures

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod commands;
pub mod error;
pub mod fixtures;
pub mod prelude;
pub mod settings;

// Re-export commonly used types at crate root
pub use error::{SeedingError, SeedingResult};
pub use fixtures::{
	FixtureDocument, FixtureFormat, FixtureLoader, FixtureParser, FixtureRecord, FixtureWriter,
	IdentityMap, load_fixtures,
};
pub use settings::Settings;
