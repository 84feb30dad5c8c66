//! Fixture generation, formats and loading.
//!
//! - [`FixtureWriter`] captures rows from a source store
//! - [`FixtureDocument`] is the artifact, read by [`FixtureParser`] and written
//!   by [`FixtureSerializer`]
//! - [`FixtureLoader`] replays a sequence into a destination store, rewriting
//!   foreign keys through an [`IdentityMap`]

mod enumerator;
mod format;
mod graph;
mod identity;
mod loader;
mod parser;
mod serializer;
mod values;
mod writer;

pub use enumerator::{DEFAULT_CHUNK_SIZE, EntityEnumerator};
pub use format::{
	DEFAULT_PRIMARY_KEY, FORMAT_VERSION, FixtureDocument, FixtureFormat, FixtureRecord,
	KindManifest,
};
pub use graph::DependencyGraph;
pub use identity::{IdentityKey, IdentityMap};
pub use loader::{
	DEFAULT_FLUSH_EVERY, FixtureLoader, LoadOptions, LoadResult, LoadState, load_fixtures,
};
pub use parser::FixtureParser;
pub use serializer::FixtureSerializer;
pub use values::{
	Base64BytesSerializer, DateSerializer, DateTimeSerializer, DecimalSerializer,
	DurationSerializer, FloatSerializer, IntegerSerializer, Literal, NullSerializer,
	TextSerializer, ValueSerializer, ValueSerializerRegistry,
};
pub use writer::FixtureWriter;
