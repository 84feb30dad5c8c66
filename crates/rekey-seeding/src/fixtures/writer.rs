//! Fixture generation from a source store.

use std::path::Path;
use std::pin::pin;

use futures::TryStreamExt;
use rekey_db::{EntityKind, ForeignKeyDescriptor, SourceStore, Value};

use super::enumerator::{DEFAULT_CHUNK_SIZE, EntityEnumerator};
use super::format::DEFAULT_PRIMARY_KEY;
use super::graph::DependencyGraph;
use super::{
	FixtureDocument, FixtureFormat, FixtureRecord, FixtureSerializer, KindManifest,
	ValueSerializerRegistry,
};
use crate::error::{SeedingError, SeedingResult};

/// Captures the rows of a source store as an ordered fixture sequence.
///
/// Each [`generate`](Self::generate) call appends the records of one entity
/// kind, in call order. Callers must generate referenced kinds before the
/// kinds that reference them, or use [`generate_all`](Self::generate_all).
///
/// # Example
///
/// ```ignore
/// let mut writer = FixtureWriter::new(&store);
/// writer.generate(&EntityKind::new("course")).await?;
/// writer.generate_excluding(&EntityKind::new("user"), &["id", "password"]).await?;
/// writer.save_to(Path::new("fixtures/generated.json"), FixtureFormat::Json)?;
/// ```
pub struct FixtureWriter<'a, S: SourceStore + ?Sized> {
	store: &'a S,
	primary_key: String,
	chunk_size: usize,
	registry: ValueSerializerRegistry,
	document: FixtureDocument,
}

impl<'a, S: SourceStore + ?Sized> FixtureWriter<'a, S> {
	/// Creates a writer using the `id` primary key and the default registry.
	pub fn new(store: &'a S) -> Self {
		Self {
			store,
			primary_key: DEFAULT_PRIMARY_KEY.to_string(),
			chunk_size: DEFAULT_CHUNK_SIZE,
			registry: ValueSerializerRegistry::new(),
			document: FixtureDocument::new(DEFAULT_PRIMARY_KEY),
		}
	}

	/// Sets the primary-key attribute name shared by every kind.
	///
	/// Must be called before the first `generate`.
	pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
		self.primary_key = primary_key.into();
		self.document.primary_key = self.primary_key.clone();
		self
	}

	/// Sets the number of rows fetched per round trip.
	pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
		self.chunk_size = chunk_size;
		self
	}

	/// Replaces the value serializer registry.
	pub fn with_registry(mut self, registry: ValueSerializerRegistry) -> Self {
		self.registry = registry;
		self
	}

	/// Returns the primary-key attribute name.
	pub fn primary_key(&self) -> &str {
		&self.primary_key
	}

	/// Generates fixtures for every row of `kind`, leaving out the primary key.
	///
	/// Returns the number of records appended.
	pub async fn generate(&mut self, kind: &EntityKind) -> SeedingResult<usize> {
		let primary_key = self.primary_key.clone();
		self.generate_excluding(kind, &[primary_key.as_str()]).await
	}

	/// Generates fixtures for every row of `kind`, leaving out `exclude`.
	///
	/// `exclude` replaces the default exclusion set; list the primary key in it
	/// to keep it out of the fields.
	///
	/// # Errors
	///
	/// - [`SeedingError::ConfigurationError`] when `kind` was already
	///   generated by this writer, no attribute is left to capture, or a row
	///   has no usable primary key
	/// - [`SeedingError::SerializationError`] when a value has no serializer
	///
	/// On error nothing of `kind` is appended; earlier kinds are kept.
	pub async fn generate_excluding(
		&mut self,
		kind: &EntityKind,
		exclude: &[&str],
	) -> SeedingResult<usize> {
		if self.document.manifest(kind).is_some() {
			return Err(SeedingError::ConfigurationError(format!(
				"{} was already generated by this writer",
				kind
			)));
		}
		let store = self.store;
		let attributes = store.attribute_names(kind, exclude).await?;
		if attributes.is_empty() {
			return Err(SeedingError::ConfigurationError(format!(
				"{} has no attributes left to capture after excluding {:?}",
				kind, exclude
			)));
		}
		let foreign_keys: Vec<ForeignKeyDescriptor> = store
			.foreign_keys_of(kind)
			.await?
			.into_iter()
			.filter(|fk| attributes.contains(&fk.attribute))
			.collect();

		let enumerator = EntityEnumerator::new(store, kind.clone(), self.primary_key.as_str())
			.with_chunk_size(self.chunk_size);
		let mut rows = pin!(enumerator.rows());
		let mut records = Vec::new();

		while let Some(row) = rows.try_next().await? {
			let pk = row.primary_key(&self.primary_key).ok_or_else(|| {
				SeedingError::ConfigurationError(format!(
					"{} row has no usable `{}` value",
					kind, self.primary_key
				))
			})?;

			let mut record = FixtureRecord::new(kind.clone(), pk);
			for attribute in &attributes {
				let value = row.get(attribute).unwrap_or(&Value::Null);
				let literal = self.registry.serialize(kind, attribute, value)?;
				record.fields.insert(attribute.clone(), literal);
			}
			records.push(record);
		}

		let count = records.len();
		tracing::debug!(kind = %kind, records = count, "generated fixtures");

		self.document
			.kinds
			.push(KindManifest::new(kind.clone(), attributes, foreign_keys));
		self.document.records.extend(records);
		Ok(count)
	}

	/// Generates `kinds` in foreign-key dependency order.
	///
	/// Returns the order used. Stops at the first failing kind; kinds
	/// generated before it are kept.
	pub async fn generate_all(&mut self, kinds: &[EntityKind]) -> SeedingResult<Vec<EntityKind>> {
		let graph = DependencyGraph::from_introspector(self.store, kinds).await?;
		let order = graph.topological_order()?;
		for kind in &order {
			self.generate(kind).await?;
		}
		Ok(order)
	}

	/// Records generated so far, in sequence order.
	pub fn records(&self) -> &[FixtureRecord] {
		&self.document.records
	}

	/// The document generated so far.
	pub fn document(&self) -> &FixtureDocument {
		&self.document
	}

	/// Consumes the writer, returning its document.
	pub fn into_document(self) -> FixtureDocument {
		self.document
	}

	/// Renders the document.
	pub fn output(&self, format: FixtureFormat) -> SeedingResult<String> {
		FixtureSerializer::new()
			.with_format(format)
			.serialize(&self.document)
	}

	/// Renders the document into `path`.
	pub fn save_to(&self, path: &Path, format: FixtureFormat) -> SeedingResult<()> {
		FixtureSerializer::new()
			.with_format(format)
			.write_to_file(&self.document, path)
	}
}
