//! Fixture loading with foreign-key translation.
//!
//! Records are inserted one at a time, in sequence order, inside a single
//! store session. Before a record is inserted, each of its foreign keys is
//! rewritten from the source store's key to the key the destination store
//! assigned when the referenced record was loaded. Any failure rolls the
//! whole session back.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rekey_db::{
	DestinationStore, EntityKind, ForeignKeyDescriptor, PrimaryKey, Row, StoreSession, Value,
};

use super::format::DEFAULT_PRIMARY_KEY;
use super::graph::DependencyGraph;
use super::{FixtureDocument, FixtureRecord, IdentityKey, IdentityMap, ValueSerializerRegistry};
use crate::error::{SeedingError, SeedingResult};

/// Records inserted between two flushes unless configured otherwise.
pub const DEFAULT_FLUSH_EVERY: usize = 500;

/// Options for fixture loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
	/// Primary-key attribute name shared by every kind.
	pub primary_key: String,

	/// Flush the session every this many records. Zero disables flushing.
	pub flush_every: usize,

	/// Check the kind order against foreign keys before loading.
	pub verify_order: bool,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self {
			primary_key: DEFAULT_PRIMARY_KEY.to_string(),
			flush_every: DEFAULT_FLUSH_EVERY,
			verify_order: false,
		}
	}
}

impl LoadOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the primary-key attribute name.
	pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
		self.primary_key = primary_key.into();
		self
	}

	/// Sets the flush interval.
	pub fn with_flush_every(mut self, flush_every: usize) -> Self {
		self.flush_every = flush_every;
		self
	}

	/// Enables or disables the order check.
	pub fn with_verify_order(mut self, verify_order: bool) -> Self {
		self.verify_order = verify_order;
		self
	}
}

/// Where a record is in the load protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
	/// Not processed yet.
	Pending,
	/// Foreign keys being rewritten.
	Translating,
	/// Inserted and recorded in the identity map.
	Inserted,
	/// Part of a committed load.
	Committed,
	/// The load failed and was rolled back.
	Aborted,
}

impl fmt::Display for LoadState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Pending => "pending",
			Self::Translating => "translating",
			Self::Inserted => "inserted",
			Self::Committed => "committed",
			Self::Aborted => "aborted",
		};
		f.write_str(name)
	}
}

/// Result of a committed load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResult {
	/// Number of records inserted.
	pub records_loaded: usize,

	/// Records inserted per entity kind.
	pub per_kind: BTreeMap<EntityKind, usize>,

	/// Number of intermediate flushes issued.
	pub flushes: usize,
}

type ForeignKeyCache = HashMap<EntityKind, Vec<ForeignKeyDescriptor>>;

/// Loads fixture sequences into a destination store.
///
/// # Example
///
/// ```ignore
/// let loader = FixtureLoader::new(&store).with_options(LoadOptions::new().with_flush_every(100));
/// let mut identity_map = IdentityMap::new();
/// let result = loader.load(&document.records, &mut identity_map).await?;
/// println!("Loaded {} records", result.records_loaded);
/// ```
pub struct FixtureLoader<'a, D: DestinationStore + ?Sized> {
	store: &'a D,
	registry: ValueSerializerRegistry,
	options: LoadOptions,
}

impl<'a, D: DestinationStore + ?Sized> FixtureLoader<'a, D> {
	/// Creates a loader with default options and the default registry.
	pub fn new(store: &'a D) -> Self {
		Self {
			store,
			registry: ValueSerializerRegistry::new(),
			options: LoadOptions::default(),
		}
	}

	/// Sets the load options.
	pub fn with_options(mut self, options: LoadOptions) -> Self {
		self.options = options;
		self
	}

	/// Replaces the value serializer registry.
	pub fn with_registry(mut self, registry: ValueSerializerRegistry) -> Self {
		self.registry = registry;
		self
	}

	/// Returns the load options.
	pub fn options(&self) -> &LoadOptions {
		&self.options
	}

	/// Loads `records` in order and commits them as one transaction.
	///
	/// `identity_map` may already hold identities from earlier loads of the
	/// same source store; references to them resolve. It receives the new
	/// entries only when the load commits, and is left untouched otherwise.
	///
	/// # Errors
	///
	/// - [`SeedingError::UnresolvedReferenceError`] when a foreign key names a
	///   record that has not been loaded
	/// - [`SeedingError::DuplicateFixtureError`] when an identity is loaded twice
	/// - [`SeedingError::OrderingError`] when `verify_order` is set and the kind
	///   order contradicts the foreign keys
	/// - [`SeedingError::DatabaseError`] when the store rejects an operation
	pub async fn load(
		&self,
		records: &[FixtureRecord],
		identity_map: &mut IdentityMap,
	) -> SeedingResult<LoadResult> {
		self.load_with_primary_key(records, &self.options.primary_key, identity_map)
			.await
	}

	/// Loads a parsed document using the primary key it declares.
	pub async fn load_document(
		&self,
		document: &FixtureDocument,
		identity_map: &mut IdentityMap,
	) -> SeedingResult<LoadResult> {
		self.load_with_primary_key(&document.records, &document.primary_key, identity_map)
			.await
	}

	async fn load_with_primary_key(
		&self,
		records: &[FixtureRecord],
		primary_key: &str,
		identity_map: &mut IdentityMap,
	) -> SeedingResult<LoadResult> {
		// Schema reads happen before the session opens: a single-connection
		// store cannot serve them while a transaction holds the connection.
		let foreign_keys = self.discover_foreign_keys(records).await?;
		if self.options.verify_order {
			verify_kind_order(records, &foreign_keys)?;
		}

		let mut working = identity_map.clone();
		let mut session = self.store.begin().await?;

		let outcome = self
			.apply(&mut session, records, primary_key, &foreign_keys, &mut working)
			.await;
		let result = match outcome {
			Ok(result) => result,
			Err(error) => {
				tracing::warn!(state = %LoadState::Aborted, error = %error, "fixture load failed; rolling back");
				if let Err(rollback_error) = session.rollback().await {
					tracing::warn!(error = %rollback_error, "rollback failed");
				}
				return Err(error);
			}
		};

		tracing::info!(records = result.records_loaded, "committing fixtures");
		session.commit().await?;
		*identity_map = working;
		tracing::info!(
			state = %LoadState::Committed,
			records = result.records_loaded,
			identities = identity_map.len(),
			"fixtures committed"
		);
		Ok(result)
	}

	async fn discover_foreign_keys(&self, records: &[FixtureRecord]) -> SeedingResult<ForeignKeyCache> {
		let mut cache = ForeignKeyCache::new();
		for record in records {
			if !cache.contains_key(&record.model) {
				let descriptors = self.store.foreign_keys_of(&record.model).await?;
				cache.insert(record.model.clone(), descriptors);
			}
		}
		Ok(cache)
	}

	async fn apply(
		&self,
		session: &mut D::Session,
		records: &[FixtureRecord],
		primary_key: &str,
		foreign_keys: &ForeignKeyCache,
		identity_map: &mut IdentityMap,
	) -> SeedingResult<LoadResult> {
		let mut result = LoadResult::default();

		for (index, record) in records.iter().enumerate() {
			let lookup_key = IdentityKey::new(record.model.clone(), record.pk.clone());
			tracing::trace!(key = %lookup_key, state = %LoadState::Pending);
			if identity_map.contains(&lookup_key) {
				return Err(SeedingError::DuplicateFixtureError {
					key: lookup_key.to_string(),
				});
			}

			tracing::trace!(key = %lookup_key, state = %LoadState::Translating);
			let descriptors = foreign_keys
				.get(&record.model)
				.map(Vec::as_slice)
				.unwrap_or_default();
			let row = self.translate(record, primary_key, descriptors, identity_map)?;

			let new_key = session.insert(&record.model, primary_key, &row).await?;
			tracing::trace!(key = %lookup_key, new = %new_key, state = %LoadState::Inserted);
			identity_map.insert(lookup_key, new_key)?;

			result.records_loaded += 1;
			*result.per_kind.entry(record.model.clone()).or_insert(0) += 1;

			let loaded = index + 1;
			if self.options.flush_every > 0 && loaded % self.options.flush_every == 0 {
				session.flush().await?;
				result.flushes += 1;
				tracing::info!(loaded, total = records.len(), "fixture load progress");
			}
		}

		Ok(result)
	}

	/// Builds the row to insert: literals decoded, primary key dropped,
	/// foreign keys rewritten to destination keys.
	fn translate(
		&self,
		record: &FixtureRecord,
		primary_key: &str,
		foreign_keys: &[ForeignKeyDescriptor],
		identity_map: &IdentityMap,
	) -> SeedingResult<Row> {
		let mut row = Row::new();
		for (attribute, literal) in &record.fields {
			if attribute == primary_key {
				continue;
			}
			let value = self.registry.deserialize(&record.model, attribute, literal)?;
			row.insert(attribute.clone(), value);
		}

		for foreign_key in foreign_keys {
			let Some(value) = row.get(&foreign_key.attribute) else {
				continue;
			};
			if value.is_null() {
				continue;
			}

			let unresolved = || SeedingError::UnresolvedReferenceError {
				kind: record.model.to_string(),
				attribute: foreign_key.attribute.clone(),
				target: foreign_key.target.to_string(),
				value: value.to_string(),
			};
			let original = PrimaryKey::from_value(value).ok_or_else(unresolved)?;
			let new_key = identity_map
				.resolve(&foreign_key.target, &original)
				.ok_or_else(unresolved)?;

			let translated: Value = new_key.to_value();
			row.insert(foreign_key.attribute.clone(), translated);
		}

		Ok(row)
	}
}

fn verify_kind_order(records: &[FixtureRecord], foreign_keys: &ForeignKeyCache) -> SeedingResult<()> {
	let mut order: Vec<&EntityKind> = Vec::new();
	for record in records {
		if !order.contains(&&record.model) {
			order.push(&record.model);
		}
	}

	let mut graph = DependencyGraph::new();
	for kind in &order {
		graph.add_kind((*kind).clone());
		for descriptor in foreign_keys.get(*kind).into_iter().flatten() {
			graph.add_dependency((*kind).clone(), descriptor.target.clone());
		}
	}
	graph.verify_order(&order)
}

/// Loads `fixtures` into `store` and returns the resulting identity map.
///
/// `identity_map` seeds the translation with identities loaded earlier from
/// the same source store; pass the map returned by a previous call to load
/// further sequences that reference it.
pub async fn load_fixtures<D>(
	store: &D,
	fixtures: &[FixtureRecord],
	primary_key: &str,
	identity_map: Option<IdentityMap>,
) -> SeedingResult<IdentityMap>
where
	D: DestinationStore + ?Sized,
{
	let mut identity_map = identity_map.unwrap_or_default();
	FixtureLoader::new(store)
		.with_options(LoadOptions::new().with_primary_key(primary_key))
		.load(fixtures, &mut identity_map)
		.await?;
	Ok(identity_map)
}
