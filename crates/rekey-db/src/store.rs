//! Store traits consumed by fixture generation and loading.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::DbResult;
use crate::schema::{EntityKind, SchemaIntrospector};
use crate::value::{PrimaryKey, Value};

/// One row of an entity kind, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
	values: BTreeMap<String, Value>,
}

impl Row {
	/// Creates an empty row.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
		self.values.insert(attribute.into(), value.into());
		self
	}

	/// Sets an attribute, returning the previous value.
	pub fn insert(&mut self, attribute: impl Into<String>, value: Value) -> Option<Value> {
		self.values.insert(attribute.into(), value)
	}

	/// Returns the value of an attribute.
	pub fn get(&self, attribute: &str) -> Option<&Value> {
		self.values.get(attribute)
	}

	/// Returns the primary key stored under `primary_key`, if it has a key category.
	pub fn primary_key(&self, primary_key: &str) -> Option<PrimaryKey> {
		self.get(primary_key).and_then(PrimaryKey::from_value)
	}

	/// Iterates attributes in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.values.iter()
	}

	/// Number of attributes.
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Returns true when the row has no attributes.
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl FromIterator<(String, Value)> for Row {
	fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
		Self {
			values: iter.into_iter().collect(),
		}
	}
}

impl IntoIterator for Row {
	type Item = (String, Value);
	type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.values.into_iter()
	}
}

/// A store rows are captured from.
#[async_trait]
pub trait SourceStore: SchemaIntrospector {
	/// Fetches up to `limit` rows of `kind` ordered by `primary_key`, starting
	/// strictly after `after` (or from the first row when `None`).
	///
	/// Keyset pagination keeps enumeration stable while bounding memory.
	async fn fetch_chunk(
		&self,
		kind: &EntityKind,
		primary_key: &str,
		after: Option<&PrimaryKey>,
		limit: usize,
	) -> DbResult<Vec<Row>>;
}

/// A store fixtures are loaded into.
#[async_trait]
pub trait DestinationStore: SchemaIntrospector {
	/// Session type; one session is one transaction.
	type Session: StoreSession;

	/// Opens a session. Nothing written through it is visible to other
	/// sessions until [`StoreSession::commit`] succeeds.
	async fn begin(&self) -> DbResult<Self::Session>;
}

/// A transactional unit of work against a [`DestinationStore`].
#[async_trait]
pub trait StoreSession: Send {
	/// Inserts a row into `kind` and returns the primary key the store assigned.
	///
	/// `values` must not contain `primary_key`; the store generates it.
	async fn insert(
		&mut self,
		kind: &EntityKind,
		primary_key: &str,
		values: &Row,
	) -> DbResult<PrimaryKey>;

	/// Pushes pending work to the store without finishing the transaction.
	async fn flush(&mut self) -> DbResult<()>;

	/// Commits everything written through this session.
	async fn commit(&mut self) -> DbResult<()>;

	/// Discards everything written through this session.
	async fn rollback(&mut self) -> DbResult<()>;
}
