//! In-memory store backend.
//!
//! Tables live behind a shared lock. A [`MemorySession`] stages inserts and
//! applies them on commit, so uncommitted rows are never visible through the
//! store. Foreign keys and NOT NULL columns are enforced on insert.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{DbError, DbResult};
use crate::schema::{ColumnInfo, EntityKind, ForeignKeyDescriptor, SchemaIntrospector};
use crate::store::{DestinationStore, Row, SourceStore, StoreSession};
use crate::value::{PrimaryKey, ValueCategory};

/// Definition of an in-memory table.
#[derive(Debug, Clone)]
pub struct TableSchema {
	kind: EntityKind,
	columns: Vec<ColumnInfo>,
	foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableSchema {
	/// Starts a table definition.
	pub fn new(kind: impl Into<EntityKind>) -> Self {
		Self {
			kind: kind.into(),
			columns: Vec::new(),
			foreign_keys: Vec::new(),
		}
	}

	/// Adds a column.
	pub fn column(mut self, column: ColumnInfo) -> Self {
		self.columns.push(column);
		self
	}

	/// Adds an integer primary-key column.
	pub fn id(self, name: &str) -> Self {
		self.column(ColumnInfo::new(name, ValueCategory::Integer).primary_key())
	}

	/// Adds a nullable integer column referencing `target`.
	pub fn foreign_key(mut self, name: &str, target: impl Into<EntityKind>) -> Self {
		self.columns.push(ColumnInfo::new(name, ValueCategory::Integer));
		self.foreign_keys.push(ForeignKeyDescriptor::new(name, target));
		self
	}

	/// Returns the entity kind.
	pub fn kind(&self) -> &EntityKind {
		&self.kind
	}

	fn primary_key_column(&self) -> Option<&ColumnInfo> {
		self.columns.iter().find(|column| column.primary_key)
	}
}

#[derive(Debug)]
struct MemoryTable {
	schema: TableSchema,
	rows: BTreeMap<PrimaryKey, Row>,
	next_id: i64,
}

impl MemoryTable {
	fn column(&self, name: &str) -> Option<&ColumnInfo> {
		self.schema.columns.iter().find(|column| column.name == name)
	}

	fn primary_key_name(&self) -> DbResult<&str> {
		self.schema
			.primary_key_column()
			.map(|column| column.name.as_str())
			.ok_or_else(|| DbError::Constraint {
				kind: self.schema.kind.to_string(),
				message: "table has no primary key column".to_string(),
			})
	}
}

#[derive(Debug, Default)]
struct MemoryState {
	tables: BTreeMap<EntityKind, MemoryTable>,
	flushes: usize,
}

impl MemoryState {
	fn table(&self, kind: &EntityKind) -> DbResult<&MemoryTable> {
		self.tables
			.get(kind)
			.ok_or_else(|| DbError::UnknownKind(kind.to_string()))
	}

	fn table_mut(&mut self, kind: &EntityKind) -> DbResult<&mut MemoryTable> {
		self.tables
			.get_mut(kind)
			.ok_or_else(|| DbError::UnknownKind(kind.to_string()))
	}
}

/// Shared in-memory store. Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates (or replaces) a table.
	pub fn create_table(&self, schema: TableSchema) {
		let table = MemoryTable {
			schema,
			rows: BTreeMap::new(),
			next_id: 1,
		};
		self.state
			.write()
			.tables
			.insert(table.schema.kind.clone(), table);
	}

	/// Removes a table and its rows. Returns whether it existed.
	pub fn drop_table(&self, kind: &EntityKind) -> bool {
		self.state.write().tables.remove(kind).is_some()
	}

	/// Inserts a committed row directly.
	///
	/// When the row carries its primary key it is kept as is; otherwise the
	/// next integer id is assigned. Used to seed source stores.
	pub fn insert_row(&self, kind: &EntityKind, mut row: Row) -> DbResult<PrimaryKey> {
		let mut state = self.state.write();
		let table = state.table_mut(kind)?;
		let primary_key = table.primary_key_name()?.to_string();
		let key = match row.primary_key(&primary_key) {
			Some(key) => key,
			None => {
				let key = PrimaryKey::Integer(table.next_id);
				row.insert(primary_key, key.to_value());
				key
			}
		};
		if table.rows.contains_key(&key) {
			return Err(DbError::Constraint {
				kind: kind.to_string(),
				message: format!("duplicate primary key {}", key),
			});
		}
		if let PrimaryKey::Integer(id) = key {
			table.next_id = table.next_id.max(id + 1);
		}
		table.rows.insert(key.clone(), row);
		Ok(key)
	}

	/// Returns a snapshot of the committed rows of `kind`, ordered by primary key.
	pub fn rows(&self, kind: &EntityKind) -> DbResult<Vec<Row>> {
		Ok(self
			.state
			.read()
			.table(kind)?
			.rows
			.values()
			.cloned()
			.collect())
	}

	/// Returns the committed row with the given key.
	pub fn get(&self, kind: &EntityKind, key: &PrimaryKey) -> DbResult<Option<Row>> {
		Ok(self.state.read().table(kind)?.rows.get(key).cloned())
	}

	/// Number of committed rows of `kind`.
	pub fn row_count(&self, kind: &EntityKind) -> DbResult<usize> {
		Ok(self.state.read().table(kind)?.rows.len())
	}

	/// Number of flushes issued by sessions of this store.
	pub fn flush_count(&self) -> usize {
		self.state.read().flushes
	}
}

#[async_trait]
impl SchemaIntrospector for MemoryStore {
	async fn entity_kinds(&self) -> DbResult<Vec<EntityKind>> {
		Ok(self.state.read().tables.keys().cloned().collect())
	}

	async fn columns(&self, kind: &EntityKind) -> DbResult<Vec<ColumnInfo>> {
		Ok(self.state.read().table(kind)?.schema.columns.clone())
	}

	async fn foreign_keys_of(&self, kind: &EntityKind) -> DbResult<Vec<ForeignKeyDescriptor>> {
		Ok(self.state.read().table(kind)?.schema.foreign_keys.clone())
	}
}

#[async_trait]
impl SourceStore for MemoryStore {
	async fn fetch_chunk(
		&self,
		kind: &EntityKind,
		primary_key: &str,
		after: Option<&PrimaryKey>,
		limit: usize,
	) -> DbResult<Vec<Row>> {
		let state = self.state.read();
		let table = state.table(kind)?;
		if table.column(primary_key).is_none() {
			return Err(DbError::UnknownAttribute {
				kind: kind.to_string(),
				attribute: primary_key.to_string(),
			});
		}

		if table.primary_key_name()? == primary_key {
			let rows = match after {
				Some(after) => table
					.rows
					.range::<PrimaryKey, _>((
						std::ops::Bound::Excluded(after),
						std::ops::Bound::Unbounded,
					))
					.map(|(_, row)| row.clone())
					.take(limit)
					.collect(),
				None => table.rows.values().take(limit).cloned().collect(),
			};
			return Ok(rows);
		}

		// Ordering by some other unique attribute: sort a filtered copy.
		let mut keyed: Vec<(PrimaryKey, &Row)> = table
			.rows
			.values()
			.filter_map(|row| row.primary_key(primary_key).map(|key| (key, row)))
			.filter(|(key, _)| after.is_none_or(|after| key > after))
			.collect();
		keyed.sort_by(|a, b| a.0.cmp(&b.0));
		Ok(keyed
			.into_iter()
			.take(limit)
			.map(|(_, row)| row.clone())
			.collect())
	}
}

#[async_trait]
impl DestinationStore for MemoryStore {
	type Session = MemorySession;

	async fn begin(&self) -> DbResult<MemorySession> {
		Ok(MemorySession {
			state: Arc::clone(&self.state),
			pending: Vec::new(),
			finished: false,
		})
	}
}

/// Session over a [`MemoryStore`]. Dropping it without commit discards its rows.
#[derive(Debug)]
pub struct MemorySession {
	state: Arc<RwLock<MemoryState>>,
	pending: Vec<(EntityKind, PrimaryKey, Row)>,
	finished: bool,
}

impl MemorySession {
	fn ensure_open(&self) -> DbResult<()> {
		if self.finished {
			return Err(DbError::Transaction(
				"session already committed or rolled back".to_string(),
			));
		}
		Ok(())
	}

	fn is_visible(&self, state: &MemoryState, kind: &EntityKind, key: &PrimaryKey) -> bool {
		let committed = state
			.tables
			.get(kind)
			.is_some_and(|table| table.rows.contains_key(key));
		committed
			|| self
				.pending
				.iter()
				.any(|(pending_kind, pending_key, _)| pending_kind == kind && pending_key == key)
	}
}

#[async_trait]
impl StoreSession for MemorySession {
	async fn insert(
		&mut self,
		kind: &EntityKind,
		primary_key: &str,
		values: &Row,
	) -> DbResult<PrimaryKey> {
		self.ensure_open()?;
		let mut state = self.state.write();

		let table = state.table(kind)?;
		if table.primary_key_name()? != primary_key {
			return Err(DbError::UnknownAttribute {
				kind: kind.to_string(),
				attribute: primary_key.to_string(),
			});
		}
		for (attribute, _) in values.iter() {
			if attribute == primary_key {
				return Err(DbError::Constraint {
					kind: kind.to_string(),
					message: format!("primary key `{}` is assigned by the store", primary_key),
				});
			}
			if table.column(attribute).is_none() {
				return Err(DbError::UnknownAttribute {
					kind: kind.to_string(),
					attribute: attribute.clone(),
				});
			}
		}
		for column in table.schema.columns.iter().filter(|c| !c.nullable && !c.primary_key) {
			if values.get(&column.name).is_none_or(|value| value.is_null()) {
				return Err(DbError::Constraint {
					kind: kind.to_string(),
					message: format!("`{}` may not be NULL", column.name),
				});
			}
		}
		for fk in &table.schema.foreign_keys {
			let Some(value) = values.get(&fk.attribute).filter(|value| !value.is_null()) else {
				continue;
			};
			let referenced = PrimaryKey::from_value(value);
			if !referenced.is_some_and(|key| self.is_visible(&state, &fk.target, &key)) {
				return Err(DbError::Constraint {
					kind: kind.to_string(),
					message: format!(
						"`{}` references missing {}#{}",
						fk.attribute, fk.target, value
					),
				});
			}
		}

		// Ids come from a sequence that is not rolled back, as in most databases.
		let table = state.table_mut(kind)?;
		let key = PrimaryKey::Integer(table.next_id);
		table.next_id += 1;

		let mut row = values.clone();
		row.insert(primary_key, key.to_value());
		self.pending.push((kind.clone(), key.clone(), row));
		Ok(key)
	}

	async fn flush(&mut self) -> DbResult<()> {
		self.ensure_open()?;
		self.state.write().flushes += 1;
		Ok(())
	}

	async fn commit(&mut self) -> DbResult<()> {
		self.ensure_open()?;
		let mut state = self.state.write();
		// Nothing is applied unless every pending row fits.
		for (kind, key, _) in &self.pending {
			if state.table(kind)?.rows.contains_key(key) {
				return Err(DbError::Constraint {
					kind: kind.to_string(),
					message: format!("duplicate primary key {}", key),
				});
			}
		}
		for (kind, key, row) in self.pending.drain(..) {
			state.table_mut(&kind)?.rows.insert(key, row);
		}
		self.finished = true;
		Ok(())
	}

	async fn rollback(&mut self) -> DbResult<()> {
		self.ensure_open()?;
		self.pending.clear();
		self.finished = true;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn store() -> MemoryStore {
		let store = MemoryStore::new();
		store.create_table(
			TableSchema::new("course")
				.id("id")
				.column(ColumnInfo::new("title", ValueCategory::Text).not_null()),
		);
		store.create_table(
			TableSchema::new("lecture")
				.id("id")
				.column(ColumnInfo::new("title", ValueCategory::Text))
				.foreign_key("course_id", "course"),
		);
		store
	}

	#[rstest]
	fn test_insert_row_keeps_explicit_key(store: MemoryStore) {
		let course = EntityKind::new("course");
		let key = store
			.insert_row(&course, Row::new().with("id", 42_i64).with("title", "Rust"))
			.unwrap();
		assert_eq!(key, PrimaryKey::Integer(42));

		let next = store
			.insert_row(&course, Row::new().with("title", "Go"))
			.unwrap();
		assert_eq!(next, PrimaryKey::Integer(43));
	}

	#[rstest]
	#[tokio::test]
	async fn test_fetch_chunk_pages_by_key(store: MemoryStore) {
		let course = EntityKind::new("course");
		for id in [5_i64, 1, 3, 9] {
			store
				.insert_row(&course, Row::new().with("id", id).with("title", "t"))
				.unwrap();
		}

		let first = store.fetch_chunk(&course, "id", None, 2).await.unwrap();
		let ids: Vec<_> = first.iter().filter_map(|r| r.primary_key("id")).collect();
		assert_eq!(ids, vec![PrimaryKey::Integer(1), PrimaryKey::Integer(3)]);

		let after = PrimaryKey::Integer(3);
		let second = store
			.fetch_chunk(&course, "id", Some(&after), 2)
			.await
			.unwrap();
		let ids: Vec<_> = second.iter().filter_map(|r| r.primary_key("id")).collect();
		assert_eq!(ids, vec![PrimaryKey::Integer(5), PrimaryKey::Integer(9)]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_session_rows_invisible_until_commit(store: MemoryStore) {
		let course = EntityKind::new("course");
		let mut session = store.begin().await.unwrap();
		let key = session
			.insert(&course, "id", &Row::new().with("title", "Rust"))
			.await
			.unwrap();
		assert_eq!(key, PrimaryKey::Integer(1));
		assert_eq!(store.row_count(&course).unwrap(), 0);

		session.commit().await.unwrap();
		assert_eq!(store.row_count(&course).unwrap(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_rollback_discards_rows(store: MemoryStore) {
		let course = EntityKind::new("course");
		let mut session = store.begin().await.unwrap();
		session
			.insert(&course, "id", &Row::new().with("title", "Rust"))
			.await
			.unwrap();
		session.rollback().await.unwrap();

		assert_eq!(store.row_count(&course).unwrap(), 0);
		assert!(matches!(
			session.commit().await,
			Err(DbError::Transaction(_))
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_commit_applies_nothing(store: MemoryStore) {
		let course = EntityKind::new("course");
		let lecture = EntityKind::new("lecture");
		let mut session = store.begin().await.unwrap();
		session
			.insert(&course, "id", &Row::new().with("title", "Rust"))
			.await
			.unwrap();
		session
			.insert(&lecture, "id", &Row::new().with("title", "Ownership"))
			.await
			.unwrap();
		assert!(store.drop_table(&lecture));

		let result = session.commit().await;

		assert!(matches!(result, Err(DbError::UnknownKind(_))));
		assert_eq!(store.row_count(&course).unwrap(), 0);
		session.rollback().await.unwrap();
	}

	#[rstest]
	#[tokio::test]
	async fn test_foreign_key_enforced(store: MemoryStore) {
		let lecture = EntityKind::new("lecture");
		let mut session = store.begin().await.unwrap();
		let result = session
			.insert(&lecture, "id", &Row::new().with("course_id", 99_i64))
			.await;
		assert!(matches!(result, Err(DbError::Constraint { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_foreign_key_sees_pending_rows(store: MemoryStore) {
		let course = EntityKind::new("course");
		let lecture = EntityKind::new("lecture");
		let mut session = store.begin().await.unwrap();
		let course_id = session
			.insert(&course, "id", &Row::new().with("title", "Rust"))
			.await
			.unwrap();
		session
			.insert(&lecture, "id", &Row::new().with("course_id", course_id.to_value()))
			.await
			.unwrap();
		session.commit().await.unwrap();
		assert_eq!(store.row_count(&lecture).unwrap(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_not_null_enforced(store: MemoryStore) {
		let course = EntityKind::new("course");
		let mut session = store.begin().await.unwrap();
		let result = session.insert(&course, "id", &Row::new()).await;
		assert!(matches!(result, Err(DbError::Constraint { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_explicit_primary_key_rejected(store: MemoryStore) {
		let course = EntityKind::new("course");
		let mut session = store.begin().await.unwrap();
		let result = session
			.insert(&course, "id", &Row::new().with("id", 4_i64).with("title", "x"))
			.await;
		assert!(matches!(result, Err(DbError::Constraint { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_introspection(store: MemoryStore) {
		let lecture = EntityKind::new("lecture");
		let kinds = store.entity_kinds().await.unwrap();
		assert_eq!(kinds, vec![EntityKind::new("course"), lecture.clone()]);

		let names = store
			.attribute_names(&lecture, &["id"])
			.await
			.unwrap();
		assert_eq!(names, vec!["title", "course_id"]);

		let fks = store.foreign_keys_of(&lecture).await.unwrap();
		assert_eq!(fks, vec![ForeignKeyDescriptor::new("course_id", "course")]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unknown_kind(store: MemoryStore) {
		let result = store.columns(&EntityKind::new("nope")).await;
		assert!(matches!(result, Err(DbError::UnknownKind(_))));
	}
}
