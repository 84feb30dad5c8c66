//! Entity kinds and schema introspection.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DbResult;
use crate::value::ValueCategory;

/// A named schema (table) whose rows are captured as fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKind(String);

impl EntityKind {
	/// Creates an entity kind from its table name.
	pub fn new(table_name: impl Into<String>) -> Self {
		Self(table_name.into())
	}

	/// Returns the table name.
	pub fn table_name(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for EntityKind {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for EntityKind {
	fn from(name: String) -> Self {
		Self(name)
	}
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
	/// Column name
	pub name: String,
	/// Value category stored in the column
	pub category: ValueCategory,
	/// Whether the column accepts NULL
	pub nullable: bool,
	/// Whether the column is (part of) the primary key
	pub primary_key: bool,
}

impl ColumnInfo {
	/// Creates a nullable, non-key column.
	pub fn new(name: impl Into<String>, category: ValueCategory) -> Self {
		Self {
			name: name.into(),
			category,
			nullable: true,
			primary_key: false,
		}
	}

	/// Marks the column NOT NULL.
	pub fn not_null(mut self) -> Self {
		self.nullable = false;
		self
	}

	/// Marks the column as the primary key.
	pub fn primary_key(mut self) -> Self {
		self.primary_key = true;
		self.nullable = false;
		self
	}
}

/// A single-valued foreign key: `attribute` holds a primary key of `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
	/// Referencing attribute on the owning kind
	pub attribute: String,
	/// Kind whose primary key is referenced
	pub target: EntityKind,
}

impl ForeignKeyDescriptor {
	/// Creates a descriptor.
	pub fn new(attribute: impl Into<String>, target: impl Into<EntityKind>) -> Self {
		Self {
			attribute: attribute.into(),
			target: target.into(),
		}
	}
}

/// Reads entity-kind metadata from a store.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
	/// Lists the entity kinds the store holds.
	async fn entity_kinds(&self) -> DbResult<Vec<EntityKind>>;

	/// Returns the columns of `kind` in declaration order.
	///
	/// Fails with [`DbError::UnknownKind`](crate::DbError::UnknownKind) when the
	/// kind does not exist.
	async fn columns(&self, kind: &EntityKind) -> DbResult<Vec<ColumnInfo>>;

	/// Returns the single-column foreign keys declared on `kind`.
	///
	/// Composite foreign keys are not reported.
	async fn foreign_keys_of(&self, kind: &EntityKind) -> DbResult<Vec<ForeignKeyDescriptor>>;

	/// Returns the attribute names of `kind` in declaration order, minus `exclude`.
	async fn attribute_names(&self, kind: &EntityKind, exclude: &[&str]) -> DbResult<Vec<String>> {
		Ok(self
			.columns(kind)
			.await?
			.into_iter()
			.map(|column| column.name)
			.filter(|name| !exclude.contains(&name.as_str()))
			.collect())
	}
}
