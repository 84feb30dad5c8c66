//! Error types for the store layer.

use thiserror::Error;

/// Errors raised by store backends and schema introspection.
#[derive(Debug, Error)]
pub enum DbError {
	/// Could not open or reach the store.
	#[error("Connection error: {0}")]
	Connection(String),

	/// A statement failed to execute.
	#[error("Query error: {0}")]
	Query(String),

	/// The entity kind does not exist in the store.
	#[error("Unknown entity kind: {0}")]
	UnknownKind(String),

	/// The attribute does not exist on the entity kind.
	#[error("Unknown attribute: {kind}.{attribute}")]
	UnknownAttribute {
		/// Entity kind (table name).
		kind: String,
		/// Attribute (column) name.
		attribute: String,
	},

	/// A stored value could not be decoded into a [`Value`](crate::Value).
	#[error("Decode error: {kind}.{attribute}: {message}")]
	Decode {
		/// Entity kind (table name).
		kind: String,
		/// Attribute (column) name.
		attribute: String,
		/// What went wrong.
		message: String,
	},

	/// A constraint (foreign key, uniqueness, not-null) was violated.
	#[error("Constraint violation on {kind}: {message}")]
	Constraint {
		/// Entity kind (table name).
		kind: String,
		/// What went wrong.
		message: String,
	},

	/// Transaction handling failed, or the session was already finished.
	#[error("Transaction error: {0}")]
	Transaction(String),
}

/// Result type alias for store operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for DbError {
	fn from(error: sqlx::Error) -> Self {
		match error {
			sqlx::Error::Configuration(e) => DbError::Connection(e.to_string()),
			sqlx::Error::Io(e) => DbError::Connection(e.to_string()),
			sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
				DbError::Connection(error.to_string())
			}
			other => DbError::Query(other.to_string()),
		}
	}
}
