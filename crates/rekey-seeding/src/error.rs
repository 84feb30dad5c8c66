//! Error types for the seeding module.
//!
//! Generation errors abort the entity kind being generated; load errors
//! abort the whole load, which is then rolled back.

use rekey_db::DbError;
use thiserror::Error;

/// Errors that can occur while generating or loading fixtures.
#[derive(Debug, Error)]
pub enum SeedingError {
	/// The entity kind cannot be captured as configured (caller bug).
	#[error("Configuration error: {0}")]
	ConfigurationError(String),

	/// A value of an unsupported category was met while generating.
	#[error("Cannot serialize. Entity: {kind}. Attribute: {attribute}. Value: {value} ({message})")]
	SerializationError {
		/// Entity kind being generated.
		kind: String,
		/// Attribute holding the value.
		attribute: String,
		/// Runtime value, rendered for diagnostics.
		value: String,
		/// Why the value was rejected.
		message: String,
	},

	/// A fixture literal could not be turned back into a store value.
	#[error("Cannot deserialize {kind}.{attribute}: {message}")]
	DeserializationError {
		/// Entity kind of the record.
		kind: String,
		/// Attribute holding the literal.
		attribute: String,
		/// What went wrong.
		message: String,
	},

	/// A foreign key points at an identity that was never loaded.
	#[error(
		"Unresolved reference: {kind}.{attribute} = {value} has no loaded {target} (is the fixture sequence out of order?)"
	)]
	UnresolvedReferenceError {
		/// Entity kind of the referencing record.
		kind: String,
		/// Foreign-key attribute.
		attribute: String,
		/// Referenced entity kind.
		target: String,
		/// Original (untranslated) value.
		value: String,
	},

	/// The same original identity was loaded twice into one identity map.
	#[error("Duplicate fixture: {key} is already in the identity map")]
	DuplicateFixtureError {
		/// Identity key, rendered as `kind#pk`.
		key: String,
	},

	/// Entity kinds appear in an order that violates their dependencies.
	#[error("Ordering error: {0}")]
	OrderingError(String),

	/// Invalid fixture format detected.
	#[error("Invalid fixture format: {0}")]
	InvalidFormat(String),

	/// Error parsing fixture data.
	#[error("Parse error: {0}")]
	ParseError(String),

	/// Validation failed for a specific field.
	#[error("Validation error: {field}: {message}")]
	ValidationError {
		/// Field that failed validation.
		field: String,
		/// Validation error message.
		message: String,
	},

	/// Settings could not be read or are invalid.
	#[error("Settings error: {0}")]
	SettingsError(String),

	/// Store operation failed.
	#[error("Database error: {0}")]
	DatabaseError(#[from] DbError),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),

	/// YAML serialization/deserialization error (when yaml feature is enabled).
	#[cfg(feature = "yaml")]
	#[error("YAML error: {0}")]
	YamlError(#[from] serde_yaml::Error),

	/// Fixture file not found.
	#[error("Fixture file not found: {0}")]
	FileNotFound(String),

	/// Unsupported file extension.
	#[error("Unsupported file extension: {0}")]
	UnsupportedExtension(String),
}

/// Result type alias for seeding operations.
pub type SeedingResult<T> = Result<T, SeedingError>;
