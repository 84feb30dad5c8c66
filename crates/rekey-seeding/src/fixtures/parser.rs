//! Fixture parsing functionality.
//!
//! This module handles parsing of fixture files in JSON and YAML formats.
//! Three shapes are accepted: a full [`FixtureDocument`], a bare array of
//! records, or a single record. The latter two use
//! [`DEFAULT_PRIMARY_KEY`].

use std::path::Path;

use super::format::{DEFAULT_PRIMARY_KEY, FORMAT_VERSION};
use super::{FixtureDocument, FixtureFormat, FixtureRecord};
use crate::error::{SeedingError, SeedingResult};

/// Parser for fixture files.
///
/// Supports both JSON and YAML formats (YAML requires the `yaml` feature).
#[derive(Debug, Default)]
pub struct FixtureParser;

impl FixtureParser {
	/// Creates a new fixture parser.
	pub fn new() -> Self {
		Self
	}

	/// Parses a fixture file from the given path.
	///
	/// The format is automatically detected from the file extension.
	///
	/// # Errors
	///
	/// Returns an error if:
	/// - The file extension is not recognized
	/// - The file cannot be read
	/// - The file content is invalid
	pub fn parse_file(&self, path: &Path) -> SeedingResult<FixtureDocument> {
		let format = FixtureFormat::from_path(path).ok_or_else(|| {
			SeedingError::UnsupportedExtension(
				path.extension()
					.and_then(|e| e.to_str())
					.unwrap_or("(none)")
					.to_string(),
			)
		})?;

		let content = std::fs::read_to_string(path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				SeedingError::FileNotFound(path.display().to_string())
			} else {
				SeedingError::IoError(e)
			}
		})?;

		self.parse_string(&content, format)
	}

	/// Parses fixture data from a string.
	pub fn parse_string(
		&self,
		content: &str,
		format: FixtureFormat,
	) -> SeedingResult<FixtureDocument> {
		let document = match format {
			FixtureFormat::Json => self.parse_json(content)?,
			FixtureFormat::Yaml => self.parse_yaml(content)?,
		};
		self.validate_document(&document)?;
		Ok(document)
	}

	/// Parses JSON fixture content.
	fn parse_json(&self, content: &str) -> SeedingResult<FixtureDocument> {
		let value: serde_json::Value = serde_json::from_str(content)?;

		match value {
			serde_json::Value::Array(arr) => {
				let records = arr
					.into_iter()
					.enumerate()
					.map(|(idx, item)| {
						decode_record(idx, serde_json::from_value(item).map_err(|e| e.to_string()))
					})
					.collect::<SeedingResult<Vec<_>>>()?;
				Ok(FixtureDocument::from_records(DEFAULT_PRIMARY_KEY, records))
			}
			serde_json::Value::Object(ref map) if map.contains_key("records") => {
				parse_document(serde_json::from_value(value).map_err(|e| e.to_string()))
			}
			serde_json::Value::Object(_) => {
				// Single record
				let record = decode_record(0, serde_json::from_value(value).map_err(|e| e.to_string()))?;
				Ok(FixtureDocument::from_records(DEFAULT_PRIMARY_KEY, vec![record]))
			}
			_ => Err(SeedingError::ParseError(
				"Expected array or object".to_string(),
			)),
		}
	}

	/// Parses YAML fixture content.
	#[cfg(feature = "yaml")]
	fn parse_yaml(&self, content: &str) -> SeedingResult<FixtureDocument> {
		let value: serde_yaml::Value = serde_yaml::from_str(content)?;

		match value {
			serde_yaml::Value::Sequence(seq) => {
				let records = seq
					.into_iter()
					.enumerate()
					.map(|(idx, item)| {
						decode_record(idx, serde_yaml::from_value(item).map_err(|e| e.to_string()))
					})
					.collect::<SeedingResult<Vec<_>>>()?;
				Ok(FixtureDocument::from_records(DEFAULT_PRIMARY_KEY, records))
			}
			serde_yaml::Value::Mapping(ref map) if map.contains_key("records") => {
				parse_document(serde_yaml::from_value(value).map_err(|e| e.to_string()))
			}
			serde_yaml::Value::Mapping(_) => {
				// Single record
				let record = decode_record(0, serde_yaml::from_value(value).map_err(|e| e.to_string()))?;
				Ok(FixtureDocument::from_records(DEFAULT_PRIMARY_KEY, vec![record]))
			}
			_ => Err(SeedingError::ParseError(
				"Expected sequence or mapping".to_string(),
			)),
		}
	}

	/// Stub for YAML parsing when the feature is not enabled.
	#[cfg(not(feature = "yaml"))]
	fn parse_yaml(&self, _content: &str) -> SeedingResult<FixtureDocument> {
		Err(SeedingError::UnsupportedExtension(
			"YAML support requires the 'yaml' feature".to_string(),
		))
	}

	/// Validates a parsed document.
	fn validate_document(&self, document: &FixtureDocument) -> SeedingResult<()> {
		if document.version != FORMAT_VERSION {
			return Err(SeedingError::ValidationError {
				field: "version".to_string(),
				message: format!(
					"Unsupported fixture version {} (expected {})",
					document.version, FORMAT_VERSION
				),
			});
		}

		if document.primary_key.is_empty() {
			return Err(SeedingError::ValidationError {
				field: "primary_key".to_string(),
				message: "Primary-key attribute name must not be empty".to_string(),
			});
		}

		for (idx, record) in document.records.iter().enumerate() {
			if record.model.table_name().is_empty() {
				return Err(SeedingError::ValidationError {
					field: "model".to_string(),
					message: format!("Record at index {} has an empty entity kind", idx),
				});
			}
		}

		Ok(())
	}

	/// Parses multiple fixture files into one sequence, in path order.
	///
	/// Manifests are concatenated. All files must declare the same primary-key
	/// attribute.
	pub fn parse_files(&self, paths: &[&Path]) -> SeedingResult<FixtureDocument> {
		let mut combined: Option<FixtureDocument> = None;

		for path in paths {
			let document = self.parse_file(path)?;
			match combined.as_mut() {
				None => combined = Some(document),
				Some(all) => {
					if all.primary_key != document.primary_key {
						return Err(SeedingError::ValidationError {
							field: "primary_key".to_string(),
							message: format!(
								"{} uses '{}' but earlier fixtures use '{}'",
								path.display(),
								document.primary_key,
								all.primary_key
							),
						});
					}
					all.kinds.extend(document.kinds);
					all.records.extend(document.records);
				}
			}
		}

		Ok(combined.unwrap_or_else(|| FixtureDocument::new(DEFAULT_PRIMARY_KEY)))
	}
}

fn decode_record(
	idx: usize,
	decoded: Result<FixtureRecord, String>,
) -> SeedingResult<FixtureRecord> {
	decoded.map_err(|e| SeedingError::ParseError(format!("Invalid record at index {}: {}", idx, e)))
}

fn parse_document(decoded: Result<FixtureDocument, String>) -> SeedingResult<FixtureDocument> {
	decoded.map_err(|e| SeedingError::ParseError(format!("Invalid fixture document: {}", e)))
}
