//! Document serialization for fixture output.

use std::path::Path;

use super::{FixtureDocument, FixtureFormat};
use crate::error::{SeedingError, SeedingResult};

/// Renders a [`FixtureDocument`] as text.
///
/// Output is a pure function of the document: the same sequence always yields
/// byte-identical text.
#[derive(Debug, Clone)]
pub struct FixtureSerializer {
	/// Output format.
	format: FixtureFormat,

	/// Indentation for pretty JSON; `0` writes compact JSON.
	indent: usize,
}

impl FixtureSerializer {
	/// Creates a new fixture serializer with default settings.
	pub fn new() -> Self {
		Self {
			format: FixtureFormat::Json,
			indent: 2,
		}
	}

	/// Sets the output format.
	pub fn with_format(mut self, format: FixtureFormat) -> Self {
		self.format = format;
		self
	}

	/// Sets the indentation level.
	pub fn with_indent(mut self, indent: usize) -> Self {
		self.indent = indent;
		self
	}

	/// Serializes a document to a string.
	pub fn serialize(&self, document: &FixtureDocument) -> SeedingResult<String> {
		match self.format {
			FixtureFormat::Json => self.serialize_json(document),
			FixtureFormat::Yaml => self.serialize_yaml(document),
		}
	}

	/// Serializes to JSON format.
	fn serialize_json(&self, document: &FixtureDocument) -> SeedingResult<String> {
		if self.indent == 0 {
			return Ok(serde_json::to_string(document)?);
		}

		let indent = " ".repeat(self.indent);
		let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
		let mut buffer = Vec::new();
		let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
		serde::Serialize::serialize(document, &mut serializer)?;
		buffer.push(b'\n');
		String::from_utf8(buffer).map_err(|e| SeedingError::InvalidFormat(e.to_string()))
	}

	/// Serializes to YAML format.
	#[cfg(feature = "yaml")]
	fn serialize_yaml(&self, document: &FixtureDocument) -> SeedingResult<String> {
		Ok(serde_yaml::to_string(document)?)
	}

	/// Stub for YAML serialization when feature is not enabled.
	#[cfg(not(feature = "yaml"))]
	fn serialize_yaml(&self, _document: &FixtureDocument) -> SeedingResult<String> {
		Err(SeedingError::UnsupportedExtension(
			"YAML support requires the 'yaml' feature".to_string(),
		))
	}

	/// Writes a serialized document to a file.
	pub fn write_to_file(&self, document: &FixtureDocument, path: &Path) -> SeedingResult<()> {
		let content = self.serialize(document)?;
		std::fs::write(path, content)?;
		Ok(())
	}

	/// Returns the configured output format.
	pub fn format(&self) -> FixtureFormat {
		self.format
	}

	/// Returns the configured indentation level.
	pub fn indent(&self) -> usize {
		self.indent
	}
}

impl Default for FixtureSerializer {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixtures::{FixtureParser, FixtureRecord, Literal};
	use rstest::rstest;
	use tempfile::tempdir;

	fn document() -> FixtureDocument {
		FixtureDocument::from_records(
			"id",
			vec![
				FixtureRecord::new("course", 42_i64)
					.with_field("title", Literal::Text("Rust".into())),
			],
		)
	}

	#[rstest]
	fn test_serialize_json_pretty() {
		let serializer = FixtureSerializer::new();

		let output = serializer.serialize(&document()).unwrap();
		assert!(output.contains("\"model\": \"course\""));
		assert!(output.contains("\"primary_key\": \"id\""));
		assert!(output.ends_with('\n'));
	}

	#[rstest]
	fn test_serialize_json_custom_indent() {
		let serializer = FixtureSerializer::new().with_indent(4);

		let output = serializer.serialize(&document()).unwrap();
		assert!(output.contains("\n    \"version\": 1"));
	}

	#[rstest]
	fn test_serialize_json_compact() {
		let serializer = FixtureSerializer::new().with_indent(0);

		let output = serializer.serialize(&document()).unwrap();
		assert!(!output.contains('\n'));
	}

	#[rstest]
	fn test_serialize_is_deterministic() {
		let serializer = FixtureSerializer::new();
		assert_eq!(
			serializer.serialize(&document()).unwrap(),
			serializer.serialize(&document()).unwrap()
		);
	}

	#[rstest]
	fn test_serialized_output_parses_back() {
		let serializer = FixtureSerializer::new();
		let output = serializer.serialize(&document()).unwrap();

		let parsed = FixtureParser::new()
			.parse_string(&output, FixtureFormat::Json)
			.unwrap();
		assert_eq!(parsed, document());
	}

	#[rstest]
	fn test_write_to_file() {
		let serializer = FixtureSerializer::new();

		let dir = tempdir().unwrap();
		let path = dir.path().join("fixtures.json");

		serializer.write_to_file(&document(), &path).unwrap();

		let content = std::fs::read_to_string(&path).unwrap();
		assert!(content.contains("course"));
	}

	#[cfg(feature = "yaml")]
	#[rstest]
	fn test_serialize_yaml() {
		let serializer = FixtureSerializer::new().with_format(FixtureFormat::Yaml);

		let output = serializer.serialize(&document()).unwrap();
		assert!(output.contains("model: course"));
		assert!(output.contains("primary_key: id"));
	}

	#[cfg(not(feature = "yaml"))]
	#[rstest]
	fn test_serialize_yaml_requires_feature() {
		let serializer = FixtureSerializer::new().with_format(FixtureFormat::Yaml);
		assert!(matches!(
			serializer.serialize(&document()),
			Err(SeedingError::UnsupportedExtension(_))
		));
	}
}
