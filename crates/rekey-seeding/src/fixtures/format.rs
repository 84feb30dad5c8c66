//! Fixture format definitions.
//!
//! A fixture artifact is a versioned [`FixtureDocument`]: the primary-key
//! attribute name, a manifest of the captured entity kinds, and the ordered
//! records.

use std::collections::BTreeMap;
use std::path::Path;

use rekey_db::{EntityKind, ForeignKeyDescriptor, PrimaryKey};
use serde::{Deserialize, Serialize};

use super::values::Literal;

/// Version written into every document.
pub const FORMAT_VERSION: u32 = 1;

/// Default primary-key attribute name.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// One captured row.
///
/// `pk` is the primary key the row had in the *source* store. It identifies
/// the record during loading and is never inserted.
///
/// # Example
///
/// ```json
/// {
///   "model": "lecture",
///   "pk": 7,
///   "fields": {
///     "course_id": 42,
///     "title": "Ownership"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureRecord {
	/// Entity kind the row belongs to.
	pub model: EntityKind,

	/// Original primary key.
	pub pk: PrimaryKey,

	/// Attribute literals, primary key excluded.
	#[serde(default)]
	pub fields: BTreeMap<String, Literal>,
}

impl FixtureRecord {
	/// Creates a record with no fields.
	pub fn new(model: impl Into<EntityKind>, pk: impl Into<PrimaryKey>) -> Self {
		Self {
			model: model.into(),
			pk: pk.into(),
			fields: BTreeMap::new(),
		}
	}

	/// Builder-style field setter.
	pub fn with_field(mut self, attribute: impl Into<String>, literal: Literal) -> Self {
		self.fields.insert(attribute.into(), literal);
		self
	}

	/// Returns the literal of an attribute.
	pub fn field(&self, attribute: &str) -> Option<&Literal> {
		self.fields.get(attribute)
	}
}

/// Supported fixture file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureFormat {
	/// JSON format (default).
	#[default]
	Json,

	/// YAML format (requires `yaml` feature).
	Yaml,
}

impl FixtureFormat {
	/// Determines the fixture format from a file extension.
	///
	/// # Example
	///
	/// ```
	/// # use rekey_seeding::fixtures::FixtureFormat;
	/// assert_eq!(FixtureFormat::from_extension("json"), Some(FixtureFormat::Json));
	/// assert_eq!(FixtureFormat::from_extension("yml"), Some(FixtureFormat::Yaml));
	/// assert_eq!(FixtureFormat::from_extension("py"), None);
	/// ```
	pub fn from_extension(ext: &str) -> Option<Self> {
		match ext.to_lowercase().as_str() {
			"json" => Some(Self::Json),
			"yaml" | "yml" => Some(Self::Yaml),
			_ => None,
		}
	}

	/// Determines the fixture format from a file path.
	pub fn from_path(path: &Path) -> Option<Self> {
		path.extension()
			.and_then(|ext| ext.to_str())
			.and_then(Self::from_extension)
	}

	/// Returns the default file extension for this format.
	pub fn extension(&self) -> &'static str {
		match self {
			Self::Json => "json",
			Self::Yaml => "yaml",
		}
	}
}

impl std::fmt::Display for FixtureFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Json => write!(f, "JSON"),
			Self::Yaml => write!(f, "YAML"),
		}
	}
}

/// What a document knows about one captured entity kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KindManifest {
	/// Entity kind.
	pub name: EntityKind,

	/// Captured attributes in declaration order.
	pub attributes: Vec<String>,

	/// Foreign keys declared on the kind at capture time.
	#[serde(default)]
	pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl KindManifest {
	/// Creates a manifest entry.
	pub fn new(
		name: impl Into<EntityKind>,
		attributes: Vec<String>,
		foreign_keys: Vec<ForeignKeyDescriptor>,
	) -> Self {
		Self {
			name: name.into(),
			attributes,
			foreign_keys,
		}
	}
}

/// A complete fixture artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureDocument {
	/// Format version.
	pub version: u32,

	/// Primary-key attribute name shared by every kind.
	pub primary_key: String,

	/// Captured kinds in generation order.
	#[serde(default)]
	pub kinds: Vec<KindManifest>,

	/// Ordered fixture sequence.
	pub records: Vec<FixtureRecord>,
}

impl FixtureDocument {
	/// Creates an empty document using `primary_key`.
	pub fn new(primary_key: impl Into<String>) -> Self {
		Self {
			version: FORMAT_VERSION,
			primary_key: primary_key.into(),
			kinds: Vec::new(),
			records: Vec::new(),
		}
	}

	/// Builds a document around an existing sequence, without a manifest.
	pub fn from_records(primary_key: impl Into<String>, records: Vec<FixtureRecord>) -> Self {
		Self {
			records,
			..Self::new(primary_key)
		}
	}

	/// Returns the number of records.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns true if there are no records.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Returns the manifest entry of `kind`.
	pub fn manifest(&self, kind: &EntityKind) -> Option<&KindManifest> {
		self.kinds.iter().find(|manifest| &manifest.name == kind)
	}

	/// Entity kinds in order of first appearance in the sequence.
	pub fn kinds_in_order(&self) -> Vec<&EntityKind> {
		let mut seen = Vec::new();
		for record in &self.records {
			if !seen.contains(&&record.model) {
				seen.push(&record.model);
			}
		}
		seen
	}

	/// Number of records per entity kind.
	pub fn count_by_kind(&self) -> BTreeMap<&EntityKind, usize> {
		let mut counts = BTreeMap::new();
		for record in &self.records {
			*counts.entry(&record.model).or_insert(0) += 1;
		}
		counts
	}

	/// Returns an iterator over the records.
	pub fn iter(&self) -> impl Iterator<Item = &FixtureRecord> {
		self.records.iter()
	}
}

impl IntoIterator for FixtureDocument {
	type Item = FixtureRecord;
	type IntoIter = std::vec::IntoIter<FixtureRecord>;

	fn into_iter(self) -> Self::IntoIter {
		self.records.into_iter()
	}
}

impl<'a> IntoIterator for &'a FixtureDocument {
	type Item = &'a FixtureRecord;
	type IntoIter = std::slice::Iter<'a, FixtureRecord>;

	fn into_iter(self) -> Self::IntoIter {
		self.records.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn lecture() -> FixtureRecord {
		FixtureRecord::new("lecture", 7_i64)
			.with_field("course_id", Literal::Integer(42))
			.with_field("title", Literal::Text("Ownership".into()))
	}

	#[rstest]
	fn test_fixture_record_json_shape() {
		assert_eq!(
			serde_json::to_value(lecture()).unwrap(),
			json!({
				"model": "lecture",
				"pk": 7,
				"fields": {"course_id": 42, "title": "Ownership"}
			})
		);
	}

	#[rstest]
	fn test_fixture_record_text_pk() {
		let record: FixtureRecord =
			serde_json::from_value(json!({"model": "tag", "pk": "rust", "fields": {}})).unwrap();
		assert_eq!(record.pk, PrimaryKey::Text("rust".into()));
	}

	#[rstest]
	fn test_fixture_record_fields_default_empty() {
		let record: FixtureRecord =
			serde_json::from_value(json!({"model": "tag", "pk": 1})).unwrap();
		assert!(record.fields.is_empty());
	}

	#[rstest]
	fn test_fixture_format_from_extension() {
		assert_eq!(
			FixtureFormat::from_extension("JSON"),
			Some(FixtureFormat::Json)
		);
		assert_eq!(
			FixtureFormat::from_extension("yaml"),
			Some(FixtureFormat::Yaml)
		);
		assert_eq!(FixtureFormat::from_extension("xml"), None);
	}

	#[rstest]
	fn test_fixture_format_from_path() {
		use std::path::PathBuf;
		assert_eq!(
			FixtureFormat::from_path(&PathBuf::from("dump.yml")),
			Some(FixtureFormat::Yaml)
		);
		assert_eq!(FixtureFormat::from_path(&PathBuf::from("dump")), None);
	}

	#[rstest]
	fn test_fixture_format_serde() {
		assert_eq!(
			serde_json::to_string(&FixtureFormat::Yaml).unwrap(),
			r#""yaml""#
		);
	}

	#[rstest]
	fn test_document_kind_order_and_counts() {
		let document = FixtureDocument::from_records(
			"id",
			vec![
				FixtureRecord::new("course", 42_i64),
				lecture(),
				FixtureRecord::new("course", 43_i64),
				FixtureRecord::new("lecture", 8_i64),
			],
		);

		let order: Vec<_> = document
			.kinds_in_order()
			.into_iter()
			.map(EntityKind::table_name)
			.collect();
		assert_eq!(order, vec!["course", "lecture"]);

		let counts = document.count_by_kind();
		assert_eq!(counts[&EntityKind::new("course")], 2);
		assert_eq!(counts[&EntityKind::new("lecture")], 2);
		assert_eq!(document.version, FORMAT_VERSION);
	}

	#[rstest]
	fn test_document_manifest_lookup() {
		let mut document = FixtureDocument::new("id");
		document.kinds.push(KindManifest::new(
			"lecture",
			vec!["course_id".into(), "title".into()],
			vec![ForeignKeyDescriptor::new("course_id", "course")],
		));

		let manifest = document.manifest(&EntityKind::new("lecture")).unwrap();
		assert_eq!(manifest.foreign_keys[0].target, EntityKind::new("course"));
		assert!(document.manifest(&EntityKind::new("course")).is_none());
	}
}
