//! dumpdata command implementation.
//!
//! This command captures entity kinds from a source store into a fixture file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rekey_db::{EntityKind, SourceStore};

use crate::error::{SeedingError, SeedingResult};
use crate::fixtures::{
	DEFAULT_CHUNK_SIZE, DEFAULT_PRIMARY_KEY, DependencyGraph, FixtureDocument, FixtureFormat,
	FixtureSerializer, FixtureWriter, ValueSerializerRegistry,
};
use crate::settings::Settings;

/// Arguments for the dumpdata command.
#[derive(Debug, Clone, Default)]
pub struct DumpDataArgs {
	/// Entity kinds to capture, in load order unless dependency ordering is on.
	pub kinds: Vec<EntityKind>,

	/// Output file. The document is only returned when `None`.
	pub output: Option<PathBuf>,
}

/// Options for the dumpdata command.
#[derive(Debug, Clone)]
pub struct DumpDataOptions {
	/// Primary-key attribute name.
	pub primary_key: String,

	/// Attributes to leave out, per kind. Kinds not listed leave out the
	/// primary key only.
	pub exclude: BTreeMap<EntityKind, Vec<String>>,

	/// Reorder `kinds` by foreign-key dependencies.
	pub order_by_dependencies: bool,

	/// Output format. Defaults to the output file's extension.
	pub format: Option<FixtureFormat>,

	/// Rows fetched per round trip.
	pub chunk_size: usize,

	/// JSON indentation; `0` writes compact JSON.
	pub indent: usize,

	/// Verbosity level.
	pub verbosity: u8,
}

impl Default for DumpDataOptions {
	fn default() -> Self {
		Self {
			primary_key: DEFAULT_PRIMARY_KEY.to_string(),
			exclude: BTreeMap::new(),
			order_by_dependencies: false,
			format: None,
			chunk_size: DEFAULT_CHUNK_SIZE,
			indent: 2,
			verbosity: 0,
		}
	}
}

impl DumpDataOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Options taken from settings.
	pub fn from_settings(settings: &Settings) -> Self {
		Self {
			primary_key: settings.primary_key.clone(),
			format: Some(settings.format),
			chunk_size: settings.chunk_size,
			..Self::default()
		}
	}

	/// Sets the attributes to leave out of `kind`.
	pub fn with_exclude(mut self, kind: impl Into<EntityKind>, attributes: &[&str]) -> Self {
		self.exclude.insert(
			kind.into(),
			attributes.iter().map(|a| a.to_string()).collect(),
		);
		self
	}

	/// Sets dependency ordering.
	pub fn with_dependency_order(mut self, enabled: bool) -> Self {
		self.order_by_dependencies = enabled;
		self
	}

	/// Sets the output format.
	pub fn with_format(mut self, format: FixtureFormat) -> Self {
		self.format = Some(format);
		self
	}

	/// Sets the indentation level.
	pub fn with_indent(mut self, indent: usize) -> Self {
		self.indent = indent;
		self
	}

	/// Sets verbosity level.
	pub fn with_verbosity(mut self, level: u8) -> Self {
		self.verbosity = level;
		self
	}
}

/// Result of a dumpdata run.
#[derive(Debug, Clone)]
pub struct DumpResult {
	/// Generated document.
	pub document: FixtureDocument,

	/// File written, if any.
	pub path: Option<PathBuf>,

	/// Format used.
	pub format: FixtureFormat,
}

impl DumpResult {
	/// Number of records captured.
	pub fn records_written(&self) -> usize {
		self.document.len()
	}
}

/// The dumpdata command for capturing fixtures from a store.
///
/// # Example
///
/// ```ignore
/// let command = DumpDataCommand::new();
/// let args = DumpDataArgs {
///     kinds: vec![EntityKind::new("course"), EntityKind::new("lecture")],
///     output: Some(PathBuf::from("fixtures/school.json")),
/// };
/// let result = command.execute(&store, args, DumpDataOptions::new()).await?;
/// println!("Dumped {} records", result.records_written());
/// ```
#[derive(Debug, Default)]
pub struct DumpDataCommand {
	registry: ValueSerializerRegistry,
}

impl DumpDataCommand {
	/// Creates a new dumpdata command.
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses `registry` to serialize values.
	pub fn with_registry(mut self, registry: ValueSerializerRegistry) -> Self {
		self.registry = registry;
		self
	}

	/// Returns the command name.
	pub fn name(&self) -> &str {
		"dumpdata"
	}

	/// Returns the command description.
	pub fn description(&self) -> &str {
		"Captures the rows of the named entity kinds as fixtures"
	}

	/// Returns the command help text.
	pub fn help(&self) -> &str {
		r#"
Usage: dumpdata [options] kind [kind ...]

Captures the rows of the named entity kinds as fixtures.

Arguments:
  kind                 Entity kinds to capture, referenced kinds first

Options:
  --output, -o FILE    Write fixtures to FILE
  --format FORMAT      json or yaml (default: from FILE extension)
  --exclude KIND.ATTR  Leave an attribute out of the fixtures
  --order              Order kinds by foreign-key dependencies
  --verbosity LEVEL    Verbosity level (0=minimal, 1=normal, 2=verbose)
"#
	}

	/// Executes the dumpdata command.
	pub async fn execute<S>(
		&self,
		store: &S,
		args: DumpDataArgs,
		options: DumpDataOptions,
	) -> SeedingResult<DumpResult>
	where
		S: SourceStore + ?Sized,
	{
		if args.kinds.is_empty() {
			return Err(SeedingError::ValidationError {
				field: "kinds".to_string(),
				message: "At least one entity kind must be specified".to_string(),
			});
		}

		let format = match (options.format, args.output.as_deref()) {
			(Some(format), _) => format,
			(None, Some(path)) => FixtureFormat::from_path(path).ok_or_else(|| {
				SeedingError::UnsupportedExtension(path.display().to_string())
			})?,
			(None, None) => FixtureFormat::default(),
		};

		let mut writer = FixtureWriter::new(store)
			.with_primary_key(options.primary_key.clone())
			.with_chunk_size(options.chunk_size)
			.with_registry(self.registry.clone());

		let kinds = if options.order_by_dependencies {
			let graph = DependencyGraph::from_introspector(store, &args.kinds).await?;
			graph.topological_order()?
		} else {
			args.kinds
		};

		for kind in &kinds {
			let count = match options.exclude.get(kind) {
				Some(exclude) => {
					let exclude: Vec<&str> = exclude.iter().map(String::as_str).collect();
					writer.generate_excluding(kind, &exclude).await?
				}
				None => writer.generate(kind).await?,
			};
			if options.verbosity > 1 {
				println!("{}: {} object(s)", kind, count);
			}
		}

		let document = writer.into_document();
		if let Some(path) = &args.output {
			FixtureSerializer::new()
				.with_format(format)
				.with_indent(options.indent)
				.write_to_file(&document, path)?;
		}

		let result = DumpResult {
			document,
			path: args.output,
			format,
		};
		if options.verbosity > 0 {
			self.print_result(&result);
		}
		Ok(result)
	}

	/// Prints the dump result summary.
	fn print_result(&self, result: &DumpResult) {
		match &result.path {
			Some(path) => println!(
				"Dumped {} object(s) to {} ({})",
				result.records_written(),
				path.display(),
				result.format
			),
			None => println!("Dumped {} object(s)", result.records_written()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixtures::FixtureParser;
	use rekey_db::backends::{MemoryStore, TableSchema};
	use rekey_db::{ColumnInfo, Row, ValueCategory};
	use rstest::{fixture, rstest};
	use tempfile::tempdir;

	#[fixture]
	fn store() -> MemoryStore {
		let store = MemoryStore::new();
		store.create_table(
			TableSchema::new("course")
				.id("id")
				.column(ColumnInfo::new("title", ValueCategory::Text))
				.column(ColumnInfo::new("secret", ValueCategory::Text)),
		);
		store.create_table(
			TableSchema::new("lecture")
				.id("id")
				.foreign_key("course_id", "course"),
		);
		store
			.insert_row(
				&EntityKind::new("course"),
				Row::new()
					.with("id", 42_i64)
					.with("title", "Rust")
					.with("secret", "hunter2"),
			)
			.unwrap();
		store
			.insert_row(
				&EntityKind::new("lecture"),
				Row::new().with("id", 7_i64).with("course_id", 42_i64),
			)
			.unwrap();
		store
	}

	#[rstest]
	fn test_command_metadata() {
		let cmd = DumpDataCommand::new();
		assert_eq!(cmd.name(), "dumpdata");
		assert!(!cmd.description().is_empty());
		assert!(cmd.help().contains("--output"));
	}

	#[rstest]
	fn test_options_from_settings() {
		let settings = Settings {
			primary_key: "uid".to_string(),
			chunk_size: 5,
			format: FixtureFormat::Yaml,
			..Settings::default()
		};
		let options = DumpDataOptions::from_settings(&settings);
		assert_eq!(options.primary_key, "uid");
		assert_eq!(options.chunk_size, 5);
		assert_eq!(options.format, Some(FixtureFormat::Yaml));
	}

	#[rstest]
	#[tokio::test]
	async fn test_execute_empty_kinds(store: MemoryStore) {
		let result = DumpDataCommand::new()
			.execute(&store, DumpDataArgs::default(), DumpDataOptions::new())
			.await;
		assert!(matches!(result, Err(SeedingError::ValidationError { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_execute_writes_file(store: MemoryStore) {
		let dir = tempdir().unwrap();
		let path = dir.path().join("school.json");
		let args = DumpDataArgs {
			kinds: vec![EntityKind::new("lecture"), EntityKind::new("course")],
			output: Some(path.clone()),
		};
		let options = DumpDataOptions::new()
			.with_dependency_order(true)
			.with_exclude("course", &["id", "secret"]);

		let result = DumpDataCommand::new()
			.execute(&store, args, options)
			.await
			.unwrap();
		assert_eq!(result.records_written(), 2);
		assert_eq!(result.format, FixtureFormat::Json);

		let parsed = FixtureParser::new().parse_file(&path).unwrap();
		assert_eq!(parsed, result.document);
		assert_eq!(parsed.records[0].model, EntityKind::new("course"));
		assert!(parsed.records[0].field("secret").is_none());
		assert!(parsed.records[0].field("title").is_some());
	}

	#[rstest]
	#[tokio::test]
	async fn test_execute_unknown_extension(store: MemoryStore) {
		let args = DumpDataArgs {
			kinds: vec![EntityKind::new("course")],
			output: Some(PathBuf::from("school.py")),
		};
		let result = DumpDataCommand::new()
			.execute(&store, args, DumpDataOptions::new())
			.await;
		assert!(matches!(result, Err(SeedingError::UnsupportedExtension(_))));
	}
}
