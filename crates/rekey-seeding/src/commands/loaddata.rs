//! loaddata command implementation.
//!
//! This command loads fixture files into a destination store.

use std::path::{Path, PathBuf};

use rekey_db::DestinationStore;

use crate::error::{SeedingError, SeedingResult};
use crate::fixtures::{
	DEFAULT_FLUSH_EVERY, FixtureLoader, FixtureParser, IdentityMap, LoadOptions, LoadResult,
	ValueSerializerRegistry,
};
use crate::settings::Settings;

/// Arguments for the loaddata command.
#[derive(Debug, Clone, Default)]
pub struct LoadDataArgs {
	/// Fixture file paths to load, in order.
	pub fixture_paths: Vec<PathBuf>,
}

/// Options for the loaddata command.
#[derive(Debug, Clone)]
pub struct LoadDataOptions {
	/// Identity map file. Read before loading when it exists, written back
	/// after a successful load.
	pub identity_map: Option<PathBuf>,

	/// Records inserted between two flushes.
	pub flush_every: usize,

	/// Check the kind order against foreign keys before loading.
	pub verify_order: bool,

	/// Verbosity level.
	pub verbosity: u8,
}

impl Default for LoadDataOptions {
	fn default() -> Self {
		Self {
			identity_map: None,
			flush_every: DEFAULT_FLUSH_EVERY,
			verify_order: false,
			verbosity: 0,
		}
	}
}

impl LoadDataOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Options taken from settings.
	pub fn from_settings(settings: &Settings) -> Self {
		Self {
			flush_every: settings.flush_every,
			verify_order: settings.verify_order,
			..Self::default()
		}
	}

	/// Sets the identity map file.
	pub fn with_identity_map(mut self, path: impl Into<PathBuf>) -> Self {
		self.identity_map = Some(path.into());
		self
	}

	/// Sets the flush interval.
	pub fn with_flush_every(mut self, flush_every: usize) -> Self {
		self.flush_every = flush_every;
		self
	}

	/// Sets order verification.
	pub fn with_verify_order(mut self, verify_order: bool) -> Self {
		self.verify_order = verify_order;
		self
	}

	/// Sets verbosity level.
	pub fn with_verbosity(mut self, level: u8) -> Self {
		self.verbosity = level;
		self
	}
}

/// The loaddata command for loading fixtures into a store.
///
/// All files are loaded in one transaction. Foreign keys are rewritten to
/// the keys the destination assigns; with an identity map file, references
/// to records loaded by earlier runs resolve too.
///
/// # Example
///
/// ```ignore
/// let command = LoadDataCommand::new();
/// let args = LoadDataArgs {
///     fixture_paths: vec![PathBuf::from("fixtures/school.json")],
/// };
/// let options = LoadDataOptions::new()
///     .with_identity_map("fixtures/identities.json")
///     .with_verbosity(1);
/// let result = command.execute(&store, args, options).await?;
/// println!("Loaded {} records", result.records_loaded);
/// ```
#[derive(Debug, Default)]
pub struct LoadDataCommand {
	registry: ValueSerializerRegistry,
}

impl LoadDataCommand {
	/// Creates a new loaddata command.
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses `registry` to decode fixture literals.
	pub fn with_registry(mut self, registry: ValueSerializerRegistry) -> Self {
		self.registry = registry;
		self
	}

	/// Returns the command name.
	pub fn name(&self) -> &str {
		"loaddata"
	}

	/// Returns the command description.
	pub fn description(&self) -> &str {
		"Installs the named fixture(s) in the database"
	}

	/// Returns the command help text.
	pub fn help(&self) -> &str {
		r#"
Usage: loaddata [options] fixture [fixture ...]

Installs the named fixture(s) in the database.

Arguments:
  fixture              One or more fixture files to load, in order

Options:
  --identity-map FILE  Resolve references through FILE and update it
  --flush-every N      Flush after every N records (default: 500)
  --verify-order       Reject fixtures whose kinds are out of order
  --verbosity LEVEL    Verbosity level (0=minimal, 1=normal, 2=verbose)
"#
	}

	/// Executes the loaddata command.
	///
	/// # Arguments
	///
	/// * `store` - Destination store
	/// * `args` - Command arguments (fixture paths)
	/// * `options` - Command options
	///
	/// # Returns
	///
	/// Returns the load result with statistics.
	pub async fn execute<D>(
		&self,
		store: &D,
		args: LoadDataArgs,
		options: LoadDataOptions,
	) -> SeedingResult<LoadResult>
	where
		D: DestinationStore + ?Sized,
	{
		if args.fixture_paths.is_empty() {
			return Err(SeedingError::ValidationError {
				field: "fixture_paths".to_string(),
				message: "At least one fixture file must be specified".to_string(),
			});
		}

		for path in &args.fixture_paths {
			if !path.exists() {
				return Err(SeedingError::FileNotFound(path.display().to_string()));
			}
		}

		let paths: Vec<&Path> = args.fixture_paths.iter().map(|p| p.as_path()).collect();
		let document = FixtureParser::new().parse_files(&paths)?;

		let mut identity_map = match &options.identity_map {
			Some(path) if path.exists() => IdentityMap::load_from(path)?,
			_ => IdentityMap::new(),
		};

		let loader = FixtureLoader::new(store)
			.with_registry(self.registry.clone())
			.with_options(
				LoadOptions::new()
					.with_primary_key(document.primary_key.clone())
					.with_flush_every(options.flush_every)
					.with_verify_order(options.verify_order),
			);
		let result = loader.load_document(&document, &mut identity_map).await?;

		if let Some(path) = &options.identity_map {
			identity_map.save_to(path)?;
		}

		if options.verbosity > 0 {
			self.print_result(&result, options.verbosity);
		}

		Ok(result)
	}

	/// Prints the load result summary.
	fn print_result(&self, result: &LoadResult, verbosity: u8) {
		println!("Installed {} object(s)", result.records_loaded);

		if verbosity > 1 {
			for (kind, count) in &result.per_kind {
				println!("  {}: {}", kind, count);
			}
		}
	}
}
