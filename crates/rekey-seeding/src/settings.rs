//! Settings for fixture generation and loading.
//!
//! Settings come from an optional TOML file, then `REKEY_*` environment
//! variables override individual keys:
//!
//! ```toml
//! primary_key = "id"
//! chunk_size = 50
//! flush_every = 500
//! format = "json"
//! verify_order = false
//! database_url = "sqlite://source.db"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SeedingError, SeedingResult};
use crate::fixtures::{
	DEFAULT_CHUNK_SIZE, DEFAULT_FLUSH_EVERY, DEFAULT_PRIMARY_KEY, FixtureFormat, LoadOptions,
};

/// Prefix of environment variables read by [`Settings::with_env_overrides`].
pub const ENV_PREFIX: &str = "REKEY_";

/// Fixture settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	/// Primary-key attribute name shared by every kind.
	pub primary_key: String,

	/// Rows fetched per round trip while generating.
	pub chunk_size: usize,

	/// Records inserted between two flushes while loading.
	pub flush_every: usize,

	/// Output format of generated fixtures.
	pub format: FixtureFormat,

	/// Check the kind order before loading.
	pub verify_order: bool,

	/// Store to connect to, if the caller lets settings pick it.
	pub database_url: Option<String>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			primary_key: DEFAULT_PRIMARY_KEY.to_string(),
			chunk_size: DEFAULT_CHUNK_SIZE,
			flush_every: DEFAULT_FLUSH_EVERY,
			format: FixtureFormat::Json,
			verify_order: false,
			database_url: None,
		}
	}
}

impl Settings {
	/// Parses settings from TOML text. Missing keys keep their defaults.
	pub fn from_toml_str(content: &str) -> SeedingResult<Self> {
		toml::from_str(content).map_err(|e| SeedingError::SettingsError(e.to_string()))
	}

	/// Reads settings from a TOML file. A missing file yields the defaults.
	pub fn from_file(path: &Path) -> SeedingResult<Self> {
		if !path.exists() {
			return Ok(Self::default());
		}
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	/// Reads the file (if any), applies environment overrides and validates.
	pub fn load(path: Option<&Path>) -> SeedingResult<Self> {
		let settings = match path {
			Some(path) => Self::from_file(path)?,
			None => Self::default(),
		};
		let settings = settings.with_env_overrides()?;
		settings.validate()?;
		Ok(settings)
	}

	/// Applies `REKEY_*` variables from the process environment.
	pub fn with_env_overrides(self) -> SeedingResult<Self> {
		self.with_env_overrides_from(std::env::vars())
	}

	/// Applies `REKEY_*` variables from `vars`.
	///
	/// Keys are matched case-insensitively after the prefix
	/// (`REKEY_CHUNK_SIZE` sets `chunk_size`). Other variables are ignored.
	pub fn with_env_overrides_from<I, K, V>(mut self, vars: I) -> SeedingResult<Self>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		for (key, value) in vars {
			let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
				continue;
			};
			let value = value.as_ref();
			match name.to_lowercase().as_str() {
				"primary_key" => self.primary_key = value.to_string(),
				"chunk_size" => self.chunk_size = parse_env(name, value)?,
				"flush_every" => self.flush_every = parse_env(name, value)?,
				"verify_order" => self.verify_order = parse_bool(name, value)?,
				"database_url" => self.database_url = Some(value.to_string()),
				"format" => {
					self.format = FixtureFormat::from_extension(value).ok_or_else(|| {
						SeedingError::SettingsError(format!(
							"{}{}: unknown fixture format {:?}",
							ENV_PREFIX, name, value
						))
					})?
				}
				_ => tracing::debug!(variable = key.as_ref(), "ignoring unknown setting"),
			}
		}
		Ok(self)
	}

	/// Checks value ranges.
	pub fn validate(&self) -> SeedingResult<()> {
		if self.primary_key.trim().is_empty() {
			return Err(SeedingError::ValidationError {
				field: "primary_key".to_string(),
				message: "must not be empty".to_string(),
			});
		}
		if self.chunk_size == 0 {
			return Err(SeedingError::ValidationError {
				field: "chunk_size".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}
		if self.flush_every == 0 {
			return Err(SeedingError::ValidationError {
				field: "flush_every".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}
		Ok(())
	}

	/// Loader options derived from these settings.
	pub fn load_options(&self) -> LoadOptions {
		LoadOptions::new()
			.with_primary_key(self.primary_key.clone())
			.with_flush_every(self.flush_every)
			.with_verify_order(self.verify_order)
	}
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> SeedingResult<T>
where
	T::Err: std::fmt::Display,
{
	value.trim().parse().map_err(|e: T::Err| {
		SeedingError::SettingsError(format!("{}{}: {}", ENV_PREFIX, name, e))
	})
}

fn parse_bool(name: &str, value: &str) -> SeedingResult<bool> {
	match value.trim().to_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other => Err(SeedingError::SettingsError(format!(
			"{}{}: expected a boolean, got {:?}",
			ENV_PREFIX, name, other
		))),
	}
}
