//! Original-to-new identity translation.
//!
//! An [`IdentityMap`] remembers, for every loaded record, which primary key the
//! destination store assigned to it. Keys are typed `(kind, original pk)`
//! pairs, so `("ab", 1)` and `("a", "b1")` never collide.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use rekey_db::{EntityKind, PrimaryKey};
use serde::{Deserialize, Serialize};

use crate::error::{SeedingError, SeedingResult};

/// Identity of a row in the *source* store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
	/// Entity kind of the row.
	pub kind: EntityKind,
	/// Primary key the row had in the source store.
	pub original: PrimaryKey,
}

impl IdentityKey {
	/// Creates an identity key.
	pub fn new(kind: impl Into<EntityKind>, original: impl Into<PrimaryKey>) -> Self {
		Self {
			kind: kind.into(),
			original: original.into(),
		}
	}
}

impl fmt::Display for IdentityKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.kind, self.original)
	}
}

#[derive(Serialize, Deserialize)]
struct IdentityEntry {
	kind: EntityKind,
	original: PrimaryKey,
	new: PrimaryKey,
}

/// Mapping from source identities to destination primary keys.
///
/// Entries are only ever added. Iteration is ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
	entries: BTreeMap<IdentityKey, PrimaryKey>,
}

impl IdentityMap {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records that `key` was loaded as `new`.
	///
	/// # Errors
	///
	/// [`SeedingError::DuplicateFixtureError`] when `key` is already mapped;
	/// the existing entry is left untouched.
	pub fn insert(&mut self, key: IdentityKey, new: PrimaryKey) -> SeedingResult<()> {
		if self.entries.contains_key(&key) {
			return Err(SeedingError::DuplicateFixtureError {
				key: key.to_string(),
			});
		}
		self.entries.insert(key, new);
		Ok(())
	}

	/// Returns the new key of `key`.
	pub fn get(&self, key: &IdentityKey) -> Option<&PrimaryKey> {
		self.entries.get(key)
	}

	/// Returns the new key of `(kind, original)`.
	pub fn resolve(&self, kind: &EntityKind, original: &PrimaryKey) -> Option<&PrimaryKey> {
		self.entries
			.get(&IdentityKey::new(kind.clone(), original.clone()))
	}

	/// Returns true when `key` is mapped.
	pub fn contains(&self, key: &IdentityKey) -> bool {
		self.entries.contains_key(key)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true when the map is empty.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates entries in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&IdentityKey, &PrimaryKey)> {
		self.entries.iter()
	}

	/// Writes the map to `path` as JSON.
	pub fn save_to(&self, path: &Path) -> SeedingResult<()> {
		let entries: Vec<IdentityEntry> = self
			.entries
			.iter()
			.map(|(key, new)| IdentityEntry {
				kind: key.kind.clone(),
				original: key.original.clone(),
				new: new.clone(),
			})
			.collect();
		let content = serde_json::to_string_pretty(&entries)?;
		std::fs::write(path, content)?;
		Ok(())
	}

	/// Reads a map written by [`save_to`](Self::save_to).
	///
	/// # Errors
	///
	/// [`SeedingError::FileNotFound`] when `path` does not exist, and
	/// [`SeedingError::DuplicateFixtureError`] when the file maps one identity
	/// twice.
	pub fn load_from(path: &Path) -> SeedingResult<Self> {
		let content = std::fs::read_to_string(path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				SeedingError::FileNotFound(path.display().to_string())
			} else {
				SeedingError::IoError(e)
			}
		})?;
		let entries: Vec<IdentityEntry> = serde_json::from_str(&content)?;

		let mut map = Self::new();
		for entry in entries {
			map.insert(IdentityKey::new(entry.kind, entry.original), entry.new)?;
		}
		Ok(map)
	}
}

impl<'a> IntoIterator for &'a IdentityMap {
	type Item = (&'a IdentityKey, &'a PrimaryKey);
	type IntoIter = std::collections::btree_map::Iter<'a, IdentityKey, PrimaryKey>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use tempfile::tempdir;

	#[rstest]
	fn test_insert_and_resolve() {
		let mut map = IdentityMap::new();
		map.insert(IdentityKey::new("course", 42_i64), PrimaryKey::Integer(1))
			.unwrap();

		assert_eq!(
			map.resolve(&EntityKind::new("course"), &PrimaryKey::Integer(42)),
			Some(&PrimaryKey::Integer(1))
		);
		assert_eq!(
			map.resolve(&EntityKind::new("lecture"), &PrimaryKey::Integer(42)),
			None
		);
		assert_eq!(map.len(), 1);
	}

	#[rstest]
	fn test_duplicate_insert_is_rejected() {
		let mut map = IdentityMap::new();
		let key = IdentityKey::new("course", 42_i64);
		map.insert(key.clone(), PrimaryKey::Integer(1)).unwrap();

		let result = map.insert(key.clone(), PrimaryKey::Integer(2));
		match result {
			Err(SeedingError::DuplicateFixtureError { key }) => assert_eq!(key, "course#42"),
			other => panic!("expected DuplicateFixtureError, got {:?}", other),
		}
		assert_eq!(map.get(&key), Some(&PrimaryKey::Integer(1)));
	}

	#[rstest]
	fn test_keys_do_not_alias() {
		let mut map = IdentityMap::new();
		map.insert(IdentityKey::new("ab", 1_i64), PrimaryKey::Integer(10))
			.unwrap();
		map.insert(IdentityKey::new("a", "b1"), PrimaryKey::Integer(20))
			.unwrap();
		map.insert(IdentityKey::new("ab", "1"), PrimaryKey::Integer(30))
			.unwrap();

		assert_eq!(map.len(), 3);
	}

	#[rstest]
	fn test_save_and_load() {
		let mut map = IdentityMap::new();
		map.insert(IdentityKey::new("course", 42_i64), PrimaryKey::Integer(1))
			.unwrap();
		map.insert(IdentityKey::new("tag", "rust"), PrimaryKey::Text("t-1".into()))
			.unwrap();

		let dir = tempdir().unwrap();
		let path = dir.path().join("identity.json");
		map.save_to(&path).unwrap();

		assert_eq!(IdentityMap::load_from(&path).unwrap(), map);
	}

	#[rstest]
	fn test_load_missing_file() {
		let result = IdentityMap::load_from(Path::new("/nonexistent/identity.json"));
		assert!(matches!(result, Err(SeedingError::FileNotFound(_))));
	}

	#[rstest]
	fn test_load_rejects_duplicate_entries() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("identity.json");
		std::fs::write(
			&path,
			r#"[
				{"kind": "course", "original": 42, "new": 1},
				{"kind": "course", "original": 42, "new": 2}
			]"#,
		)
		.unwrap();

		assert!(matches!(
			IdentityMap::load_from(&path),
			Err(SeedingError::DuplicateFixtureError { .. })
		));
	}

	#[rstest]
	fn test_display() {
		assert_eq!(IdentityKey::new("lecture", 7_i64).to_string(), "lecture#7");
	}
}
