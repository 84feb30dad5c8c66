//! Snapshot one SQLite database and replay it into another.

#![cfg(feature = "sqlite")]

use rekey_db::backends::SqliteStore;
use rekey_db::{EntityKind, PrimaryKey, Row, SourceStore, Value};
use rekey_seeding::SeedingError;
use rekey_seeding::commands::{
	DumpDataArgs, DumpDataCommand, DumpDataOptions, LoadDataArgs, LoadDataCommand, LoadDataOptions,
};
use rekey_seeding::fixtures::{FixtureLoader, IdentityKey, IdentityMap};
use rstest::rstest;
use tempfile::tempdir;

const SCHEMA: &str = "
	CREATE TABLE course (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		title TEXT NOT NULL,
		starts DATE,
		rating REAL
	);
	CREATE TABLE lecture (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		title TEXT,
		course_id INTEGER REFERENCES course(id)
	);
";

async fn source() -> SqliteStore {
	let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
	store.execute(SCHEMA).await.unwrap();
	store
		.execute(
			"INSERT INTO course (id, title, starts, rating) VALUES
				(42, 'Rust', '2024-09-01', 4.5),
				(43, 'Go', NULL, NULL);
			INSERT INTO lecture (id, title, course_id) VALUES
				(7, 'Ownership', 42),
				(8, 'Goroutines', 43),
				(9, 'Lifetimes', 42),
				(10, 'Unassigned', NULL);",
		)
		.await
		.unwrap();
	store
}

async fn destination() -> SqliteStore {
	let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
	store.execute(SCHEMA).await.unwrap();
	store
		.execute("INSERT INTO course (id, title) VALUES (1, 'Existing');")
		.await
		.unwrap();
	store
}

async fn all_rows(store: &SqliteStore, kind: &str) -> Vec<Row> {
	store
		.fetch_chunk(&EntityKind::new(kind), "id", None, 1000)
		.await
		.unwrap()
}

fn text(row: &Row, attribute: &str) -> String {
	match row.get(attribute) {
		Some(Value::Text(value)) => value.clone(),
		other => panic!("{} is not text: {:?}", attribute, other),
	}
}

#[rstest]
#[tokio::test]
async fn test_dump_and_load_between_databases() {
	let dir = tempdir().unwrap();
	let fixture_path = dir.path().join("school.json");
	let map_path = dir.path().join("identities.json");

	let source = source().await;
	let dumped = DumpDataCommand::new()
		.execute(
			&source,
			DumpDataArgs {
				kinds: vec![EntityKind::new("lecture"), EntityKind::new("course")],
				output: Some(fixture_path.clone()),
			},
			DumpDataOptions::new().with_dependency_order(true),
		)
		.await
		.unwrap();
	assert_eq!(dumped.records_written(), 6);

	let destination = destination().await;
	let result = LoadDataCommand::new()
		.execute(
			&destination,
			LoadDataArgs {
				fixture_paths: vec![fixture_path],
			},
			LoadDataOptions::new()
				.with_identity_map(&map_path)
				.with_verify_order(true)
				.with_flush_every(2),
		)
		.await
		.unwrap();
	assert_eq!(result.records_loaded, 6);
	assert_eq!(result.flushes, 3);

	let identity_map = IdentityMap::load_from(&map_path).unwrap();
	let rust = identity_map
		.get(&IdentityKey::new("course", 42_i64))
		.cloned()
		.unwrap();
	assert_ne!(rust, PrimaryKey::Integer(42));

	let courses = all_rows(&destination, "course").await;
	assert_eq!(courses.len(), 3);
	let loaded_rust = courses
		.iter()
		.find(|row| row.primary_key("id") == Some(rust.clone()))
		.unwrap();
	assert_eq!(text(loaded_rust, "title"), "Rust");
	assert_eq!(
		loaded_rust.get("starts"),
		Some(&Value::Date(
			chrono::NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
		))
	);
	assert_eq!(loaded_rust.get("rating"), Some(&Value::Float(4.5)));

	let lectures = all_rows(&destination, "lecture").await;
	assert_eq!(lectures.len(), 4);
	for row in &lectures {
		let expected = match text(row, "title").as_str() {
			"Ownership" | "Lifetimes" => Some(rust.to_value()),
			"Goroutines" => identity_map
				.get(&IdentityKey::new("course", 43_i64))
				.map(PrimaryKey::to_value),
			"Unassigned" => None,
			other => panic!("unexpected lecture {}", other),
		};
		assert_eq!(row.get("course_id"), Some(&expected.unwrap_or(Value::Null)));
	}
}

#[rstest]
#[tokio::test]
async fn test_failed_load_rolls_back() {
	let source = source().await;
	let dumped = DumpDataCommand::new()
		.execute(
			&source,
			DumpDataArgs {
				kinds: vec![EntityKind::new("course"), EntityKind::new("lecture")],
				output: None,
			},
			DumpDataOptions::new(),
		)
		.await
		.unwrap();

	// Drop the Go course so lecture 8 points at nothing.
	let mut document = dumped.document;
	let go = IdentityKey::new("course", 43_i64);
	document
		.records
		.retain(|record| IdentityKey::new(record.model.clone(), record.pk.clone()) != go);

	let destination = destination().await;
	let mut identity_map = IdentityMap::new();
	let result = FixtureLoader::new(&destination)
		.load_document(&document, &mut identity_map)
		.await;

	assert!(matches!(
		result,
		Err(SeedingError::UnresolvedReferenceError { .. })
	));
	assert!(identity_map.is_empty());
	assert_eq!(all_rows(&destination, "course").await.len(), 1);
	assert!(all_rows(&destination, "lecture").await.is_empty());
}
