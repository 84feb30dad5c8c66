//! Shared stores for rekey-seeding integration tests.
//!
//! Every test uses the same small school schema: courses, and lectures that
//! reference a course.

#![allow(dead_code)]

use chrono::NaiveDate;
use rekey_db::backends::{MemoryStore, TableSchema};
use rekey_db::{ColumnInfo, EntityKind, PrimaryKey, Row, Value, ValueCategory};

/// Course kind.
pub fn course() -> EntityKind {
	EntityKind::new("course")
}

/// Lecture kind.
pub fn lecture() -> EntityKind {
	EntityKind::new("lecture")
}

/// Empty school schema.
pub fn school_schema() -> MemoryStore {
	let store = MemoryStore::new();
	store.create_table(
		TableSchema::new("course")
			.id("id")
			.column(ColumnInfo::new("title", ValueCategory::Text).not_null())
			.column(ColumnInfo::new("starts", ValueCategory::Date))
			.column(ColumnInfo::new("rating", ValueCategory::Float)),
	);
	store.create_table(
		TableSchema::new("lecture")
			.id("id")
			.column(ColumnInfo::new("title", ValueCategory::Text))
			.foreign_key("course_id", "course"),
	);
	store
}

/// Source store: courses 42 and 43, lectures 7 and 9 on 42, lecture 8 on 43.
pub fn source_school() -> MemoryStore {
	let store = school_schema();
	for (id, title, starts) in [(42_i64, "Rust", Some((2024, 9, 1))), (43, "Go", None)] {
		store
			.insert_row(
				&course(),
				Row::new()
					.with("id", id)
					.with("title", title)
					.with(
						"starts",
						starts.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
					)
					.with("rating", 4.5),
			)
			.unwrap();
	}
	for (id, title, course_id) in [
		(7_i64, "Ownership", 42_i64),
		(8, "Goroutines", 43),
		(9, "Lifetimes", 42),
	] {
		store
			.insert_row(
				&lecture(),
				Row::new()
					.with("id", id)
					.with("title", title)
					.with("course_id", course_id),
			)
			.unwrap();
	}
	store
}

/// Destination store that already holds course 1, so loaded keys differ
/// from the source keys.
pub fn destination_school() -> MemoryStore {
	let store = school_schema();
	store
		.insert_row(
			&course(),
			Row::new().with("id", 1_i64).with("title", "Existing"),
		)
		.unwrap();
	store
}

/// Title of the course a lecture row references in `store`.
pub fn course_title_of(store: &MemoryStore, lecture_row: &Row) -> String {
	let course_id = lecture_row
		.get("course_id")
		.and_then(PrimaryKey::from_value)
		.expect("lecture without course");
	let course_row = store
		.get(&course(), &course_id)
		.unwrap()
		.expect("dangling course reference");
	match course_row.get("title") {
		Some(Value::Text(title)) => title.clone(),
		other => panic!("unexpected course title {:?}", other),
	}
}

/// Lecture titles paired with their course titles, sorted.
pub fn lecture_courses(store: &MemoryStore) -> Vec<(String, String)> {
	let mut pairs: Vec<(String, String)> = store
		.rows(&lecture())
		.unwrap()
		.iter()
		.map(|row| {
			let title = match row.get("title") {
				Some(Value::Text(title)) => title.clone(),
				other => panic!("unexpected lecture title {:?}", other),
			};
			(title, course_title_of(store, row))
		})
		.collect();
	pairs.sort();
	pairs
}
