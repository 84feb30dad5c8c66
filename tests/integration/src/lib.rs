//! Integration test utilities for rekey
//!
//! Shared stores for tests that exercise the `rekey` facade end to end.

use rekey::db::backends::{MemoryStore, TableSchema};
use rekey::db::{ColumnInfo, DbResult, EntityKind, PrimaryKey, Row, ValueCategory};

/// Empty course/lecture schema; `lecture.course_id` references `course`.
pub fn school() -> MemoryStore {
	let store = MemoryStore::new();
	store.create_table(
		TableSchema::new("course")
			.id("id")
			.column(ColumnInfo::new("title", ValueCategory::Text)),
	);
	store.create_table(
		TableSchema::new("lecture")
			.id("id")
			.foreign_key("course_id", "course"),
	);
	store
}

/// Adds a committed course row.
pub fn add_course(store: &MemoryStore, id: i64, title: &str) -> DbResult<PrimaryKey> {
	store.insert_row(
		&EntityKind::new("course"),
		Row::new().with("id", id).with("title", title),
	)
}
