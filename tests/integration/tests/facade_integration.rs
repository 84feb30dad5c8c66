//! The facade exposes a working generate/load path.

use rekey::db::Row;
use rekey::prelude::*;
use rekey_integration_tests::{add_course, school};
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn test_course_lecture_through_facade() {
	let source = school();
	add_course(&source, 42, "Rust").unwrap();
	source
		.insert_row(
			&EntityKind::new("lecture"),
			Row::new().with("id", 7_i64).with("course_id", 42_i64),
		)
		.unwrap();

	let mut writer = FixtureWriter::new(&source);
	writer
		.generate_all(&[EntityKind::new("lecture"), EntityKind::new("course")])
		.await
		.unwrap();

	let destination = school();
	add_course(&destination, 5, "Existing").unwrap();
	let identity_map = load_fixtures(&destination, writer.records(), "id", None)
		.await
		.unwrap();

	let new_course = identity_map
		.get(&IdentityKey::new("course", 42_i64))
		.unwrap();
	assert_eq!(new_course, &PrimaryKey::Integer(6));

	let new_lecture = identity_map
		.get(&IdentityKey::new("lecture", 7_i64))
		.unwrap();
	let lecture = destination
		.get(&EntityKind::new("lecture"), new_lecture)
		.unwrap()
		.unwrap();
	assert_eq!(lecture.get("course_id"), Some(&Value::Integer(6)));
}
