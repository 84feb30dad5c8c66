//! Scalar values as they are read from and written to a store.
//!
//! [`Value`] is a closed union: every category a store can hand back is a
//! variant here, so code that matches on it is checked for exhaustiveness.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Category of a scalar [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueCategory {
	/// Absent value.
	Null,
	/// 64-bit signed integer.
	Integer,
	/// Arbitrary-precision decimal.
	Decimal,
	/// 64-bit floating point.
	Float,
	/// UTF-8 text.
	Text,
	/// Calendar date.
	Date,
	/// Date and time without time zone.
	DateTime,
	/// Signed time span.
	Duration,
	/// Raw bytes.
	Bytes,
}

impl ValueCategory {
	/// Every category, in declaration order.
	pub const ALL: [ValueCategory; 9] = [
		Self::Null,
		Self::Integer,
		Self::Decimal,
		Self::Float,
		Self::Text,
		Self::Date,
		Self::DateTime,
		Self::Duration,
		Self::Bytes,
	];

	/// Short lowercase tag used in fixture literals.
	pub fn tag(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Integer => "integer",
			Self::Decimal => "decimal",
			Self::Float => "float",
			Self::Text => "text",
			Self::Date => "date",
			Self::DateTime => "datetime",
			Self::Duration => "duration",
			Self::Bytes => "bytes",
		}
	}

	/// Looks a category up by its [`tag`](Self::tag).
	pub fn from_tag(tag: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|category| category.tag() == tag)
	}
}

impl fmt::Display for ValueCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag())
	}
}

/// A scalar attribute value.
///
/// Equality on [`Value::Float`] compares bit patterns, so `NaN == NaN` and
/// `0.0 != -0.0`. That is the notion of equality a snapshot needs: a value
/// read back must be the exact value that was written.
#[derive(Debug, Clone)]
pub enum Value {
	/// SQL `NULL`.
	Null,
	/// Integer value.
	Integer(i64),
	/// Decimal value, scale preserved.
	Decimal(Decimal),
	/// Floating point value.
	Float(f64),
	/// Text value.
	Text(String),
	/// Date value.
	Date(NaiveDate),
	/// Date and time value.
	DateTime(NaiveDateTime),
	/// Duration value.
	Duration(TimeDelta),
	/// Binary value.
	Bytes(Vec<u8>),
}

impl Value {
	/// Returns the category of this value.
	pub fn category(&self) -> ValueCategory {
		match self {
			Self::Null => ValueCategory::Null,
			Self::Integer(_) => ValueCategory::Integer,
			Self::Decimal(_) => ValueCategory::Decimal,
			Self::Float(_) => ValueCategory::Float,
			Self::Text(_) => ValueCategory::Text,
			Self::Date(_) => ValueCategory::Date,
			Self::DateTime(_) => ValueCategory::DateTime,
			Self::Duration(_) => ValueCategory::Duration,
			Self::Bytes(_) => ValueCategory::Bytes,
		}
	}

	/// Returns true for [`Value::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Integer(a), Self::Integer(b)) => a == b,
			(Self::Decimal(a), Self::Decimal(b)) => a == b && a.scale() == b.scale(),
			(Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
			(Self::Text(a), Self::Text(b)) => a == b,
			(Self::Date(a), Self::Date(b)) => a == b,
			(Self::DateTime(a), Self::DateTime(b)) => a == b,
			(Self::Duration(a), Self::Duration(b)) => a == b,
			(Self::Bytes(a), Self::Bytes(b)) => a == b,
			_ => false,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("NULL"),
			Self::Integer(v) => write!(f, "{}", v),
			Self::Decimal(v) => write!(f, "{}", v),
			Self::Float(v) => write!(f, "{:?}", v),
			Self::Text(v) => write!(f, "{:?}", v),
			Self::Date(v) => write!(f, "{}", v),
			Self::DateTime(v) => write!(f, "{}", v),
			Self::Duration(v) => write!(f, "{}", v),
			Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
		}
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Self::Integer(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Self::Float(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Self::Text(v.to_string())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Self::Text(v)
	}
}

impl From<Decimal> for Value {
	fn from(v: Decimal) -> Self {
		Self::Decimal(v)
	}
}

impl From<NaiveDate> for Value {
	fn from(v: NaiveDate) -> Self {
		Self::Date(v)
	}
}

impl From<NaiveDateTime> for Value {
	fn from(v: NaiveDateTime) -> Self {
		Self::DateTime(v)
	}
}

impl From<TimeDelta> for Value {
	fn from(v: TimeDelta) -> Self {
		Self::Duration(v)
	}
}

impl From<Vec<u8>> for Value {
	fn from(v: Vec<u8>) -> Self {
		Self::Bytes(v)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		v.map(Into::into).unwrap_or(Self::Null)
	}
}

/// Primary-key value of a row.
///
/// Only integer and text keys are supported; they are the only categories a
/// store hands out as row identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
	/// Integer key (auto-increment columns).
	Integer(i64),
	/// Text key.
	Text(String),
}

impl PrimaryKey {
	/// Extracts a primary key from a value, if its category can be one.
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::Integer(v) => Some(Self::Integer(*v)),
			Value::Text(v) => Some(Self::Text(v.clone())),
			_ => None,
		}
	}

	/// Converts the key back into a store value.
	pub fn to_value(&self) -> Value {
		match self {
			Self::Integer(v) => Value::Integer(*v),
			Self::Text(v) => Value::Text(v.clone()),
		}
	}
}

impl fmt::Display for PrimaryKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Integer(v) => write!(f, "{}", v),
			Self::Text(v) => f.write_str(v),
		}
	}
}

impl From<i64> for PrimaryKey {
	fn from(v: i64) -> Self {
		Self::Integer(v)
	}
}

impl From<&str> for PrimaryKey {
	fn from(v: &str) -> Self {
		Self::Text(v.to_string())
	}
}
