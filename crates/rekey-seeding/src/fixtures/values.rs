//! Conversion between store values and fixture literals.
//!
//! Each [`ValueCategory`] is handled by one [`ValueSerializer`]. The default
//! [`ValueSerializerRegistry`] covers every category except
//! [`ValueCategory::Bytes`]; more handlers can be registered without touching
//! the writer or the loader.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rekey_db::{EntityKind, Value, ValueCategory};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{SeedingError, SeedingResult};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Serialized form of a value inside a fixture record.
///
/// Nulls, integers and text use their JSON-native form. Every other category
/// is written as `{"type": <tag>, "value": ...}` so it reads back without
/// guessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
	/// `null`
	Null,
	/// JSON integer
	Integer(i64),
	/// JSON string
	Text(String),
	/// Category-tagged value
	Tagged {
		/// Category tag (see [`ValueCategory::tag`]).
		#[serde(rename = "type")]
		tag: String,
		/// Category-specific payload.
		value: Json,
	},
}

impl Literal {
	/// Builds a tagged literal.
	pub fn tagged(category: ValueCategory, value: impl Into<Json>) -> Self {
		Self::Tagged {
			tag: category.tag().to_string(),
			value: value.into(),
		}
	}

	/// Returns the category tag this literal claims.
	pub fn tag(&self) -> &str {
		match self {
			Self::Null => ValueCategory::Null.tag(),
			Self::Integer(_) => ValueCategory::Integer.tag(),
			Self::Text(_) => ValueCategory::Text.tag(),
			Self::Tagged { tag, .. } => tag,
		}
	}
}

/// Converts values of one category to literals and back.
pub trait ValueSerializer: Send + Sync {
	/// Category handled by this serializer.
	fn category(&self) -> ValueCategory;

	/// Serializes a value of [`category`](Self::category).
	fn serialize(&self, value: &Value) -> Result<Literal, String>;

	/// Reads a literal produced by [`serialize`](Self::serialize).
	fn deserialize(&self, literal: &Literal) -> Result<Value, String>;
}

fn mismatch(expected: ValueCategory, found: impl std::fmt::Debug) -> String {
	format!("expected a {} value, found {:?}", expected, found)
}

fn tagged_payload(literal: &Literal, category: ValueCategory) -> Result<&Json, String> {
	match literal {
		Literal::Tagged { tag, value } if tag == category.tag() => Ok(value),
		other => Err(mismatch(category, other)),
	}
}

fn tagged_str(literal: &Literal, category: ValueCategory) -> Result<&str, String> {
	tagged_payload(literal, category)?
		.as_str()
		.ok_or_else(|| format!("{} payload must be a string", category))
}

/// `null`
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSerializer;

impl ValueSerializer for NullSerializer {
	fn category(&self) -> ValueCategory {
		ValueCategory::Null
	}

	fn serialize(&self, value: &Value) -> Result<Literal, String> {
		match value {
			Value::Null => Ok(Literal::Null),
			other => Err(mismatch(self.category(), other)),
		}
	}

	fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
		match literal {
			Literal::Null => Ok(Value::Null),
			other => Err(mismatch(self.category(), other)),
		}
	}
}

/// Integers as JSON integers.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntegerSerializer;

impl ValueSerializer for IntegerSerializer {
	fn category(&self) -> ValueCategory {
		ValueCategory::Integer
	}

	fn serialize(&self, value: &Value) -> Result<Literal, String> {
		match value {
			Value::Integer(v) => Ok(Literal::Integer(*v)),
			other => Err(mismatch(self.category(), other)),
		}
	}

	fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
		match literal {
			Literal::Integer(v) => Ok(Value::Integer(*v)),
			other => Err(mismatch(self.category(), other)),
		}
	}
}

/// Text as JSON strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSerializer;

impl ValueSerializer for TextSerializer {
	fn category(&self) -> ValueCategory {
		ValueCategory::Text
	}

	fn serialize(&self, value: &Value) -> Result<Literal, String> {
		match value {
			Value::Text(v) => Ok(Literal::Text(v.clone())),
			other => Err(mismatch(self.category(), other)),
		}
	}

	fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
		match literal {
			Literal::Text(v) => Ok(Value::Text(v.clone())),
			other => Err(mismatch(self.category(), other)),
		}
	}
}

/// Decimals as strings, scale preserved (`"1.50"`).
#[derive(Debug, Default, Clone, Copy)]
pub struct DecimalSerializer;

impl ValueSerializer for DecimalSerializer {
	fn category(&self) -> ValueCategory {
		ValueCategory::Decimal
	}

	fn serialize(&self, value: &Value) -> Result<Literal, String> {
		match value {
			Value::Decimal(v) => Ok(Literal::tagged(self.category(), v.to_string())),
			other => Err(mismatch(self.category(), other)),
		}
	}

	fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
		let text = tagged_str(literal, self.category())?;
		Decimal::from_str(text)
			.map(Value::Decimal)
			.map_err(|e| e.to_string())
	}
}

/// Floats as JSON numbers; NaN and infinities as `"NaN"`, `"inf"`, `"-inf"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FloatSerializer;

impl ValueSerializer for FloatSerializer {
	fn category(&self) -> ValueCategory {
		ValueCategory::Float
	}

	fn serialize(&self, value: &Value) -> Result<Literal, String> {
		let Value::Float(v) = value else {
			return Err(mismatch(self.category(), value));
		};
		let payload = match serde_json::Number::from_f64(*v) {
			Some(number) => Json::Number(number),
			None if v.is_nan() => Json::from("NaN"),
			None if *v > 0.0 => Json::from("inf"),
			None => Json::from("-inf"),
		};
		Ok(Literal::tagged(self.category(), payload))
	}

	fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
		let float = match tagged_payload(literal, self.category())? {
			Json::Number(number) => number
				.as_f64()
				.ok_or_else(|| format!("{} is not a float", number))?,
			Json::String(special) => match special.as_str() {
				"NaN" => f64::NAN,
				"inf" => f64::INFINITY,
				"-inf" => f64::NEG_INFINITY,
				other => return Err(format!("unknown float literal {:?}", other)),
			},
			other => return Err(mismatch(self.category(), other)),
		};
		Ok(Value::Float(float))
	}
}

/// Dates as `YYYY-MM-DD`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateSerializer;

impl ValueSerializer for DateSerializer {
	fn category(&self) -> ValueCategory {
		ValueCategory::Date
	}

	fn serialize(&self, value: &Value) -> Result<Literal, String> {
		match value {
			Value::Date(v) => Ok(Literal::tagged(
				self.category(),
				v.format(DATE_FORMAT).to_string(),
			)),
			other => Err(mismatch(self.category(), other)),
		}
	}

	fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
		let text = tagged_str(literal, self.category())?;
		NaiveDate::parse_from_str(text, DATE_FORMAT)
			.map(Value::Date)
			.map_err(|e| e.to_string())
	}
}

/// Datetimes as ISO-8601 with as many fractional digits as needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateTimeSerializer;

impl ValueSerializer for DateTimeSerializer {
	fn category(&self) -> ValueCategory {
		ValueCategory::DateTime
	}

	fn serialize(&self, value: &Value) -> Result<Literal, String> {
		match value {
			Value::DateTime(v) => Ok(Literal::tagged(
				self.category(),
				v.format(DATETIME_FORMAT).to_string(),
			)),
			other => Err(mismatch(self.category(), other)),
		}
	}

	fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
		let text = tagged_str(literal, self.category())?;
		NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
			.map(Value::DateTime)
			.map_err(|e| e.to_string())
	}
}

/// Durations as whole seconds plus a nanosecond remainder, so the full
/// `TimeDelta` range survives.
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationSerializer;

const NANOS_PER_SEC: i64 = 1_000_000_000;

impl ValueSerializer for DurationSerializer {
	fn category(&self) -> ValueCategory {
		ValueCategory::Duration
	}

	fn serialize(&self, value: &Value) -> Result<Literal, String> {
		let Value::Duration(v) = value else {
			return Err(mismatch(self.category(), value));
		};
		Ok(Literal::tagged(
			self.category(),
			serde_json::json!({"secs": v.num_seconds(), "nanos": v.subsec_nanos()}),
		))
	}

	fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
		let payload = tagged_payload(literal, self.category())?;
		let part = |name: &str| {
			payload
				.get(name)
				.and_then(Json::as_i64)
				.ok_or_else(|| format!("duration payload needs an integer `{}`", name))
		};
		let mut secs = part("secs")?;
		let mut nanos = part("nanos")?;
		if nanos.abs() >= NANOS_PER_SEC {
			return Err(format!("duration nanos {} out of range", nanos));
		}
		// `TimeDelta::new` wants a non-negative remainder.
		if nanos < 0 {
			secs = secs
				.checked_sub(1)
				.ok_or_else(|| "duration seconds out of range".to_string())?;
			nanos += NANOS_PER_SEC;
		}
		TimeDelta::new(secs, nanos as u32)
			.map(Value::Duration)
			.ok_or_else(|| format!("duration {}s {}ns out of range", secs, nanos))
	}
}

/// Bytes as standard base64. Not registered by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64BytesSerializer;

impl ValueSerializer for Base64BytesSerializer {
	fn category(&self) -> ValueCategory {
		ValueCategory::Bytes
	}

	fn serialize(&self, value: &Value) -> Result<Literal, String> {
		match value {
			Value::Bytes(v) => Ok(Literal::tagged(self.category(), BASE64.encode(v))),
			other => Err(mismatch(self.category(), other)),
		}
	}

	fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
		let text = tagged_str(literal, self.category())?;
		BASE64
			.decode(text)
			.map(Value::Bytes)
			.map_err(|e| e.to_string())
	}
}

/// Built-in handler for a category, if any.
fn default_serializer(category: ValueCategory) -> Option<Arc<dyn ValueSerializer>> {
	match category {
		ValueCategory::Null => Some(Arc::new(NullSerializer)),
		ValueCategory::Integer => Some(Arc::new(IntegerSerializer)),
		ValueCategory::Decimal => Some(Arc::new(DecimalSerializer)),
		ValueCategory::Float => Some(Arc::new(FloatSerializer)),
		ValueCategory::Text => Some(Arc::new(TextSerializer)),
		ValueCategory::Date => Some(Arc::new(DateSerializer)),
		ValueCategory::DateTime => Some(Arc::new(DateTimeSerializer)),
		ValueCategory::Duration => Some(Arc::new(DurationSerializer)),
		ValueCategory::Bytes => None,
	}
}

/// Category-to-serializer table used by the writer and the loader.
#[derive(Clone)]
pub struct ValueSerializerRegistry {
	serializers: HashMap<ValueCategory, Arc<dyn ValueSerializer>>,
}

impl std::fmt::Debug for ValueSerializerRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut categories: Vec<_> = self.serializers.keys().collect();
		categories.sort();
		f.debug_struct("ValueSerializerRegistry")
			.field("categories", &categories)
			.finish()
	}
}

impl ValueSerializerRegistry {
	/// Registry with the built-in serializers.
	pub fn new() -> Self {
		let serializers = ValueCategory::ALL
			.into_iter()
			.filter_map(|category| default_serializer(category).map(|s| (category, s)))
			.collect();
		Self { serializers }
	}

	/// Registry with no serializers at all.
	pub fn empty() -> Self {
		Self {
			serializers: HashMap::new(),
		}
	}

	/// Registers (or replaces) the serializer for its category.
	pub fn register<S: ValueSerializer + 'static>(&mut self, serializer: S) -> &mut Self {
		self.serializers
			.insert(serializer.category(), Arc::new(serializer));
		self
	}

	/// Builder-style [`register`](Self::register).
	pub fn with<S: ValueSerializer + 'static>(mut self, serializer: S) -> Self {
		self.register(serializer);
		self
	}

	/// Returns true when `category` has a serializer.
	pub fn supports(&self, category: ValueCategory) -> bool {
		self.serializers.contains_key(&category)
	}

	/// Serializes the value of `kind.attribute`.
	///
	/// # Errors
	///
	/// Returns [`SeedingError::SerializationError`] naming the kind, attribute
	/// and value when the category has no serializer or the serializer
	/// rejects the value.
	pub fn serialize(
		&self,
		kind: &EntityKind,
		attribute: &str,
		value: &Value,
	) -> SeedingResult<Literal> {
		let fail = |message: String| SeedingError::SerializationError {
			kind: kind.to_string(),
			attribute: attribute.to_string(),
			value: value.to_string(),
			message,
		};
		let category = value.category();
		let serializer = self
			.serializers
			.get(&category)
			.ok_or_else(|| fail(format!("no serializer registered for {} values", category)))?;
		serializer.serialize(value).map_err(fail)
	}

	/// Reads the literal of `kind.attribute` back into a value.
	pub fn deserialize(
		&self,
		kind: &EntityKind,
		attribute: &str,
		literal: &Literal,
	) -> SeedingResult<Value> {
		let fail = |message: String| SeedingError::DeserializationError {
			kind: kind.to_string(),
			attribute: attribute.to_string(),
			message,
		};
		let category = ValueCategory::from_tag(literal.tag())
			.ok_or_else(|| fail(format!("unknown literal type {:?}", literal.tag())))?;
		let serializer = self
			.serializers
			.get(&category)
			.ok_or_else(|| fail(format!("no serializer registered for {} values", category)))?;
		serializer.deserialize(literal).map_err(fail)
	}
}

impl Default for ValueSerializerRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn registry() -> ValueSerializerRegistry {
		ValueSerializerRegistry::new()
	}

	fn kind() -> EntityKind {
		EntityKind::new("course")
	}

	fn round_trip(registry: &ValueSerializerRegistry, value: Value) -> Value {
		let literal = registry.serialize(&kind(), "attr", &value).unwrap();
		// Through text, as a fixture file would.
		let text = serde_json::to_string(&literal).unwrap();
		let literal: Literal = serde_json::from_str(&text).unwrap();
		registry.deserialize(&kind(), "attr", &literal).unwrap()
	}

	#[rstest]
	#[case(Value::Null)]
	#[case(Value::Integer(0))]
	#[case(Value::Integer(i64::MIN))]
	#[case(Value::Integer(i64::MAX))]
	#[case(Value::Decimal(Decimal::from_str("1.50").unwrap()))]
	#[case(Value::Decimal(Decimal::from_str("-0.000000000000000000000000001").unwrap()))]
	#[case(Value::Decimal(Decimal::MAX))]
	#[case(Value::Float(0.1))]
	#[case(Value::Float(-0.0))]
	#[case(Value::Float(f64::MIN_POSITIVE))]
	#[case(Value::Float(1e300))]
	#[case(Value::Float(f64::NAN))]
	#[case(Value::Float(f64::INFINITY))]
	#[case(Value::Float(f64::NEG_INFINITY))]
	#[case(Value::Text(String::new()))]
	#[case(Value::Text("2024-01-01".to_string()))]
	#[case(Value::Text("naïve \"quoted\"\n".to_string()))]
	#[case(Value::Date(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()))]
	#[case(Value::DateTime(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(23, 59, 59).unwrap()))]
	#[case(Value::DateTime(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_nano_opt(0, 0, 0, 123_456_789).unwrap()))]
	#[case(Value::Duration(TimeDelta::zero()))]
	#[case(Value::Duration(TimeDelta::nanoseconds(-1_500_000_001)))]
	#[case(Value::Duration(TimeDelta::days(365 * 200)))]
	#[case(Value::Duration(TimeDelta::days(365 * 400)))]
	#[case(Value::Duration(TimeDelta::MAX))]
	#[case(Value::Duration(TimeDelta::MIN))]
	#[case(Value::Duration(TimeDelta::new(-3, 1).unwrap()))]
	fn test_round_trip(registry: ValueSerializerRegistry, #[case] value: Value) {
		assert_eq!(round_trip(&registry, value.clone()), value);
	}

	#[rstest]
	fn test_native_literals(registry: ValueSerializerRegistry) {
		let literal = registry
			.serialize(&kind(), "title", &Value::Text("Rust".into()))
			.unwrap();
		assert_eq!(serde_json::to_value(&literal).unwrap(), json!("Rust"));

		let literal = registry
			.serialize(&kind(), "seats", &Value::Integer(30))
			.unwrap();
		assert_eq!(serde_json::to_value(&literal).unwrap(), json!(30));

		let literal = registry.serialize(&kind(), "note", &Value::Null).unwrap();
		assert_eq!(serde_json::to_value(&literal).unwrap(), json!(null));
	}

	#[rstest]
	fn test_tagged_literal_shape(registry: ValueSerializerRegistry) {
		let literal = registry
			.serialize(&kind(), "price", &Value::Decimal(Decimal::from_str("9.90").unwrap()))
			.unwrap();
		assert_eq!(
			serde_json::to_value(&literal).unwrap(),
			json!({"type": "decimal", "value": "9.90"})
		);
	}

	#[rstest]
	fn test_bytes_unsupported_by_default(registry: ValueSerializerRegistry) {
		let result = registry.serialize(&kind(), "logo", &Value::Bytes(vec![1, 2, 3]));
		match result {
			Err(SeedingError::SerializationError {
				kind,
				attribute,
				value,
				..
			}) => {
				assert_eq!(kind, "course");
				assert_eq!(attribute, "logo");
				assert_eq!(value, "<3 bytes>");
			}
			other => panic!("expected SerializationError, got {:?}", other),
		}
	}

	#[rstest]
	fn test_registered_bytes_serializer_round_trips() {
		let registry = ValueSerializerRegistry::new().with(Base64BytesSerializer);
		assert!(registry.supports(ValueCategory::Bytes));
		let value = Value::Bytes(vec![0, 159, 146, 150, 255]);
		assert_eq!(round_trip(&registry, value.clone()), value);
	}

	#[rstest]
	fn test_custom_serializer_replaces_builtin() {
		struct UpperText;

		impl ValueSerializer for UpperText {
			fn category(&self) -> ValueCategory {
				ValueCategory::Text
			}

			fn serialize(&self, value: &Value) -> Result<Literal, String> {
				match value {
					Value::Text(v) => Ok(Literal::Text(v.to_uppercase())),
					other => Err(format!("not text: {:?}", other)),
				}
			}

			fn deserialize(&self, literal: &Literal) -> Result<Value, String> {
				match literal {
					Literal::Text(v) => Ok(Value::Text(v.clone())),
					other => Err(format!("not text: {:?}", other)),
				}
			}
		}

		let registry = ValueSerializerRegistry::new().with(UpperText);
		let literal = registry
			.serialize(&kind(), "title", &Value::Text("rust".into()))
			.unwrap();
		assert_eq!(literal, Literal::Text("RUST".into()));
	}

	#[rstest]
	fn test_unknown_tag_fails(registry: ValueSerializerRegistry) {
		let literal = Literal::Tagged {
			tag: "uuid".to_string(),
			value: json!("x"),
		};
		let result = registry.deserialize(&kind(), "ref", &literal);
		assert!(matches!(
			result,
			Err(SeedingError::DeserializationError { .. })
		));
	}

	#[rstest]
	fn test_malformed_payload_fails(registry: ValueSerializerRegistry) {
		let literal = Literal::Tagged {
			tag: "date".to_string(),
			value: json!("31/12/1969"),
		};
		assert!(registry.deserialize(&kind(), "starts", &literal).is_err());
	}

	#[rstest]
	fn test_empty_registry_rejects_everything() {
		let registry = ValueSerializerRegistry::empty();
		for category in ValueCategory::ALL {
			assert!(!registry.supports(category));
		}
		assert!(registry.serialize(&kind(), "a", &Value::Null).is_err());
	}
}
