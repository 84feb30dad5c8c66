//! SQLite backend built on sqlx.
//!
//! Column categories come from the declared column type, following SQLite's
//! affinity rules. Dates and datetimes are stored as ISO-8601 text, durations
//! as integer nanoseconds and decimals as text.
//!
//! A decimal keeps its scale only in a column with TEXT affinity, such as one
//! declared `DECIMAL_TEXT`. Numeric affinity turns `1.50` into the REAL `1.5`,
//! so inserts that would lose scale and reads of REAL decimals both fail.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Arguments, Row as _, Sqlite, Transaction, TypeInfo, ValueRef};

use crate::error::{DbError, DbResult};
use crate::schema::{ColumnInfo, EntityKind, ForeignKeyDescriptor, SchemaIntrospector};
use crate::store::{DestinationStore, Row, SourceStore, StoreSession};
use crate::value::{PrimaryKey, Value, ValueCategory};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Quotes an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
	format!("\"{}\"", name.replace('"', "\"\""))
}

/// Maps a declared SQLite column type to a value category.
///
/// Checks run in the order of SQLite's affinity rules, with date, time and
/// decimal names recognised before the generic NUMERIC fallback. A text type
/// naming `DECIMAL` or `NUMERIC` is a decimal column with TEXT affinity.
pub fn category_for_declared_type(declared: &str) -> ValueCategory {
	let declared = declared.to_ascii_uppercase();
	let decimal = declared.contains("DECIMAL") || declared.contains("NUMERIC");
	if declared.contains("INT") && !declared.contains("INTERVAL") {
		ValueCategory::Integer
	} else if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT")
	{
		if decimal {
			ValueCategory::Decimal
		} else {
			ValueCategory::Text
		}
	} else if declared.contains("BLOB") || declared.is_empty() {
		ValueCategory::Bytes
	} else if declared.contains("REAL") || declared.contains("FLOA") || declared.contains("DOUB") {
		ValueCategory::Float
	} else if declared.contains("DATETIME") || declared.contains("TIMESTAMP") {
		ValueCategory::DateTime
	} else if declared.contains("DATE") {
		ValueCategory::Date
	} else if declared.contains("INTERVAL") || declared.contains("DURATION") {
		ValueCategory::Duration
	} else {
		ValueCategory::Decimal
	}
}

#[derive(sqlx::FromRow)]
struct TableInfoRow {
	name: String,
	r#type: String,
	notnull: i64,
	pk: i64,
}

#[derive(sqlx::FromRow)]
struct ForeignKeyRow {
	id: i64,
	seq: i64,
	table: String,
	from: String,
}

/// SQLite store usable as fixture source and destination.
#[derive(Debug)]
pub struct SqliteStore {
	pool: SqlitePool,
	columns: RwLock<HashMap<EntityKind, Vec<ColumnInfo>>>,
}

impl SqliteStore {
	/// Connects to `url` (e.g. `sqlite://data.db` or `sqlite::memory:`).
	///
	/// In-memory databases are private to one connection, so the pool is
	/// capped at a single connection for them. sqlx enables foreign key
	/// enforcement on every connection it opens.
	pub async fn connect(url: &str) -> DbResult<Self> {
		let max_connections = if url.contains(":memory:") { 1 } else { 5 };
		let pool = SqlitePoolOptions::new()
			.max_connections(max_connections)
			.connect(url)
			.await
			.map_err(|e| DbError::Connection(e.to_string()))?;
		Ok(Self::from_pool(pool))
	}

	/// Wraps an existing pool.
	pub fn from_pool(pool: SqlitePool) -> Self {
		Self {
			pool,
			columns: RwLock::new(HashMap::new()),
		}
	}

	/// Returns the underlying pool.
	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Executes raw SQL (schema setup, seeding).
	pub async fn execute(&self, sql: &str) -> DbResult<()> {
		sqlx::raw_sql(sql).execute(&self.pool).await?;
		self.columns.write().clear();
		Ok(())
	}

	async fn cached_columns(&self, kind: &EntityKind) -> DbResult<Vec<ColumnInfo>> {
		if let Some(columns) = self.columns.read().get(kind) {
			return Ok(columns.clone());
		}
		let query = format!("PRAGMA table_info({})", quote_ident(kind.table_name()));
		let rows: Vec<TableInfoRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
		if rows.is_empty() {
			return Err(DbError::UnknownKind(kind.to_string()));
		}
		let columns: Vec<ColumnInfo> = rows
			.into_iter()
			.map(|row| ColumnInfo {
				category: category_for_declared_type(&row.r#type),
				nullable: row.notnull == 0 && row.pk == 0,
				primary_key: row.pk > 0,
				name: row.name,
			})
			.collect();
		self.columns.write().insert(kind.clone(), columns.clone());
		Ok(columns)
	}
}

#[async_trait]
impl SchemaIntrospector for SqliteStore {
	async fn entity_kinds(&self) -> DbResult<Vec<EntityKind>> {
		let names: Vec<(String,)> = sqlx::query_as(
			"SELECT name FROM sqlite_master \
			 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
		)
		.fetch_all(&self.pool)
		.await?;
		Ok(names.into_iter().map(|(name,)| EntityKind::new(name)).collect())
	}

	async fn columns(&self, kind: &EntityKind) -> DbResult<Vec<ColumnInfo>> {
		self.cached_columns(kind).await
	}

	async fn foreign_keys_of(&self, kind: &EntityKind) -> DbResult<Vec<ForeignKeyDescriptor>> {
		// Validates the kind exists; PRAGMA foreign_key_list is silent on unknown tables.
		self.cached_columns(kind).await?;

		let query = format!("PRAGMA foreign_key_list({})", quote_ident(kind.table_name()));
		let mut rows: Vec<ForeignKeyRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
		rows.sort_by_key(|row| (row.id, row.seq));

		let mut composite: HashMap<i64, usize> = HashMap::new();
		for row in &rows {
			*composite.entry(row.id).or_default() += 1;
		}
		Ok(rows
			.into_iter()
			.filter(|row| composite.get(&row.id) == Some(&1))
			.map(|row| ForeignKeyDescriptor::new(row.from, row.table))
			.collect())
	}
}

fn decode_error(kind: &EntityKind, column: &ColumnInfo, message: impl ToString) -> DbError {
	DbError::Decode {
		kind: kind.to_string(),
		attribute: column.name.clone(),
		message: message.to_string(),
	}
}

fn decode_column(kind: &EntityKind, row: &SqliteRow, column: &ColumnInfo) -> DbResult<Value> {
	let name = column.name.as_str();
	let raw = row.try_get_raw(name)?;
	if raw.is_null() {
		return Ok(Value::Null);
	}
	let storage = raw.type_info().name().to_string();
	drop(raw);

	let value = match (column.category, storage.as_str()) {
		(ValueCategory::Integer, "INTEGER") => Value::Integer(row.try_get(name)?),
		(ValueCategory::Float, "REAL") => Value::Float(row.try_get(name)?),
		(ValueCategory::Float, "INTEGER") => Value::Float(row.try_get::<i64, _>(name)? as f64),
		(ValueCategory::Decimal, "INTEGER") => {
			Value::Decimal(Decimal::from(row.try_get::<i64, _>(name)?))
		}
		(ValueCategory::Decimal, "REAL") => {
			let float: f64 = row.try_get(name)?;
			return Err(decode_error(
				kind,
				column,
				format!("decimal stored as REAL {}, scale unknown", float),
			));
		}
		(ValueCategory::Decimal, "TEXT") => {
			let text: String = row.try_get(name)?;
			Value::Decimal(Decimal::from_str(&text).map_err(|e| decode_error(kind, column, e))?)
		}
		(ValueCategory::Date, "TEXT") => {
			let text: String = row.try_get(name)?;
			Value::Date(
				NaiveDate::parse_from_str(&text, DATE_FORMAT)
					.map_err(|e| decode_error(kind, column, e))?,
			)
		}
		(ValueCategory::DateTime, "TEXT") => {
			let text: String = row.try_get(name)?;
			let parsed = NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
				.or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f"))
				.map_err(|e| decode_error(kind, column, e))?;
			Value::DateTime(parsed)
		}
		(ValueCategory::Duration, "INTEGER") => {
			Value::Duration(TimeDelta::nanoseconds(row.try_get(name)?))
		}
		// Dynamic typing: anything else is read by its storage class.
		(_, "INTEGER") => Value::Integer(row.try_get(name)?),
		(_, "REAL") => Value::Float(row.try_get(name)?),
		(_, "TEXT") => Value::Text(row.try_get(name)?),
		(_, "BLOB") => Value::Bytes(row.try_get(name)?),
		(_, other) => {
			return Err(decode_error(
				kind,
				column,
				format!("unexpected storage class {}", other),
			));
		}
	};
	Ok(value)
}

fn bind_value(arguments: &mut SqliteArguments<'_>, value: &Value) -> DbResult<()> {
	let result = match value {
		Value::Null => arguments.add(None::<i64>),
		Value::Integer(v) => arguments.add(*v),
		Value::Decimal(v) => arguments.add(v.to_string()),
		Value::Float(v) => arguments.add(*v),
		Value::Text(v) => arguments.add(v.clone()),
		Value::Date(v) => arguments.add(v.format(DATE_FORMAT).to_string()),
		Value::DateTime(v) => arguments.add(v.format(DATETIME_FORMAT).to_string()),
		Value::Duration(v) => {
			let nanos = v.num_nanoseconds().ok_or_else(|| {
				DbError::Query(format!("duration {} exceeds the nanosecond range", v))
			})?;
			arguments.add(nanos)
		}
		Value::Bytes(v) => arguments.add(v.clone()),
	};
	result.map_err(|e| DbError::Query(e.to_string()))
}

fn bind_primary_key(arguments: &mut SqliteArguments<'_>, key: &PrimaryKey) -> DbResult<()> {
	bind_value(arguments, &key.to_value())
}

#[async_trait]
impl SourceStore for SqliteStore {
	async fn fetch_chunk(
		&self,
		kind: &EntityKind,
		primary_key: &str,
		after: Option<&PrimaryKey>,
		limit: usize,
	) -> DbResult<Vec<Row>> {
		let columns = self.cached_columns(kind).await?;
		if !columns.iter().any(|column| column.name == primary_key) {
			return Err(DbError::UnknownAttribute {
				kind: kind.to_string(),
				attribute: primary_key.to_string(),
			});
		}

		let table = quote_ident(kind.table_name());
		let key = quote_ident(primary_key);
		let mut arguments = SqliteArguments::default();
		let sql = match after {
			Some(after) => {
				bind_primary_key(&mut arguments, after)?;
				format!(
					"SELECT * FROM {} WHERE {} > ? ORDER BY {} LIMIT ?",
					table, key, key
				)
			}
			None => format!("SELECT * FROM {} ORDER BY {} LIMIT ?", table, key),
		};
		let limit = i64::try_from(limit).map_err(|e| DbError::Query(e.to_string()))?;
		arguments
			.add(limit)
			.map_err(|e| DbError::Query(e.to_string()))?;

		let rows = sqlx::query_with(&sql, arguments)
			.fetch_all(&self.pool)
			.await?;
		tracing::debug!(kind = %kind, rows = rows.len(), "fetched chunk");
		rows.iter()
			.map(|row| {
				columns
					.iter()
					.map(|column| Ok((column.name.clone(), decode_column(kind, row, column)?)))
					.collect::<DbResult<Row>>()
			})
			.collect()
	}
}

#[async_trait]
impl DestinationStore for SqliteStore {
	type Session = SqliteSession;

	async fn begin(&self) -> DbResult<SqliteSession> {
		let tx = self
			.pool
			.begin()
			.await
			.map_err(|e| DbError::Transaction(e.to_string()))?;
		Ok(SqliteSession { tx: Some(tx) })
	}
}

/// Transaction on a [`SqliteStore`]. Dropping it without commit rolls back.
#[derive(Debug)]
pub struct SqliteSession {
	tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteSession {
	fn tx(&mut self) -> DbResult<&mut Transaction<'static, Sqlite>> {
		self.tx.as_mut().ok_or_else(|| {
			DbError::Transaction("session already committed or rolled back".to_string())
		})
	}
}

#[async_trait]
impl StoreSession for SqliteSession {
	async fn insert(
		&mut self,
		kind: &EntityKind,
		primary_key: &str,
		values: &Row,
	) -> DbResult<PrimaryKey> {
		let table = quote_ident(kind.table_name());
		let mut returning = quote_ident(primary_key);
		let mut arguments = SqliteArguments::default();
		// Decimal attributes and their scale, checked against the stored class.
		let mut decimals = Vec::new();
		let sql = if values.is_empty() {
			format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
		} else {
			let mut names = Vec::with_capacity(values.len());
			for (name, value) in values.iter() {
				names.push(quote_ident(name));
				bind_value(&mut arguments, value)?;
				if let Value::Decimal(decimal) = value {
					returning.push_str(&format!(", typeof({})", quote_ident(name)));
					decimals.push((name.clone(), decimal.scale()));
				}
			}
			let placeholders = vec!["?"; names.len()].join(", ");
			format!(
				"INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
				table,
				names.join(", "),
				placeholders,
				returning
			)
		};

		let tx = self.tx()?;
		let row = sqlx::query_with(&sql, arguments)
			.fetch_one(&mut **tx)
			.await
			.map_err(|e| match e {
				sqlx::Error::Database(db) => DbError::Constraint {
					kind: kind.to_string(),
					message: db.message().to_string(),
				},
				other => other.into(),
			})?;

		for (index, (name, scale)) in decimals.iter().enumerate() {
			let storage: String = row.try_get(index + 1)?;
			if storage != "text" && !(storage == "integer" && *scale == 0) {
				return Err(DbError::Constraint {
					kind: kind.to_string(),
					message: format!(
						"decimal {} was stored as {} and lost its scale; \
						 the column needs TEXT affinity",
						name, storage
					),
				});
			}
		}

		let raw = row.try_get_raw(0)?;
		let storage = raw.type_info().name().to_string();
		drop(raw);
		match storage.as_str() {
			"INTEGER" => Ok(PrimaryKey::Integer(row.try_get(0)?)),
			"TEXT" => Ok(PrimaryKey::Text(row.try_get(0)?)),
			other => Err(DbError::Decode {
				kind: kind.to_string(),
				attribute: primary_key.to_string(),
				message: format!("primary key has storage class {}", other),
			}),
		}
	}

	async fn flush(&mut self) -> DbResult<()> {
		// Statements run eagerly inside the transaction; nothing is buffered.
		self.tx()?;
		Ok(())
	}

	async fn commit(&mut self) -> DbResult<()> {
		let tx = self.tx.take().ok_or_else(|| {
			DbError::Transaction("session already committed or rolled back".to_string())
		})?;
		tx.commit()
			.await
			.map_err(|e| DbError::Transaction(e.to_string()))
	}

	async fn rollback(&mut self) -> DbResult<()> {
		let tx = self.tx.take().ok_or_else(|| {
			DbError::Transaction("session already committed or rolled back".to_string())
		})?;
		tx.rollback()
			.await
			.map_err(|e| DbError::Transaction(e.to_string()))
	}
}
