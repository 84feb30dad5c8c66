//! Chunked enumeration of the rows of one entity kind.

use futures::stream::{self, Stream, TryStreamExt};
use rekey_db::{EntityKind, PrimaryKey, Row, SourceStore};

use crate::error::{SeedingError, SeedingResult};

/// Rows fetched per round trip unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

enum Cursor {
	Start,
	After(PrimaryKey),
	Done,
}

/// Lazily walks every row of an entity kind, ordered by primary key.
///
/// At most `chunk_size` rows are held at a time. Each call to
/// [`chunks`](Self::chunks) or [`rows`](Self::rows) starts a fresh walk, so
/// the enumeration can be restarted.
pub struct EntityEnumerator<'a, S: SourceStore + ?Sized> {
	store: &'a S,
	kind: EntityKind,
	primary_key: String,
	chunk_size: usize,
}

impl<'a, S: SourceStore + ?Sized> EntityEnumerator<'a, S> {
	/// Creates an enumerator over `kind` keyed by `primary_key`.
	pub fn new(store: &'a S, kind: EntityKind, primary_key: impl Into<String>) -> Self {
		Self {
			store,
			kind,
			primary_key: primary_key.into(),
			chunk_size: DEFAULT_CHUNK_SIZE,
		}
	}

	/// Sets the chunk size. Zero is treated as one.
	pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
		self.chunk_size = chunk_size.max(1);
		self
	}

	/// Returns the entity kind being enumerated.
	pub fn kind(&self) -> &EntityKind {
		&self.kind
	}

	/// Streams the rows chunk by chunk.
	pub fn chunks(&self) -> impl Stream<Item = SeedingResult<Vec<Row>>> + '_ {
		stream::try_unfold(Cursor::Start, move |cursor| self.next_chunk(cursor))
	}

	async fn next_chunk(&self, cursor: Cursor) -> SeedingResult<Option<(Vec<Row>, Cursor)>> {
		let after = match cursor {
			Cursor::Done => return Ok(None),
			Cursor::Start => None,
			Cursor::After(key) => Some(key),
		};

		let rows = self
			.store
			.fetch_chunk(&self.kind, &self.primary_key, after.as_ref(), self.chunk_size)
			.await?;
		if rows.is_empty() {
			return Ok(None);
		}
		tracing::debug!(kind = %self.kind, rows = rows.len(), "enumerated chunk");

		let next = if rows.len() < self.chunk_size {
			Cursor::Done
		} else {
			let last = rows
				.last()
				.and_then(|row| row.primary_key(&self.primary_key))
				.ok_or_else(|| {
					SeedingError::ConfigurationError(format!(
						"{} rows have no usable `{}` to paginate on",
						self.kind, self.primary_key
					))
				})?;
			Cursor::After(last)
		};
		Ok(Some((rows, next)))
	}

	/// Streams the rows one by one.
	pub fn rows(&self) -> impl Stream<Item = SeedingResult<Row>> + '_ {
		self.chunks()
			.map_ok(|rows| stream::iter(rows.into_iter().map(Ok::<Row, SeedingError>)))
			.try_flatten()
	}
}
