//! Foreign-key dependencies between entity kinds.
//!
//! A kind depends on every kind its foreign keys point at. Loading a kind
//! before one of its dependencies leaves references unresolvable, so the
//! graph is used to pick a generation order or to check a sequence before it
//! is loaded.

use std::collections::{BTreeMap, BTreeSet};

use rekey_db::{EntityKind, SchemaIntrospector};

use super::format::KindManifest;
use crate::error::{SeedingError, SeedingResult};

/// Directed graph from entity kinds to the kinds they reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
	/// Kinds in insertion order.
	kinds: Vec<EntityKind>,
	dependencies: BTreeMap<EntityKind, BTreeSet<EntityKind>>,
}

impl DependencyGraph {
	/// Creates an empty graph.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the graph recorded in a fixture document's manifest.
	pub fn from_manifest(kinds: &[KindManifest]) -> Self {
		let mut graph = Self::new();
		for manifest in kinds {
			graph.add_kind(manifest.name.clone());
			for foreign_key in &manifest.foreign_keys {
				graph.add_dependency(manifest.name.clone(), foreign_key.target.clone());
			}
		}
		graph
	}

	/// Builds the graph of `kinds` by asking the store for their foreign keys.
	pub async fn from_introspector<I>(introspector: &I, kinds: &[EntityKind]) -> SeedingResult<Self>
	where
		I: SchemaIntrospector + ?Sized,
	{
		let mut graph = Self::new();
		for kind in kinds {
			graph.add_kind(kind.clone());
			for foreign_key in introspector.foreign_keys_of(kind).await? {
				graph.add_dependency(kind.clone(), foreign_key.target);
			}
		}
		Ok(graph)
	}

	/// Adds a kind with no dependencies. Adding a kind twice is a no-op.
	pub fn add_kind(&mut self, kind: EntityKind) {
		if !self.dependencies.contains_key(&kind) {
			self.dependencies.insert(kind.clone(), BTreeSet::new());
			self.kinds.push(kind);
		}
	}

	/// Records that `kind` references `target`.
	///
	/// `target` is not added as a kind of its own: references to kinds outside
	/// the graph are assumed to be satisfied already.
	pub fn add_dependency(&mut self, kind: EntityKind, target: EntityKind) {
		self.add_kind(kind.clone());
		if let Some(targets) = self.dependencies.get_mut(&kind) {
			targets.insert(target);
		}
	}

	/// Kinds in insertion order.
	pub fn kinds(&self) -> &[EntityKind] {
		&self.kinds
	}

	/// Returns true when `kind` is part of the graph.
	pub fn contains(&self, kind: &EntityKind) -> bool {
		self.dependencies.contains_key(kind)
	}

	/// Kinds inside the graph that `kind` must be loaded after.
	///
	/// Self references are left out; they order records, not kinds.
	pub fn dependencies_of<'a>(&'a self, kind: &'a EntityKind) -> impl Iterator<Item = &'a EntityKind> {
		self.dependencies
			.get(kind)
			.into_iter()
			.flatten()
			.filter(move |target| *target != kind && self.contains(target))
	}

	/// Orders every kind after the kinds it depends on.
	///
	/// Among kinds that are ready at the same time, insertion order wins, so
	/// a caller order that is already valid comes back unchanged.
	///
	/// # Errors
	///
	/// [`SeedingError::OrderingError`] naming the kinds on a dependency cycle.
	pub fn topological_order(&self) -> SeedingResult<Vec<EntityKind>> {
		let mut placed: BTreeSet<&EntityKind> = BTreeSet::new();
		let mut order = Vec::with_capacity(self.kinds.len());

		while order.len() < self.kinds.len() {
			let next = self.kinds.iter().find(|kind| {
				!placed.contains(kind)
					&& self
						.dependencies_of(kind)
						.all(|target| placed.contains(target))
			});
			match next {
				Some(kind) => {
					placed.insert(kind);
					order.push(kind.clone());
				}
				None => {
					let stuck: Vec<String> = self
						.kinds
						.iter()
						.filter(|kind| !placed.contains(kind))
						.map(ToString::to_string)
						.collect();
					return Err(SeedingError::OrderingError(format!(
						"foreign keys form a cycle between: {}",
						stuck.join(", ")
					)));
				}
			}
		}

		Ok(order)
	}

	/// Checks that no kind in `order` comes before a kind it depends on.
	///
	/// Dependencies absent from `order` are not checked.
	pub fn verify_order(&self, order: &[&EntityKind]) -> SeedingResult<()> {
		for (position, kind) in order.iter().enumerate() {
			for target in self.dependencies_of(kind) {
				let later = order[position + 1..].iter().any(|other| *other == target);
				if later {
					return Err(SeedingError::OrderingError(format!(
						"{} is loaded before {}, which it references",
						kind, target
					)));
				}
			}
		}
		Ok(())
	}
}
