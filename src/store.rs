//! The domain store the layout core reads from and writes positions back to.

use std::collections::HashMap;

use log::debug;

use crate::layout::types::{EgoLayoutParams, Entity, ForceParams, Point, Relationship};

/// Errors raised by store mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
	/// An entity or relationship with this id already exists.
	#[error("duplicate id: {0}")]
	DuplicateId(String),

	/// No entity has this id.
	#[error("unknown entity: {0}")]
	UnknownEntity(String),

	/// No relationship has this id.
	#[error("unknown relationship: {0}")]
	UnknownRelationship(String),

	/// A relationship names an endpoint that is not an entity.
	#[error("relationship {relationship} points at missing entity {entity}")]
	DanglingEndpoint {
		/// Offending relationship.
		relationship: String,
		/// Missing endpoint.
		entity: String,
	},
}

/// Result type alias using [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;

/// Read accessors and mutations the layout core needs from the domain.
///
/// The core only ever writes positions through [`DomainStore::write_positions`].
pub trait DomainStore {
	/// Current entities, in display order.
	fn entities(&self) -> &[Entity];
	/// Current relationships, in display order.
	fn relationships(&self) -> &[Relationship];
	/// Force layout tunables.
	fn force_params(&self) -> ForceParams;
	/// Ego layout tunables.
	fn ego_params(&self) -> EgoLayoutParams;

	/// Add an entity.
	fn add_entity(&mut self, entity: Entity) -> Result<()>;
	/// Replace an entity with the same id.
	fn update_entity(&mut self, entity: Entity) -> Result<()>;
	/// Remove an entity and every relationship touching it.
	fn remove_entity(&mut self, id: &str) -> Result<Entity>;
	/// Add a relationship between existing entities.
	fn add_relationship(&mut self, relationship: Relationship) -> Result<()>;
	/// Replace a relationship with the same id.
	fn update_relationship(&mut self, relationship: Relationship) -> Result<()>;
	/// Remove a relationship.
	fn remove_relationship(&mut self, id: &str) -> Result<Relationship>;
	/// Store positions for the given entity ids; unknown ids are ignored.
	fn write_positions(&mut self, positions: &HashMap<String, Point>);
	/// Replace the force tunables.
	fn set_force_params(&mut self, params: ForceParams);
	/// Replace the ego tunables.
	fn set_ego_params(&mut self, params: EgoLayoutParams);
}

/// In-memory [`DomainStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	entities: Vec<Entity>,
	relationships: Vec<Relationship>,
	force_params: ForceParams,
	ego_params: EgoLayoutParams,
	revision: u64,
	next_id: u64,
}

impl MemoryStore {
	/// An empty store with default tunables.
	pub fn new() -> Self {
		Self::default()
	}

	/// Bumped on every mutation.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// A fresh id with the given prefix, unused by any entity or relationship.
	pub fn new_id(&mut self, prefix: &str) -> String {
		loop {
			self.next_id += 1;
			let id = format!("{prefix}-{}", self.next_id);
			if !self.has_id(&id) {
				return id;
			}
		}
	}

	/// Entity by id.
	pub fn entity(&self, id: &str) -> Option<&Entity> {
		self.entities.iter().find(|e| e.id == id)
	}

	fn has_id(&self, id: &str) -> bool {
		self.entities.iter().any(|e| e.id == id) || self.relationships.iter().any(|r| r.id == id)
	}

	fn check_endpoints(&self, rel: &Relationship) -> Result<()> {
		for end in [&rel.source, &rel.target] {
			if self.entity(end).is_none() {
				return Err(StoreError::DanglingEndpoint {
					relationship: rel.id.clone(),
					entity: end.clone(),
				});
			}
		}
		Ok(())
	}

	fn bump(&mut self) {
		self.revision += 1;
	}
}

impl DomainStore for MemoryStore {
	fn entities(&self) -> &[Entity] {
		&self.entities
	}

	fn relationships(&self) -> &[Relationship] {
		&self.relationships
	}

	fn force_params(&self) -> ForceParams {
		self.force_params
	}

	fn ego_params(&self) -> EgoLayoutParams {
		self.ego_params
	}

	fn add_entity(&mut self, entity: Entity) -> Result<()> {
		if self.has_id(&entity.id) {
			return Err(StoreError::DuplicateId(entity.id));
		}
		self.entities.push(entity);
		self.bump();
		Ok(())
	}

	fn update_entity(&mut self, entity: Entity) -> Result<()> {
		let slot = self
			.entities
			.iter_mut()
			.find(|e| e.id == entity.id)
			.ok_or_else(|| StoreError::UnknownEntity(entity.id.clone()))?;
		*slot = entity;
		self.bump();
		Ok(())
	}

	fn remove_entity(&mut self, id: &str) -> Result<Entity> {
		let pos = self
			.entities
			.iter()
			.position(|e| e.id == id)
			.ok_or_else(|| StoreError::UnknownEntity(id.to_string()))?;
		let removed = self.entities.remove(pos);
		let before = self.relationships.len();
		self.relationships.retain(|r| r.source != id && r.target != id);
		debug!("removed entity {id} and {} relationships", before - self.relationships.len());
		self.bump();
		Ok(removed)
	}

	fn add_relationship(&mut self, relationship: Relationship) -> Result<()> {
		if self.has_id(&relationship.id) {
			return Err(StoreError::DuplicateId(relationship.id));
		}
		self.check_endpoints(&relationship)?;
		self.relationships.push(relationship);
		self.bump();
		Ok(())
	}

	fn update_relationship(&mut self, relationship: Relationship) -> Result<()> {
		self.check_endpoints(&relationship)?;
		let slot = self
			.relationships
			.iter_mut()
			.find(|r| r.id == relationship.id)
			.ok_or_else(|| StoreError::UnknownRelationship(relationship.id.clone()))?;
		*slot = relationship;
		self.bump();
		Ok(())
	}

	fn remove_relationship(&mut self, id: &str) -> Result<Relationship> {
		let pos = self
			.relationships
			.iter()
			.position(|r| r.id == id)
			.ok_or_else(|| StoreError::UnknownRelationship(id.to_string()))?;
		let removed = self.relationships.remove(pos);
		self.bump();
		Ok(removed)
	}

	fn write_positions(&mut self, positions: &HashMap<String, Point>) {
		let mut written = 0usize;
		for entity in &mut self.entities {
			if let Some(&p) = positions.get(&entity.id) {
				entity.position = Some(p);
				written += 1;
			}
		}
		if written > 0 {
			debug!("wrote back {written} positions");
			self.bump();
		}
	}

	fn set_force_params(&mut self, params: ForceParams) {
		self.force_params = params;
		self.bump();
	}

	fn set_ego_params(&mut self, params: EgoLayoutParams) {
		self.ego_params = params;
		self.bump();
	}
}
