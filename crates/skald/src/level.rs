//! # Level: Entities and the Events Scoped to Them
//!
//! A [`Level`] owns an ordered [`EntityStore`] and the list of
//! [`Event`]s that run against it. Insertion order matters in both: events
//! are evaluated in the order they were added, and within one event,
//! candidate entities are visited in spawn order.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ EntityStore                                          │
//! │                                                      │
//! │  allocator: generational EntityId lifecycle          │
//! │  entities:  Vec<Entity>          (spawn order)       │
//! │  locations: HashMap<u32, usize>  index → vec slot    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Despawning keeps the order of the survivors (a `Vec::remove`, not a swap
//! remove), so evaluation order stays stable for the rest of the level.
//!
//! ## Collisions
//!
//! Collision detection is external. Before each tick it calls
//! [`Level::record_contact`] for every touching pair; the contact lists are
//! wiped again by [`Level::clear_contacts`] (the
//! [`ContactResetSystem`](crate::systems::ContactResetSystem) does this at the
//! end of every tick).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ecs::component::{Component, ComponentKind, Contact, kinds};
use crate::ecs::entity::{Entity, EntityAllocator, EntityId};
use crate::error::{Result, SkaldError};
use crate::rules::condition::Direction;
use crate::rules::event::Event;

// ── EntityStore ──────────────────────────────────────────────────────────

/// Ordered storage for the entities of one level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "StoreRepr")]
pub struct EntityStore {
    allocator: EntityAllocator,
    entities: Vec<Entity>,
    /// Entity index → position in `entities`. Rebuilt on load.
    #[serde(skip_serializing)]
    locations: HashMap<u32, usize>,
}

#[derive(Deserialize)]
struct StoreRepr {
    allocator: EntityAllocator,
    entities: Vec<Entity>,
}

impl TryFrom<StoreRepr> for EntityStore {
    type Error = SkaldError;

    /// Every stored entity must hold a distinct live id, and every live id
    /// must belong to a stored entity.
    fn try_from(repr: StoreRepr) -> Result<Self> {
        let StoreRepr {
            allocator,
            entities,
        } = repr;
        let mut locations = HashMap::with_capacity(entities.len());
        for (pos, entity) in entities.iter().enumerate() {
            let id = entity.id();
            if !allocator.is_alive(id) || allocator.is_free(id.index) {
                return Err(SkaldError::Malformed(format!("entity id {id} is not allocated")));
            }
            if locations.insert(id.index, pos).is_some() {
                return Err(SkaldError::Malformed(format!("entity id {id} appears twice")));
            }
        }
        if allocator.live_count() != entities.len() {
            return Err(SkaldError::Malformed(format!(
                "{} ids allocated but {} entities stored",
                allocator.live_count(),
                entities.len()
            )));
        }
        Ok(EntityStore {
            allocator,
            entities,
            locations,
        })
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an entity, assigning it a fresh id.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = self.allocator.allocate();
        entity.set_id(id);
        self.locations.insert(id.index, self.entities.len());
        self.entities.push(entity);
        id
    }

    /// Despawn an entity, returning it. `None` if the id is stale.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        let pos = self.locations.remove(&id.index)?;
        let entity = self.entities.remove(pos);
        self.allocator.deallocate(id);
        self.reindex_from(pos);
        Some(entity)
    }

    /// Despawn every entity.
    pub fn clear(&mut self) {
        for id in self.ids() {
            self.despawn(id);
        }
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        let pos = *self.locations.get(&id.index)?;
        self.entities.get(pos)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        let pos = *self.locations.get(&id.index)?;
        self.entities.get_mut(pos)
    }

    /// Like [`get_mut`](Self::get_mut), but a stale id is an error.
    pub fn require_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.get_mut(id).ok_or(SkaldError::StaleEntity(id))
    }

    /// Entities in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    /// Ids in spawn order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(Entity::id).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// First entity whose name component equals `name`.
    pub fn find_named(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|e| e.name() == Some(name))
            .map(Entity::id)
    }

    /// Every entity whose name component equals `name`.
    pub fn all_named(&self, name: &str) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.name() == Some(name))
            .map(Entity::id)
            .collect()
    }

    /// Every entity whose group component equals `group`.
    pub fn in_group(&self, group: &str) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.group() == Some(group))
            .map(Entity::id)
            .collect()
    }

    /// Every entity carrying all of `signature`, in spawn order.
    pub fn with_components(&self, signature: &[ComponentKind]) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.has_components(signature))
            .map(Entity::id)
            .collect()
    }

    fn reindex_from(&mut self, start: usize) {
        for (pos, entity) in self.entities.iter().enumerate().skip(start) {
            self.locations.insert(entity.id().index, pos);
        }
    }
}

// ── Level ────────────────────────────────────────────────────────────────

/// A playable level: its entities plus the events scoped to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Level {
    name: String,
    entities: EntityStore,
    events: Vec<Event>,
}

impl Level {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        self.entities.spawn(entity)
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.despawn(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Append an event. Events run in the order they were added.
    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Builder form of [`add_event`](Self::add_event).
    pub fn with_event(mut self, event: Event) -> Self {
        self.add_event(event);
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut Vec<Event> {
        &mut self.events
    }

    pub fn remove_event(&mut self, index: usize) -> Option<Event> {
        (index < self.events.len()).then(|| self.events.remove(index))
    }

    /// Check every event for configuration errors.
    pub fn validate(&self) -> Result<()> {
        for event in &self.events {
            event.validate()?;
        }
        Ok(())
    }

    /// Borrow the entity store mutably alongside the (read-only) events.
    pub(crate) fn split_mut(&mut self) -> (&mut EntityStore, &[Event]) {
        (&mut self.entities, &self.events)
    }

    /// Record that `other` touched `subject` on the given side of `subject`.
    ///
    /// The contact is appended to the subject's collided component for that
    /// direction (created on demand) and mirrored into
    /// [`AnyCollided`](ComponentKind::AnyCollided).
    pub fn record_contact(
        &mut self,
        subject: EntityId,
        other: EntityId,
        direction: Direction,
    ) -> Result<()> {
        let other_entity = self
            .entities
            .get(other)
            .ok_or(SkaldError::StaleEntity(other))?;
        let contact = Contact {
            entity: other,
            name: other_entity.name().map(str::to_string),
            group: other_entity.group().map(str::to_string),
        };

        let entity = self.entities.require_mut(subject)?;
        let mut sides = vec![direction];
        if direction != Direction::Any {
            sides.push(Direction::Any);
        }
        for side in sides {
            let kind = side.collided();
            if entity.get(kind).is_none() {
                entity.add_component(kind, Component::new(Vec::new()));
            }
            if let Some(list) = entity.get_mut(kind) {
                list.push_contact(contact.clone());
            }
        }
        Ok(())
    }

    /// Empty every collided list in the level.
    pub fn clear_contacts(&mut self) {
        for entity in self.entities.iter_mut() {
            for direction in Direction::ALL {
                if let Some(list) = entity.get_mut(direction.collided()) {
                    list.clear_contacts();
                }
            }
        }
    }

    /// Reset every entity's components to their original values.
    pub fn reset(&mut self) {
        for entity in self.entities.iter_mut() {
            entity.reset_to_original();
        }
    }

    /// Despawn all entities (the level is being unloaded).
    pub fn unload(&mut self) {
        log::debug!("unloading level \"{}\" ({} entities)", self.name, self.entities.len());
        self.entities.clear();
    }

    /// Name of the entity with this id, for log messages.
    pub(crate) fn describe(&self, id: EntityId) -> String {
        match self.get(id).and_then(|e| e.value(kinds::NAME)) {
            Some(name) => format!("{name} ({id})"),
            None => id.to_string(),
        }
    }
}
