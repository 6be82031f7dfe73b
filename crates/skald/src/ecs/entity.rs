//! # Entity: A Bag of Components, One Per Kind
//!
//! An [`Entity`] is a game object: a keyed bag holding at most one
//! component per [`ComponentKind`]. "Has component X" is the structural
//! capability check the rest of the runtime dispatches on. Actions,
//! conditions, and systems select the entities they apply to with
//! [`Entity::has_components`] rather than through any type hierarchy.
//!
//! Entities live in a level's [`EntityStore`](crate::level::EntityStore) and
//! are addressed by an [`EntityId`].
//!
//! ## Design: Generational Indices
//!
//! Ids pair a slot index with a **generation** counter. When a slot is
//! recycled its generation increments, so a stale id (say, an action's link
//! to a destroyed score keeper) is detected instead of silently pointing at
//! whatever got spawned into the slot next.
//!
//! ```text
//! EntityId { index: 5, generation: 0 }  ← original
//! EntityId { index: 5, generation: 1 }  ← after recycle
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::component::{Component, ComponentKind, ComponentSlot, Kind, Payload, kinds};
use crate::error::{Result, SkaldError};

// ── EntityId ─────────────────────────────────────────────────────────────

/// A lightweight handle to an entity in a level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    /// Slot index in the allocator. Recycled when the entity is despawned.
    pub(crate) index: u32,
    /// Incremented each time this slot is reused.
    pub(crate) generation: u32,
}

impl EntityId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the raw index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Placeholder id for entities that haven't been spawned yet.
    pub(crate) const DETACHED: EntityId = EntityId::new(u32::MAX, 0);
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

// ── Allocator ────────────────────────────────────────────────────────────

/// Manages entity id allocation and recycling.
///
/// ```text
/// generations: [0, 1, 0, 2, 0]   ← one generation per slot ever allocated
/// free_list:   [1, 3]             ← slots available for reuse
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl EntityAllocator {
    /// Allocate an id, reusing a freed slot when one is available.
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_list.pop() {
            // Generation was already bumped on dealloc.
            EntityId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            EntityId::new(index, 0)
        }
    }

    /// Free an id. Returns `false` if it was already stale.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.generations[id.index as usize] += 1;
        self.free_list.push(id.index);
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        let idx = id.index as usize;
        idx < self.generations.len() && self.generations[idx] == id.generation
    }

    /// Slots currently handed out.
    pub fn live_count(&self) -> usize {
        self.generations.len().saturating_sub(self.free_list.len())
    }

    pub fn is_free(&self, index: u32) -> bool {
        self.free_list.contains(&index)
    }

    #[cfg(test)]
    fn free_count(&self) -> usize {
        self.free_list.len()
    }
}

// ── Entity ───────────────────────────────────────────────────────────────

/// A game object: at most one component per [`ComponentKind`].
///
/// # Example
///
/// ```
/// use skald::prelude::*;
///
/// let flappy = Entity::new()
///     .with(kinds::NAME, "flappy".to_string())
///     .with(kinds::Y_POSITION, 50.0);
/// assert_eq!(flappy.value(kinds::Y_POSITION), Some(&50.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EntityRepr")]
pub struct Entity {
    id: EntityId,
    components: BTreeMap<ComponentKind, ComponentSlot>,
}

/// Wire form of [`Entity`]. Prototypes may omit the id.
#[derive(Deserialize)]
struct EntityRepr {
    #[serde(default = "detached")]
    id: EntityId,
    components: BTreeMap<ComponentKind, ComponentSlot>,
}

impl TryFrom<EntityRepr> for Entity {
    type Error = SkaldError;

    fn try_from(repr: EntityRepr) -> Result<Self> {
        let mut entity = Entity {
            id: repr.id,
            components: BTreeMap::new(),
        };
        for (kind, slot) in repr.components {
            entity.insert_slot(kind, slot)?;
        }
        Ok(entity)
    }
}

fn detached() -> EntityId {
    EntityId::DETACHED
}

impl Entity {
    pub fn new() -> Self {
        Self {
            id: EntityId::DETACHED,
            components: BTreeMap::new(),
        }
    }

    /// The id assigned when this entity was spawned into a level.
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    /// Add a component, replacing (and returning) any existing one of the
    /// same kind.
    pub fn add_component<T: Payload>(
        &mut self,
        kind: Kind<T>,
        component: Component<T>,
    ) -> Option<ComponentSlot> {
        self.components.insert(kind.kind(), T::into_slot(component))
    }

    /// Builder form of [`add_component`](Self::add_component).
    pub fn with<T: Payload>(mut self, kind: Kind<T>, value: T) -> Self {
        self.add_component(kind, Component::new(value));
        self
    }

    /// Insert an untyped slot. Fails if the slot's payload doesn't match the
    /// kind.
    pub fn insert_slot(
        &mut self,
        kind: ComponentKind,
        slot: ComponentSlot,
    ) -> Result<Option<ComponentSlot>> {
        if slot.payload() != kind.payload() {
            return Err(SkaldError::Incompatible {
                kind,
                expected: kind.payload(),
                found: slot.payload(),
                reason: "component payload does not match its kind",
            });
        }
        Ok(self.components.insert(kind, slot))
    }

    pub fn remove_component(&mut self, kind: impl Into<ComponentKind>) -> Option<ComponentSlot> {
        self.components.remove(&kind.into())
    }

    pub fn has_component(&self, kind: impl Into<ComponentKind>) -> bool {
        self.components.contains_key(&kind.into())
    }

    /// `true` iff every kind in `kinds` is present.
    pub fn has_components(&self, kinds: &[ComponentKind]) -> bool {
        kinds.iter().all(|k| self.components.contains_key(k))
    }

    pub fn get<T: Payload>(&self, kind: Kind<T>) -> Option<&Component<T>> {
        self.components.get(&kind.kind()).and_then(T::from_slot)
    }

    pub fn get_mut<T: Payload>(&mut self, kind: Kind<T>) -> Option<&mut Component<T>> {
        self.components.get_mut(&kind.kind()).and_then(T::from_slot_mut)
    }

    /// Shortcut for `get(kind).map(Component::value)`.
    pub fn value<T: Payload>(&self, kind: Kind<T>) -> Option<&T> {
        self.get(kind).map(Component::value)
    }

    /// Like [`get`](Self::get), but a missing component is an error.
    ///
    /// Use this where the component is a configuration requirement rather
    /// than something that may legitimately be absent.
    pub fn require<T: Payload>(&self, kind: Kind<T>) -> Result<&Component<T>> {
        self.get(kind).ok_or(SkaldError::MissingComponent {
            entity: self.id,
            kind: kind.kind(),
        })
    }

    pub fn require_mut<T: Payload>(&mut self, kind: Kind<T>) -> Result<&mut Component<T>> {
        let id = self.id;
        self.get_mut(kind).ok_or(SkaldError::MissingComponent {
            entity: id,
            kind: kind.kind(),
        })
    }

    pub fn slot(&self, kind: ComponentKind) -> Option<&ComponentSlot> {
        self.components.get(&kind)
    }

    pub fn slot_mut(&mut self, kind: ComponentKind) -> Option<&mut ComponentSlot> {
        self.components.get_mut(&kind)
    }

    /// Every kind this entity carries, in kind order.
    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.components.keys().copied()
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentKind, &ComponentSlot)> + '_ {
        self.components.iter().map(|(k, s)| (*k, s))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.value(kinds::NAME).map(String::as_str)
    }

    pub fn group(&self) -> Option<&str> {
        self.value(kinds::GROUP).map(String::as_str)
    }

    /// Reset every component to its original value.
    pub fn reset_to_original(&mut self) {
        for slot in self.components.values_mut() {
            slot.reset_to_original();
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Value;

    #[test]
    fn allocate_sequential() {
        let mut alloc = EntityAllocator::default();
        let e0 = alloc.allocate();
        let e1 = alloc.allocate();
        assert_eq!(e0.index, 0);
        assert_eq!(e1.index, 1);
        assert_eq!(e0.generation, 0);
    }

    #[test]
    fn recycle_bumps_generation() {
        let mut alloc = EntityAllocator::default();
        let e0 = alloc.allocate();
        assert!(alloc.deallocate(e0));
        let reused = alloc.allocate();
        assert_eq!(reused.index, 0);
        assert_eq!(reused.generation, 1);
        assert!(!alloc.is_alive(e0));
        assert!(alloc.is_alive(reused));
    }

    #[test]
    fn double_free_returns_false() {
        let mut alloc = EntityAllocator::default();
        let e0 = alloc.allocate();
        assert!(alloc.deallocate(e0));
        assert!(!alloc.deallocate(e0));
        assert_eq!(alloc.free_count(), 1);
        assert_eq!(alloc.live_count(), 0);
    }

    #[test]
    fn add_replaces_same_kind() {
        let mut e = Entity::new();
        e.add_component(kinds::X_POSITION, Component::new(1.0));
        e.add_component(kinds::X_POSITION, Component::new(2.0));
        e.add_component(kinds::X_POSITION, Component::new(3.0));

        assert_eq!(e.len(), 1);
        let x = e.get(kinds::X_POSITION).unwrap();
        assert_eq!(*x.value(), 3.0);
        // Fresh instance, not a write on the old one.
        assert_eq!(*x.original(), 3.0);
    }

    #[test]
    fn has_components_is_set_containment() {
        let e = Entity::new()
            .with(kinds::X_POSITION, 0.0)
            .with(kinds::Y_POSITION, 0.0);
        assert!(e.has_components(&[ComponentKind::XPosition, ComponentKind::YPosition]));
        assert!(e.has_components(&[]));
        assert!(!e.has_components(&[ComponentKind::XPosition, ComponentKind::XVelocity]));
    }

    #[test]
    fn remove_then_lookup_is_absent() {
        let mut e = Entity::new().with(kinds::HEALTH, 3.0);
        assert!(e.remove_component(kinds::HEALTH).is_some());
        assert!(e.get(kinds::HEALTH).is_none());
        assert!(e.remove_component(ComponentKind::Health).is_none());
    }

    #[test]
    fn require_reports_missing_kind() {
        let e = Entity::new();
        match e.require(kinds::SCORE) {
            Err(SkaldError::MissingComponent { kind, .. }) => {
                assert_eq!(kind, ComponentKind::Score)
            }
            other => panic!("expected MissingComponent, got {other:?}"),
        }
    }

    #[test]
    fn insert_slot_checks_payload() {
        let mut e = Entity::new();
        let bad = ComponentSlot::from_value(Value::Flag(true));
        assert!(e.insert_slot(ComponentKind::Name, bad).is_err());
        let good = ComponentSlot::from_value(Value::Text("mario".into()));
        assert!(e.insert_slot(ComponentKind::Name, good).unwrap().is_none());
        assert_eq!(e.name(), Some("mario"));
    }

    #[test]
    fn loading_checks_payloads_and_defaults_the_id() {
        let key = |kind: ComponentKind| {
            serde_json::to_value(kind).unwrap().as_str().unwrap().to_string()
        };
        let mario = Entity::new().with(kinds::NAME, "mario".to_string());
        let mut json = serde_json::to_value(mario).unwrap();
        json.as_object_mut().unwrap().remove("id");

        let prototype: Entity = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(prototype.id(), EntityId::DETACHED);
        assert_eq!(prototype.name(), Some("mario"));

        let text = json["components"][key(ComponentKind::Name)].clone();
        json["components"][key(ComponentKind::XPosition)] = text;
        assert!(serde_json::from_value::<Entity>(json).is_err());
    }

    #[test]
    fn reset_entity_restores_all_components() {
        let mut e = Entity::new()
            .with(kinds::X_POSITION, 5.0)
            .with(kinds::NAME, "goomba".to_string());
        e.get_mut(kinds::X_POSITION).unwrap().set_value(99.0);
        e.get_mut(kinds::NAME).unwrap().set_value("koopa".into());

        e.reset_to_original();
        assert_eq!(e.value(kinds::X_POSITION), Some(&5.0));
        assert_eq!(e.name(), Some("goomba"));
    }
}
