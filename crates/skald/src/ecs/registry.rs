//! # Component Registry: Named Defaults and the Authoring Format
//!
//! Authoring tools and level files refer to components by name
//! (`"XPosition"`) and write values as bare JSON (`50`). The registry maps
//! each [`ComponentKind`] to a default-value factory, so tools can offer an
//! "Add Component" list and build entities from a list of kinds without
//! any reflection.
//!
//! ```text
//! { "Name": "flappy", "YPosition": 50, "Camera": false }
//!        │                 │               │
//!        ▼                 ▼               ▼
//!   Component<String> Component<f64>  Component<bool>
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use skald::prelude::*;
//!
//! let mut registry = ComponentRegistry::new();
//! registry.register_with_default(kinds::HEALTH, 3.0);
//! registry.register(kinds::NAME);
//!
//! let goomba = registry.default_entity(&[ComponentKind::Name, ComponentKind::Health]).unwrap();
//! assert_eq!(goomba.value(kinds::HEALTH), Some(&3.0));
//! ```

use std::collections::BTreeMap;

use super::component::{ComponentKind, ComponentSlot, Kind, Payload, Value};
use super::entity::Entity;
use crate::error::{Result, SkaldError};

/// Maps component kinds to their default values.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    defaults: BTreeMap<ComponentKind, Value>,
}

impl ComponentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every kind registered at its zero value.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in ComponentKind::ALL {
            registry
                .defaults
                .insert(kind, Value::default_for(kind.payload()));
        }
        registry
    }

    /// Register a kind with its payload's zero value.
    pub fn register<T: Payload>(&mut self, kind: Kind<T>) {
        let kind = kind.kind();
        self.defaults.insert(kind, Value::default_for(kind.payload()));
    }

    /// Register a kind with a specific default.
    pub fn register_with_default<T: Payload>(&mut self, kind: Kind<T>, default: T) {
        self.defaults.insert(kind.kind(), default.into_value());
    }

    pub fn is_registered(&self, kind: ComponentKind) -> bool {
        self.defaults.contains_key(&kind)
    }

    /// Short names of every registered kind, in kind order (for an
    /// "Add Component" dropdown).
    pub fn component_names(&self) -> Vec<&'static str> {
        self.defaults.keys().map(|k| k.short_name()).collect()
    }

    /// The default value registered under `name`.
    pub fn default_value(&self, name: &str) -> Option<Value> {
        let kind: ComponentKind = name.parse().ok()?;
        self.defaults.get(&kind).cloned()
    }

    /// A fresh component holding the kind's default.
    pub fn create(&self, kind: ComponentKind) -> Option<ComponentSlot> {
        self.defaults.get(&kind).cloned().map(ComponentSlot::from_value)
    }

    pub fn create_by_name(&self, name: &str) -> Result<ComponentSlot> {
        let kind: ComponentKind = name.parse()?;
        self.create(kind)
            .ok_or_else(|| SkaldError::UnknownKind(name.to_string()))
    }

    /// An entity carrying the default of every kind in `kinds`.
    pub fn default_entity(&self, kinds: &[ComponentKind]) -> Result<Entity> {
        let mut entity = Entity::new();
        for &kind in kinds {
            let slot = self
                .create(kind)
                .ok_or_else(|| SkaldError::UnknownKind(kind.short_name().to_string()))?;
            entity.insert_slot(kind, slot)?;
        }
        Ok(entity)
    }

    /// Build an entity from the `{ "Kind": value }` authoring format.
    ///
    /// Names may be short or full. A `null` value means "use the registered
    /// default".
    pub fn entity_from_json(&self, json: &serde_json::Value) -> Result<Entity> {
        let map: BTreeMap<String, serde_json::Value> = serde_json::from_value(json.clone())?;
        let mut entity = Entity::new();
        for (name, raw) in map {
            let kind: ComponentKind = name.parse()?;
            let slot = if raw.is_null() {
                self.create_by_name(&name)?
            } else {
                ComponentSlot::from_value(serde_json::from_value::<Value>(raw)?)
            };
            entity.insert_slot(kind, slot)?;
        }
        Ok(entity)
    }

    /// The inverse of [`entity_from_json`](Self::entity_from_json): current
    /// values keyed by short name.
    pub fn entity_to_json(entity: &Entity) -> Result<serde_json::Value> {
        let map: BTreeMap<&str, Value> = entity
            .components()
            .map(|(kind, slot)| (kind.short_name(), slot.value()))
            .collect();
        Ok(serde_json::to_value(map)?)
    }
}
