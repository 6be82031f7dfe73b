//! # Entity-Component Store
//!
//! A deliberately small ECS for rule-driven 2D games. Entities are keyed
//! bags of components rather than archetype rows: the rule engine needs to
//! name components in data, so identity is a closed kind enum instead of a
//! Rust type.
//!
//! ## Module Overview
//!
//! - [`component`]: `Component<T>`, the closed `ComponentKind` set, typed `Kind<T>` handles
//! - [`entity`]: Generational entity ids and the `Entity` component bag
//! - [`registry`]: Named defaults and the `{ "Kind": value }` authoring format
//! - [`system`]: System trait and schedule runner

pub mod component;
pub mod entity;
pub mod registry;
pub mod system;

pub use component::{
    Component, ComponentKind, ComponentSlot, Contact, Kind, Payload, PayloadType, Value, kinds,
};
pub use entity::{Entity, EntityId};
pub use registry::ComponentRegistry;
pub use system::{Frame, Schedule, System};
