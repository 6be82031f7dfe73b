//! Convenience re-exports: `use skald::prelude::*` for the common items.

pub use crate::config::{CommitPolicy, EngineConfig};
pub use crate::ecs::{
    Component, ComponentKind, ComponentRegistry, Contact, Entity, EntityId, Frame, Kind, Schedule,
    System, Value, kinds,
};
pub use crate::engine::{Engine, GameStatus, TickReport};
pub use crate::error::{Result, SkaldError};
pub use crate::game::{Game, Transition};
pub use crate::input::{Input, KeyCode};
pub use crate::level::{EntityStore, Level};
pub use crate::rules::{
    Action, Comparison, Condition, Direction, Effect, Event, EventType, ModifyType, Selector,
    Target,
};
pub use crate::systems::{
    ContactResetSystem, EventReport, EventSystem, GameOverSystem, MovementSystem,
    ProgressionSystem,
};
