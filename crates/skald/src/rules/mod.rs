//! # Rule Engine
//!
//! Declarative game logic as plain data:
//!
//! - [`action`]: mutations of one component on one entity
//! - [`condition`]: predicates over one entity
//! - [`event`]: selector + required inputs + conditions + actions
//! - [`commands`]: structural changes deferred to the end of a pass
//!
//! Nothing in here holds a reference to an entity. Rules name component
//! kinds and carry their operands, so they can be serialized and inspected
//! by authoring tools.

pub mod action;
pub mod commands;
pub mod condition;
pub mod event;

pub use action::{Action, Applied, Effect, ModifyType, Settable, Target};
pub use commands::{Command, Commands};
pub use condition::{Comparison, Condition, Direction};
pub use event::{CollisionSpec, Event, EventOutcome, EventType, Selector};
