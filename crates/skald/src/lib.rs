//! # Skald: Rule Engine for 2D Entity-Component Games
//!
//! Entities carry typed components; levels carry declarative events that
//! bind conditions over those components (and the keys being held) to
//! actions that rewrite them. An [`Engine`](engine::Engine) ticks the active
//! level through a schedule of systems, one of which is the event pass.
//!
//! Start with `use skald::prelude::*`, build a [`Game`](game::Game) out of
//! [`Level`](level::Level)s, and hand it to an engine.

pub mod config;
pub mod ecs;
pub mod engine;
pub mod error;
pub mod game;
pub mod input;
pub mod level;
pub mod prelude;
pub mod rules;
pub mod snapshot;
pub mod systems;
