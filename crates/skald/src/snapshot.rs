//! # Snapshots: Save and Restore Game State
//!
//! Everything in a [`Game`] is plain data, so a snapshot is just its JSON
//! form: levels, entities (with each component's current, original, and
//! previous value), events, and which level is active. That makes a
//! snapshot usable as a mid-game checkpoint, not only as a level file.
//!
//! Loading always re-validates every rule, since a hand-edited file can
//! name a mode that doesn't fit its component.
//!
//! ## Quick Start
//!
//! ```
//! use skald::prelude::*;
//! use skald::snapshot;
//!
//! let mut level = Level::new("meadow");
//! level.spawn(Entity::new().with(kinds::NAME, "flappy".to_string()));
//! let game = Game::new("Flappy").with_level(level);
//!
//! let json = snapshot::to_json(&game).unwrap();
//! let restored = snapshot::from_json(&json).unwrap();
//! assert_eq!(restored.level(1).unwrap().entities().len(), 1);
//! ```

use std::path::Path;

use crate::error::Result;
use crate::game::Game;
use crate::level::Level;

/// Serialize a game to pretty-printed JSON.
pub fn to_json(game: &Game) -> Result<String> {
    Ok(serde_json::to_string_pretty(game)?)
}

/// Restore a game from JSON, validating every rule.
pub fn from_json(json: &str) -> Result<Game> {
    let game: Game = serde_json::from_str(json)?;
    game.validate()?;
    Ok(game)
}

pub fn to_value(game: &Game) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(game)?)
}

pub fn from_value(value: serde_json::Value) -> Result<Game> {
    let game: Game = serde_json::from_value(value)?;
    game.validate()?;
    Ok(game)
}

/// Serialize a single level.
pub fn level_to_json(level: &Level) -> Result<String> {
    Ok(serde_json::to_string_pretty(level)?)
}

/// Restore a single level, validating its events.
pub fn level_from_json(json: &str) -> Result<Level> {
    let level: Level = serde_json::from_str(json)?;
    level.validate()?;
    Ok(level)
}

/// Write a game snapshot to a file.
pub fn save_to_file(game: &Game, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, to_json(game)?)?;
    log::info!("saved \"{}\" to {}", game.title(), path.display());
    Ok(())
}

/// Read a game snapshot from a file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Game> {
    let path = path.as_ref();
    let game = from_json(&std::fs::read_to_string(path)?)?;
    log::info!("loaded \"{}\" from {}", game.title(), path.display());
    Ok(game)
}
