//! The game aggregate: an ordered list of levels and which one is active.
//!
//! Level numbers are 1-based, the way players and authoring tools count
//! them. The [`Engine`](crate::engine::Engine) only ever ticks the current
//! level; the others sit untouched until the game moves to them.
//!
//! # Example
//!
//! ```
//! use skald::prelude::*;
//!
//! let mut game = Game::new("Flappy")
//!     .with_level(Level::new("meadow"))
//!     .with_level(Level::new("caves"));
//! assert_eq!(game.current_number(), 1);
//!
//! game.go_to_level(2).unwrap();
//! assert_eq!(game.current_level().map(Level::name), Some("caves"));
//! assert!(game.go_to_level(3).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkaldError};
use crate::level::Level;

/// A level change requested by a system during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Move to the given 1-based level.
    GoTo(usize),
    /// The player finished the last level.
    Beaten,
    /// The player lost.
    GameOver,
}

/// An ordered collection of levels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Game {
    title: String,
    levels: Vec<Level>,
    /// 0-based index into `levels`.
    #[serde(default)]
    current: usize,
}

impl Game {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Append a level, returning its 1-based number.
    pub fn add_level(&mut self, level: Level) -> usize {
        self.levels.push(level);
        self.levels.len()
    }

    /// Builder form of [`add_level`](Self::add_level).
    pub fn with_level(mut self, level: Level) -> Self {
        self.add_level(level);
        self
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// The level with the given 1-based number.
    pub fn level(&self, number: usize) -> Option<&Level> {
        number.checked_sub(1).and_then(|i| self.levels.get(i))
    }

    pub fn level_mut(&mut self, number: usize) -> Option<&mut Level> {
        number.checked_sub(1).and_then(|i| self.levels.get_mut(i))
    }

    /// 1-based number of the active level.
    pub fn current_number(&self) -> usize {
        self.current + 1
    }

    /// The active level. `None` only for a game with no levels.
    pub fn current_level(&self) -> Option<&Level> {
        self.levels.get(self.current)
    }

    pub fn current_level_mut(&mut self) -> Option<&mut Level> {
        self.levels.get_mut(self.current)
    }

    /// Make the level with the given 1-based number active.
    pub fn go_to_level(&mut self, number: usize) -> Result<()> {
        if number == 0 || number > self.levels.len() {
            return Err(SkaldError::NoSuchLevel {
                requested: number,
                count: self.levels.len(),
            });
        }
        self.current = number - 1;
        log::info!(
            "{}: now on level {number} \"{}\"",
            self.title,
            self.levels[self.current].name()
        );
        Ok(())
    }

    /// Reset every component in the active level to its original value.
    pub fn restart_level(&mut self) {
        if let Some(level) = self.current_level_mut() {
            level.reset();
        }
    }

    /// Check every event in every level for configuration errors.
    pub fn validate(&self) -> Result<()> {
        for level in &self.levels {
            level.validate()?;
        }
        if !self.levels.is_empty() && self.current >= self.levels.len() {
            return Err(SkaldError::NoSuchLevel {
                requested: self.current_number(),
                count: self.levels.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::kinds;
    use crate::ecs::entity::Entity;

    fn three_levels() -> Game {
        Game::new("Test")
            .with_level(Level::new("one"))
            .with_level(Level::new("two"))
            .with_level(Level::new("three"))
    }

    #[test]
    fn levels_are_numbered_from_one() {
        let game = three_levels();
        assert_eq!(game.level_count(), 3);
        assert_eq!(game.level(1).unwrap().name(), "one");
        assert_eq!(game.level(3).unwrap().name(), "three");
        assert!(game.level(0).is_none());
        assert!(game.level(4).is_none());
    }

    #[test]
    fn go_to_level_bounds() {
        let mut game = three_levels();
        game.go_to_level(3).unwrap();
        assert_eq!(game.current_number(), 3);

        match game.go_to_level(0) {
            Err(SkaldError::NoSuchLevel { requested, count }) => {
                assert_eq!((requested, count), (0, 3));
            }
            other => panic!("expected NoSuchLevel, got {other:?}"),
        }
        assert!(game.go_to_level(4).is_err());
        assert_eq!(game.current_number(), 3);
    }

    #[test]
    fn empty_game_has_no_current_level() {
        let game = Game::new("Empty");
        assert!(game.current_level().is_none());
        assert!(game.validate().is_ok());
    }

    #[test]
    fn restart_resets_current_level_only() {
        let mut game = three_levels();
        let a = game
            .level_mut(1)
            .unwrap()
            .spawn(Entity::new().with(kinds::LIVES, 3.0));
        let b = game
            .level_mut(2)
            .unwrap()
            .spawn(Entity::new().with(kinds::LIVES, 3.0));
        for n in [1, 2] {
            let level = game.level_mut(n).unwrap();
            let id = if n == 1 { a } else { b };
            level.get_mut(id).unwrap().get_mut(kinds::LIVES).unwrap().set_value(1.0);
        }

        game.restart_level();
        assert_eq!(game.level(1).unwrap().get(a).unwrap().value(kinds::LIVES), Some(&3.0));
        assert_eq!(game.level(2).unwrap().get(b).unwrap().value(kinds::LIVES), Some(&1.0));
    }
}
