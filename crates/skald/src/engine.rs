//! # Engine: The Tick Driver
//!
//! [`Engine`] owns the [`Game`], the [`Schedule`], and the input state, and
//! advances the active level one tick at a time. Frame timing is the
//! caller's business: call [`Engine::tick`] from whatever loop drives the
//! game.
//!
//! One tick:
//!
//! ```text
//! (external) record contacts, press/release keys
//!     │
//!     ▼
//! Schedule::run(current level)      movement → events → game over → progression → contacts
//!     │
//!     ▼
//! apply the first requested Transition
//!     │
//!     ▼
//! clear just-pressed / just-released input edges
//! ```
//!
//! # Example
//!
//! ```
//! use skald::prelude::*;
//!
//! let mut level = Level::new("meadow");
//! let flappy = level.spawn(
//!     Entity::new()
//!         .with(kinds::NAME, "flappy".to_string())
//!         .with(kinds::Y_VELOCITY, 0.0),
//! );
//! level.add_event(
//!     Event::named("flappy")
//!         .with_input(KeyCode::ArrowUp)
//!         .with_action(Action::number(ModifyType::Absolute, -5.0, kinds::Y_VELOCITY)),
//! );
//!
//! let mut engine = Engine::builder(Game::new("Flappy").with_level(level))
//!     .seed(7)
//!     .build()
//!     .unwrap();
//! engine.input_mut().press(KeyCode::ArrowUp);
//! engine.tick().unwrap();
//!
//! let bird = engine.level().unwrap().get(flappy).unwrap();
//! assert_eq!(bird.value(kinds::Y_VELOCITY), Some(&-5.0));
//! ```

use crate::config::{CommitPolicy, EngineConfig};
use crate::ecs::system::{Frame, Schedule, System};
use crate::error::{Result, SkaldError};
use crate::game::{Game, Transition};
use crate::input::{Input, KeyCode};
use crate::level::Level;
use crate::systems::{EventReport, default_schedule};

/// Whether there is anything left to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Running,
    /// A level change pointed past the last level.
    Beaten,
    /// A game-over was requested.
    Lost,
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// 1-based level the tick ran on.
    pub level: usize,
    /// The transition that was applied, if any.
    pub transition: Option<Transition>,
    pub events: EventReport,
    pub status: GameStatus,
}

/// Drives a [`Game`] one tick at a time.
pub struct Engine {
    game: Game,
    schedule: Schedule,
    input: Input<KeyCode>,
    tick: u64,
    status: GameStatus,
    config: EngineConfig,
}

impl Engine {
    /// An engine with the default config and schedule.
    ///
    /// # Panics
    ///
    /// Panics if the game contains an invalid rule. Use
    /// [`builder`](Self::builder) to get the error instead.
    pub fn new(game: Game) -> Self {
        match Self::builder(game).build() {
            Ok(engine) => engine,
            Err(e) => panic!("invalid game: {e}"),
        }
    }

    pub fn builder(game: Game) -> EngineBuilder {
        EngineBuilder {
            game,
            config: EngineConfig::default(),
            schedule: None,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// The active level.
    pub fn level(&self) -> Option<&Level> {
        self.game.current_level()
    }

    /// The active level, e.g. for the collision step to record contacts.
    pub fn level_mut(&mut self) -> Option<&mut Level> {
        self.game.current_level_mut()
    }

    pub fn input(&self) -> &Input<KeyCode> {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut Input<KeyCode> {
        &mut self.input
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_beaten(&self) -> bool {
        self.status == GameStatus::Beaten
    }

    pub fn is_lost(&self) -> bool {
        self.status == GameStatus::Lost
    }

    /// Won or lost, either way nothing is left to play.
    pub fn is_over(&self) -> bool {
        self.status != GameStatus::Running
    }

    /// Number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Append a system to the end of the schedule.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.schedule.add_system(system);
    }

    /// Run one tick on the active level.
    ///
    /// Once the game is over, ticks do nothing but report that.
    pub fn tick(&mut self) -> Result<TickReport> {
        let level_number = self.game.current_number();
        if self.is_over() {
            return Ok(TickReport {
                tick: self.tick,
                level: level_number,
                transition: None,
                events: EventReport::default(),
                status: self.status,
            });
        }

        let count = self.game.level_count();
        let level = self
            .game
            .current_level_mut()
            .ok_or(SkaldError::NoSuchLevel { requested: level_number, count })?;

        let mut frame = Frame::new(&self.input, self.tick);
        self.schedule.run(level, &mut frame);
        let Frame {
            transitions, events, ..
        } = frame;

        #[cfg(feature = "diagnostics")]
        for timing in self.schedule.timings() {
            log::trace!("tick {}: {} took {:.1}us", self.tick, timing.name, timing.duration_us);
        }

        if transitions.len() > 1 {
            log::debug!("{} level transitions requested, using the first", transitions.len());
        }
        let transition = match transitions.first().copied() {
            Some(Transition::GoTo(n)) if n > count => Some(self.beaten()),
            Some(Transition::GoTo(n)) => {
                self.game.go_to_level(n)?;
                Some(Transition::GoTo(n))
            }
            Some(Transition::Beaten) => Some(self.beaten()),
            Some(Transition::GameOver) => {
                log::info!("{}: game over", self.game.title());
                self.status = GameStatus::Lost;
                Some(Transition::GameOver)
            }
            None => None,
        };

        self.input.clear_just();
        let report = TickReport {
            tick: self.tick,
            level: level_number,
            transition,
            events,
            status: self.status,
        };
        self.tick += 1;
        Ok(report)
    }

    fn beaten(&mut self) -> Transition {
        log::info!("{}: game beaten", self.game.title());
        self.status = GameStatus::Beaten;
        Transition::Beaten
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    game: Game,
    config: EngineConfig,
    schedule: Option<Schedule>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed RANDOM actions for a reproducible run.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.config.commit_policy = policy;
        self
    }

    /// Replace the default schedule entirely.
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Validate every rule in the game and build the engine.
    pub fn build(self) -> Result<Engine> {
        self.game.validate()?;
        let schedule = self
            .schedule
            .unwrap_or_else(|| default_schedule(&self.config));
        log::info!(
            "{}: {} level(s), {} system(s)",
            self.game.title(),
            self.game.level_count(),
            schedule.len()
        );
        Ok(Engine {
            game: self.game,
            schedule,
            input: Input::new(),
            tick: 0,
            status: GameStatus::Running,
            config: self.config,
        })
    }
}
