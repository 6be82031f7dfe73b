//! Built-in systems.
//!
//! The default schedule built by [`default_schedule`] runs, in order:
//!
//! ```text
//! MovementSystem       position += velocity
//! EventSystem          every event of the level, in insertion order
//! GameOverSystem       Lives at zero → game lost
//! ProgressionSystem    Progression flag → level change
//! ContactResetSystem   empty the collided lists for the next tick
//! ```
//!
//! Contacts are recorded by the external collision step *before* the tick,
//! so clearing them last keeps them visible to the event pass.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{CommitPolicy, EngineConfig};
use crate::ecs::component::{ComponentKind, kinds};
use crate::ecs::entity::EntityId;
use crate::ecs::system::{Frame, Schedule, System};
use crate::game::Transition;
use crate::input::{Input, KeyCode};
use crate::level::Level;
use crate::rules::{Command, Commands, EventOutcome};

/// Build the standard schedule for `config`.
pub fn default_schedule(config: &EngineConfig) -> Schedule {
    let mut schedule = Schedule::new();
    if config.movement {
        schedule.add_system(MovementSystem::new());
    }
    schedule.add_system(EventSystem::new(config.commit_policy, config.seed));
    if config.game_over {
        schedule.add_system(GameOverSystem::new());
    }
    if config.progression {
        schedule.add_system(ProgressionSystem::new());
    }
    if config.clear_contacts {
        schedule.add_system(ContactResetSystem);
    }
    schedule
}

// ── Movement ─────────────────────────────────────────────────────────────

/// Integrates velocity into position once per tick.
pub struct MovementSystem {
    signature: [ComponentKind; 4],
}

impl MovementSystem {
    pub fn new() -> Self {
        Self {
            signature: [
                ComponentKind::XPosition,
                ComponentKind::YPosition,
                ComponentKind::XVelocity,
                ComponentKind::YVelocity,
            ],
        }
    }
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MovementSystem {
    fn signature(&self) -> &[ComponentKind] {
        &self.signature
    }

    fn run(&mut self, level: &mut Level, _frame: &mut Frame<'_>) {
        for id in self.entities(level) {
            let Some(entity) = level.get_mut(id) else {
                continue;
            };
            for (position, velocity) in [
                (kinds::X_POSITION, kinds::X_VELOCITY),
                (kinds::Y_POSITION, kinds::Y_VELOCITY),
            ] {
                let Some(&v) = entity.value(velocity) else {
                    continue;
                };
                if let Some(p) = entity.get_mut(position) {
                    let next = p.value() + v;
                    p.set_value(next);
                }
            }
        }
    }
}

// ── Events ───────────────────────────────────────────────────────────────

/// Totals for one event pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventReport {
    /// (event, entity) pairs whose conditions held.
    pub fired: usize,
    /// Events skipped because their inputs weren't held.
    pub skipped_input: usize,
    /// Actions that failed (missing component, stale target).
    pub failures: usize,
    /// Entities spawned by the pass.
    pub spawned: Vec<EntityId>,
    /// Despawns queued by the pass.
    pub despawned: usize,
}

impl EventReport {
    pub fn record(&mut self, outcome: &EventOutcome) {
        self.fired += outcome.fired;
        self.failures += outcome.failures;
        if outcome.skipped_input {
            self.skipped_input += 1;
        }
    }

    pub fn merge(&mut self, other: EventReport) {
        self.fired += other.fired;
        self.skipped_input += other.skipped_input;
        self.failures += other.failures;
        self.spawned.extend(other.spawned);
        self.despawned += other.despawned;
    }
}

/// Evaluates every event of the level against its entities.
///
/// Owns the random source for RANDOM actions, so a seeded engine replays
/// identically.
pub struct EventSystem {
    policy: CommitPolicy,
    rng: StdRng,
}

impl EventSystem {
    pub fn new(policy: CommitPolicy, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { policy, rng }
    }

    pub fn policy(&self) -> CommitPolicy {
        self.policy
    }

    /// Run every event once, then apply queued spawns and despawns.
    pub fn run_pass(&mut self, level: &mut Level, input: &Input<KeyCode>) -> EventReport {
        let (store, events) = level.split_mut();
        let snapshot = match self.policy {
            CommitPolicy::Immediate => None,
            CommitPolicy::Snapshot => Some(store.clone()),
        };

        let mut commands = Commands::new();
        let mut report = EventReport::default();
        for event in events {
            let outcome =
                event.execute(store, snapshot.as_ref(), input, &mut self.rng, &mut commands);
            report.record(&outcome);
        }

        report.despawned = commands
            .iter()
            .filter(|c| matches!(c, Command::Despawn(_)))
            .count();
        report.spawned = commands.apply(store);
        if report.failures > 0 {
            log::debug!(
                "level \"{}\": {} action(s) skipped this pass",
                level.name(),
                report.failures
            );
        }
        report
    }
}

impl System for EventSystem {
    fn run(&mut self, level: &mut Level, frame: &mut Frame<'_>) {
        let report = self.run_pass(level, frame.input);
        frame.events.merge(report);
    }
}

// ── Progression ──────────────────────────────────────────────────────────

/// Requests a level change for any entity whose Progression flag is set.
///
/// The target is the entity's NextLevel value. The flag is cleared once the
/// request is made. Requests past the last level mean the game is beaten;
/// the engine decides that, since only it knows the level count.
pub struct ProgressionSystem {
    signature: [ComponentKind; 2],
}

impl ProgressionSystem {
    pub fn new() -> Self {
        Self {
            signature: [ComponentKind::Progression, ComponentKind::NextLevel],
        }
    }
}

impl Default for ProgressionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ProgressionSystem {
    fn signature(&self) -> &[ComponentKind] {
        &self.signature
    }

    fn run(&mut self, level: &mut Level, frame: &mut Frame<'_>) {
        for id in self.entities(level) {
            let who = level.describe(id);
            let Some(entity) = level.get_mut(id) else {
                continue;
            };
            if entity.value(kinds::PROGRESSION) != Some(&true) {
                continue;
            }
            let Some(&next) = entity.value(kinds::NEXT_LEVEL) else {
                continue;
            };
            if let Some(flag) = entity.get_mut(kinds::PROGRESSION) {
                flag.set_value(false);
            }
            if !next.is_finite() || next < 1.0 {
                log::warn!("{who} asked for level {next}, ignoring");
                continue;
            }
            frame.request(Transition::GoTo(next.round() as usize));
        }
    }
}

// ── Game over ────────────────────────────────────────────────────────────

/// Ends the game as lost once any entity's Lives drops to zero.
///
/// Runs before progression, so losing the last life and reaching the door
/// in the same tick counts as a loss.
pub struct GameOverSystem {
    signature: [ComponentKind; 1],
}

impl GameOverSystem {
    pub fn new() -> Self {
        Self {
            signature: [ComponentKind::Lives],
        }
    }
}

impl Default for GameOverSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for GameOverSystem {
    fn signature(&self) -> &[ComponentKind] {
        &self.signature
    }

    fn run(&mut self, level: &mut Level, frame: &mut Frame<'_>) {
        for id in self.entities(level) {
            let lives = level.get(id).and_then(|e| e.value(kinds::LIVES)).copied();
            if lives.is_some_and(|n| n <= 0.0) {
                log::debug!("{} is out of lives", level.describe(id));
                frame.request(Transition::GameOver);
                return;
            }
        }
    }
}

// ── Contacts ─────────────────────────────────────────────────────────────

/// Empties every collided list so the next tick starts clean.
pub struct ContactResetSystem;

impl System for ContactResetSystem {
    fn run(&mut self, level: &mut Level, _frame: &mut Frame<'_>) {
        level.clear_contacts();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::Entity;
    use crate::rules::{Action, Condition, Direction, Event, ModifyType};

    fn tick(system: &mut impl System, level: &mut Level) -> (Vec<Transition>, EventReport) {
        let input = Input::new();
        let mut frame = Frame::new(&input, 0);
        system.run(level, &mut frame);
        (frame.transitions, frame.events)
    }

    #[test]
    fn movement_adds_velocity() {
        let mut level = Level::new("test");
        let id = level.spawn(
            Entity::new()
                .with(kinds::X_POSITION, 10.0)
                .with(kinds::Y_POSITION, 50.0)
                .with(kinds::X_VELOCITY, 2.0)
                .with(kinds::Y_VELOCITY, -5.0),
        );
        let parked = level.spawn(
            Entity::new()
                .with(kinds::X_POSITION, 1.0)
                .with(kinds::X_VELOCITY, 9.0),
        );

        tick(&mut MovementSystem::new(), &mut level);
        let e = level.get(id).unwrap();
        assert_eq!(e.value(kinds::X_POSITION), Some(&12.0));
        assert_eq!(e.value(kinds::Y_POSITION), Some(&45.0));
        assert_eq!(e.get(kinds::Y_POSITION).unwrap().previous(), Some(&50.0));
        // Missing Y components keep it out of the signature.
        assert_eq!(level.get(parked).unwrap().value(kinds::X_POSITION), Some(&1.0));
    }

    fn counter_level() -> (Level, EntityId) {
        let mut level = Level::new("test");
        let id = level.spawn(
            Entity::new()
                .with(kinds::NAME, "counter".to_string())
                .with(kinds::VALUE, 0.0),
        );
        // Two events on the same entity: the second reads what the first wrote
        // unless the pass works from a snapshot.
        level.add_event(
            Event::named("counter")
                .with_condition(Condition::less_than(kinds::VALUE, 1.0))
                .with_action(Action::number(ModifyType::Relative, 1.0, kinds::VALUE)),
        );
        level.add_event(
            Event::named("counter")
                .with_condition(Condition::less_than(kinds::VALUE, 1.0))
                .with_action(Action::number(ModifyType::Relative, 10.0, kinds::VALUE)),
        );
        (level, id)
    }

    #[test]
    fn immediate_policy_exposes_earlier_writes() {
        let (mut level, id) = counter_level();
        let mut system = EventSystem::new(CommitPolicy::Immediate, Some(1));
        let report = system.run_pass(&mut level, &Input::new());
        assert_eq!(report.fired, 1);
        assert_eq!(level.get(id).unwrap().value(kinds::VALUE), Some(&1.0));
    }

    #[test]
    fn snapshot_policy_reads_start_of_pass_values() {
        let (mut level, id) = counter_level();
        let mut system = EventSystem::new(CommitPolicy::Snapshot, Some(1));
        let report = system.run_pass(&mut level, &Input::new());
        assert_eq!(report.fired, 2);
        assert_eq!(level.get(id).unwrap().value(kinds::VALUE), Some(&11.0));
    }

    #[test]
    fn destroy_is_committed_after_the_pass() {
        let mut level = Level::new("test");
        let goomba = level.spawn(Entity::new().with(kinds::NAME, "Goomba".to_string()));
        level.add_event(Event::named("Goomba").with_action(Action::destroy()));
        // Runs after the destroy was queued; the goomba is still there to match.
        level.add_event(
            Event::named("Goomba").with_action(Action::add_component(kinds::PIZZA, true)),
        );

        let mut system = EventSystem::new(CommitPolicy::Immediate, Some(1));
        let report = system.run_pass(&mut level, &Input::new());
        assert_eq!(report.fired, 2);
        assert_eq!(report.despawned, 1);
        assert!(level.get(goomba).is_none());
        assert!(level.entities().is_empty());
    }

    #[test]
    fn spawn_ids_are_reported() {
        let mut level = Level::new("test");
        level.spawn(Entity::new().with(kinds::NAME, "Block".to_string()));
        level.add_event(
            Event::named("Block").with_action(Action::spawn(
                Entity::new().with(kinds::NAME, "Coin".to_string()),
            )),
        );

        let (_, report) = tick(&mut EventSystem::new(CommitPolicy::Immediate, Some(1)), &mut level);
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(level.get(report.spawned[0]).unwrap().name(), Some("Coin"));
    }

    #[test]
    fn seeded_passes_replay_identically() {
        let build = || {
            let mut level = Level::new("test");
            let id = level.spawn(
                Entity::new()
                    .with(kinds::NAME, "leaf".to_string())
                    .with(kinds::X_POSITION, 0.0),
            );
            level.add_event(
                Event::named("leaf")
                    .with_action(Action::number(ModifyType::Random, 3.0, kinds::X_POSITION)),
            );
            (level, id)
        };
        let run = |seed| {
            let (mut level, id) = build();
            let mut system = EventSystem::new(CommitPolicy::Immediate, Some(seed));
            for _ in 0..5 {
                system.run_pass(&mut level, &Input::new());
            }
            *level.get(id).unwrap().value(kinds::X_POSITION).unwrap()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn progression_requests_next_level_once() {
        let mut level = Level::new("test");
        let door = level.spawn(
            Entity::new()
                .with(kinds::PROGRESSION, true)
                .with(kinds::NEXT_LEVEL, 2.0),
        );
        level.spawn(Entity::new().with(kinds::PROGRESSION, false).with(kinds::NEXT_LEVEL, 5.0));

        let mut system = ProgressionSystem::new();
        let (transitions, _) = tick(&mut system, &mut level);
        assert_eq!(transitions, vec![Transition::GoTo(2)]);
        assert_eq!(level.get(door).unwrap().value(kinds::PROGRESSION), Some(&false));

        let (transitions, _) = tick(&mut system, &mut level);
        assert!(transitions.is_empty());
    }

    #[test]
    fn game_over_when_lives_run_out() {
        let mut level = Level::new("test");
        let mario = level.spawn(
            Entity::new()
                .with(kinds::NAME, "Mario".to_string())
                .with(kinds::LIVES, 1.0),
        );
        level.spawn(Entity::new().with(kinds::NAME, "Luigi".to_string()));

        let mut system = GameOverSystem::new();
        let (transitions, _) = tick(&mut system, &mut level);
        assert!(transitions.is_empty());

        let lives = level.get_mut(mario).unwrap().get_mut(kinds::LIVES).unwrap();
        lives.set_value(0.0);
        let (transitions, _) = tick(&mut system, &mut level);
        assert_eq!(transitions, vec![Transition::GameOver]);
    }

    #[test]
    fn contacts_are_cleared() {
        let mut level = Level::new("test");
        let a = level.spawn(Entity::new().with(kinds::NAME, "a".to_string()));
        let b = level.spawn(Entity::new().with(kinds::NAME, "b".to_string()));
        level.record_contact(a, b, Direction::Top).unwrap();

        tick(&mut ContactResetSystem, &mut level);
        assert!(level.get(a).unwrap().value(kinds::TOP_COLLIDED).unwrap().is_empty());
    }

    #[test]
    fn default_schedule_respects_config() {
        assert_eq!(default_schedule(&EngineConfig::default()).len(), 5);
        let bare = EngineConfig {
            movement: false,
            progression: false,
            game_over: false,
            clear_contacts: false,
            ..EngineConfig::default()
        };
        assert_eq!(default_schedule(&bare).len(), 1);
    }
}
