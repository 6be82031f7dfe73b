//! # Event: Selector + Inputs + Conditions + Actions
//!
//! An [`Event`] is one rule of the game:
//!
//! ```text
//! for every entity picked by `selector`
//!     if every key in `inputs` is held
//!     and every condition holds for the entity
//!         apply every action, in order
//! ```
//!
//! ## Collision events
//!
//! [`Event::collision`] builds an event whose first condition is a directional
//! [`Condition::Collision`]. That condition is structural: once installed,
//! adding or removing collision conditions on the event is silently ignored
//! (the mutator returns `false`). To change the direction, delete the event
//! and build a new one.
//!
//! ## Failure semantics
//!
//! A condition that reads an absent component counts as false. An action
//! that fails on one candidate is logged and counted, and evaluation moves
//! on to the next action and the next candidate. Nothing here aborts a tick.

use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::action::{Action, ModifyType};
use super::commands::Commands;
use super::condition::{Condition, Direction};
use crate::ecs::component::kinds;
use crate::ecs::entity::{Entity, EntityId};
use crate::error::{Result, SkaldError};
use crate::input::{Input, KeyCode};
use crate::level::EntityStore;

/// Velocity an entity leaves a bounce with.
const BOUNCE_SPEED: f64 = 2.0;
/// Distance an entity is pushed out of what it hit.
const BOUNCE_NUDGE: f64 = 5.0;
/// Bound of the random sideways jitter after a bounce.
const BOUNCE_JITTER: f64 = 10.0;

// ── Selector ─────────────────────────────────────────────────────────────

/// Which entities an event considers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selector {
    /// Every entity in the level.
    #[default]
    General,
    /// Entities whose name equals the label.
    Named(String),
    /// Entities whose group equals the label.
    Grouped(String),
}

impl Selector {
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Selector::General => true,
            Selector::Named(name) => entity.name() == Some(name.as_str()),
            Selector::Grouped(group) => entity.group() == Some(group.as_str()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::General => f.write_str("every entity"),
            Selector::Named(name) => write!(f, "\"{name}\""),
            Selector::Grouped(group) => write!(f, "group \"{group}\""),
        }
    }
}

// ── Event types ──────────────────────────────────────────────────────────

/// The structural collision condition of a collision event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionSpec {
    pub direction: Direction,
    pub with: String,
    #[serde(default)]
    pub grouped: bool,
}

impl CollisionSpec {
    pub fn condition(&self) -> Condition {
        Condition::collision(self.direction, self.with.clone(), self.grouped)
    }
}

/// The kinds of event the authoring layer offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    TopCollision,
    BottomCollision,
    LeftCollision,
    RightCollision,
    AnyCollision,
    General,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::TopCollision,
        EventType::BottomCollision,
        EventType::LeftCollision,
        EventType::RightCollision,
        EventType::AnyCollision,
        EventType::General,
    ];

    pub const fn display_name(self) -> &'static str {
        match self {
            EventType::TopCollision => "Top Collision Event",
            EventType::BottomCollision => "Bottom Collision Event",
            EventType::LeftCollision => "Left Collision Event",
            EventType::RightCollision => "Right Collision Event",
            EventType::AnyCollision => "Any Collision Event",
            EventType::General => "General Event",
        }
    }

    /// Collision events involve a second entity the author must pick.
    pub const fn is_interactive(self) -> bool {
        !matches!(self, EventType::General)
    }

    pub const fn direction(self) -> Option<Direction> {
        match self {
            EventType::TopCollision => Some(Direction::Top),
            EventType::BottomCollision => Some(Direction::Bottom),
            EventType::LeftCollision => Some(Direction::Left),
            EventType::RightCollision => Some(Direction::Right),
            EventType::AnyCollision => Some(Direction::Any),
            EventType::General => None,
        }
    }

    pub const fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::Top => EventType::TopCollision,
            Direction::Bottom => EventType::BottomCollision,
            Direction::Left => EventType::LeftCollision,
            Direction::Right => EventType::RightCollision,
            Direction::Any => EventType::AnyCollision,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ── Event ────────────────────────────────────────────────────────────────

/// What one event did during one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Candidates picked by the selector.
    pub matched: usize,
    /// Candidates whose conditions all held.
    pub fired: usize,
    /// Actions that returned an error.
    pub failures: usize,
    /// The required inputs weren't held, so nothing was evaluated.
    pub skipped_input: bool,
}

/// A rule binding conditions to actions for the entities a selector picks.
///
/// # Example
///
/// ```
/// use skald::prelude::*;
///
/// let flap = Event::named("flappy")
///     .with_input(KeyCode::ArrowUp)
///     .with_condition(Condition::less_than(kinds::VALUE, 10.0))
///     .with_action(Action::number(ModifyType::Absolute, -5.0, kinds::Y_VELOCITY));
/// assert_eq!(flap.event_type(), EventType::General);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default)]
    selector: Selector,
    #[serde(default)]
    inputs: BTreeSet<KeyCode>,
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default)]
    actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collision: Option<CollisionSpec>,
}

impl Event {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            ..Self::default()
        }
    }

    pub fn general() -> Self {
        Self::new(Selector::General)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Selector::Named(name.into()))
    }

    pub fn grouped(group: impl Into<String>) -> Self {
        Self::new(Selector::Grouped(group.into()))
    }

    /// A collision event: fires for `selector`'s entities touching `with` on
    /// `direction`. The collision condition is locked in.
    pub fn collision(
        selector: Selector,
        direction: Direction,
        with: impl Into<String>,
        grouped: bool,
    ) -> Self {
        let spec = CollisionSpec {
            direction,
            with: with.into(),
            grouped,
        };
        Self {
            selector,
            conditions: vec![spec.condition()],
            collision: Some(spec),
            ..Self::default()
        }
    }

    /// `subject` bounces off `other` when touching it on `direction`.
    ///
    /// Velocity on the contact axis is set away from the contact, the
    /// position is nudged out of overlap, and the other axis gets a random
    /// jitter so repeated bounces don't lock into a loop.
    pub fn bounce(
        direction: Direction,
        subject: impl Into<String>,
        other: impl Into<String>,
        grouped: bool,
    ) -> Self {
        let event = Self::collision(Selector::Named(subject.into()), direction, other, grouped);
        let (velocity, position, jitter, sign) = match direction {
            Direction::Right => (kinds::X_VELOCITY, kinds::X_POSITION, kinds::Y_POSITION, -1.0),
            Direction::Left => (kinds::X_VELOCITY, kinds::X_POSITION, kinds::Y_POSITION, 1.0),
            Direction::Bottom => (kinds::Y_VELOCITY, kinds::Y_POSITION, kinds::X_POSITION, -1.0),
            Direction::Top => (kinds::Y_VELOCITY, kinds::Y_POSITION, kinds::X_POSITION, 1.0),
            Direction::Any => {
                return event
                    .with_action(Action::number(ModifyType::Scale, -1.0, kinds::X_VELOCITY))
                    .with_action(Action::number(ModifyType::Scale, -1.0, kinds::Y_VELOCITY));
            }
        };
        event
            .with_action(Action::number(ModifyType::Absolute, sign * BOUNCE_SPEED, velocity))
            .with_action(Action::number(ModifyType::Relative, sign * BOUNCE_NUDGE, position))
            .with_action(Action::number(ModifyType::Random, BOUNCE_JITTER, jitter))
    }

    // ── Builders ─────────────────────────────────────────────────────────

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_input(mut self, key: KeyCode) -> Self {
        self.add_input(key);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.add_condition(condition);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.add_action(action);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn inputs(&self) -> &BTreeSet<KeyCode> {
        &self.inputs
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn collision_spec(&self) -> Option<&CollisionSpec> {
        self.collision.as_ref()
    }

    pub fn event_type(&self) -> EventType {
        match &self.collision {
            Some(spec) => EventType::from_direction(spec.direction),
            None => EventType::General,
        }
    }

    fn locked(&self, condition: &Condition) -> bool {
        if self.collision.is_some() && condition.is_collision() {
            log::debug!("{self}: collision condition is fixed, ignoring edit");
            true
        } else {
            false
        }
    }

    // ── Mutators ─────────────────────────────────────────────────────────
    //
    // All return whether the event changed.

    pub fn set_selector(&mut self, selector: Selector) -> bool {
        let changed = self.selector != selector;
        self.selector = selector;
        changed
    }

    pub fn add_input(&mut self, key: KeyCode) -> bool {
        self.inputs.insert(key)
    }

    pub fn add_inputs(&mut self, keys: impl IntoIterator<Item = KeyCode>) -> bool {
        keys.into_iter().fold(false, |changed, k| self.inputs.insert(k) | changed)
    }

    pub fn remove_input(&mut self, key: KeyCode) -> bool {
        self.inputs.remove(&key)
    }

    pub fn remove_inputs(&mut self, keys: impl IntoIterator<Item = KeyCode>) -> bool {
        keys.into_iter().fold(false, |changed, k| self.inputs.remove(&k) | changed)
    }

    pub fn set_inputs(&mut self, keys: impl IntoIterator<Item = KeyCode>) -> bool {
        let keys: BTreeSet<KeyCode> = keys.into_iter().collect();
        let changed = self.inputs != keys;
        self.inputs = keys;
        changed
    }

    /// Append a condition. Collision conditions are refused on collision
    /// events.
    pub fn add_condition(&mut self, condition: Condition) -> bool {
        if self.locked(&condition) {
            return false;
        }
        self.conditions.push(condition);
        true
    }

    pub fn add_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) -> bool {
        conditions
            .into_iter()
            .fold(false, |changed, c| self.add_condition(c) | changed)
    }

    /// Remove the first condition equal to `condition`.
    pub fn remove_condition(&mut self, condition: &Condition) -> bool {
        if self.locked(condition) {
            return false;
        }
        match self.conditions.iter().position(|c| c == condition) {
            Some(index) => {
                self.conditions.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replace the condition list. A collision event keeps its collision
    /// condition in front and drops any collision conditions passed in.
    pub fn set_conditions(&mut self, conditions: Vec<Condition>) -> bool {
        let next = match &self.collision {
            Some(spec) => {
                let mut next = vec![spec.condition()];
                next.extend(conditions.into_iter().filter(|c| !self.locked(c)));
                next
            }
            None => conditions,
        };
        let changed = self.conditions != next;
        self.conditions = next;
        changed
    }

    pub fn add_action(&mut self, action: Action) -> bool {
        self.actions.push(action);
        true
    }

    pub fn add_actions(&mut self, actions: impl IntoIterator<Item = Action>) -> bool {
        let before = self.actions.len();
        self.actions.extend(actions);
        self.actions.len() != before
    }

    /// Remove the first action equal to `action`.
    pub fn remove_action(&mut self, action: &Action) -> bool {
        match self.actions.iter().position(|a| a == action) {
            Some(index) => {
                self.actions.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn set_actions(&mut self, actions: Vec<Action>) -> bool {
        let changed = self.actions != actions;
        self.actions = actions;
        changed
    }

    // ── Evaluation ───────────────────────────────────────────────────────

    /// Are all required inputs held? No requirement means yes.
    pub fn inputs_satisfied(&self, input: &Input<KeyCode>) -> bool {
        input.pressed_all(&self.inputs)
    }

    /// Do all conditions hold for `entity`?
    pub fn conditions_hold(&self, entity: &Entity) -> bool {
        self.conditions.iter().all(|condition| match condition.check(entity) {
            Ok(true) => true,
            Ok(false) => {
                log::trace!("{self}: \"{condition}\" false for {}", entity.id());
                false
            }
            Err(e) => {
                log::trace!("{self}: \"{condition}\" false for {}: {e}", entity.id());
                false
            }
        })
    }

    /// Ids of the entities in `store` the selector picks, in store order.
    pub fn candidates(&self, store: &EntityStore) -> Vec<EntityId> {
        store
            .iter()
            .filter(|e| self.selector.matches(e))
            .map(Entity::id)
            .collect()
    }

    /// Check every condition and action for configuration errors.
    ///
    /// A collision event must lead with its own collision condition and
    /// carry no other, which a loaded document may not honor.
    pub fn validate(&self) -> Result<()> {
        if let Some(spec) = &self.collision {
            if self.conditions.first() != Some(&spec.condition()) {
                return Err(SkaldError::Malformed(format!(
                    "{self}: first condition must be \"{}\"",
                    spec.condition()
                )));
            }
            if self.conditions[1..].iter().any(Condition::is_collision) {
                return Err(SkaldError::Malformed(format!(
                    "{self}: a collision event takes no extra collision conditions"
                )));
            }
        }
        for condition in &self.conditions {
            condition.validate()?;
        }
        for action in &self.actions {
            action.validate()?;
        }
        Ok(())
    }

    /// Run this event once against `store`.
    ///
    /// Selection and conditions read from `view` when given (a snapshot taken
    /// at the start of the pass), otherwise from live state. Actions always
    /// write to `store`.
    pub fn execute<R: Rng + ?Sized>(
        &self,
        store: &mut EntityStore,
        view: Option<&EntityStore>,
        input: &Input<KeyCode>,
        rng: &mut R,
        commands: &mut Commands,
    ) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        if !self.inputs_satisfied(input) {
            outcome.skipped_input = true;
            return outcome;
        }

        let candidates = self.candidates(view.unwrap_or(&*store));
        outcome.matched = candidates.len();

        for id in candidates {
            let holds = view
                .unwrap_or(&*store)
                .get(id)
                .is_some_and(|entity| self.conditions_hold(entity));
            if !holds {
                continue;
            }

            outcome.fired += 1;
            log::debug!("{self} fired for {id}");
            for action in &self.actions {
                if let Err(e) = action.apply(store, id, rng, commands) {
                    log::warn!("{self}: \"{action}\" on {id} skipped: {e}");
                    outcome.failures += 1;
                }
            }
        }
        outcome
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => f.write_str(label),
            None => write!(f, "{} for {}", self.event_type(), self.selector),
        }
    }
}
