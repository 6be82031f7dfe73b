//! # Action: Declarative Component Mutations
//!
//! An [`Action`] is plain data describing one change to one entity: "set
//! XVelocity to -2", "add 1 to Score on the score keeper", "destroy the
//! subject". It holds no reference to any entity, so the same action can be
//! stored in an event, serialized, and applied to every entity the event
//! matches.
//!
//! ## Modify modes
//!
//! ```text
//! ABSOLUTE   value = operand               any payload but contacts
//! RELATIVE   value = value + operand       numbers only
//! SCALE      value = value * operand       numbers only
//! RANDOM     value = value + u,  u ∈ [-|operand|, +|operand|]
//! ```
//!
//! Compatibility between a mode, its operand, and the target kind is checked
//! when the action is built ([`Action::build`]) or loaded
//! ([`Action::validate`]). A missing component on the entity is only known
//! at apply time and comes back as [`SkaldError::MissingComponent`].
//!
//! ## Targets
//!
//! Actions normally write to the entity the event matched
//! ([`Target::Subject`]). [`Target::Associated`] points at another entity in
//! the same level instead, which is how a coin pickup bumps the score on a
//! separate score keeper.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::commands::Commands;
use crate::ecs::component::{
    Component, ComponentKind, ComponentSlot, Kind, Payload, PayloadType, Value,
};
use crate::ecs::entity::{Entity, EntityId};
use crate::error::{Result, SkaldError};
use crate::level::EntityStore;

// ── ModifyType ───────────────────────────────────────────────────────────

/// How a [`Effect::Modify`] combines its operand with the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifyType {
    Absolute,
    Relative,
    Scale,
    Random,
}

impl ModifyType {
    pub const ALL: [ModifyType; 4] = [
        ModifyType::Absolute,
        ModifyType::Relative,
        ModifyType::Scale,
        ModifyType::Random,
    ];

    pub const fn display_name(self) -> &'static str {
        match self {
            ModifyType::Absolute => "ABSOLUTE",
            ModifyType::Relative => "RELATIVE",
            ModifyType::Scale => "SCALE",
            ModifyType::Random => "RANDOM",
        }
    }

    /// Can this mode write to a component with the given payload?
    pub const fn accepts(self, payload: PayloadType) -> bool {
        match self {
            ModifyType::Absolute => !matches!(payload, PayloadType::Contacts),
            _ => matches!(payload, PayloadType::Number),
        }
    }

    const fn mismatch_reason(self) -> &'static str {
        match self {
            ModifyType::Absolute => "ABSOLUTE operand must match the component",
            ModifyType::Relative => "RELATIVE needs a numeric component",
            ModifyType::Scale => "SCALE needs a numeric component",
            ModifyType::Random => "RANDOM needs a numeric component",
        }
    }
}

impl fmt::Display for ModifyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ── Target ───────────────────────────────────────────────────────────────

/// Which entity an action writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The entity the event matched.
    #[default]
    Subject,
    /// A specific entity in the same level.
    Associated(EntityId),
}

impl Target {
    pub fn is_subject(&self) -> bool {
        matches!(self, Target::Subject)
    }

    /// The id to write to when `subject` is the matched entity.
    pub fn resolve(self, subject: EntityId) -> EntityId {
        match self {
            Target::Subject => subject,
            Target::Associated(id) => id,
        }
    }
}

// ── Effect ───────────────────────────────────────────────────────────────

/// What an action does to its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Rewrite one component with a [`ModifyType`].
    Modify {
        kind: ComponentKind,
        mode: ModifyType,
        operand: Value,
    },
    /// Attach a fresh component, replacing any existing one of that kind.
    AddComponent { kind: ComponentKind, value: Value },
    /// Detach a component. Absent components are left alone.
    RemoveComponent { kind: ComponentKind },
    /// Restore a component's original value.
    Reset { kind: ComponentKind },
    /// Despawn the target at the end of the event pass.
    Destroy,
    /// Spawn a copy of `prototype` at the end of the event pass.
    Spawn { prototype: Entity },
}

/// What applying an action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    /// Nothing to do (removing an absent component, RANDOM with a zero bound).
    Unchanged,
    /// A structural change was pushed onto the command queue.
    Queued,
}

/// Payload types that ABSOLUTE can write. Contact lists are owned by the
/// collision step.
pub trait Settable: Payload {}

impl Settable for f64 {}
impl Settable for bool {}
impl Settable for String {}

// ── Action ───────────────────────────────────────────────────────────────

/// One declarative mutation, bound to a single kind and mode.
///
/// # Example
///
/// ```
/// use skald::prelude::*;
///
/// let flap = Action::number(ModifyType::Absolute, -5.0, kinds::Y_VELOCITY);
/// assert_eq!(flap.to_string(), "ABSOLUTE YVelocityComponent -5");
///
/// // SCALE on a name can't work, so building it fails.
/// assert!(Action::build(ModifyType::Scale, 2.0, ComponentKind::Name).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    effect: Effect,
    #[serde(default, skip_serializing_if = "Target::is_subject")]
    target: Target,
}

impl Action {
    pub fn new(effect: Effect) -> Self {
        Self {
            effect,
            target: Target::Subject,
        }
    }

    /// Build a modify action from untyped parts, checking compatibility.
    pub fn build(mode: ModifyType, operand: impl Into<Value>, kind: ComponentKind) -> Result<Self> {
        let operand = operand.into();
        check_modify(kind, mode, &operand)?;
        Ok(Self::new(Effect::Modify {
            kind,
            mode,
            operand,
        }))
    }

    /// A numeric modify action. Every mode fits a number.
    pub fn number(mode: ModifyType, operand: f64, kind: Kind<f64>) -> Self {
        Self::new(Effect::Modify {
            kind: kind.kind(),
            mode,
            operand: Value::Number(operand),
        })
    }

    /// ABSOLUTE write of a typed value.
    pub fn set<T: Settable>(kind: Kind<T>, value: T) -> Self {
        Self::new(Effect::Modify {
            kind: kind.kind(),
            mode: ModifyType::Absolute,
            operand: value.into_value(),
        })
    }

    pub fn add_component<T: Payload>(kind: Kind<T>, value: T) -> Self {
        Self::new(Effect::AddComponent {
            kind: kind.kind(),
            value: value.into_value(),
        })
    }

    pub fn remove_component(kind: impl Into<ComponentKind>) -> Self {
        Self::new(Effect::RemoveComponent { kind: kind.into() })
    }

    pub fn reset(kind: impl Into<ComponentKind>) -> Self {
        Self::new(Effect::Reset { kind: kind.into() })
    }

    pub fn destroy() -> Self {
        Self::new(Effect::Destroy)
    }

    pub fn spawn(prototype: Entity) -> Self {
        Self::new(Effect::Spawn { prototype })
    }

    /// Redirect this action to another entity in the same level.
    pub fn on(mut self, entity: EntityId) -> Self {
        self.target = Target::Associated(entity);
        self
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// The component kind this action touches, if it touches one.
    pub fn kind(&self) -> Option<ComponentKind> {
        match &self.effect {
            Effect::Modify { kind, .. }
            | Effect::AddComponent { kind, .. }
            | Effect::RemoveComponent { kind }
            | Effect::Reset { kind } => Some(*kind),
            Effect::Destroy | Effect::Spawn { .. } => None,
        }
    }

    pub fn mode(&self) -> Option<ModifyType> {
        match &self.effect {
            Effect::Modify { mode, .. } => Some(*mode),
            _ => None,
        }
    }

    /// Re-check an action that didn't come through a checked constructor
    /// (e.g. one loaded from a snapshot).
    pub fn validate(&self) -> Result<()> {
        match &self.effect {
            Effect::Modify {
                kind,
                mode,
                operand,
            } => check_modify(*kind, *mode, operand),
            Effect::AddComponent { kind, value } => {
                check_payload(*kind, value.payload(), "added value must match the component")
            }
            Effect::Spawn { prototype } => {
                for (kind, slot) in prototype.components() {
                    check_payload(kind, slot.payload(), "prototype component payload mismatch")?;
                }
                Ok(())
            }
            Effect::RemoveComponent { .. } | Effect::Reset { .. } | Effect::Destroy => Ok(()),
        }
    }

    /// Apply this action with `subject` as the matched entity.
    ///
    /// Component writes happen immediately. `Destroy` and `Spawn` are pushed
    /// onto `commands` and take effect when the caller applies the queue.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        store: &mut EntityStore,
        subject: EntityId,
        rng: &mut R,
        commands: &mut Commands,
    ) -> Result<Applied> {
        let target = self.target.resolve(subject);
        match &self.effect {
            Effect::Spawn { prototype } => {
                commands.spawn(prototype.clone());
                Ok(Applied::Queued)
            }
            Effect::Destroy => {
                if !store.is_alive(target) {
                    return Err(SkaldError::StaleEntity(target));
                }
                commands.despawn(target);
                Ok(Applied::Queued)
            }
            Effect::Modify {
                kind,
                mode,
                operand,
            } => modify(store.require_mut(target)?, *kind, *mode, operand, rng),
            Effect::AddComponent { kind, value } => {
                let entity = store.require_mut(target)?;
                entity.insert_slot(*kind, ComponentSlot::from_value(value.clone()))?;
                Ok(Applied::Changed)
            }
            Effect::RemoveComponent { kind } => {
                let entity = store.require_mut(target)?;
                Ok(match entity.remove_component(*kind) {
                    Some(_) => Applied::Changed,
                    None => Applied::Unchanged,
                })
            }
            Effect::Reset { kind } => {
                let entity = store.require_mut(target)?;
                let id = entity.id();
                entity
                    .slot_mut(*kind)
                    .ok_or(SkaldError::MissingComponent { entity: id, kind: *kind })?
                    .reset_to_original();
                Ok(Applied::Changed)
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.effect {
            Effect::Modify {
                kind,
                mode,
                operand,
            } => write!(f, "{mode} {kind} {operand}")?,
            Effect::AddComponent { kind, value } => write!(f, "ADD {kind} {value}")?,
            Effect::RemoveComponent { kind } => write!(f, "REMOVE {kind}")?,
            Effect::Reset { kind } => write!(f, "RESET {kind}")?,
            Effect::Destroy => f.write_str("DESTROY")?,
            Effect::Spawn { prototype } => {
                write!(f, "SPAWN {}", prototype.name().unwrap_or("entity"))?
            }
        }
        if let Target::Associated(id) = self.target {
            write!(f, " on {id}")?;
        }
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn check_payload(kind: ComponentKind, found: PayloadType, reason: &'static str) -> Result<()> {
    if kind.payload() == found {
        Ok(())
    } else {
        Err(incompatible(kind, found, reason))
    }
}

fn check_modify(kind: ComponentKind, mode: ModifyType, operand: &Value) -> Result<()> {
    if !mode.accepts(kind.payload()) {
        return Err(incompatible(kind, operand.payload(), mode.mismatch_reason()));
    }
    check_payload(kind, operand.payload(), mode.mismatch_reason())?;
    if mode == ModifyType::Random && !operand.as_number().is_some_and(random_bound_in_range) {
        return Err(incompatible(kind, operand.payload(), RANDOM_BOUND_REASON));
    }
    Ok(())
}

const RANDOM_BOUND_REASON: &str = "RANDOM bound must be finite and at most half of f64::MAX";

/// The sampled range `-n..=n` must have a finite width.
fn random_bound_in_range(n: f64) -> bool {
    (2.0 * n).is_finite()
}

fn incompatible(kind: ComponentKind, found: PayloadType, reason: &'static str) -> SkaldError {
    SkaldError::Incompatible {
        kind,
        expected: kind.payload(),
        found,
        reason,
    }
}

fn modify<R: Rng + ?Sized>(
    entity: &mut Entity,
    kind: ComponentKind,
    mode: ModifyType,
    operand: &Value,
    rng: &mut R,
) -> Result<Applied> {
    let id = entity.id();
    let slot = entity
        .slot_mut(kind)
        .ok_or(SkaldError::MissingComponent { entity: id, kind })?;

    if mode == ModifyType::Absolute {
        if kind.payload() == PayloadType::Contacts {
            return Err(incompatible(kind, operand.payload(), mode.mismatch_reason()));
        }
        slot.set_dynamic(operand.clone())
            .map_err(|_| incompatible(kind, operand.payload(), mode.mismatch_reason()))?;
        return Ok(Applied::Changed);
    }

    let (ComponentSlot::Number(component), Some(n)) = (slot, operand.as_number()) else {
        return Err(incompatible(kind, operand.payload(), mode.mismatch_reason()));
    };
    match mode {
        ModifyType::Relative => shift(component, n),
        ModifyType::Scale => {
            let next = component.value() * n;
            component.set_value(next);
        }
        ModifyType::Random => {
            let bound = n.abs();
            if !random_bound_in_range(bound) {
                return Err(incompatible(kind, PayloadType::Number, RANDOM_BOUND_REASON));
            }
            if bound == 0.0 {
                return Ok(Applied::Unchanged);
            }
            shift(component, rng.gen_range(-bound..=bound));
        }
        ModifyType::Absolute => {}
    }
    Ok(Applied::Changed)
}

fn shift(component: &mut Component<f64>, by: f64) {
    let next = component.value() + by;
    component.set_value(next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::kinds;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Fixture {
        store: EntityStore,
        mario: EntityId,
        rng: StdRng,
        commands: Commands,
    }

    fn fixture() -> Fixture {
        let mut store = EntityStore::new();
        let mario = store.spawn(
            Entity::new()
                .with(kinds::NAME, "Mario".to_string())
                .with(kinds::X_POSITION, 10.0)
                .with(kinds::X_VELOCITY, 3.0),
        );
        Fixture {
            store,
            mario,
            rng: StdRng::seed_from_u64(7),
            commands: Commands::new(),
        }
    }

    impl Fixture {
        fn apply(&mut self, action: &Action) -> Result<Applied> {
            action.apply(&mut self.store, self.mario, &mut self.rng, &mut self.commands)
        }

        fn x(&self) -> f64 {
            *self.store.get(self.mario).unwrap().value(kinds::X_POSITION).unwrap()
        }
    }

    #[test]
    fn absolute_is_idempotent() {
        let mut fx = fixture();
        let action = Action::number(ModifyType::Absolute, 5.0, kinds::X_POSITION);
        fx.apply(&action).unwrap();
        fx.apply(&action).unwrap();
        assert_eq!(fx.x(), 5.0);
    }

    #[test]
    fn relative_and_scale_laws() {
        let mut fx = fixture();
        fx.apply(&Action::number(ModifyType::Relative, -5.0, kinds::X_POSITION)).unwrap();
        assert_eq!(fx.x(), 5.0);
        fx.apply(&Action::number(ModifyType::Scale, 3.0, kinds::X_POSITION)).unwrap();
        assert_eq!(fx.x(), 15.0);

        let x = fx.store.get(fx.mario).unwrap().get(kinds::X_POSITION).unwrap();
        assert_eq!(x.previous(), Some(&5.0));
        assert_eq!(*x.original(), 10.0);

        fx.apply(&Action::number(ModifyType::Absolute, 4.0, kinds::X_POSITION)).unwrap();
        fx.apply(&Action::number(ModifyType::Relative, 0.0, kinds::X_POSITION)).unwrap();
        assert_eq!(fx.x(), 4.0);
        fx.apply(&Action::number(ModifyType::Scale, 1.0, kinds::X_POSITION)).unwrap();
        assert_eq!(fx.x(), 4.0);
    }

    #[test]
    fn random_stays_within_bound() {
        let mut fx = fixture();
        let jitter = Action::number(ModifyType::Random, -2.0, kinds::X_POSITION);
        for _ in 0..200 {
            let before = fx.x();
            assert_eq!(fx.apply(&jitter).unwrap(), Applied::Changed);
            let delta = fx.x() - before;
            assert!((-2.0..=2.0).contains(&delta), "delta {delta} out of bounds");
        }
    }

    #[test]
    fn random_bound_too_wide_to_sample_is_rejected() {
        let wide = f64::MAX / 1.5;
        assert!(Action::build(ModifyType::Random, wide, ComponentKind::XPosition).is_err());
        assert!(Action::build(ModifyType::Random, -1e308, ComponentKind::XPosition).is_err());
        assert!(Action::build(ModifyType::Random, 1e300, ComponentKind::XPosition).is_ok());

        // Unvalidated actions fail at apply time instead of panicking.
        let mut fx = fixture();
        let jitter = Action::number(ModifyType::Random, 1e308, kinds::X_POSITION);
        assert!(matches!(fx.apply(&jitter), Err(SkaldError::Incompatible { .. })));
        assert_eq!(fx.x(), 10.0);
    }

    #[test]
    fn random_with_zero_bound_is_a_no_op() {
        let mut fx = fixture();
        let still = Action::number(ModifyType::Random, 0.0, kinds::X_POSITION);
        assert_eq!(fx.apply(&still).unwrap(), Applied::Unchanged);
        assert_eq!(fx.x(), 10.0);
    }

    #[test]
    fn absolute_on_text_and_flag() {
        let mut fx = fixture();
        fx.apply(&Action::set(kinds::NAME, "Luigi".to_string())).unwrap();
        assert_eq!(fx.store.get(fx.mario).unwrap().name(), Some("Luigi"));

        fx.store
            .get_mut(fx.mario)
            .unwrap()
            .add_component(kinds::CAMERA, Component::new(false));
        fx.apply(&Action::set(kinds::CAMERA, true)).unwrap();
        assert_eq!(fx.store.get(fx.mario).unwrap().value(kinds::CAMERA), Some(&true));
    }

    #[test]
    fn build_rejects_incompatible_modes() {
        assert!(Action::build(ModifyType::Scale, 2.0, ComponentKind::Name).is_err());
        assert!(Action::build(ModifyType::Relative, "x", ComponentKind::Name).is_err());
        assert!(Action::build(ModifyType::Absolute, true, ComponentKind::XPosition).is_err());
        assert!(Action::build(ModifyType::Absolute, 1.0, ComponentKind::TopCollided).is_err());
        assert!(Action::build(ModifyType::Random, f64::NAN, ComponentKind::XPosition).is_err());

        assert!(Action::build(ModifyType::Absolute, "Luigi", ComponentKind::Name).is_ok());
        assert!(Action::build(ModifyType::Random, 10.0, ComponentKind::YPosition).is_ok());
    }

    #[test]
    fn missing_component_is_reported_and_nothing_changes() {
        let mut fx = fixture();
        let before = fx.store.get(fx.mario).unwrap().clone();
        let err = fx
            .apply(&Action::number(ModifyType::Relative, 1.0, kinds::HEALTH))
            .unwrap_err();
        assert!(matches!(
            err,
            SkaldError::MissingComponent {
                kind: ComponentKind::Health,
                ..
            }
        ));
        assert_eq!(fx.store.get(fx.mario).unwrap(), &before);
    }

    #[test]
    fn associated_target_writes_elsewhere() {
        let mut fx = fixture();
        let keeper = fx.store.spawn(Entity::new().with(kinds::SCORE, 0.0));
        let bump = Action::number(ModifyType::Relative, 100.0, kinds::SCORE).on(keeper);

        fx.apply(&bump).unwrap();
        assert_eq!(fx.store.get(keeper).unwrap().value(kinds::SCORE), Some(&100.0));

        fx.store.despawn(keeper);
        assert!(matches!(fx.apply(&bump), Err(SkaldError::StaleEntity(id)) if id == keeper));
    }

    #[test]
    fn destroy_and_spawn_are_deferred() {
        let mut fx = fixture();
        assert_eq!(fx.apply(&Action::destroy()).unwrap(), Applied::Queued);
        assert_eq!(
            fx.apply(&Action::spawn(Entity::new().with(kinds::NAME, "Coin".to_string())))
                .unwrap(),
            Applied::Queued
        );
        assert!(fx.store.is_alive(fx.mario));
        assert_eq!(fx.commands.len(), 2);

        fx.commands.apply(&mut fx.store);
        assert!(!fx.store.is_alive(fx.mario));
        assert!(fx.store.find_named("Coin").is_some());
    }

    #[test]
    fn structural_component_edits() {
        let mut fx = fixture();
        fx.apply(&Action::add_component(kinds::PIZZA, true)).unwrap();
        assert!(fx.store.get(fx.mario).unwrap().has_component(kinds::PIZZA));

        assert_eq!(fx.apply(&Action::remove_component(kinds::PIZZA)).unwrap(), Applied::Changed);
        assert_eq!(fx.apply(&Action::remove_component(kinds::PIZZA)).unwrap(), Applied::Unchanged);

        fx.apply(&Action::number(ModifyType::Absolute, 99.0, kinds::X_POSITION)).unwrap();
        fx.apply(&Action::reset(kinds::X_POSITION)).unwrap();
        assert_eq!(fx.x(), 10.0);
    }

    #[test]
    fn display_matches_authoring_listing() {
        assert_eq!(
            Action::number(ModifyType::Absolute, 5.0, kinds::X_POSITION).to_string(),
            "ABSOLUTE XPositionComponent 5"
        );
        assert_eq!(
            Action::number(ModifyType::Scale, 0.5, kinds::Y_VELOCITY).to_string(),
            "SCALE YVelocityComponent 0.5"
        );
        assert_eq!(Action::destroy().to_string(), "DESTROY");
    }

    #[test]
    fn loads_from_hand_written_json() {
        let json = r#"{
            "effect": { "type": "modify", "kind": "YPosition", "mode": "RANDOM", "operand": 10 }
        }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        action.validate().unwrap();
        assert_eq!(action.mode(), Some(ModifyType::Random));
        assert_eq!(action.target(), Target::Subject);

        let bad = r#"{
            "effect": { "type": "modify", "kind": "Name", "mode": "SCALE", "operand": 2 }
        }"#;
        let action: Action = serde_json::from_str(bad).unwrap();
        assert!(action.validate().is_err());
    }
}
