//! Predicates over one entity's components.
//!
//! Conditions are pure: [`Condition::test`] never mutates the entity and
//! reports `false` when the component it reads is absent. Use
//! [`Condition::check`] to find out *why* a condition didn't hold.
//!
//! Collision conditions read the directional contact lists filled in by the
//! external collision step (see [`Level::record_contact`]).
//!
//! [`Level::record_contact`]: crate::level::Level::record_contact

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ecs::component::{ComponentKind, Contact, Kind, PayloadType, Value, kinds};
use crate::ecs::entity::Entity;
use crate::error::{Result, SkaldError};

/// A side of an entity, as seen by the collision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
    /// Any side at all.
    Any,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::Top,
        Direction::Bottom,
        Direction::Left,
        Direction::Right,
        Direction::Any,
    ];

    /// The contact list recorded for this side.
    pub const fn collided(self) -> Kind<Vec<Contact>> {
        match self {
            Direction::Top => kinds::TOP_COLLIDED,
            Direction::Bottom => kinds::BOTTOM_COLLIDED,
            Direction::Left => kinds::LEFT_COLLIDED,
            Direction::Right => kinds::RIGHT_COLLIDED,
            Direction::Any => kinds::ANY_COLLIDED,
        }
    }

    /// The facing side. `Any` is its own opposite.
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Any => Direction::Any,
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Direction::Top => "Top",
            Direction::Bottom => "Bottom",
            Direction::Left => "Left",
            Direction::Right => "Right",
            Direction::Any => "Any",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The comparison half of a value condition, for building from untyped parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    GreaterThan,
    LessThan,
    EqualTo,
    StringEqualTo,
}

impl Comparison {
    pub const fn display_name(self) -> &'static str {
        match self {
            Comparison::GreaterThan => "Greater Than",
            Comparison::LessThan => "Less Than",
            Comparison::EqualTo => "Equal To",
            Comparison::StringEqualTo => "Equals",
        }
    }

    const fn payload(self) -> PayloadType {
        match self {
            Comparison::StringEqualTo => PayloadType::Text,
            _ => PayloadType::Number,
        }
    }
}

/// A predicate over one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum Condition {
    /// Numeric component strictly greater than `threshold`.
    GreaterThan { kind: ComponentKind, threshold: f64 },
    /// Numeric component strictly less than `threshold`.
    LessThan { kind: ComponentKind, threshold: f64 },
    /// Numeric component exactly equal to `value`.
    EqualTo { kind: ComponentKind, value: f64 },
    /// Text component exactly equal to `value` (case sensitive).
    StringEqualTo { kind: ComponentKind, value: String },
    /// The entity touched something labelled `target` on `direction`.
    ///
    /// `target` is compared against the other entity's name, or its group
    /// when `grouped` is set.
    Collision {
        direction: Direction,
        target: String,
        #[serde(default)]
        grouped: bool,
    },
}

impl Condition {
    pub fn greater_than(kind: Kind<f64>, threshold: f64) -> Self {
        Condition::GreaterThan {
            kind: kind.kind(),
            threshold,
        }
    }

    pub fn less_than(kind: Kind<f64>, threshold: f64) -> Self {
        Condition::LessThan {
            kind: kind.kind(),
            threshold,
        }
    }

    pub fn equal_to(kind: Kind<f64>, value: f64) -> Self {
        Condition::EqualTo {
            kind: kind.kind(),
            value,
        }
    }

    pub fn string_equal_to(kind: Kind<String>, value: impl Into<String>) -> Self {
        Condition::StringEqualTo {
            kind: kind.kind(),
            value: value.into(),
        }
    }

    pub fn collision(direction: Direction, target: impl Into<String>, grouped: bool) -> Self {
        Condition::Collision {
            direction,
            target: target.into(),
            grouped,
        }
    }

    /// Build a value condition from untyped parts, checking that the kind
    /// and operand fit the comparison.
    pub fn build(
        comparison: Comparison,
        kind: ComponentKind,
        operand: impl Into<Value>,
    ) -> Result<Self> {
        let operand = operand.into();
        let expected = comparison.payload();
        if kind.payload() != expected || operand.payload() != expected {
            return Err(SkaldError::Incompatible {
                kind,
                expected: kind.payload(),
                found: operand.payload(),
                reason: "comparison does not fit the component",
            });
        }
        Ok(match (comparison, operand) {
            (Comparison::GreaterThan, Value::Number(threshold)) => {
                Condition::GreaterThan { kind, threshold }
            }
            (Comparison::LessThan, Value::Number(threshold)) => {
                Condition::LessThan { kind, threshold }
            }
            (Comparison::EqualTo, Value::Number(value)) => Condition::EqualTo { kind, value },
            (Comparison::StringEqualTo, Value::Text(value)) => {
                Condition::StringEqualTo { kind, value }
            }
            (_, operand) => {
                return Err(SkaldError::Incompatible {
                    kind,
                    expected,
                    found: operand.payload(),
                    reason: "comparison does not fit the component",
                });
            }
        })
    }

    /// `true` for [`Condition::Collision`].
    pub fn is_collision(&self) -> bool {
        matches!(self, Condition::Collision { .. })
    }

    /// The component kind this condition reads.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Condition::GreaterThan { kind, .. }
            | Condition::LessThan { kind, .. }
            | Condition::EqualTo { kind, .. }
            | Condition::StringEqualTo { kind, .. } => *kind,
            Condition::Collision { direction, .. } => direction.collided().kind(),
        }
    }

    /// Re-check a condition that didn't come through a typed constructor.
    pub fn validate(&self) -> Result<()> {
        let (kind, expected) = match self {
            Condition::GreaterThan { kind, .. }
            | Condition::LessThan { kind, .. }
            | Condition::EqualTo { kind, .. } => (*kind, PayloadType::Number),
            Condition::StringEqualTo { kind, .. } => (*kind, PayloadType::Text),
            Condition::Collision { .. } => return Ok(()),
        };
        if kind.payload() == expected {
            Ok(())
        } else {
            Err(SkaldError::Incompatible {
                kind,
                expected: kind.payload(),
                found: expected,
                reason: "comparison does not fit the component",
            })
        }
    }

    /// Evaluate against `entity`, explaining a missing component.
    ///
    /// A collision condition on an entity with no contacts for that side is
    /// simply `false`: contact lists only exist once something touched it.
    pub fn check(&self, entity: &Entity) -> Result<bool> {
        let missing = |kind| SkaldError::MissingComponent {
            entity: entity.id(),
            kind,
        };
        let number = |kind: ComponentKind| match entity.slot(kind).map(|s| s.value()) {
            Some(Value::Number(n)) => Ok(n),
            Some(other) => Err(SkaldError::Incompatible {
                kind,
                expected: PayloadType::Number,
                found: other.payload(),
                reason: "numeric comparison on a non-numeric component",
            }),
            None => Err(missing(kind)),
        };

        match self {
            Condition::GreaterThan { kind, threshold } => Ok(number(*kind)? > *threshold),
            Condition::LessThan { kind, threshold } => Ok(number(*kind)? < *threshold),
            Condition::EqualTo { kind, value } => Ok(number(*kind)? == *value),
            Condition::StringEqualTo { kind, value } => match entity.slot(*kind) {
                Some(slot) => Ok(slot.value().as_text() == Some(value.as_str())),
                None => Err(missing(*kind)),
            },
            Condition::Collision {
                direction,
                target,
                grouped,
            } => Ok(entity
                .value(direction.collided())
                .is_some_and(|contacts| contacts.iter().any(|c| c.matches(target, *grouped)))),
        }
    }

    /// Evaluate against `entity`. Absent components make this `false`.
    pub fn test(&self, entity: &Entity) -> bool {
        matches!(self.check(entity), Ok(true))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::GreaterThan { kind, threshold } => {
                let op = Comparison::GreaterThan.display_name();
                write!(f, "{} {op} {threshold}", kind.short_name())
            }
            Condition::LessThan { kind, threshold } => {
                let op = Comparison::LessThan.display_name();
                write!(f, "{} {op} {threshold}", kind.short_name())
            }
            Condition::EqualTo { kind, value } => {
                let op = Comparison::EqualTo.display_name();
                write!(f, "{} {op} {value}", kind.short_name())
            }
            Condition::StringEqualTo { kind, value } => {
                let op = Comparison::StringEqualTo.display_name();
                write!(f, "{} {op} {value}", kind.short_name())
            }
            Condition::Collision {
                direction,
                target,
                grouped,
            } => {
                let what = if *grouped { "group" } else { "entity" };
                write!(f, "{direction} collision with {what} {target}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::EntityId;

    fn mario() -> Entity {
        Entity::new()
            .with(kinds::NAME, "Mario".to_string())
            .with(kinds::X_POSITION, 5.0)
    }

    fn touching(direction: Direction, name: &str, group: Option<&str>) -> Entity {
        let contact = Contact {
            entity: EntityId::new(9, 0),
            name: Some(name.to_string()),
            group: group.map(str::to_string),
        };
        mario().with(direction.collided(), vec![contact])
    }

    #[test]
    fn numeric_comparisons_are_strict() {
        let e = mario();
        assert!(Condition::greater_than(kinds::X_POSITION, 4.0).test(&e));
        assert!(!Condition::greater_than(kinds::X_POSITION, 5.0).test(&e));
        assert!(Condition::less_than(kinds::X_POSITION, 6.0).test(&e));
        assert!(!Condition::less_than(kinds::X_POSITION, 5.0).test(&e));
        assert!(Condition::equal_to(kinds::X_POSITION, 5.0).test(&e));
        assert!(!Condition::equal_to(kinds::X_POSITION, 5.000001).test(&e));
    }

    #[test]
    fn string_equality_is_case_sensitive() {
        let e = mario();
        assert!(Condition::string_equal_to(kinds::NAME, "Mario").test(&e));
        assert!(!Condition::string_equal_to(kinds::NAME, "mario").test(&e));
    }

    #[test]
    fn absent_component_is_false_and_entity_untouched() {
        let e = mario();
        let before = e.clone();
        let cond = Condition::greater_than(kinds::HEALTH, 0.0);
        assert!(!cond.test(&e));
        assert!(matches!(
            cond.check(&e),
            Err(SkaldError::MissingComponent {
                kind: ComponentKind::Health,
                ..
            })
        ));
        assert_eq!(e, before);
    }

    #[test]
    fn collision_matches_direction_and_label() {
        let e = touching(Direction::Bottom, "Block", Some("Walls"));
        assert!(Condition::collision(Direction::Bottom, "Block", false).test(&e));
        assert!(Condition::collision(Direction::Bottom, "Walls", true).test(&e));
        assert!(!Condition::collision(Direction::Bottom, "Walls", false).test(&e));
        assert!(!Condition::collision(Direction::Top, "Block", false).test(&e));
        assert!(!Condition::collision(Direction::Bottom, "Goomba", false).test(&e));
    }

    #[test]
    fn collision_without_contacts_is_false_not_error() {
        let cond = Condition::collision(Direction::Left, "Block", false);
        assert!(matches!(cond.check(&mario()), Ok(false)));
    }

    #[test]
    fn build_checks_payloads() {
        assert!(Condition::build(Comparison::GreaterThan, ComponentKind::XPosition, 1.0).is_ok());
        assert!(Condition::build(Comparison::GreaterThan, ComponentKind::Name, 1.0).is_err());
        assert!(Condition::build(Comparison::StringEqualTo, ComponentKind::Name, "Mario").is_ok());
        assert!(Condition::build(Comparison::StringEqualTo, ComponentKind::Name, 3.0).is_err());
        assert!(Condition::build(Comparison::EqualTo, ComponentKind::Camera, true).is_err());
    }

    #[test]
    fn validate_catches_hand_written_mismatch() {
        let json = r#"{ "condition": "less_than", "kind": "Sprite", "threshold": 3 }"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        assert!(cond.validate().is_err());

        let ok: Condition = serde_json::from_str(
            r#"{ "condition": "collision", "direction": "Right", "target": "Pipe" }"#,
        )
        .unwrap();
        assert!(ok.validate().is_ok());
        assert!(ok.is_collision());
    }

    #[test]
    fn display_reads_like_the_editor() {
        assert_eq!(
            Condition::greater_than(kinds::X_POSITION, 5.0).to_string(),
            "XPosition Greater Than 5"
        );
        assert_eq!(
            Condition::collision(Direction::Top, "Goomba", false).to_string(),
            "Top collision with entity Goomba"
        );
    }

    #[test]
    fn opposite_sides() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
        }
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }
}
