//! Error types for the component store and the rule engine.
//!
//! Two classes of failure exist:
//!
//! - **Configuration errors** ([`SkaldError::Incompatible`],
//!   [`SkaldError::UnknownKind`]) are raised when a rule is *built* against a
//!   component kind it can't work with, e.g. `SCALE` on a text component.
//!   They surface at construction (or on snapshot load), never mid-tick.
//!   [`SkaldError::Malformed`] is their load-time cousin for documents that
//!   break a structural rule no builder would let through.
//! - **Evaluation errors** ([`SkaldError::MissingComponent`],
//!   [`SkaldError::StaleEntity`]) describe a single candidate entity that
//!   can't satisfy a rule. The event pass logs them, counts them in its
//!   report, and moves on to the next candidate.

use std::fmt;

use crate::ecs::component::{ComponentKind, PayloadType};
use crate::ecs::entity::EntityId;

/// Everything that can go wrong inside the core.
#[derive(Debug)]
pub enum SkaldError {
    /// A blind read or write targeted a component the entity doesn't carry.
    MissingComponent {
        entity: EntityId,
        kind: ComponentKind,
    },
    /// A rule was built against a kind whose payload doesn't fit the rule.
    Incompatible {
        kind: ComponentKind,
        expected: PayloadType,
        found: PayloadType,
        reason: &'static str,
    },
    /// An entity handle no longer refers to a live entity.
    StaleEntity(EntityId),
    /// A component name didn't match any known kind.
    UnknownKind(String),
    /// A level number outside `1..=level_count`.
    NoSuchLevel { requested: usize, count: usize },
    /// A snapshot or config document failed to (de)serialize.
    Snapshot(serde_json::Error),
    /// A loaded document breaks a rule the builders enforce, such as a
    /// duplicate entity id or a collision event without its lock.
    Malformed(String),
    /// Reading or writing a snapshot file failed.
    Io(std::io::Error),
}

impl fmt::Display for SkaldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkaldError::MissingComponent { entity, kind } => {
                write!(f, "entity {entity} has no {kind}")
            }
            SkaldError::Incompatible {
                kind,
                expected,
                found,
                reason,
            } => write!(f, "{reason}: {kind} holds {expected:?}, got {found:?}"),
            SkaldError::StaleEntity(entity) => write!(f, "entity {entity} is not alive"),
            SkaldError::UnknownKind(name) => write!(f, "unknown component kind \"{name}\""),
            SkaldError::NoSuchLevel { requested, count } => {
                write!(f, "level {requested} requested, game has {count}")
            }
            SkaldError::Snapshot(e) => write!(f, "snapshot error: {e}"),
            SkaldError::Malformed(what) => write!(f, "malformed data: {what}"),
            SkaldError::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for SkaldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SkaldError::Snapshot(e) => Some(e),
            SkaldError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SkaldError {
    fn from(e: serde_json::Error) -> Self {
        SkaldError::Snapshot(e)
    }
}

impl From<std::io::Error> for SkaldError {
    fn from(e: std::io::Error) -> Self {
        SkaldError::Io(e)
    }
}

/// Shorthand used across the crate.
pub type Result<T> = std::result::Result<T, SkaldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_readable() {
        let err = SkaldError::Incompatible {
            kind: ComponentKind::Name,
            expected: PayloadType::Text,
            found: PayloadType::Number,
            reason: "SCALE needs a numeric component",
        };
        assert_eq!(
            err.to_string(),
            "SCALE needs a numeric component: NameComponent holds Text, got Number"
        );
    }

    #[test]
    fn snapshot_error_has_source() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: SkaldError = json_err.into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
