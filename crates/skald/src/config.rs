//! Engine configuration.
//!
//! Every field has a default, so a config document only needs to name what
//! it changes:
//!
//! ```
//! use skald::config::{CommitPolicy, EngineConfig};
//!
//! let config = EngineConfig::from_json(r#"{ "seed": 42, "commit_policy": "snapshot" }"#).unwrap();
//! assert_eq!(config.seed, Some(42));
//! assert_eq!(config.commit_policy, CommitPolicy::Snapshot);
//! assert!(config.movement);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// When the event pass makes one event's writes visible to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Writes land immediately. A later event in the same tick sees the
    /// values an earlier one left behind.
    #[default]
    Immediate,
    /// Selection and conditions for every event read a copy of the level
    /// taken when the pass starts. Writes still land on live state, so two
    /// events touching one entity both apply, in event order.
    Snapshot,
}

/// Knobs for [`Engine`](crate::engine::Engine) and its default schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for RANDOM actions. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub commit_policy: CommitPolicy,
    /// Add the built-in movement system (position += velocity).
    pub movement: bool,
    /// Add the built-in progression system (level changes).
    pub progression: bool,
    /// End the game as lost when an entity runs out of lives.
    pub game_over: bool,
    /// Clear collided lists at the end of every tick.
    pub clear_contacts: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            commit_policy: CommitPolicy::Immediate,
            movement: true,
            progression: true,
            game_over: true,
            clear_contacts: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn unknown_policy_is_an_error() {
        assert!(EngineConfig::from_json(r#"{ "commit_policy": "eventually" }"#).is_err());
    }

    #[test]
    fn pretty_output_reloads() {
        let config = EngineConfig {
            seed: Some(9),
            movement: false,
            ..EngineConfig::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"seed\": 9"));
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
