//! Engine configuration with documented defaults
//!
//! Rule constants that belong to the game itself (dice faces, unit
//! profiles) live in `battle::constants`. This struct holds only the
//! knobs a caller may legitimately change between games.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::battle::constants::{DEFAULT_ACTIVATION_LIMIT, MAX_ACTIVATION_LIMIT};
use crate::core::error::{Result, TacticsError};

/// How the engine picks between several equally legal retreat hexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetreatPolicy {
    /// Always take the candidate with the smallest cell id
    #[default]
    LowestCellId,
    /// Draw from the engine's dice source (reproducible under a fixed seed)
    Random,
    /// Pause and let the defending side choose via `choose_retreat`
    Interactive,
}

/// Configuration for a game engine instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Activations each side may spend per turn
    ///
    /// Scenario documents are validated against this value: a turn block
    /// with more `activationsLeft` than the limit is rejected.
    pub activation_limit: u32,

    /// Tie-break rule for forced retreats
    pub retreat_policy: RetreatPolicy,

    /// Seed for the default dice source
    ///
    /// `None` draws a seed from the OS. Any fixed value makes every roll,
    /// and therefore every game, reproducible.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            activation_limit: DEFAULT_ACTIVATION_LIMIT,
            retreat_policy: RetreatPolicy::default(),
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_retreat_policy(mut self, policy: RetreatPolicy) -> Self {
        self.retreat_policy = policy;
        self
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.activation_limit == 0 {
            return Err("activation_limit must be at least 1".into());
        }
        if self.activation_limit > MAX_ACTIVATION_LIMIT {
            return Err(format!(
                "activation_limit ({}) exceeds the maximum of {}",
                self.activation_limit, MAX_ACTIVATION_LIMIT
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML config
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate().map_err(TacticsError::Config)?;
        Ok(config)
    }

    /// Load config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }
}
