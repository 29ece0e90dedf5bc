//! Scenario document: the one persisted-state format
//!
//! Documents are validated as raw JSON first (so bad enumerations and
//! out-of-range numbers are reported together) and only then parsed into
//! typed form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::battle::terrain::TerrainTag;
use crate::battle::units::Unit;
use crate::core::error::{Result, TacticsError};
use crate::core::types::{CellId, Side, TurnNumber, UnitId};
use crate::scenario::validation::{validate_with, ValidationRules};

/// Schema tag every document must carry
pub const SCHEMA_VERSION: &str = "dbd-scn-0.1";

/// The `turn` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnBlock {
    pub side: Side,
    pub turn_number: TurnNumber,
    pub activations_left: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDocument {
    pub schema: String,
    pub board: String,
    pub standards_to_win: u32,
    pub terrain: BTreeMap<CellId, TerrainTag>,
    pub units: Vec<Unit>,
    pub turn: TurnBlock,
    /// Standards already captured, for resuming a game in progress
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub standards: BTreeMap<Side, u32>,
    /// Units of the turn side that have already spent their activation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acted: Vec<UnitId>,
}

impl ScenarioDocument {
    /// Empty scenario on `board`, Blue to move
    pub fn new(board: impl Into<String>, standards_to_win: u32, activations: u32) -> Self {
        Self {
            schema: SCHEMA_VERSION.to_string(),
            board: board.into(),
            standards_to_win,
            terrain: BTreeMap::new(),
            units: Vec::new(),
            turn: TurnBlock {
                side: Side::Blue,
                turn_number: 1,
                activations_left: activations,
            },
            standards: BTreeMap::new(),
            acted: Vec::new(),
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn with_terrain(mut self, cell: CellId, tag: TerrainTag) -> Self {
        self.terrain.insert(cell, tag);
        self
    }

    /// Set a side's captured standards; zero clears the entry
    pub fn with_standards(mut self, side: Side, standards: u32) -> Self {
        if standards == 0 {
            self.standards.remove(&side);
        } else {
            self.standards.insert(side, standards);
        }
        self
    }

    /// Validate a raw document and parse it
    pub fn from_value(value: &serde_json::Value, rules: &ValidationRules) -> Result<Self> {
        let errors = validate_with(value, rules);
        if !errors.is_empty() {
            return Err(TacticsError::InvalidScenario(errors));
        }
        Ok(Self::deserialize(value)?)
    }

    /// Parse JSON text against the standard rules
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_json_with(text, &ValidationRules::default())
    }

    pub fn from_json_with(text: &str, rules: &ValidationRules) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(&value, rules)
    }

    /// Load a scenario from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, &ValidationRules::default())
    }

    pub fn load_with(path: impl AsRef<Path>, rules: &ValidationRules) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json_with(&contents, rules)
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn standards_of(&self, side: Side) -> u32 {
        self.standards.get(&side).copied().unwrap_or(0)
    }
}
