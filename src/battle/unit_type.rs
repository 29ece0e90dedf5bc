//! Unit types, quality tiers, and their fixed properties

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of military unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    #[serde(rename = "INF")]
    Infantry,
    #[serde(rename = "CAV")]
    Cavalry,
    #[serde(rename = "SKR")]
    Skirmisher,
    #[serde(rename = "ARC")]
    Archer,
    #[serde(rename = "GEN")]
    General,
}

/// Fixed properties for a unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitProperties {
    pub base_max_hp: u8,
    pub melee_dice: u32,
    pub movement_points: u32,
}

impl UnitType {
    pub const ALL: [UnitType; 5] = [
        UnitType::Infantry,
        UnitType::Cavalry,
        UnitType::Skirmisher,
        UnitType::Archer,
        UnitType::General,
    ];

    /// Get default properties for this unit type
    pub fn properties(&self) -> UnitProperties {
        match self {
            UnitType::Infantry => UnitProperties {
                base_max_hp: 4,
                melee_dice: 2,
                movement_points: 1,
            },
            UnitType::Cavalry => UnitProperties {
                base_max_hp: 3,
                melee_dice: 3, // Shock
                movement_points: 2,
            },
            UnitType::Skirmisher => UnitProperties {
                base_max_hp: 2,
                melee_dice: 2,
                movement_points: 2,
            },
            UnitType::Archer => UnitProperties {
                base_max_hp: 2,
                melee_dice: 1, // Weak in melee
                movement_points: 1,
            },
            UnitType::General => UnitProperties {
                base_max_hp: 4,
                melee_dice: 1,
                movement_points: 2,
            },
        }
    }

    pub fn melee_dice(&self) -> u32 {
        self.properties().melee_dice
    }

    pub fn movement_points(&self) -> u32 {
        self.properties().movement_points
    }

    pub fn is_general(&self) -> bool {
        matches!(self, UnitType::General)
    }

    /// Scenario document code
    pub fn code(&self) -> &'static str {
        match self {
            UnitType::Infantry => "INF",
            UnitType::Cavalry => "CAV",
            UnitType::Skirmisher => "SKR",
            UnitType::Archer => "ARC",
            UnitType::General => "GEN",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for UnitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitType::ALL
            .into_iter()
            .find(|t| t.code() == s)
            .ok_or_else(|| format!("unknown unit type {s:?}"))
    }
}

/// Training tier; shifts max HP and retreat cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "GREEN")]
    Green,
    #[serde(rename = "REGULAR")]
    Regular,
    #[serde(rename = "VETERAN")]
    Veteran,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Green, Quality::Regular, Quality::Veteran];

    /// Additive max-HP modifier
    pub fn hp_delta(&self) -> i8 {
        match self {
            Quality::Green => -1,
            Quality::Regular => 0,
            Quality::Veteran => 1,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Quality::Green => "GREEN",
            Quality::Regular => "REGULAR",
            Quality::Veteran => "VETERAN",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::ALL
            .into_iter()
            .find(|q| q.code() == s)
            .ok_or_else(|| format!("unknown quality {s:?}"))
    }
}

/// Max HP derived from type and quality (never below 1)
pub fn max_hp(unit_type: UnitType, quality: Quality) -> u8 {
    let hp = unit_type.properties().base_max_hp as i16 + quality.hp_delta() as i16;
    hp.max(1) as u8
}
