//! Battle terrain types and their effects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Terrain tag for a board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TerrainTag {
    #[default]
    #[serde(rename = "CLEAR")]
    Clear,
    #[serde(rename = "WOODS")]
    Woods, // Cover
    #[serde(rename = "ROUGH")]
    Rough, // Cover
    #[serde(rename = "HILL")]
    Hill,
    #[serde(rename = "WATER")]
    Water, // Impassable
}

impl TerrainTag {
    pub const ALL: [TerrainTag; 5] = [
        TerrainTag::Clear,
        TerrainTag::Woods,
        TerrainTag::Rough,
        TerrainTag::Hill,
        TerrainTag::Water,
    ];

    /// Can a unit enter or stand on this terrain?
    pub fn is_passable(&self) -> bool {
        !matches!(self, TerrainTag::Water)
    }

    /// Does a defender here cost the attacker a die?
    pub fn provides_cover(&self) -> bool {
        matches!(self, TerrainTag::Woods | TerrainTag::Rough)
    }

    pub fn code(&self) -> &'static str {
        match self {
            TerrainTag::Clear => "CLEAR",
            TerrainTag::Woods => "WOODS",
            TerrainTag::Rough => "ROUGH",
            TerrainTag::Hill => "HILL",
            TerrainTag::Water => "WATER",
        }
    }
}

impl fmt::Display for TerrainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TerrainTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TerrainTag::ALL
            .into_iter()
            .find(|t| t.code() == s)
            .ok_or_else(|| format!("unknown terrain {s:?}"))
    }
}
