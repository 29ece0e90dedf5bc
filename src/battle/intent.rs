//! Serializable player intents
//!
//! The JSON form is what the headless runner replays:
//! `{"action":"move","unit":"b1","to":42}`.

use serde::{Deserialize, Serialize};

use crate::core::types::{CellId, UnitId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Intent {
    Move { unit: UnitId, to: CellId },
    Attack { attacker: UnitId, defender: UnitId },
    EndTurn,
    Pass { unit: UnitId },
    ChooseRetreat { cell: CellId },
}

impl Intent {
    /// Parse a JSON array of intents
    pub fn parse_script(text: &str) -> serde_json::Result<Vec<Intent>> {
        serde_json::from_str(text)
    }
}
