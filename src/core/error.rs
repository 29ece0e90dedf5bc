use thiserror::Error;

use crate::battle::board::BoardError;
use crate::core::types::{CellId, Side, TurnNumber, UnitId};
use crate::scenario::validation::ValidationError;

#[derive(Error, Debug)]
pub enum TacticsError {
    #[error("Invalid scenario: {}", format_validation(.0))]
    InvalidScenario(Vec<ValidationError>),

    #[error("Illegal action: {0}")]
    IllegalAction(IllegalAction),

    #[error("Not found: {0}")]
    NotFound(NotFound),

    #[error("Game over: {winner} has won")]
    GameOver { winner: Side },

    #[error("Invalid board: {0}")]
    InvalidBoard(#[from] BoardError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Why an intent was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IllegalAction {
    #[error("it is {active}'s turn, not {attempted}'s")]
    WrongSide { active: Side, attempted: Side },

    #[error("no activations left this turn")]
    NoActivationsLeft,

    #[error("unit {0} has already acted this turn")]
    AlreadyActed(UnitId),

    #[error("{defender} is not adjacent to {attacker}")]
    NotAdjacent { attacker: UnitId, defender: UnitId },

    #[error("{defender} is on the same side as {attacker}")]
    FriendlyTarget { attacker: UnitId, defender: UnitId },

    #[error("cell {to} is not reachable by {unit}")]
    Unreachable { unit: UnitId, to: CellId },

    #[error("unit {0} is engaged and cannot move")]
    Engaged(UnitId),

    #[error("a forced retreat is being resolved")]
    RetreatInProgress,

    #[error("no forced retreat is waiting for a choice")]
    NoRetreatPending,

    #[error("cell {0} is not a legal retreat destination")]
    NotARetreatOption(CellId),

    #[error("turn {0} is the last turn that can be numbered")]
    TurnLimitReached(TurnNumber),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    #[error("unit {0}")]
    Unit(UnitId),

    #[error("cell {0}")]
    Cell(CellId),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, TacticsError>;
