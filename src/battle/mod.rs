//! Battle system - turn-based melee on a fixed hex board
//!
//! Board and units are plain data; the `GameEngine` owns them and is the
//! only thing that mutates them. Combat is dice-driven with forced
//! retreats, and the first side to capture enough standards wins.

pub mod board;
pub mod constants;
pub mod dice;
pub mod engagement;
pub mod engine;
pub mod events;
pub mod hex;
pub mod intent;
pub mod pathfinding;
pub mod resolution;
pub mod terrain;
pub mod turn;
pub mod unit_type;
pub mod units;
pub mod victory;

// Re-exports for convenient access
pub use board::{
    is_known_board, BoardDefinition, BoardError, BoardGraph, CellSpec, HexDefinition,
    KNOWN_BOARDS, STANDARD_BOARD_ID, STANDARD_CELL_COUNT,
};
pub use constants::*;
pub use dice::{DiceSource, ScriptedDice, SeededDice};
pub use engagement::{adjacent_enemies, is_engaged, is_flanked, support_info, SupportInfo};
pub use engine::{GameEngine, GameSnapshot, PendingRetreat, SideTotals, TurnView, UnitView};
pub use events::{BattleEvent, BattleEventKind, BattleEventLog};
pub use hex::HexCoord;
pub use intent::Intent;
pub use pathfinding::{distance_field, legal_moves, reachable_within, retreat_candidates};
pub use resolution::{
    cancel_count, classify, dice_pool, tally, AttackOutcome, DicePool, DieResult,
    RetreatContext, RollTally,
};
pub use terrain::TerrainTag;
pub use turn::{EnginePhase, TurnState};
pub use unit_type::{max_hp, Quality, UnitProperties, UnitType};
pub use units::{PlacementConflict, Unit, UnitRegistry};
pub use victory::{standards_for, VictoryTracker};
