//! Append-only combat log

use serde::{Deserialize, Serialize};

use crate::battle::resolution::AttackOutcome;
use crate::core::types::{CellId, Side, TurnNumber, UnitId};

/// Log entry for battle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub seq: u64,
    pub turn: TurnNumber,
    pub side: Side,
    pub kind: BattleEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BattleEventKind {
    ScenarioLoaded {
        board: String,
        units: usize,
    },
    UnitMoved {
        unit: UnitId,
        from: CellId,
        to: CellId,
    },
    UnitPassed {
        unit: UnitId,
    },
    AttackResolved(AttackOutcome),
    RetreatStep {
        unit: UnitId,
        from: CellId,
        to: CellId,
    },
    RetreatBlocked {
        unit: UnitId,
        hp: u8,
    },
    RetreatChoiceNeeded {
        unit: UnitId,
        options: Vec<CellId>,
    },
    UnitDestroyed {
        unit: UnitId,
        by: Side,
        points: u32,
    },
    TurnEnded {
        next: Side,
        turn: TurnNumber,
    },
    Victory {
        winner: Side,
        standards: u32,
    },
}

impl BattleEventKind {
    pub fn describe(&self) -> String {
        match self {
            BattleEventKind::ScenarioLoaded { board, units } => {
                format!("scenario loaded on {board} with {units} units")
            }
            BattleEventKind::UnitMoved { unit, from, to } => format!("{unit} moved {from} -> {to}"),
            BattleEventKind::UnitPassed { unit } => format!("{unit} passed"),
            BattleEventKind::AttackResolved(o) => format!(
                "{} attacked {} with {} dice {:?}: {} hits, {} retreats ({} cancelled), hp {}",
                o.attacker,
                o.defender,
                o.pool.total,
                o.rolls,
                o.hits,
                o.retreats,
                o.cancelled,
                o.defender_hp
            ),
            BattleEventKind::RetreatStep { unit, from, to } => {
                format!("{unit} retreated {from} -> {to}")
            }
            BattleEventKind::RetreatBlocked { unit, hp } => {
                format!("{unit} could not retreat, hp now {hp}")
            }
            BattleEventKind::RetreatChoiceNeeded { unit, options } => {
                format!("{unit} must choose a retreat from {options:?}")
            }
            BattleEventKind::UnitDestroyed { unit, by, points } => {
                format!("{unit} destroyed, {by} gains {points}")
            }
            BattleEventKind::TurnEnded { next, turn } => format!("turn {turn}: {next} to act"),
            BattleEventKind::Victory { winner, standards } => {
                format!("{winner} wins with {standards} standards")
            }
        }
    }
}

/// Ordered event log with monotonically increasing sequence numbers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleEventLog {
    events: Vec<BattleEvent>,
    next_seq: u64,
}

impl BattleEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: TurnNumber, side: Side, kind: BattleEventKind) -> &BattleEvent {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(BattleEvent {
            seq,
            turn,
            side,
            kind,
        });
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Events with `seq >= from`
    pub fn since(&self, from: u64) -> &[BattleEvent] {
        let start = self.events.partition_point(|e| e.seq < from);
        &self.events[start..]
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
