//! Turn and activation bookkeeping

use serde::{Deserialize, Serialize};

use crate::core::error::IllegalAction;
use crate::core::types::{Side, TurnNumber, UnitId};

/// Engine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnginePhase {
    #[default]
    Normal,
    /// Waiting on `choose_retreat`
    RetreatInProgress,
}

/// Whose turn it is and how much of it has been spent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnState {
    pub side: Side,
    pub turn_number: TurnNumber,
    pub activation_limit: u32,
    pub activations_used: u32,
    /// Units that have spent their activation, in order
    pub acted: Vec<UnitId>,
}

impl TurnState {
    pub fn new(side: Side, activation_limit: u32) -> Self {
        Self {
            side,
            turn_number: 1,
            activation_limit,
            activations_used: 0,
            acted: Vec::new(),
        }
    }

    pub fn activations_left(&self) -> u32 {
        self.activation_limit.saturating_sub(self.activations_used)
    }

    pub fn has_acted(&self, unit: &UnitId) -> bool {
        self.acted.contains(unit)
    }

    /// Gate shared by every unit intent
    pub fn check_can_activate(&self, side: Side, unit: &UnitId) -> Result<(), IllegalAction> {
        if side != self.side {
            return Err(IllegalAction::WrongSide {
                active: self.side,
                attempted: side,
            });
        }
        if self.activations_left() == 0 {
            return Err(IllegalAction::NoActivationsLeft);
        }
        if self.has_acted(unit) {
            return Err(IllegalAction::AlreadyActed(unit.clone()));
        }
        Ok(())
    }

    /// Spend one activation on `unit`. Callers gate with `check_can_activate`.
    pub fn consume(&mut self, unit: UnitId) {
        self.activations_used = (self.activations_used + 1).min(self.activation_limit);
        if !self.acted.contains(&unit) {
            self.acted.push(unit);
        }
    }

    /// Hand the turn to the other side. Leaves the state untouched at the last turn number.
    pub fn advance(&mut self) -> Result<(), IllegalAction> {
        let next = self
            .turn_number
            .checked_add(1)
            .ok_or(IllegalAction::TurnLimitReached(self.turn_number))?;
        self.side = self.side.opponent();
        self.turn_number = next;
        self.activations_used = 0;
        self.acted.clear();
        Ok(())
    }
}
