//! Standards and the win condition

use serde::{Deserialize, Serialize};

use crate::battle::constants::{STANDARDS_PER_GENERAL, STANDARDS_PER_UNIT};
use crate::core::types::Side;

/// Standards captured by destroying a unit
pub fn standards_for(is_general: bool) -> u32 {
    if is_general {
        STANDARDS_PER_GENERAL
    } else {
        STANDARDS_PER_UNIT
    }
}

/// Per-side standards and the one-shot winner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VictoryTracker {
    pub standards_to_win: u32,
    blue: u32,
    red: u32,
    winner: Option<Side>,
}

impl VictoryTracker {
    pub fn new(standards_to_win: u32) -> Self {
        Self {
            standards_to_win,
            blue: 0,
            red: 0,
            winner: None,
        }
    }

    pub fn add_score(&mut self, side: Side, points: u32) {
        match side {
            Side::Blue => self.blue += points,
            Side::Red => self.red += points,
        }
    }

    pub fn current_score(&self, side: Side) -> u32 {
        match side {
            Side::Blue => self.blue,
            Side::Red => self.red,
        }
    }

    /// Declare the first side at or over the threshold. Once set, the
    /// winner never changes.
    pub fn check_victory(&mut self) -> Option<Side> {
        if self.winner.is_none() {
            self.winner = Side::ALL
                .into_iter()
                .find(|s| self.current_score(*s) >= self.standards_to_win);
        }
        self.winner
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }
}
