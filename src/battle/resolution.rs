//! Melee resolution rules: dice pools, roll classification, cancellation
//!
//! Pure functions only. The engine applies the results to the registry.

use serde::{Deserialize, Serialize};

use crate::battle::constants::{
    COVER_PENALTY_DICE, DIE_HIT_MIN, DIE_RETREAT, FLANK_BONUS_DICE, MIN_DICE_POOL,
};
use crate::battle::engagement::SupportInfo;
use crate::battle::unit_type::{Quality, UnitType};
use crate::core::types::{CellId, UnitId};

/// Dice pool with its modifiers spelled out for the combat log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DicePool {
    pub base: u32,
    pub flank_bonus: u32,
    pub cover_penalty: u32,
    pub total: u32,
}

/// Size the attacker's pool
///
/// +1 if the defender is flanked, -1 if the defender stands in cover,
/// never below one die.
pub fn dice_pool(attacker: UnitType, defender_flanked: bool, defender_in_cover: bool) -> DicePool {
    let base = attacker.melee_dice();
    let flank_bonus = if defender_flanked { FLANK_BONUS_DICE } else { 0 };
    let cover_penalty = if defender_in_cover { COVER_PENALTY_DICE } else { 0 };
    let total = (base + flank_bonus)
        .saturating_sub(cover_penalty)
        .max(MIN_DICE_POOL);

    DicePool {
        base,
        flank_bonus,
        cover_penalty,
        total,
    }
}

/// What a single die means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DieResult {
    Hit,
    Retreat,
    Miss,
}

pub fn classify(roll: u8) -> DieResult {
    if roll >= DIE_HIT_MIN {
        DieResult::Hit
    } else if roll == DIE_RETREAT {
        DieResult::Retreat
    } else {
        DieResult::Miss
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RollTally {
    pub hits: u32,
    pub retreats: u32,
    pub misses: u32,
}

pub fn tally(rolls: &[u8]) -> RollTally {
    rolls
        .iter()
        .fold(RollTally::default(), |mut t, &roll| {
            match classify(roll) {
                DieResult::Hit => t.hits += 1,
                DieResult::Retreat => t.retreats += 1,
                DieResult::Miss => t.misses += 1,
            }
            t
        })
}

/// Retreat results the defender ignores
///
/// An adjacent friendly General counts as full support for every quality.
pub fn cancel_count(quality: Quality, support: SupportInfo) -> u32 {
    let general = support.general_adjacent;
    match quality {
        Quality::Green => u32::from(support.support >= 2 || general),
        Quality::Regular => u32::from(support.support >= 1 || general),
        Quality::Veteran => {
            if support.support >= 1 || general {
                2
            } else {
                1
            }
        }
    }
}

/// Full record of one attack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackOutcome {
    pub attacker: UnitId,
    pub defender: UnitId,
    pub pool: DicePool,
    pub rolls: Vec<u8>,
    pub hits: u32,
    pub retreats: u32,
    pub cancelled: u32,
    pub net_retreats: u32,
    /// Retreat steps that moved the defender
    pub retreat_moves: u32,
    /// Retreat steps with nowhere to go (each cost 1 HP)
    pub blocked_steps: u32,
    pub defender_hp: u8,
    pub destroyed: bool,
    pub points_awarded: u32,
    /// Steps still waiting on `choose_retreat`
    pub retreat_pending: u32,
}

/// Transient state of a forced retreat
///
/// The distance field is computed once from the attacker's cell and stays
/// fixed for every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetreatContext {
    pub attacker: UnitId,
    pub defender: UnitId,
    pub attacker_cell: CellId,
    pub field: Vec<u32>,
    pub remaining: u32,
}

impl RetreatContext {
    pub fn distance(&self, cell: CellId) -> u32 {
        self.field.get(cell.index()).copied().unwrap_or(u32::MAX)
    }
}
