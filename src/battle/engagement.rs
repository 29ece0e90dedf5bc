//! Engagement queries between adjacent units
//!
//! Units are engaged when adjacent to an enemy. Engaged units may not move,
//! and the number of adjacent enemies or friends feeds into combat.

use crate::battle::board::BoardGraph;
use crate::battle::constants::FLANK_MIN_ADJACENT_ENEMIES;
use crate::battle::units::{Unit, UnitRegistry};

/// Enemy units adjacent to `unit`
pub fn adjacent_enemies<'a>(
    board: &'a BoardGraph,
    units: &'a UnitRegistry,
    unit: &Unit,
) -> impl Iterator<Item = &'a Unit> + 'a {
    units.units_in(board.neighbors(unit.cell), unit.side.opponent())
}

/// Friendly units adjacent to `unit` (never includes the unit itself)
pub fn adjacent_friends<'a>(
    board: &'a BoardGraph,
    units: &'a UnitRegistry,
    unit: &Unit,
) -> impl Iterator<Item = &'a Unit> + 'a {
    units.units_in(board.neighbors(unit.cell), unit.side)
}

/// Engaged units cannot move
pub fn is_engaged(board: &BoardGraph, units: &UnitRegistry, unit: &Unit) -> bool {
    adjacent_enemies(board, units, unit).next().is_some()
}

/// Check if a defender is flanked (2+ adjacent enemies)
pub fn is_flanked(board: &BoardGraph, units: &UnitRegistry, defender: &Unit) -> bool {
    adjacent_enemies(board, units, defender).count() >= FLANK_MIN_ADJACENT_ENEMIES
}

/// What the defender has around it when a retreat is rolled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupportInfo {
    /// Adjacent same-side units
    pub support: usize,
    /// An adjacent friendly General
    pub general_adjacent: bool,
}

pub fn support_info(board: &BoardGraph, units: &UnitRegistry, defender: &Unit) -> SupportInfo {
    adjacent_friends(board, units, defender).fold(SupportInfo::default(), |mut info, friend| {
        info.support += 1;
        info.general_adjacent |= friend.is_general();
        info
    })
}

/// Enemies the unit could attack right now, by cell id
pub fn attack_targets<'a>(
    board: &'a BoardGraph,
    units: &'a UnitRegistry,
    unit: &Unit,
) -> Vec<&'a Unit> {
    let mut targets: Vec<&Unit> = adjacent_enemies(board, units, unit).collect();
    targets.sort_by_key(|u| u.cell);
    targets
}
