//! Breadth-first search over the board graph
//!
//! Two searches live here: the bounded legal-move search, which respects
//! terrain and occupancy, and the retreat distance field, which ignores
//! both and measures pure graph distance from the attacker.

use std::collections::VecDeque;

use crate::battle::board::BoardGraph;
use crate::battle::engagement::is_engaged;
use crate::battle::units::{Unit, UnitRegistry};
use crate::core::types::CellId;

/// Cells the unit may move to this activation, sorted by id
///
/// Empty when the unit is engaged. The origin is never included.
pub fn legal_moves(board: &BoardGraph, units: &UnitRegistry, unit: &Unit) -> Vec<CellId> {
    if is_engaged(board, units, unit) {
        return Vec::new();
    }
    reachable_within(board, units, unit.cell, unit.unit_type.movement_points())
}

/// Passable, unoccupied cells within `budget` hops of `origin`
///
/// Paths may only pass through passable, unoccupied cells.
pub fn reachable_within(
    board: &BoardGraph,
    units: &UnitRegistry,
    origin: CellId,
    budget: u32,
) -> Vec<CellId> {
    let mut depth: Vec<Option<u32>> = vec![None; board.cell_count()];
    let Some(slot) = depth.get_mut(origin.index()) else {
        return Vec::new();
    };
    *slot = Some(0);

    let mut queue = VecDeque::from([origin]);
    let mut reached = Vec::new();

    while let Some(cell) = queue.pop_front() {
        let d = depth[cell.index()].unwrap_or(0);
        if d >= budget {
            continue;
        }
        for &n in board.neighbors(cell) {
            if depth[n.index()].is_some() || !board.is_passable(n) || units.is_occupied(n) {
                continue;
            }
            depth[n.index()] = Some(d + 1);
            reached.push(n);
            queue.push_back(n);
        }
    }

    reached.sort();
    reached
}

/// Hop distance from `origin` to every cell, ignoring terrain and occupancy
///
/// Indexed by cell id. Unreachable cells (only possible on a malformed
/// board) hold `u32::MAX`.
pub fn distance_field(board: &BoardGraph, origin: CellId) -> Vec<u32> {
    let mut dist = vec![u32::MAX; board.cell_count()];
    let Some(slot) = dist.get_mut(origin.index()) else {
        return dist;
    };
    *slot = 0;

    let mut queue = VecDeque::from([origin]);
    while let Some(cell) = queue.pop_front() {
        let next = dist[cell.index()] + 1;
        for &n in board.neighbors(cell) {
            if dist[n.index()] == u32::MAX {
                dist[n.index()] = next;
                queue.push_back(n);
            }
        }
    }
    dist
}

/// Adjacent cells that take the defender strictly farther from the attacker
///
/// A candidate must be passable and unoccupied. Sorted by cell id.
pub fn retreat_candidates(
    board: &BoardGraph,
    units: &UnitRegistry,
    field: &[u32],
    from: CellId,
) -> Vec<CellId> {
    let here = field.get(from.index()).copied().unwrap_or(u32::MAX);
    let mut candidates: Vec<CellId> = board
        .neighbors(from)
        .iter()
        .copied()
        .filter(|n| board.is_passable(*n) && !units.is_occupied(*n))
        .filter(|n| {
            let there = field.get(n.index()).copied().unwrap_or(u32::MAX);
            there != u32::MAX && here != u32::MAX && there > here
        })
        .collect();
    candidates.sort();
    candidates
}
