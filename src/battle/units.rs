//! Unit records and the registry that owns them
//!
//! The registry keeps two indexes in lockstep: units by id and unit id by
//! cell. Every mutation goes through it, so no two units ever share a cell.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::unit_type::{max_hp, Quality, UnitType};
use crate::core::types::{CellId, Side, UnitId};

/// A unit on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub side: Side,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub quality: Quality,
    pub hp: u8,
    #[serde(rename = "cellId")]
    pub cell: CellId,
}

impl Unit {
    pub fn new(
        id: impl Into<UnitId>,
        side: Side,
        unit_type: UnitType,
        quality: Quality,
        cell: CellId,
    ) -> Self {
        Self {
            id: id.into(),
            side,
            unit_type,
            quality,
            hp: max_hp(unit_type, quality),
            cell,
        }
    }

    pub fn with_hp(mut self, hp: u8) -> Self {
        self.hp = hp;
        self
    }

    pub fn max_hp(&self) -> u8 {
        max_hp(self.unit_type, self.quality)
    }

    pub fn is_general(&self) -> bool {
        self.unit_type.is_general()
    }

    /// Remove HP, saturating at zero. Returns true if the unit is destroyed.
    pub fn take_damage(&mut self, amount: u8) -> bool {
        self.hp = self.hp.saturating_sub(amount);
        self.hp == 0
    }
}

/// Why the registry refused an insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementConflict {
    DuplicateId(UnitId),
    CellOccupied { cell: CellId, occupant: UnitId },
}

/// Owns every live unit, in scenario order
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: AHashMap<UnitId, Unit>,
    order: Vec<UnitId>,
    occupancy: AHashMap<CellId, UnitId>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, unit: Unit) -> Result<(), PlacementConflict> {
        if self.units.contains_key(&unit.id) {
            return Err(PlacementConflict::DuplicateId(unit.id));
        }
        if let Some(occupant) = self.occupancy.get(&unit.cell) {
            return Err(PlacementConflict::CellOccupied {
                cell: unit.cell,
                occupant: occupant.clone(),
            });
        }
        self.occupancy.insert(unit.cell, unit.id.clone());
        self.order.push(unit.id.clone());
        self.units.insert(unit.id.clone(), unit);
        Ok(())
    }

    pub fn get(&self, id: &UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Apply damage in place; returns the remaining HP
    pub fn damage(&mut self, id: &UnitId, amount: u8) -> Option<u8> {
        let unit = self.units.get_mut(id)?;
        unit.take_damage(amount);
        Some(unit.hp)
    }

    pub fn contains(&self, id: &UnitId) -> bool {
        self.units.contains_key(id)
    }

    pub fn unit_at(&self, cell: CellId) -> Option<&Unit> {
        self.occupancy.get(&cell).and_then(|id| self.units.get(id))
    }

    pub fn is_occupied(&self, cell: CellId) -> bool {
        self.occupancy.contains_key(&cell)
    }

    /// Relocate a unit. The destination must be empty.
    pub fn relocate(&mut self, id: &UnitId, to: CellId) -> bool {
        if self.occupancy.contains_key(&to) {
            return false;
        }
        let Some(unit) = self.units.get_mut(id) else {
            return false;
        };
        self.occupancy.remove(&unit.cell);
        unit.cell = to;
        self.occupancy.insert(to, id.clone());
        true
    }

    pub fn remove(&mut self, id: &UnitId) -> Option<Unit> {
        let unit = self.units.remove(id)?;
        self.occupancy.remove(&unit.cell);
        self.order.retain(|other| other != id);
        Some(unit)
    }

    /// Units in scenario order
    pub fn iter(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.order.iter().filter_map(|id| self.units.get(id))
    }

    pub fn on_side(&self, side: Side) -> impl Iterator<Item = &Unit> + '_ {
        self.iter().filter(move |u| u.side == side)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units among `cells` belonging to `side`
    pub fn units_in<'a>(
        &'a self,
        cells: &'a [CellId],
        side: Side,
    ) -> impl Iterator<Item = &'a Unit> + 'a {
        cells
            .iter()
            .filter_map(|c| self.unit_at(*c))
            .filter(move |u| u.side == side)
    }
}
