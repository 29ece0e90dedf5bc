//! Board graph: hex cells, static adjacency, and terrain
//!
//! Adjacency never changes after construction. Terrain is layered on
//! afterwards from the scenario's terrain map and is kept verbatim so the
//! scenario exports unchanged.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::battle::constants::{MAX_CELL_DEGREE, MIN_CELL_DEGREE};
use crate::battle::hex::HexCoord;
use crate::battle::terrain::TerrainTag;
use crate::core::error::Result;
use crate::core::types::CellId;

/// The built-in 157-hex board
pub const STANDARD_BOARD_ID: &str = "DBD-157-v1";

/// Boards a scenario may reference
pub const KNOWN_BOARDS: [&str; 3] = ["DBD-157-v1", "DBD-157-PASS-v1", "DBD-157-CORRIDOR-v1"];

/// Cell count shared by every known board
pub const STANDARD_CELL_COUNT: usize = 157;

/// Cells per row of the standard board, top to bottom
const STANDARD_ROW_COUNTS: [i32; 11] = [12, 13, 14, 15, 16, 17, 16, 15, 14, 13, 12];

pub fn is_known_board(board_id: &str) -> bool {
    KNOWN_BOARDS.contains(&board_id)
}

/// Construction-time board errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("board has no cells")]
    Empty,

    #[error("board has too many cells ({0})")]
    TooManyCells(usize),

    #[error("cell ids must be 0..{expected}, found {found}")]
    CellIdOutOfRange { expected: usize, found: CellId },

    #[error("cell {0} is defined twice")]
    DuplicateCell(CellId),

    #[error("cells {first} and {second} share coordinate ({q}, {r})")]
    DuplicateCoord {
        first: CellId,
        second: CellId,
        q: i32,
        r: i32,
    },

    #[error("cell {cell} lists unknown neighbor {neighbor}")]
    UnknownNeighbor { cell: CellId, neighbor: CellId },

    #[error("cell {0} lists itself as a neighbor")]
    SelfNeighbor(CellId),

    #[error("cell {cell} lists neighbor {neighbor} twice")]
    DuplicateNeighbor { cell: CellId, neighbor: CellId },

    #[error("cell {cell} lists {neighbor} but not the other way round")]
    AsymmetricNeighbor { cell: CellId, neighbor: CellId },

    #[error("cell {cell} has degree {degree}, expected 2..=6")]
    DegreeOutOfRange { cell: CellId, degree: usize },

    #[error("board is disconnected: {reachable} of {total} cells reachable")]
    Disconnected { reachable: usize, total: usize },

    #[error("terrain references cell {0} which is not on the board")]
    TerrainOutOfRange(CellId),

    #[error("no built-in geometry for board '{0}'")]
    UnknownBoard(String),
}

/// A cell with explicit axial coordinates, as listed in a board file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSpec {
    pub id: CellId,
    pub q: i32,
    pub r: i32,
}

/// One entry of a board definition file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexDefinition {
    pub id: CellId,
    pub q: i32,
    pub r: i32,
    pub neighbors: Vec<CellId>,
}

/// External board definition: `{boardId, hexes: [{id, q, r, neighbors}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDefinition {
    pub board_id: String,
    pub hexes: Vec<HexDefinition>,
}

impl BoardDefinition {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a board definition from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }
}

#[derive(Debug, Clone)]
struct BoardCell {
    coord: HexCoord,
    neighbors: Vec<CellId>,
}

/// Immutable adjacency structure over hex cells
#[derive(Debug, Clone)]
pub struct BoardGraph {
    board_id: String,
    cells: Vec<BoardCell>,
    by_coord: AHashMap<HexCoord, CellId>,
    terrain: BTreeMap<CellId, TerrainTag>,
}

impl BoardGraph {
    /// Build from cells with coordinates; adjacency follows the hex grid
    pub fn from_cells(
        board_id: impl Into<String>,
        specs: &[CellSpec],
    ) -> std::result::Result<Self, BoardError> {
        let coords = index_cells(specs.iter().map(|s| (s.id, HexCoord::new(s.q, s.r))))?;
        let by_coord = coord_index(&coords)?;

        let cells = coords
            .iter()
            .map(|coord| BoardCell {
                coord: *coord,
                neighbors: coord
                    .neighbors()
                    .iter()
                    .filter_map(|n| by_coord.get(n).copied())
                    .collect(),
            })
            .collect();

        let board = Self {
            board_id: board_id.into(),
            cells,
            by_coord,
            terrain: BTreeMap::new(),
        };
        board.check_shape()?;
        Ok(board)
    }

    /// Build from a definition file with explicit neighbor lists
    pub fn from_definition(def: &BoardDefinition) -> std::result::Result<Self, BoardError> {
        let coords = index_cells(def.hexes.iter().map(|h| (h.id, HexCoord::new(h.q, h.r))))?;
        let by_coord = coord_index(&coords)?;
        let total = coords.len();

        let mut neighbors: Vec<Vec<CellId>> = vec![Vec::new(); total];
        for hex in &def.hexes {
            let list = &mut neighbors[hex.id.index()];
            for &n in &hex.neighbors {
                if n == hex.id {
                    return Err(BoardError::SelfNeighbor(hex.id));
                }
                if n.index() >= total {
                    return Err(BoardError::UnknownNeighbor {
                        cell: hex.id,
                        neighbor: n,
                    });
                }
                if list.contains(&n) {
                    return Err(BoardError::DuplicateNeighbor {
                        cell: hex.id,
                        neighbor: n,
                    });
                }
                list.push(n);
            }
        }

        for (index, list) in neighbors.iter().enumerate() {
            let cell = CellId(index as u16);
            if let Some(&n) = list.iter().find(|n| !neighbors[n.index()].contains(&cell)) {
                return Err(BoardError::AsymmetricNeighbor { cell, neighbor: n });
            }
        }

        let cells = coords
            .into_iter()
            .zip(neighbors)
            .map(|(coord, neighbors)| BoardCell { coord, neighbors })
            .collect();

        let board = Self {
            board_id: def.board_id.clone(),
            cells,
            by_coord,
            terrain: BTreeMap::new(),
        };
        board.check_shape()?;
        Ok(board)
    }

    /// The built-in `DBD-157-v1` board
    pub fn standard() -> Self {
        let mut specs = Vec::with_capacity(STANDARD_CELL_COUNT);
        let r_offset = (STANDARD_ROW_COUNTS.len() / 2) as i32;

        for (row, &count) in STANDARD_ROW_COUNTS.iter().enumerate() {
            let r = row as i32 - r_offset;
            let q_min = -(r + count - 1).div_euclid(2);
            for i in 0..count {
                specs.push(CellSpec {
                    id: CellId(specs.len() as u16),
                    q: q_min + i,
                    r,
                });
            }
        }

        match Self::from_cells(STANDARD_BOARD_ID, &specs) {
            Ok(board) => board,
            Err(err) => unreachable!("standard board geometry is invalid: {err}"),
        }
    }

    /// Built-in geometry for a known board id
    pub fn builtin(board_id: &str) -> std::result::Result<Self, BoardError> {
        if board_id == STANDARD_BOARD_ID {
            Ok(Self::standard())
        } else {
            Err(BoardError::UnknownBoard(board_id.to_string()))
        }
    }

    /// Layer a scenario terrain map onto the board
    pub fn with_terrain(
        mut self,
        terrain: BTreeMap<CellId, TerrainTag>,
    ) -> std::result::Result<Self, BoardError> {
        if let Some(cell) = terrain.keys().find(|c| !self.contains(**c)) {
            return Err(BoardError::TerrainOutOfRange(*cell));
        }
        self.terrain = terrain;
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.board_id
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, cell: CellId) -> bool {
        cell.index() < self.cells.len()
    }

    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.cells.len()).map(|i| CellId(i as u16))
    }

    pub fn coord(&self, cell: CellId) -> Option<HexCoord> {
        self.cells.get(cell.index()).map(|c| c.coord)
    }

    pub fn cell_at(&self, coord: HexCoord) -> Option<CellId> {
        self.by_coord.get(&coord).copied()
    }

    /// Neighbors of a cell (empty for cells not on the board)
    pub fn neighbors(&self, cell: CellId) -> &[CellId] {
        self.cells
            .get(cell.index())
            .map(|c| c.neighbors.as_slice())
            .unwrap_or(&[])
    }

    pub fn are_adjacent(&self, a: CellId, b: CellId) -> bool {
        self.neighbors(a).contains(&b)
    }

    pub fn terrain_of(&self, cell: CellId) -> TerrainTag {
        self.terrain.get(&cell).copied().unwrap_or_default()
    }

    /// False for water and for cells not on the board
    pub fn is_passable(&self, cell: CellId) -> bool {
        self.contains(cell) && self.terrain_of(cell).is_passable()
    }

    /// Terrain entries exactly as supplied by the scenario
    pub fn terrain_map(&self) -> &BTreeMap<CellId, TerrainTag> {
        &self.terrain
    }

    /// (min, max) neighbor count across all cells
    pub fn degree_range(&self) -> (usize, usize) {
        let degrees = self.cells.iter().map(|c| c.neighbors.len());
        let min = degrees.clone().min().unwrap_or(0);
        let max = degrees.max().unwrap_or(0);
        (min, max)
    }

    pub fn is_connected(&self) -> bool {
        self.reachable_count() == self.cells.len()
    }

    fn reachable_count(&self) -> usize {
        if self.cells.is_empty() {
            return 0;
        }
        let mut seen = vec![false; self.cells.len()];
        let mut queue = VecDeque::from([CellId(0)]);
        seen[0] = true;
        let mut count = 1;

        while let Some(cell) = queue.pop_front() {
            for &n in self.neighbors(cell) {
                if !seen[n.index()] {
                    seen[n.index()] = true;
                    count += 1;
                    queue.push_back(n);
                }
            }
        }
        count
    }

    fn check_shape(&self) -> std::result::Result<(), BoardError> {
        for (index, cell) in self.cells.iter().enumerate() {
            let degree = cell.neighbors.len();
            if !(MIN_CELL_DEGREE..=MAX_CELL_DEGREE).contains(&degree) {
                return Err(BoardError::DegreeOutOfRange {
                    cell: CellId(index as u16),
                    degree,
                });
            }
        }

        let reachable = self.reachable_count();
        if reachable != self.cells.len() {
            return Err(BoardError::Disconnected {
                reachable,
                total: self.cells.len(),
            });
        }
        Ok(())
    }
}

/// Order cells by id, requiring ids to be exactly 0..N-1
fn index_cells(
    entries: impl Iterator<Item = (CellId, HexCoord)>,
) -> std::result::Result<Vec<HexCoord>, BoardError> {
    let entries: Vec<(CellId, HexCoord)> = entries.collect();
    let total = entries.len();
    if total == 0 {
        return Err(BoardError::Empty);
    }
    if total > u16::MAX as usize {
        return Err(BoardError::TooManyCells(total));
    }

    let mut slots: Vec<Option<HexCoord>> = vec![None; total];
    for (id, coord) in entries {
        let slot = slots
            .get_mut(id.index())
            .ok_or(BoardError::CellIdOutOfRange {
                expected: total,
                found: id,
            })?;
        if slot.is_some() {
            return Err(BoardError::DuplicateCell(id));
        }
        *slot = Some(coord);
    }

    // Every slot is filled: N distinct ids all below N
    Ok(slots.into_iter().flatten().collect())
}

fn coord_index(coords: &[HexCoord]) -> std::result::Result<AHashMap<HexCoord, CellId>, BoardError> {
    let mut by_coord = AHashMap::with_capacity(coords.len());
    for (index, coord) in coords.iter().enumerate() {
        let id = CellId(index as u16);
        if let Some(first) = by_coord.insert(*coord, id) {
            return Err(BoardError::DuplicateCoord {
                first,
                second: id,
                q: coord.q,
                r: coord.r,
            });
        }
    }
    Ok(by_coord)
}
