//! Scenario validation over raw JSON
//!
//! Every check runs and every failure is reported; nothing stops at the
//! first error. Validation is pure, so running it twice gives the same list.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::battle::board::{is_known_board, BoardGraph, STANDARD_CELL_COUNT};
use crate::battle::constants::{
    DEFAULT_ACTIVATION_LIMIT, MAX_STANDARDS_TO_WIN, MIN_STANDARDS_TO_WIN,
};
use crate::battle::terrain::TerrainTag;
use crate::battle::unit_type::{max_hp, Quality, UnitType};
use crate::core::types::Side;
use crate::scenario::document::SCHEMA_VERSION;

const TOP_LEVEL_FIELDS: [&str; 8] = [
    "schema",
    "board",
    "standardsToWin",
    "terrain",
    "units",
    "turn",
    "standards",
    "acted",
];
const UNIT_FIELDS: [&str; 6] = ["id", "side", "type", "quality", "hp", "cellId"];
const TURN_FIELDS: [&str; 3] = ["side", "turnNumber", "activationsLeft"];

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "camelCase")]
pub enum ValidationError {
    #[error("document must be a JSON object")]
    NotAnObject,

    #[error("missing field '{field}'")]
    MissingField { field: String },

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("schema must be 'dbd-scn-0.1', found {found}")]
    SchemaMismatch { found: String },

    #[error("unknown board {found}")]
    UnknownBoard { found: String },

    #[error("scenario is for board {found} but the engine board is '{expected}'")]
    BoardMismatch { expected: String, found: String },

    #[error("standardsToWin must be an integer in 1..=20, found {found}")]
    StandardsToWinOutOfRange { found: String },

    #[error("terrain must be an object")]
    TerrainNotObject,

    #[error("terrain key '{key}' is not a cell id on this board")]
    TerrainCellInvalid { key: String },

    #[error("terrain at cell {key} has invalid tag {found}")]
    TerrainTagInvalid { key: String, found: String },

    #[error("units must be an array")]
    UnitsNotArray,

    #[error("unit #{index} must be an object")]
    UnitNotObject { index: usize },

    #[error("unit #{index} has no valid id")]
    UnitIdInvalid { index: usize },

    #[error("unit id '{id}' is used more than once")]
    DuplicateUnitId { id: String },

    #[error("unit '{unit}': invalid {field} {found}")]
    InvalidEnum {
        unit: String,
        field: String,
        found: String,
    },

    #[error("unit '{unit}': cellId {found} is not on this board")]
    UnitCellOutOfRange { unit: String, found: String },

    #[error("units '{first}' and '{second}' share cell {cell}")]
    CellShared {
        cell: u64,
        first: String,
        second: String,
    },

    #[error("unit '{unit}': hp {found} outside 1..={max}")]
    HpOutOfRange { unit: String, found: String, max: u8 },

    #[error("turn must be an object")]
    TurnNotObject,

    #[error("turn.side is invalid: {found}")]
    TurnSideInvalid { found: String },

    #[error("turn.turnNumber must be an integer >= 1, found {found}")]
    TurnNumberInvalid { found: String },

    #[error("turn.activationsLeft must be in 0..={limit}, found {found}")]
    ActivationsLeftOutOfRange { found: String, limit: u32 },

    #[error("standards must be an object keyed by side")]
    StandardsNotObject,

    #[error("standards must list at least one side; omit it when nothing is captured")]
    StandardsEmpty,

    #[error("standards has invalid side '{key}'")]
    StandardsSideInvalid { key: String },

    #[error("standards for {side} must be an integer in 1..standardsToWin, found {found}")]
    StandardsValueInvalid { side: String, found: String },

    #[error("acted must be an array of unit ids")]
    ActedNotArray,

    #[error("acted entry {found} is not an id of a unit on the turn side")]
    ActedUnitInvalid { found: String },

    #[error("acted must list at least one unit; omit it when nobody has acted")]
    ActedEmpty,

    #[error("acted lists '{id}' more than once")]
    ActedDuplicate { id: String },

    #[error("acted lists {count} units but only {used} activations were spent")]
    ActedExceedsUsed { count: usize, used: u64 },
}

/// Board size and turn economy a document is checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    pub cell_count: usize,
    pub activation_limit: u32,
    /// When set, the document's board id must equal it. Otherwise it must
    /// be one of the known boards.
    pub board_id: Option<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            cell_count: STANDARD_CELL_COUNT,
            activation_limit: DEFAULT_ACTIVATION_LIMIT,
            board_id: None,
        }
    }
}

impl ValidationRules {
    pub fn for_board(board: &BoardGraph, activation_limit: u32) -> Self {
        Self {
            cell_count: board.cell_count(),
            activation_limit,
            board_id: Some(board.id().to_string()),
        }
    }
}

/// Validate against the built-in board and the default activation limit
pub fn validate(doc: &Value) -> Vec<ValidationError> {
    validate_with(doc, &ValidationRules::default())
}

/// Validate against a concrete board
pub fn validate_for(doc: &Value, board: &BoardGraph, activation_limit: u32) -> Vec<ValidationError> {
    validate_with(doc, &ValidationRules::for_board(board, activation_limit))
}

pub fn validate_with(doc: &Value, rules: &ValidationRules) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let Some(root) = doc.as_object() else {
        errors.push(ValidationError::NotAnObject);
        return errors;
    };

    check_fields(root, &TOP_LEVEL_FIELDS, "", &mut errors);
    for field in &TOP_LEVEL_FIELDS[..6] {
        if !root.contains_key(*field) {
            errors.push(ValidationError::MissingField {
                field: (*field).to_string(),
            });
        }
    }

    if let Some(schema) = root.get("schema") {
        if schema.as_str() != Some(SCHEMA_VERSION) {
            errors.push(ValidationError::SchemaMismatch {
                found: schema.to_string(),
            });
        }
    }

    if let Some(board) = root.get("board") {
        check_board(board, rules, &mut errors);
    }

    let standards_to_win = root.get("standardsToWin").and_then(|v| {
        let n = v
            .as_u64()
            .filter(|n| (MIN_STANDARDS_TO_WIN..=MAX_STANDARDS_TO_WIN).contains(n));
        if n.is_none() {
            errors.push(ValidationError::StandardsToWinOutOfRange {
                found: v.to_string(),
            });
        }
        n
    });

    if let Some(terrain) = root.get("terrain") {
        check_terrain(terrain, rules, &mut errors);
    }

    let roster = root
        .get("units")
        .map(|units| check_units(units, rules, &mut errors))
        .unwrap_or_default();

    let turn = root.get("turn").and_then(|t| check_turn(t, rules, &mut errors));

    if let Some(standards) = root.get("standards") {
        check_standards(standards, standards_to_win, &mut errors);
    }

    if let Some(acted) = root.get("acted") {
        check_acted(acted, &roster, turn, rules, &mut errors);
    }

    errors
}

fn check_fields(obj: &Map<String, Value>, allowed: &[&str], prefix: &str, errors: &mut Vec<ValidationError>) {
    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            errors.push(ValidationError::UnknownField {
                field: format!("{prefix}{key}"),
            });
        }
    }
}

fn check_board(board: &Value, rules: &ValidationRules, errors: &mut Vec<ValidationError>) {
    match (&rules.board_id, board.as_str()) {
        (Some(expected), Some(id)) if id == expected => {}
        (Some(expected), _) => errors.push(ValidationError::BoardMismatch {
            expected: expected.clone(),
            found: board.to_string(),
        }),
        (None, Some(id)) if is_known_board(id) => {}
        (None, _) => errors.push(ValidationError::UnknownBoard {
            found: board.to_string(),
        }),
    }
}

fn cell_in_range(value: u64, rules: &ValidationRules) -> bool {
    value < rules.cell_count as u64
}

fn check_terrain(terrain: &Value, rules: &ValidationRules, errors: &mut Vec<ValidationError>) {
    let Some(map) = terrain.as_object() else {
        errors.push(ValidationError::TerrainNotObject);
        return;
    };
    for (key, tag) in map {
        // Keys must be canonical decimal integers so export reproduces them
        let in_range = key
            .parse::<u64>()
            .ok()
            .filter(|n| n.to_string() == *key && cell_in_range(*n, rules))
            .is_some();
        if !in_range {
            errors.push(ValidationError::TerrainCellInvalid { key: key.clone() });
        }
        if tag.as_str().and_then(|s| s.parse::<TerrainTag>().ok()).is_none() {
            errors.push(ValidationError::TerrainTagInvalid {
                key: key.clone(),
                found: tag.to_string(),
            });
        }
    }
}

/// What the acted check needs to know about each valid unit
#[derive(Debug, Default)]
struct Roster {
    sides: BTreeMap<String, Option<Side>>,
}

fn check_units(units: &Value, rules: &ValidationRules, errors: &mut Vec<ValidationError>) -> Roster {
    let mut roster = Roster::default();
    let Some(list) = units.as_array() else {
        errors.push(ValidationError::UnitsNotArray);
        return roster;
    };

    let mut occupied: BTreeMap<u64, String> = BTreeMap::new();

    for (index, entry) in list.iter().enumerate() {
        let Some(unit) = entry.as_object() else {
            errors.push(ValidationError::UnitNotObject { index });
            continue;
        };
        check_fields(unit, &UNIT_FIELDS, &format!("units[{index}]."), errors);

        let id = match unit.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                errors.push(ValidationError::UnitIdInvalid { index });
                format!("#{index}")
            }
        };
        let label = id.clone();

        let side = parse_enum::<Side>(unit, "side", &label, errors);
        let unit_type = parse_enum::<UnitType>(unit, "type", &label, errors);
        let quality = parse_enum::<Quality>(unit, "quality", &label, errors);

        match unit.get("cellId") {
            Some(cell) => match cell.as_u64().filter(|c| cell_in_range(*c, rules)) {
                Some(c) => {
                    if let Some(first) = occupied.get(&c) {
                        errors.push(ValidationError::CellShared {
                            cell: c,
                            first: first.clone(),
                            second: label.clone(),
                        });
                    } else {
                        occupied.insert(c, label.clone());
                    }
                }
                None => errors.push(ValidationError::UnitCellOutOfRange {
                    unit: label.clone(),
                    found: cell.to_string(),
                }),
            },
            None => errors.push(ValidationError::MissingField {
                field: format!("units[{index}].cellId"),
            }),
        }

        match unit.get("hp") {
            Some(hp) => {
                if let (Some(t), Some(q)) = (unit_type, quality) {
                    let max = max_hp(t, q);
                    let ok = hp.as_u64().filter(|h| (1..=max as u64).contains(h)).is_some();
                    if !ok {
                        errors.push(ValidationError::HpOutOfRange {
                            unit: label.clone(),
                            found: hp.to_string(),
                            max,
                        });
                    }
                }
            }
            None => errors.push(ValidationError::MissingField {
                field: format!("units[{index}].hp"),
            }),
        }

        if unit.get("id").and_then(Value::as_str).is_some_and(|s| !s.is_empty()) {
            if roster.sides.contains_key(&id) {
                errors.push(ValidationError::DuplicateUnitId { id: id.clone() });
            } else {
                roster.sides.insert(id, side);
            }
        }
    }
    roster
}

/// Parse a closed-enumeration field, reporting missing or bad values
fn parse_enum<T: std::str::FromStr>(
    unit: &Map<String, Value>,
    field: &str,
    label: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<T> {
    let Some(value) = unit.get(field) else {
        errors.push(ValidationError::InvalidEnum {
            unit: label.to_string(),
            field: field.to_string(),
            found: "nothing".to_string(),
        });
        return None;
    };
    let parsed = value.as_str().and_then(|s| s.parse::<T>().ok());
    if parsed.is_none() {
        errors.push(ValidationError::InvalidEnum {
            unit: label.to_string(),
            field: field.to_string(),
            found: value.to_string(),
        });
    }
    parsed
}

#[derive(Debug, Clone, Copy)]
struct TurnInfo {
    side: Option<Side>,
    activations_left: Option<u64>,
}

fn check_turn(turn: &Value, rules: &ValidationRules, errors: &mut Vec<ValidationError>) -> Option<TurnInfo> {
    let Some(obj) = turn.as_object() else {
        errors.push(ValidationError::TurnNotObject);
        return None;
    };
    check_fields(obj, &TURN_FIELDS, "turn.", errors);

    let side = obj.get("side").and_then(Value::as_str).and_then(|s| s.parse::<Side>().ok());
    if side.is_none() {
        errors.push(ValidationError::TurnSideInvalid {
            found: obj.get("side").map_or_else(|| "nothing".to_string(), Value::to_string),
        });
    }

    let turn_number = obj
        .get("turnNumber")
        .and_then(Value::as_u64)
        .filter(|n| *n >= 1 && *n <= u32::MAX as u64);
    if turn_number.is_none() {
        errors.push(ValidationError::TurnNumberInvalid {
            found: obj.get("turnNumber").map_or_else(|| "nothing".to_string(), Value::to_string),
        });
    }

    let limit = rules.activation_limit;
    let activations_left = obj
        .get("activationsLeft")
        .and_then(Value::as_u64)
        .filter(|n| *n <= limit as u64);
    if activations_left.is_none() {
        errors.push(ValidationError::ActivationsLeftOutOfRange {
            found: obj
                .get("activationsLeft")
                .map_or_else(|| "nothing".to_string(), Value::to_string),
            limit,
        });
    }

    Some(TurnInfo {
        side,
        activations_left,
    })
}

fn check_standards(standards: &Value, to_win: Option<u64>, errors: &mut Vec<ValidationError>) {
    let Some(map) = standards.as_object() else {
        errors.push(ValidationError::StandardsNotObject);
        return;
    };
    // Export omits zero scores, so only positive entries survive a round trip
    if map.is_empty() {
        errors.push(ValidationError::StandardsEmpty);
    }
    for (key, value) in map {
        if key.parse::<Side>().is_err() {
            errors.push(ValidationError::StandardsSideInvalid { key: key.clone() });
            continue;
        }
        // A side at the threshold has already won; that game cannot resume
        let ok = value
            .as_u64()
            .filter(|n| *n >= 1 && to_win.map_or(true, |limit| *n < limit))
            .is_some();
        if !ok {
            errors.push(ValidationError::StandardsValueInvalid {
                side: key.clone(),
                found: value.to_string(),
            });
        }
    }
}

fn check_acted(
    acted: &Value,
    roster: &Roster,
    turn: Option<TurnInfo>,
    rules: &ValidationRules,
    errors: &mut Vec<ValidationError>,
) {
    let Some(list) = acted.as_array() else {
        errors.push(ValidationError::ActedNotArray);
        return;
    };
    if list.is_empty() {
        errors.push(ValidationError::ActedEmpty);
    }

    let mut seen = BTreeSet::new();
    for entry in list {
        let Some(id) = entry.as_str() else {
            errors.push(ValidationError::ActedUnitInvalid {
                found: entry.to_string(),
            });
            continue;
        };
        if !seen.insert(id) {
            errors.push(ValidationError::ActedDuplicate { id: id.to_string() });
            continue;
        }
        let turn_side = turn.and_then(|t| t.side);
        let belongs = match (roster.sides.get(id), turn_side) {
            (Some(Some(side)), Some(active)) => *side == active,
            // Side errors are already reported elsewhere
            (Some(_), _) => true,
            (None, _) => false,
        };
        if !belongs {
            errors.push(ValidationError::ActedUnitInvalid {
                found: entry.to_string(),
            });
        }
    }

    if let Some(left) = turn.and_then(|t| t.activations_left) {
        let used = (rules.activation_limit as u64).saturating_sub(left);
        if seen.len() as u64 > used {
            errors.push(ValidationError::ActedExceedsUsed {
                count: seen.len(),
                used,
            });
        }
    }
}
