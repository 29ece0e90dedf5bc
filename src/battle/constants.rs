//! Battle rule constants - all tunable values in one place
//!
//! Unit profiles (HP, dice, movement) live on `UnitType` itself.

// Turn economy
pub const DEFAULT_ACTIVATION_LIMIT: u32 = 3;
pub const MAX_ACTIVATION_LIMIT: u32 = 20;

// Dice faces: 5-6 = Hit, 4 = Retreat, 1-3 = Miss
pub const DIE_FACES: u8 = 6;
pub const DIE_HIT_MIN: u8 = 5;
pub const DIE_RETREAT: u8 = 4;

// Dice pool modifiers
pub const FLANK_BONUS_DICE: u32 = 1;
pub const FLANK_MIN_ADJACENT_ENEMIES: usize = 2;
pub const COVER_PENALTY_DICE: u32 = 1;
pub const MIN_DICE_POOL: u32 = 1;

// Damage taken per blocked retreat step
pub const BLOCKED_RETREAT_DAMAGE: u8 = 1;

// Standards awarded on destruction
pub const STANDARDS_PER_UNIT: u32 = 1;
pub const STANDARDS_PER_GENERAL: u32 = 2;

// Scenario bounds
pub const MIN_STANDARDS_TO_WIN: u64 = 1;
pub const MAX_STANDARDS_TO_WIN: u64 = 20;
pub const DEFAULT_STANDARDS_TO_WIN: u32 = 6;

// Board graph bounds
pub const MIN_CELL_DEGREE: usize = 2;
pub const MAX_CELL_DEGREE: usize = 6;
