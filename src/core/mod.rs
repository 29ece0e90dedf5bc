pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, RetreatPolicy};
pub use error::{IllegalAction, NotFound, Result, TacticsError};
pub use types::{CellId, Side, TurnNumber, UnitId};
