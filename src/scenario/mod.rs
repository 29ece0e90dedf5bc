//! Scenario documents and their validation

pub mod document;
pub mod validation;

pub use document::{ScenarioDocument, TurnBlock, SCHEMA_VERSION};
pub use validation::{validate, validate_for, validate_with, ValidationError, ValidationRules};
