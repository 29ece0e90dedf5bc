//! DBD Tactics - deterministic hex-grid tactical combat engine

pub mod battle;
pub mod core;
pub mod scenario;
