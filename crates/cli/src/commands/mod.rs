//! CLI command implementations

pub mod dataset;
pub mod health;
pub mod predict;
pub mod train;
