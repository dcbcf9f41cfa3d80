//! CLI command implementations.

pub mod config;
pub mod curves;
pub mod process;
