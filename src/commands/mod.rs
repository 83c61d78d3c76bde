//! CLI command implementations for nvidia-smi-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `config`: Configuration file generation
//! - `test`: One-shot nvidia-smi query

pub mod config;

// Re-export command functions
pub use config::command_config;
pub use test::command_test;
