//! Command-line interface
//!
//! Argument definitions and command handlers for the `sortie` binary.

pub mod args;
pub mod commands;
