//! `sortie` - declarative event and phase choreography for 2D arcade
//! shooter levels
//!
//! Levels are scripted as phases of events. Events react to timers or
//! state changes, run actions, repeat until a stop condition holds, and
//! hand over to the next event in their chain. A phase finishes once all
//! of its events have, and the sequencer then starts the next phase.

pub mod actions;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod level;
pub mod observability;
pub mod schedule;
pub mod script;
pub mod state;
