//! Level script configuration
//!
//! Loads, validates and compiles YAML level scripts into runnable
//! [`Level`](crate::level::Level)s.

pub mod compile;
pub mod loader;
pub mod schema;
pub mod validation;

pub use compile::{build_action, build_level, compile};
pub use loader::{ConfigLoader, LoadResult, LoaderLimits};
pub use schema::{
    ActionConfig, EventConfig, GameSettings, LevelConfig, LevelMeta, PhaseConfig, StopConfig,
    TriggerConfig,
};
pub use validation::{ValidationResult, Validator};
