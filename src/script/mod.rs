//! Level scripting engine.
//!
//! Level content is written against a small fluent surface:
//!
//! ```text
//! phase.when(Event::enemy_dies())
//!     .execute(SpawnEnemy::new("basic"))
//!     .until(CounterReaches::enemies_spawned(3))
//!     .on_finish(DisplayText::new("Wave cleared"));
//! ```
//!
//! [`Event`]s wait on a [`Stimulus`], run [`Action`]s, repeat until their
//! [`StopCondition`] holds and hand over to chained successors.
//! [`Phase`]s bundle events into level stages and the
//! [`PhaseSequencer`] links the stages into a full script.

pub mod action;
pub mod condition;
pub mod event;
pub mod phase;
pub mod sequencer;
pub mod stimulus;

pub use action::{Action, ActionCell, CallerSlot, FnAction, from_fn};
pub use condition::{CounterReaches, Occurrences, StopCondition};
pub use event::{Event, Triggerable};
pub use phase::Phase;
pub use sequencer::{COUNTDOWN_PHASE, FINISH_PHASE, PhaseSequencer, countdown_phase};
pub use stimulus::{Manual, StateChange, Stimulus, TimerFires};
