//! Level runtime
//!
//! A [`Level`] owns everything one running level needs: the virtual
//! clock, the state store (through its [`LevelContext`]), the phase
//! sequence and the standing events that live outside any phase, such
//! as player-death handling. Dropping or tearing down the level drops
//! every subscription with it.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::actions::HandlePlayerDeath;
use crate::config::GameSettings;
use crate::context::{Caller, LevelContext};
use crate::host::GameHost;
use crate::schedule::{FrameScheduler, Scheduler};
use crate::script::{Event, Phase, PhaseSequencer, Triggerable};
use crate::state::{StateKey, StateListener, StateStore, Value};

/// Stops the running phase when [`StateKey::LEVEL_HALTED`] is informed
/// and remembers it for [`Level::retry`].
#[derive(Default)]
struct HaltWatch {
    chain: RefCell<Vec<Phase>>,
    halted: RefCell<Option<Phase>>,
}

impl StateListener for HaltWatch {
    fn on_change(&self, _key: &StateKey, _value: &Value) {
        let running = self.chain.borrow().iter().find(|p| p.is_running()).cloned();
        match running {
            Some(phase) => {
                info!(phase = %phase.name(), "level halted");
                phase.stop();
                *self.halted.borrow_mut() = Some(phase);
            }
            None => debug!("level halted with no running phase"),
        }
    }
}

/// One running level.
pub struct Level {
    name: String,
    scheduler: Rc<FrameScheduler>,
    context: Caller,
    sequencer: PhaseSequencer,
    standing: Vec<Event>,
    halt: Rc<HaltWatch>,
    started: bool,
    /// `false` after teardown cleared the store's subscriptions.
    wired: bool,
}

impl Level {
    /// Creates a level with its own virtual clock.
    #[must_use]
    pub fn new(name: impl Into<String>, host: Rc<dyn GameHost>, settings: GameSettings) -> Self {
        Self::with_scheduler(name, host, Rc::new(FrameScheduler::new()), settings)
    }

    /// Creates a level on an existing clock, typically the one the host
    /// also reads its timestamps from.
    #[must_use]
    pub fn with_scheduler(
        name: impl Into<String>,
        host: Rc<dyn GameHost>,
        scheduler: Rc<FrameScheduler>,
        settings: GameSettings,
    ) -> Self {
        let halt_on_death = settings.halt_on_player_death;
        let context = LevelContext::new(scheduler.clone(), host, settings);

        let mut level = Self {
            name: name.into(),
            scheduler,
            sequencer: PhaseSequencer::new(&context),
            context,
            standing: Vec::new(),
            halt: Rc::new(HaltWatch::default()),
            started: false,
            wired: false,
        };
        level.wire();
        if halt_on_death {
            level.always(Event::player_dies()).execute(HandlePlayerDeath::new());
        }
        level
    }

    /// Creates a phase bound to this level.
    #[must_use]
    pub fn phase(&self, name: impl Into<String>) -> Phase {
        Phase::new(name, &self.context)
    }

    /// Adds a standing event that runs for the whole level, outside any
    /// phase. It is started with the level and re-armed on retry.
    pub fn always(&mut self, event: Event) -> Event {
        event.set_caller(&self.context);
        if self.started {
            event.start();
        }
        self.standing.push(event.clone());
        event
    }

    pub fn set_phase_sequence(&mut self, phases: impl IntoIterator<Item = Phase>) {
        self.sequencer.set_phase_sequence(phases);
    }

    /// Starts the standing events and the phase chain.
    pub fn start(&mut self, countdown: u32) {
        info!(level = %self.name, countdown, "level started");
        if !self.wired {
            self.wire();
        }
        self.started = true;
        self.halt.halted.borrow_mut().take();
        for event in &self.standing {
            event.reset_chain();
            event.start();
        }
        self.sequencer.start(countdown);
        *self.halt.chain.borrow_mut() = self.sequencer.chain().to_vec();
    }

    /// Advances the level clock by `dt`, running every timer that comes
    /// due. Returns the number of timers fired.
    pub fn update(&self, dt: Duration) -> usize {
        self.scheduler.advance(dt)
    }

    /// Restarts the halted phase from scratch, restoring normal speed and
    /// pause permission. Returns `false` if nothing was halted.
    pub fn retry(&self) -> bool {
        let Some(phase) = self.halt.halted.borrow_mut().take() else {
            warn!(level = %self.name, "retry requested but level is not halted");
            return false;
        };
        info!(level = %self.name, phase = %phase.name(), "retrying phase");
        self.context.host().set_game_speed(1.0);
        self.context.store().set(StateKey::CAN_PAUSE_GAME, true);
        for event in &self.standing {
            if !event.is_active() {
                event.reset_chain();
                event.start();
            }
        }
        phase.restart();
        true
    }

    /// Stops everything and drops all state and pending timers. A later
    /// [`start`](Self::start) wires the level up again.
    pub fn teardown(&mut self) {
        info!(level = %self.name, "level torn down");
        self.sequencer.stop();
        self.sequencer.reset();
        for event in &self.standing {
            event.reset_chain();
        }
        self.halt.chain.borrow_mut().clear();
        self.halt.halted.borrow_mut().take();
        self.scheduler.clear();
        self.context.store().clear();
        self.started = false;
        self.wired = false;
    }

    /// Seeds the level-wide state and subscribes the halt watch.
    fn wire(&mut self) {
        let store = self.context.store();
        store.set(StateKey::CAN_PAUSE_GAME, true);
        store.subscribe(&self.halt, StateKey::LEVEL_HALTED);
        self.wired = true;
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn context(&self) -> &Caller {
        &self.context
    }

    #[must_use]
    pub fn store(&self) -> &StateStore {
        self.context.store()
    }

    #[must_use]
    pub fn scheduler(&self) -> &Rc<FrameScheduler> {
        &self.scheduler
    }

    #[must_use]
    pub const fn sequencer(&self) -> &PhaseSequencer {
        &self.sequencer
    }

    #[must_use]
    pub fn current_phase(&self) -> Option<Phase> {
        self.sequencer.current_phase()
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halt.halted.borrow().is_some()
    }

    /// `true` once the terminal phase has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sequencer.is_complete()
    }
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("name", &self.name)
            .field("now", &self.scheduler.now())
            .field("phases", &self.sequencer.phases().len())
            .field("halted", &self.is_halted())
            .finish_non_exhaustive()
    }
}
