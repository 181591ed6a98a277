//! Phase sequencing
//!
//! A [`PhaseSequencer`] links a level's phases into one linear chain,
//! optionally prefixed by a countdown and always terminated by a phase
//! that returns the host to the main menu.

use std::time::Duration;

use tracing::info;

use crate::actions::{DisplayText, SetScene};
use crate::context::Caller;

use super::event::Event;
use super::phase::Phase;

const TICK: Duration = Duration::from_secs(1);

/// Name of the synthesized countdown phase.
pub const COUNTDOWN_PHASE: &str = "countdown";
/// Name of the synthesized terminal phase.
pub const FINISH_PHASE: &str = "finish";

/// Links phases into the level's script.
#[derive(Debug)]
pub struct PhaseSequencer {
    caller: Caller,
    phases: Vec<Phase>,
    chain: Vec<Phase>,
}

impl PhaseSequencer {
    #[must_use]
    pub fn new(caller: &Caller) -> Self {
        Self {
            caller: Caller::clone(caller),
            phases: Vec::new(),
            chain: Vec::new(),
        }
    }

    /// Replaces the scripted phases and links each adjacent pair.
    pub fn set_phase_sequence(&mut self, phases: impl IntoIterator<Item = Phase>) {
        self.phases = phases.into_iter().collect();
        link(&self.phases);
        if let Some(last) = self.phases.last() {
            last.set_next_phase(None);
        }
    }

    /// Builds the full chain (countdown, scripted phases, finish) and
    /// starts its first phase. A previous chain is reset first.
    pub fn start(&mut self, countdown: u32) {
        self.reset();

        let mut chain = Vec::with_capacity(self.phases.len() + 2);
        if countdown > 0 {
            chain.push(countdown_phase(&self.caller, countdown));
        }
        chain.extend(self.phases.iter().cloned());
        let finish = Phase::new(FINISH_PHASE, &self.caller);
        finish.execute(SetScene::main_menu());
        chain.push(finish);

        link(&chain);
        info!(
            phases = chain.len(),
            countdown,
            "phase sequence started"
        );
        self.chain = chain;
        if let Some(first) = self.chain.first() {
            first.start();
        }
    }

    /// Stops every phase of the current chain.
    pub fn stop(&self) {
        for phase in &self.chain {
            phase.stop();
        }
    }

    /// Resets every phase of the current chain.
    pub fn reset(&self) {
        for phase in &self.chain {
            phase.reset();
        }
    }

    /// The scripted phases, without countdown or finish.
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// The full chain built by the last [`start`](Self::start).
    #[must_use]
    pub fn chain(&self) -> &[Phase] {
        &self.chain
    }

    /// The phase currently running, if any.
    #[must_use]
    pub fn current_phase(&self) -> Option<Phase> {
        self.chain.iter().find(|p| p.is_running()).cloned()
    }

    /// `true` once the terminal phase has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.chain.last().is_some_and(Phase::is_finished)
    }
}

fn link(phases: &[Phase]) {
    for pair in phases.windows(2) {
        pair[0].set_next_phase(Some(pair[1].clone()));
    }
}

/// Builds a countdown phase shown before a level.
///
/// Displays `n` on start, then every second the next lower number down to
/// `1`, then waits one more second before finishing. The whole countdown
/// is a chain of one-second timer events.
#[must_use]
pub fn countdown_phase(caller: &Caller, n: u32) -> Phase {
    let fade = caller.settings().countdown_fade;
    let tick = |count: u32| DisplayText::timed(count.to_string(), Duration::ZERO, fade);

    let phase = Phase::new(COUNTDOWN_PHASE, caller);
    phase.execute(tick(n));

    let mut event = phase.when(Event::timer(TICK));
    for count in (1..n).rev() {
        event = event.execute(tick(count)).then(Event::timer(TICK));
    }
    phase
}
