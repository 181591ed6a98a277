//! Level context
//!
//! The "caller" every event, action and stop condition is bound to. It is
//! constructed explicitly when a level starts and dropped with it.

use std::rc::Rc;

use crate::config::GameSettings;
use crate::host::GameHost;
use crate::schedule::Scheduler;
use crate::state::StateStore;

/// Shared handle to a [`LevelContext`].
pub type Caller = Rc<LevelContext>;

/// Capabilities available to scripted content for one running level.
pub struct LevelContext {
    store: StateStore,
    scheduler: Rc<dyn Scheduler>,
    host: Rc<dyn GameHost>,
    settings: GameSettings,
}

impl LevelContext {
    /// Creates a context with a fresh, empty state store.
    #[must_use]
    pub fn new(
        scheduler: Rc<dyn Scheduler>,
        host: Rc<dyn GameHost>,
        settings: GameSettings,
    ) -> Caller {
        Rc::new(Self {
            store: StateStore::new(),
            scheduler,
            host,
            settings,
        })
    }

    #[must_use]
    pub const fn store(&self) -> &StateStore {
        &self.store
    }

    #[must_use]
    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    #[must_use]
    pub fn host(&self) -> &dyn GameHost {
        self.host.as_ref()
    }

    #[must_use]
    pub const fn settings(&self) -> &GameSettings {
        &self.settings
    }
}

impl std::fmt::Debug for LevelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelContext")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
