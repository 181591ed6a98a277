//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use std::rc::Rc;
use std::time::Duration;

use sortie::config::{ConfigLoader, GameSettings, build_level};
use sortie::host::HeadlessHost;
use sortie::level::Level;
use sortie::schedule::FrameScheduler;

/// Absolute path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Runs the `sortie` binary quietly and waits for it.
#[allow(clippy::missing_panics_doc)]
pub fn sortie(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sortie"))
        .args(args)
        .arg("--quiet")
        .env_remove("SORTIE_LOG_LEVEL")
        .output()
        .expect("failed to run sortie")
}

/// An empty level on a fresh virtual clock, with the recording host.
pub fn headless_level(settings: GameSettings) -> (Level, Rc<HeadlessHost>) {
    let clock = Rc::new(FrameScheduler::new());
    let host = Rc::new(HeadlessHost::new(clock.clone()));
    let level = Level::with_scheduler("test", host.clone(), clock, settings);
    (level, host)
}

/// Loads and compiles a fixture script.
#[allow(clippy::missing_panics_doc)]
pub fn load_fixture(name: &str) -> (Level, Rc<HeadlessHost>) {
    let loaded = ConfigLoader::with_defaults()
        .load(&fixture_path(name))
        .expect("fixture should load");
    let clock = Rc::new(FrameScheduler::new());
    let host = Rc::new(HeadlessHost::new(clock.clone()));
    let level = build_level(&loaded.config, host.clone(), clock).expect("fixture should compile");
    (level, host)
}

pub const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
