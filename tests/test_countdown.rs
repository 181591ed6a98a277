//! Countdown timing ahead of the scripted phases.

mod common;

use std::time::Duration;

use common::{headless_level, secs};
use sortie::actions::DisplayText;
use sortie::config::GameSettings;
use sortie::host::HostRequest;
use sortie::script::{COUNTDOWN_PHASE, Event};

#[test]
fn countdown_of_three_ticks_once_per_second() {
    let (mut level, host) = headless_level(GameSettings::default());
    let phase = level.phase("first");
    phase.execute(DisplayText::new("Go!"));
    level.set_phase_sequence([phase.clone()]);
    level.start(3);

    assert_eq!(
        level.current_phase().map(|p| p.name().to_string()).as_deref(),
        Some(COUNTDOWN_PHASE)
    );

    level.update(secs(2));
    assert!(!phase.is_running());

    level.update(secs(1));
    assert_eq!(
        host.timed_messages(),
        vec![
            (secs(0), "3".to_string()),
            (secs(1), "2".to_string()),
            (secs(2), "1".to_string()),
            (secs(3), "Go!".to_string()),
        ]
    );
}

#[test]
fn countdown_text_uses_countdown_fade_and_no_hold() {
    let settings = GameSettings {
        countdown_fade: Duration::from_millis(750),
        ..GameSettings::default()
    };
    let (mut level, host) = headless_level(settings);
    level.start(2);

    let HostRequest::Message { hold, fade, .. } = &host.records()[0].request else {
        panic!("expected a message first");
    };
    assert_eq!(*hold, Duration::ZERO);
    assert_eq!(*fade, Duration::from_millis(750));
}

#[test]
fn zero_countdown_starts_first_phase_immediately() {
    let (mut level, host) = headless_level(GameSettings::default());
    let phase = level.phase("first");
    phase.when(Event::timer(secs(1)).execute(DisplayText::new("contact")));
    level.set_phase_sequence([phase.clone()]);
    level.start(0);

    assert!(phase.is_running());
    level.update(secs(1));
    assert_eq!(host.timed_messages(), vec![(secs(1), "contact".to_string())]);
}

#[test]
fn restarting_level_rebuilds_countdown() {
    let (mut level, host) = headless_level(GameSettings::default());
    level.start(2);
    level.update(secs(5));
    assert!(level.is_complete());

    level.start(1);
    assert!(!level.is_complete());
    level.update(secs(1));
    assert!(level.is_complete());
    assert_eq!(host.messages(), vec!["2", "1", "1"]);
}
