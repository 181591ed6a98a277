//! End-of-run summary for headless simulations.

use std::fmt::Write as _;

use serde::Serialize;

use crate::host::{EntitySpec, HeadlessHost, HostRequest, LootItem, Scene};
use crate::level::Level;
use crate::schedule::Scheduler;

/// Why a simulated run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The terminal phase finished.
    Completed,
    /// The player died and the level halted.
    Halted,
    /// The time limit ran out first.
    TimeLimit,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Halted => write!(f, "halted"),
            Self::TimeLimit => write!(f, "time limit reached"),
        }
    }
}

/// Where one phase of the chain ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseOutcome {
    pub name: String,
    pub finished: bool,
    pub completed_events: usize,
    pub events: usize,
}

/// One host request with the level time it was made at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub at_secs: f64,
    #[serde(flatten)]
    pub request: HostRequest,
}

/// What happened during a simulated run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub level: String,
    pub stop_reason: StopReason,
    pub elapsed_secs: f64,
    pub phases: Vec<PhaseOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_scene: Option<Scene>,
    pub timeline: Vec<TimelineEntry>,
}

impl RunSummary {
    /// Collects the summary from a level and the host it ran against.
    #[must_use]
    pub fn collect(level: &Level, host: &HeadlessHost) -> Self {
        let stop_reason = if level.is_complete() {
            StopReason::Completed
        } else if level.is_halted() {
            StopReason::Halted
        } else {
            StopReason::TimeLimit
        };

        let phases = level
            .sequencer()
            .chain()
            .iter()
            .map(|phase| PhaseOutcome {
                name: phase.name().to_string(),
                finished: phase.is_finished(),
                completed_events: phase.completed_events(),
                events: phase.event_count(),
            })
            .collect();

        let timeline = host
            .records()
            .into_iter()
            .map(|record| TimelineEntry {
                at_secs: record.at.as_secs_f64(),
                request: record.request,
            })
            .collect();

        Self {
            level: level.name().to_string(),
            stop_reason,
            elapsed_secs: level.scheduler().now().as_secs_f64(),
            phases,
            final_scene: host.current_scene(),
            timeline,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stop_reason == StopReason::Completed
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "level '{}' {} after {:.2}s",
            self.level, self.stop_reason, self.elapsed_secs
        )?;

        writeln!(f, "phases:")?;
        for phase in &self.phases {
            let mark = if phase.finished { "done" } else { "...." };
            writeln!(
                f,
                "  [{mark}] {} ({}/{} events)",
                phase.name, phase.completed_events, phase.events
            )?;
        }

        writeln!(f, "timeline:")?;
        for entry in &self.timeline {
            writeln!(f, "  {:>8.2}s  {}", entry.at_secs, describe(&entry.request))?;
        }

        match &self.final_scene {
            Some(scene) => write!(f, "final scene: {scene}"),
            None => write!(f, "final scene: unchanged"),
        }
    }
}

fn describe(request: &HostRequest) -> String {
    match request {
        HostRequest::Message { text, hold, fade } => format!(
            "message {text:?} (hold {}, fade {})",
            humantime::format_duration(*hold),
            humantime::format_duration(*fade)
        ),
        HostRequest::Entity { spec } => match spec {
            EntitySpec::Enemy { kind, position } => {
                let mut line = format!("spawn {kind}");
                if let Some(p) = position {
                    let _ = write!(line, " at ({:.1}, {:.1})", p.x, p.y);
                }
                line
            }
            EntitySpec::Loot { item, position, .. } => {
                let reward = match item {
                    LootItem::Experience(xp) => format!("{xp} xp"),
                    LootItem::Health(hp) => format!("{hp:.0} health"),
                };
                format!("loot {reward} at ({:.1}, {:.1})", position.x, position.y)
            }
        },
        HostRequest::Scene { scene } => format!("scene {scene}"),
        HostRequest::GameSpeed { speed } => format!("game speed x{speed}"),
        HostRequest::ReleaseTouches => "release touches".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::actions::{DisplayText, SpawnEnemy};
    use crate::config::GameSettings;
    use crate::schedule::FrameScheduler;
    use crate::script::Event;

    fn level_with_host() -> (Level, Rc<HeadlessHost>) {
        let clock = Rc::new(FrameScheduler::new());
        let host = Rc::new(HeadlessHost::new(clock.clone()));
        let mut level =
            Level::with_scheduler("summary", host.clone(), clock, GameSettings::default());
        let phase = level.phase("wave");
        phase
            .when(Event::timer(Duration::from_secs(1)))
            .execute(DisplayText::new("Go"))
            .execute(SpawnEnemy::new("basic"));
        level.set_phase_sequence([phase]);
        (level, host)
    }

    #[test]
    fn test_completed_run() {
        let (mut level, host) = level_with_host();
        level.start(0);
        level.update(Duration::from_secs(2));

        let summary = RunSummary::collect(&level, &host);
        assert_eq!(summary.stop_reason, StopReason::Completed);
        assert_eq!(summary.final_scene, Some(Scene::MainMenu));
        assert!(summary.phases.iter().all(|p| p.finished));
        // message, spawn, scene
        assert_eq!(summary.timeline.len(), 3);
        assert!((summary.timeline[0].at_secs - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_time_limit_run() {
        let (mut level, host) = level_with_host();
        level.start(0);
        level.update(Duration::from_millis(500));

        let summary = RunSummary::collect(&level, &host);
        assert_eq!(summary.stop_reason, StopReason::TimeLimit);
        assert!(!summary.is_complete());
        assert!(summary.final_scene.is_none());
    }

    #[test]
    fn test_human_rendering() {
        let (mut level, host) = level_with_host();
        level.start(0);
        level.update(Duration::from_secs(2));

        let text = RunSummary::collect(&level, &host).to_string();
        assert!(text.starts_with("level 'summary' completed after 2.00s"));
        assert!(text.contains("[done] wave (1/1 events)"));
        assert!(text.contains("spawn basic"));
        assert!(text.ends_with("final scene: main menu"));
    }

    #[test]
    fn test_json_rendering() {
        let (mut level, host) = level_with_host();
        level.start(0);
        level.update(Duration::from_secs(2));

        let json = serde_json::to_value(RunSummary::collect(&level, &host)).unwrap();
        assert_eq!(json["stop_reason"], "completed");
        assert_eq!(json["timeline"][0]["type"], "message");
        assert_eq!(json["timeline"][0]["text"], "Go");
    }
}
