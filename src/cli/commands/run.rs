//! Headless level simulation (`sortie run`)

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::{ConfigLoader, build_level};
use crate::error::SortieError;
use crate::host::HeadlessHost;
use crate::level::Level;
use crate::observability::RunSummary;
use crate::schedule::{FrameScheduler, Scheduler};
use crate::state::{EntitySnapshot, Point, StateKey, Value};

/// A broadcast scheduled from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledInform {
    pub key: StateKey,
    pub value: Option<Value>,
    pub at: Duration,
}

/// Parses `KEY[=VALUE]@TIME`. VALUE is read as YAML, so `2`, `true` and
/// `boss` become an integer, a flag and text respectively.
///
/// # Errors
///
/// Returns a usage error if the key or time is missing or malformed.
pub fn parse_inform(spec: &str) -> Result<ScheduledInform, SortieError> {
    let (head, time) = spec
        .rsplit_once('@')
        .ok_or_else(|| SortieError::Usage(format!("--inform '{spec}' is missing '@TIME'")))?;
    let at = parse_duration("--inform", time)?;

    let (key, value) = match head.split_once('=') {
        Some((key, raw)) => {
            let value: Value = serde_yaml::from_str(raw).map_err(|e| {
                SortieError::Usage(format!("--inform '{spec}' has an unreadable value: {e}"))
            })?;
            (key, Some(value))
        }
        None => (head, None),
    };

    let key = key.trim();
    if key.is_empty() {
        return Err(SortieError::Usage(format!("--inform '{spec}' has no key")));
    }

    Ok(ScheduledInform {
        key: StateKey::new(key),
        value,
        at,
    })
}

/// Loads a level script, plays it against a headless host and prints
/// what happened.
///
/// # Errors
///
/// Returns an error if the script does not load, an argument is
/// malformed, or the level stops before finishing.
pub async fn run(args: &RunArgs) -> Result<(), SortieError> {
    let limit = parse_duration("--for", &args.limit)?;
    let frame = parse_duration("--frame", &args.frame)?;
    if frame.is_zero() {
        return Err(SortieError::Usage("--frame must be longer than zero".into()));
    }
    let informs = args
        .informs
        .iter()
        .map(|spec| parse_inform(spec))
        .collect::<Result<Vec<_>, _>>()?;

    let loaded = ConfigLoader::with_defaults().load(&args.level)?;
    for warning in &loaded.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }

    let scheduler = Rc::new(FrameScheduler::new());
    let host = Rc::new(HeadlessHost::new(scheduler.clone()));
    let mut level = build_level(&loaded.config, host.clone(), scheduler)?;

    let countdown = args.countdown.unwrap_or(loaded.config.level.countdown);
    level.start(countdown);
    schedule_informs(&level, informs);

    info!(
        level = %level.name(),
        limit = %humantime::format_duration(limit),
        frame = ?frame,
        realtime = args.realtime,
        "simulation started"
    );
    simulate(&level, limit, frame, args.realtime).await;

    let summary = RunSummary::collect(&level, &host);
    match args.format {
        OutputFormat::Human => println!("{summary}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    level.teardown();
    if summary.is_complete() {
        Ok(())
    } else {
        Err(SortieError::Incomplete {
            level: summary.level,
            reason: summary.stop_reason.to_string(),
        })
    }
}

/// Steps the level frame by frame until it completes, halts, or runs out
/// of time.
async fn simulate(level: &Level, limit: Duration, frame: Duration, realtime: bool) {
    let clock = level.scheduler();
    while !level.is_complete() && !level.is_halted() {
        let remaining = limit.saturating_sub(clock.now());
        if remaining.is_zero() {
            break;
        }
        let step = frame.min(remaining);
        level.update(step);
        if realtime {
            tokio::time::sleep(step).await;
        }
    }
    debug!(now = ?clock.now(), pending = clock.pending(), "simulation stopped");
}

fn schedule_informs(level: &Level, informs: Vec<ScheduledInform>) {
    let next_id = Rc::new(Cell::new(1_u64));
    for inform in informs {
        let context = Rc::downgrade(level.context());
        let next_id = next_id.clone();
        level.scheduler().schedule(
            inform.at,
            Box::new(move || {
                let Some(context) = context.upgrade() else {
                    return;
                };
                let value = inform.value.unwrap_or_else(|| {
                    if inform.key == StateKey::ENEMY_DIED {
                        let id = next_id.get();
                        next_id.set(id + 1);
                        Value::Entity(EntitySnapshot::at(id, "scripted", Point::default()))
                    } else {
                        Value::Bool(true)
                    }
                });
                debug!(key = %inform.key, kind = value.kind(), "scheduled inform");
                context.store().inform(inform.key, value);
            }),
        );
    }
}

fn parse_duration(flag: &str, text: &str) -> Result<Duration, SortieError> {
    humantime::parse_duration(text.trim())
        .map_err(|e| SortieError::Usage(format!("{flag} '{text}' is not a duration: {e}")))
}
