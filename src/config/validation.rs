//! Level script validation
//!
//! Semantic checks on a parsed [`LevelConfig`]. Validation collects ALL
//! errors rather than stopping at the first, so a script author sees
//! every problem in one pass.

use std::collections::{HashMap, HashSet};

use crate::config::loader::LoaderLimits;
use crate::config::schema::{
    ActionConfig, DisplayConfig, EventConfig, LevelConfig, StopConfig, TriggerConfig,
};
use crate::error::{Severity, ValidationIssue};
use crate::state::StateKey;

/// Maximum edit distance for "did you mean" suggestions.
const SUGGESTION_DISTANCE: usize = 3;

// ============================================================================
// Public API
// ============================================================================

/// Result of level script validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Level script validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    /// Event id to the path it was first declared at.
    event_ids: HashMap<String, String>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a level script and returns every issue found.
    pub fn validate(&mut self, config: &LevelConfig, limits: &LoaderLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();
        self.event_ids.clear();

        if config.level.name.trim().is_empty() {
            self.add_error("level.name", "Level name is required");
        }

        self.validate_limits(config, limits);
        self.collect_event_ids(config);
        self.validate_phases(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Structure
    // ========================================================================

    fn validate_limits(&mut self, config: &LevelConfig, limits: &LoaderLimits) {
        if config.phases.len() > limits.max_phases {
            self.add_error(
                "phases",
                &format!(
                    "Too many phases: {} (limit {})",
                    config.phases.len(),
                    limits.max_phases
                ),
            );
        }

        let total_events: usize = config
            .phases
            .iter()
            .flat_map(|p| &p.events)
            .map(|e| e.chain().len())
            .sum();
        if total_events > limits.max_events {
            self.add_error(
                "phases",
                &format!("Too many events: {total_events} (limit {})", limits.max_events),
            );
        }

        for (p, phase) in config.phases.iter().enumerate() {
            for (e, event) in phase.events.iter().enumerate() {
                let depth = event.chain().len();
                if depth > limits.max_chain_depth {
                    self.add_error(
                        &format!("phases[{p}].events[{e}]"),
                        &format!(
                            "Event chain too long: {depth} (limit {})",
                            limits.max_chain_depth
                        ),
                    );
                }
            }
        }
    }

    fn collect_event_ids(&mut self, config: &LevelConfig) {
        for (p, phase) in config.phases.iter().enumerate() {
            for (e, root) in phase.events.iter().enumerate() {
                for (depth, event) in root.chain().into_iter().enumerate() {
                    let Some(id) = &event.id else { continue };
                    let path = event_path(p, e, depth);
                    if id.trim().is_empty() {
                        self.add_error(&format!("{path}.id"), "Event id cannot be empty");
                    } else if let Some(first) = self.event_ids.get(id) {
                        let message = format!("Duplicate event id '{id}' (first declared at {first})");
                        self.add_error(&format!("{path}.id"), &message);
                    } else {
                        self.event_ids.insert(id.clone(), path);
                    }
                }
            }
        }
    }

    fn validate_phases(&mut self, config: &LevelConfig) {
        if config.phases.is_empty() {
            self.add_warning("phases", "Level has no phases; it finishes immediately");
        }

        let mut names = HashSet::new();
        for (p, phase) in config.phases.iter().enumerate() {
            let path = format!("phases[{p}]");
            if phase.name.trim().is_empty() {
                self.add_error(&format!("{path}.name"), "Phase name is required");
            } else if !names.insert(phase.name.as_str()) {
                self.add_error(
                    &format!("{path}.name"),
                    &format!("Duplicate phase name '{}'", phase.name),
                );
            }

            self.validate_actions(&phase.execute, &format!("{path}.execute"));

            for (e, root) in phase.events.iter().enumerate() {
                for (depth, event) in root.chain().into_iter().enumerate() {
                    self.validate_event(event, &event_path(p, e, depth));
                }
            }
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    fn validate_event(&mut self, event: &EventConfig, path: &str) {
        self.validate_trigger(&event.when, &format!("{path}.when"));
        if let Some(until) = &event.until {
            self.validate_stop(until, event.id.as_deref(), &format!("{path}.until"));
        }
        self.validate_actions(&event.execute, &format!("{path}.execute"));
        self.validate_actions(&event.then_execute, &format!("{path}.then_execute"));
        self.validate_actions(&event.finally, &format!("{path}.finally"));

        if event.execute.is_empty() && event.then_execute.is_empty() && event.finally.is_empty() {
            if event.then.is_none() && event.until.is_none() {
                self.add_warning(path, "Event has no actions; it only gates its phase");
            }
        }
    }

    fn validate_trigger(&mut self, trigger: &TriggerConfig, path: &str) {
        match (&trigger.after, &trigger.on) {
            (Some(_), Some(_)) => {
                self.add_error(path, "Trigger must set exactly one of 'after' or 'on', not both");
            }
            (None, None) => {
                self.add_error(path, "Trigger must set one of 'after' or 'on'");
            }
            (Some(after), None) => {
                self.validate_duration(after, &format!("{path}.after"));
                if trigger.equals.is_some() {
                    self.add_error(&format!("{path}.equals"), "'equals' requires 'on'");
                }
            }
            (None, Some(key)) => self.validate_state_key(key, &format!("{path}.on")),
        }
    }

    fn validate_stop(&mut self, stop: &StopConfig, own_id: Option<&str>, path: &str) {
        let forms = [
            stop.spawned.is_some(),
            stop.counter.is_some() || stop.reaches.is_some(),
            stop.occurrences.is_some() || stop.count.is_some(),
            stop.fired.is_some(),
        ];
        let set = forms.iter().filter(|f| **f).count();
        if set != 1 {
            self.add_error(
                path,
                "Stop condition must use exactly one of 'spawned', 'counter'+'reaches', 'occurrences'+'count' or 'fired'",
            );
            return;
        }

        if let Some(spawned) = stop.spawned {
            if spawned <= 0 {
                self.add_warning(&format!("{path}.spawned"), "Condition is satisfied immediately");
            }
        }

        match (&stop.counter, stop.reaches) {
            (Some(key), Some(_)) => self.validate_state_key(key, &format!("{path}.counter")),
            (Some(_), None) => self.add_error(&format!("{path}.reaches"), "'counter' requires 'reaches'"),
            (None, Some(_)) => self.add_error(&format!("{path}.counter"), "'reaches' requires 'counter'"),
            (None, None) => {}
        }

        match (&stop.occurrences, stop.count) {
            (Some(key), Some(_)) => self.validate_state_key(key, &format!("{path}.occurrences")),
            (Some(_), None) => self.add_error(&format!("{path}.count"), "'occurrences' requires 'count'"),
            (None, Some(_)) => {
                self.add_error(&format!("{path}.occurrences"), "'count' requires 'occurrences'");
            }
            (None, None) => {}
        }

        if let Some(id) = &stop.fired {
            if !self.event_ids.contains_key(id) {
                let message = suggest(id, self.event_ids.keys().map(String::as_str)).map_or_else(
                    || format!("Unknown event id '{id}'"),
                    |s| format!("Unknown event id '{id}' (did you mean '{s}'?)"),
                );
                self.add_error(&format!("{path}.fired"), &message);
            } else if own_id == Some(id.as_str()) {
                self.add_warning(
                    &format!("{path}.fired"),
                    "Event gated on itself fires exactly once",
                );
            }
        }
    }

    fn validate_state_key(&mut self, key: &str, path: &str) {
        if key.trim().is_empty() {
            self.add_error(path, "State key cannot be empty");
            return;
        }
        let key = StateKey::new(key);
        if key.is_well_known() {
            return;
        }
        if let Some(s) = suggest(key.as_str(), StateKey::WELL_KNOWN.iter().map(StateKey::as_str)) {
            self.add_warning(
                path,
                &format!("Custom state key '{key}' is close to built-in '{s}'"),
            );
        }
    }

    fn validate_duration(&mut self, duration: &str, path: &str) {
        if let Err(e) = humantime::parse_duration(duration.trim()) {
            self.add_error(
                path,
                &format!("Invalid duration '{duration}': {e}. Expected e.g. '1s', '250ms', '2m 30s'"),
            );
        }
    }

    // ========================================================================
    // Actions
    // ========================================================================

    fn validate_actions(&mut self, actions: &[ActionConfig], base_path: &str) {
        for (idx, action) in actions.iter().enumerate() {
            let path = format!("{base_path}[{idx}].{}", action.kind());
            match action {
                ActionConfig::Display(DisplayConfig::Timed { hold, fade, .. }) => {
                    if let Some(hold) = hold {
                        self.validate_duration(hold, &format!("{path}.hold"));
                    }
                    if let Some(fade) = fade {
                        self.validate_duration(fade, &format!("{path}.fade"));
                    }
                }
                ActionConfig::Set { key, .. } | ActionConfig::Inform { key, .. } => {
                    self.validate_state_key(key, &format!("{path}.key"));
                }
                ActionConfig::GrantExperience(0) => {
                    self.add_warning(&path, "Granting zero experience has no effect");
                }
                ActionConfig::DropLoot(package) => {
                    if let Some(health) = package.health {
                        let values = [health.min, health.max, health.drop_rate];
                        if values.iter().any(|v| !v.is_finite()) {
                            self.add_error(
                                &format!("{path}.health"),
                                "'min', 'max' and 'drop_rate' must be finite numbers",
                            );
                            continue;
                        }
                        if !(0.0..=1.0).contains(&health.drop_rate) {
                            self.add_warning(
                                &format!("{path}.health.drop_rate"),
                                "Drop rate outside [0, 1] is clamped",
                            );
                        }
                        if health.min > health.max {
                            self.add_warning(
                                &format!("{path}.health"),
                                "'min' is greater than 'max'; bounds are swapped",
                            );
                        }
                    }
                }
                ActionConfig::Display(DisplayConfig::Text(_))
                | ActionConfig::Spawn(_)
                | ActionConfig::Log(_)
                | ActionConfig::Scene(_)
                | ActionConfig::GrantExperience(_)
                | ActionConfig::PlayerDeath => {}
            }
        }
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn event_path(phase: usize, event: usize, depth: usize) -> String {
    let mut path = format!("phases[{phase}].events[{event}]");
    for _ in 0..depth {
        path.push_str(".then");
    }
    path
}

/// Closest candidate within [`SUGGESTION_DISTANCE`], excluding exact
/// matches.
fn suggest<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    candidates
        .map(|c| (c, strsim::damerau_levenshtein(input, c)))
        .filter(|(_, dist)| *dist > 0 && *dist <= SUGGESTION_DISTANCE)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> LoaderLimits {
        LoaderLimits {
            max_phases: 3,
            max_events: 10,
            max_chain_depth: 3,
            max_file_size: 1 << 20,
        }
    }

    fn validate(yaml: &str) -> ValidationResult {
        let config: LevelConfig = serde_yaml::from_str(yaml).unwrap();
        Validator::new().validate(&config, &limits())
    }

    fn has_error(result: &ValidationResult, path: &str) -> bool {
        result.errors.iter().any(|e| e.path == path)
    }

    #[test]
    fn test_valid_level() {
        let result = validate(
            r"
level: { name: ok }
phases:
  - name: one
    execute: [ { spawn: basic } ]
    events:
      - id: kills
        when: { on: enemy_died }
        execute: [ { spawn: basic } ]
        until: { spawned: 3 }
",
        );
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_trigger_needs_exactly_one_form() {
        let result = validate(
            r"
level: { name: t }
phases:
  - name: p
    events:
      - when: {}
        execute: [ { log: a } ]
      - when: { after: 1s, on: x }
        execute: [ { log: b } ]
",
        );
        assert!(has_error(&result, "phases[0].events[0].when"));
        assert!(has_error(&result, "phases[0].events[1].when"));
    }

    #[test]
    fn test_invalid_duration() {
        let result = validate(
            r"
level: { name: t }
phases:
  - name: p
    events:
      - when: { after: soon }
        execute: [ { log: a } ]
",
        );
        assert!(has_error(&result, "phases[0].events[0].when.after"));
    }

    #[test]
    fn test_unknown_fired_id_suggests() {
        let result = validate(
            r"
level: { name: t }
phases:
  - name: p
    events:
      - id: boss_dead
        when: { on: boss_died }
      - when: { after: 1s }
        execute: [ { spawn: minion } ]
        until: { fired: bos_dead }
",
        );
        let issue = result
            .errors
            .iter()
            .find(|e| e.path == "phases[0].events[1].until.fired")
            .unwrap();
        assert!(issue.message.contains("did you mean 'boss_dead'"));
    }

    #[test]
    fn test_chained_ids_are_known() {
        let result = validate(
            r"
level: { name: t }
phases:
  - name: p
    events:
      - when: { after: 1s }
        execute: [ { spawn: basic } ]
        until: { fired: late }
      - when: { after: 1s }
        then:
          id: late
          when: { after: 5s }
",
        );
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn test_duplicate_names_and_ids() {
        let result = validate(
            r"
level: { name: t }
phases:
  - name: p
    events:
      - { id: a, when: { after: 1s } }
  - name: p
    events:
      - { id: a, when: { after: 1s } }
",
        );
        assert!(has_error(&result, "phases[1].name"));
        assert!(has_error(&result, "phases[1].events[0].id"));
    }

    #[test]
    fn test_stop_forms_are_exclusive() {
        let result = validate(
            r"
level: { name: t }
phases:
  - name: p
    events:
      - when: { after: 1s }
        until: { spawned: 2, count: 3 }
      - when: { after: 1s }
        until: { counter: kills }
",
        );
        assert!(has_error(&result, "phases[0].events[0].until"));
        assert!(has_error(&result, "phases[0].events[1].until.reaches"));
    }

    #[test]
    fn test_near_miss_state_key_warns() {
        let result = validate(
            r"
level: { name: t }
phases:
  - name: p
    events:
      - when: { on: enemy_dide }
        execute: [ { log: a } ]
",
        );
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.message.contains("enemy_died")));
    }

    #[test]
    fn test_limits() {
        let result = validate(
            r"
level: { name: t }
phases:
  - name: a
  - name: b
  - name: c
  - name: d
    events:
      - when: { after: 1s }
        then:
          when: { after: 1s }
          then:
            when: { after: 1s }
            then:
              when: { after: 1s }
",
        );
        assert!(has_error(&result, "phases"));
        assert!(has_error(&result, "phases[3].events[0]"));
    }

    #[test]
    fn test_collects_all_errors() {
        let result = validate(
            r"
level: { name: '' }
phases:
  - name: ''
    events:
      - when: {}
",
        );
        assert!(result.errors.len() >= 3);
    }

    #[test]
    fn test_non_finite_health_drop_rejected() {
        let result = validate(
            r"
level: { name: t }
phases:
  - name: p
    events:
      - when: { on: enemy_died }
        execute:
          - drop_loot: { experience: 1, health: { min: .nan, max: 5.0, drop_rate: 1.0 } }
          - drop_loot: { health: { min: 1.0, max: .inf, drop_rate: 0.5 } }
          - drop_loot: { health: { min: 1.0, max: 2.0, drop_rate: 0.5 } }
",
        );
        assert!(has_error(&result, "phases[0].events[0].execute[0].drop_loot.health"));
        assert!(has_error(&result, "phases[0].events[0].execute[1].drop_loot.health"));
        assert!(!has_error(&result, "phases[0].events[0].execute[2].drop_loot.health"));
    }

    #[test]
    fn test_suggest_excludes_exact() {
        assert_eq!(suggest("abc", ["abc"].into_iter()), None);
        assert_eq!(suggest("abd", ["abc", "zzzzzz"].into_iter()), Some("abc".into()));
    }
}
