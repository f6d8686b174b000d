//! Total and per-phase timing, plus the phase skeletons they hang on.

use super::{coerce_string_array, resolve_seconds, NormalizationLog, NormalizeContext, Processor};
use crate::schema::{self, ParsedCandidate};
use crate::PhaseKind;
use serde_json::{json, Map, Value};

/// Derives all timing from the selected duration config
///
/// Total duration is always `minutes * 60` and each phase gets its share of
/// the time allocation, whatever the model claimed. Exercise durations are
/// only converted, never rescaled.
pub struct DurationProcessor;

impl Processor for DurationProcessor {
    fn name(&self) -> &'static str {
        "duration"
    }

    fn process(
        &self,
        tree: &mut ParsedCandidate,
        ctx: &NormalizeContext<'_>,
        log: &mut NormalizationLog,
    ) {
        let total = ctx.duration.config.total_seconds();
        let claimed = schema::take(tree, schema::TOTAL_DURATION, schema::TOTAL_DURATION_ALIASES);
        match claimed.as_ref().and_then(Value::as_f64) {
            Some(n) if n == f64::from(total) => {}
            Some(n) => log.repaired(
                format!("total duration {} does not match {} minutes", n, ctx.minutes()),
                format!("set totalDurationSeconds to {}", total),
            ),
            None => log.fix(format!("set totalDurationSeconds to {}", total)),
        }
        tree.insert(schema::TOTAL_DURATION.into(), json!(total));

        for kind in PhaseKind::ALL {
            let key = kind.key();
            let mut phase = match schema::take(tree, key, schema::phase_aliases(kind)) {
                Some(Value::Object(phase)) => phase,
                Some(Value::Array(items)) => {
                    log.repaired(
                        format!("malformed phase: {} is a bare exercise array", key),
                        format!("wrapped {} exercises in a phase object", key),
                    );
                    let mut phase = Map::new();
                    phase.insert(schema::EXERCISES.into(), Value::Array(items));
                    phase
                }
                _ => {
                    log.repaired(
                        format!("missing {} phase", key),
                        format!("added empty {} phase", key),
                    );
                    Map::new()
                }
            };

            fill_phase_fields(kind, &mut phase, log);
            apply_phase_duration(kind, &mut phase, ctx, log);
            convert_exercise_durations(kind, &mut phase, log);

            tree.insert(key.into(), Value::Object(phase));
        }
    }
}

fn default_instructions(kind: PhaseKind) -> &'static str {
    match kind {
        PhaseKind::Warmup => "Start easy and raise your heart rate gradually",
        PhaseKind::Main => "Work through each exercise with good form, resting as listed",
        PhaseKind::Cooldown => "Slow your breathing and stretch the muscles you worked",
    }
}

fn fill_phase_fields(kind: PhaseKind, phase: &mut Map<String, Value>, log: &mut NormalizationLog) {
    let key = kind.key();

    if phase.get(schema::NAME).and_then(schema::as_text).is_none() {
        phase.insert(schema::NAME.into(), json!(kind.display_name()));
        log.fix(format!("named {} phase '{}'", key, kind.display_name()));
    }

    if phase.get(schema::INSTRUCTIONS).and_then(schema::as_text).is_none() {
        phase.insert(schema::INSTRUCTIONS.into(), json!(default_instructions(kind)));
        log.fix(format!("added default {} instructions", key));
    }

    let (tips, note) = coerce_string_array(phase.remove(schema::TIPS));
    if let Some(note) = note {
        log.fix(format!("{} tips: {}", key, note));
    }
    phase.insert(schema::TIPS.into(), tips);

    match phase.remove(schema::EXERCISES) {
        Some(Value::Array(items)) => {
            phase.insert(schema::EXERCISES.into(), Value::Array(items));
        }
        None | Some(Value::Null) => {
            phase.insert(schema::EXERCISES.into(), json!([]));
            log.fix(format!("defaulted {} exercises to empty", key));
        }
        Some(other) => {
            log.repaired(
                format!("malformed array: {}.exercises is not an array", key),
                format!("wrapped {} exercises in an array", key),
            );
            phase.insert(schema::EXERCISES.into(), json!([other]));
        }
    }
}

fn apply_phase_duration(
    kind: PhaseKind,
    phase: &mut Map<String, Value>,
    ctx: &NormalizeContext<'_>,
    log: &mut NormalizationLog,
) {
    let key = kind.key();
    let target = ctx.duration.config.phase_target_seconds(kind);
    let claimed = schema::take(phase, schema::DURATION, schema::DURATION_ALIASES);

    let resolved = claimed.as_ref().and_then(resolve_seconds);
    if let Some(minutes) = resolved.and_then(|r| r.assumed_minutes) {
        log.issue(format!("{} duration {} looks like minutes", key, minutes));
    }

    let is_target = claimed.as_ref().and_then(Value::as_f64) == Some(f64::from(target));
    if !is_target {
        log.fix(format!("set {} duration to {}s", key, target));
    }
    phase.insert(schema::DURATION.into(), json!(target));
}

fn convert_exercise_durations(
    kind: PhaseKind,
    phase: &mut Map<String, Value>,
    log: &mut NormalizationLog,
) {
    let key = kind.key();
    let Some(Value::Array(exercises)) = phase.get_mut(schema::EXERCISES) else {
        return;
    };

    for (idx, exercise) in exercises.iter_mut().enumerate() {
        let Value::Object(exercise) = exercise else {
            continue;
        };
        let n = idx + 1;
        let Some(raw) = schema::take(exercise, schema::DURATION, schema::DURATION_ALIASES) else {
            continue;
        };

        match resolve_seconds(&raw) {
            Some(resolved) => {
                if let Some(minutes) = resolved.assumed_minutes {
                    log.repaired(
                        format!("{} exercise {} duration {} looks like minutes", key, n, minutes),
                        format!(
                            "{} exercise {} duration {} converted from minutes to {}s",
                            key, n, minutes, resolved.seconds
                        ),
                    );
                } else if raw.as_f64() != Some(f64::from(resolved.seconds)) {
                    log.fix(format!(
                        "{} exercise {} duration {} converted to {}s",
                        key, n, raw, resolved.seconds
                    ));
                }
                exercise.insert(schema::DURATION.into(), json!(resolved.seconds));
            }
            None => log.issue(format!("{} exercise {} has invalid duration {}", key, n, raw)),
        }
    }
}
